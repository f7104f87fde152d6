//! Loading and scoring of persisted relevance classifiers.
//!
//! Classifiers are trained offline and persisted as JSON artifacts, one
//! per (provider, embedding-model, feature-set) combination. Three
//! scoring algorithms cover the trained matrix:
//!
//! - `gaussian_nb` — Gaussian naive Bayes; reports a probability
//! - `gradient_boosting` — summed decision trees through a sigmoid;
//!   reports a probability
//! - `ridge` — linear decision function; reports a signed margin whose
//!   sign is the predicted class and whose magnitude is confidence
//!
//! The artifact carries `n_features`, and [`Classifier::predict`]
//! rejects any feature vector of a different width — a shape mismatch
//! means the features were composed for a different model, and scoring
//! them anyway would produce garbage predictions, not errors.
//!
//! Artifacts are read lazily through [`ModelStore`], which caches each
//! loaded classifier for the life of the process. Loaded classifiers
//! are immutable.

use std::collections::HashMap;
use std::f64::consts::PI;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use serde::Deserialize;
use tracing::info;

use crate::error::{FilterError, Result};

/// How a classifier reports confidence.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScoreConvention {
    /// Scores are probabilities of the relevant class, in `[0, 1]`.
    Probability,

    /// Scores are unbounded signed margins; positive means relevant.
    Margin,
}

/// Predictions for a batch of feature vectors, index-aligned with the
/// input rows.
#[derive(Clone, Debug)]
pub struct Prediction {
    /// Predicted relevance label per row.
    pub labels: Vec<bool>,

    /// Confidence score per row, interpreted per `convention`.
    pub scores: Vec<f64>,

    /// Which scoring convention `scores` follows.
    pub convention: ScoreConvention,
}

/// A loaded, read-only relevance classifier.
#[derive(Debug, Deserialize)]
pub struct Classifier {
    /// Feature vector width the model was trained on.
    n_features: usize,

    #[serde(flatten)]
    model: Model,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "algorithm", rename_all = "snake_case")]
enum Model {
    GaussianNb {
        /// Prior probability per class `[irrelevant, relevant]`.
        class_prior: [f64; 2],
        /// Per-class feature means.
        theta: [Vec<f64>; 2],
        /// Per-class feature variances (smoothing already applied).
        var: [Vec<f64>; 2],
    },
    Ridge {
        coef: Vec<f64>,
        intercept: f64,
    },
    GradientBoosting {
        learning_rate: f64,
        /// Initial log-odds before any tree contribution.
        base_score: f64,
        trees: Vec<Tree>,
    },
}

/// One regression tree in flattened-array form.
///
/// `feature[i] < 0` marks node `i` as a leaf whose output is `value[i]`;
/// otherwise the split sends `x[feature[i]] < threshold[i]` left.
#[derive(Debug, Deserialize)]
struct Tree {
    feature: Vec<i32>,
    threshold: Vec<f64>,
    left: Vec<usize>,
    right: Vec<usize>,
    value: Vec<f64>,
}

impl Tree {
    fn score(&self, x: &[f64]) -> f64 {
        let mut node = 0usize;
        loop {
            let feature = self.feature[node];
            if feature < 0 {
                return self.value[node];
            }
            node = if x[feature as usize] < self.threshold[node] {
                self.left[node]
            } else {
                self.right[node]
            };
        }
    }
}

impl Classifier {
    /// Loads a classifier artifact from disk.
    ///
    /// # Errors
    ///
    /// [`FilterError::ModelNotFound`] if the file is absent;
    /// [`FilterError::Json`] if it does not parse as an artifact.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(FilterError::ModelNotFound(path.to_path_buf()));
        }
        let data = fs::read_to_string(path)?;
        let classifier: Classifier = serde_json::from_str(&data)?;
        Ok(classifier)
    }

    /// Returns the feature vector width the model expects.
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Returns the scoring convention of this classifier.
    pub fn convention(&self) -> ScoreConvention {
        match self.model {
            Model::GaussianNb { .. } | Model::GradientBoosting { .. } => {
                ScoreConvention::Probability
            }
            Model::Ridge { .. } => ScoreConvention::Margin,
        }
    }

    /// Scores a batch of feature vectors.
    ///
    /// Output labels and scores are index-aligned with `features`.
    ///
    /// # Errors
    ///
    /// [`FilterError::FeatureMismatch`] if any row's width differs from
    /// [`Classifier::n_features`].
    pub fn predict(&self, features: &[Vec<f64>]) -> Result<Prediction> {
        for row in features {
            if row.len() != self.n_features {
                return Err(FilterError::FeatureMismatch {
                    expected: self.n_features,
                    got: row.len(),
                });
            }
        }

        let mut labels = Vec::with_capacity(features.len());
        let mut scores = Vec::with_capacity(features.len());

        for row in features {
            let (label, score) = match &self.model {
                Model::GaussianNb {
                    class_prior,
                    theta,
                    var,
                } => gaussian_nb_score(row, class_prior, theta, var),
                Model::Ridge { coef, intercept } => {
                    let margin = dot(coef, row) + intercept;
                    (margin > 0.0, margin)
                }
                Model::GradientBoosting {
                    learning_rate,
                    base_score,
                    trees,
                } => {
                    let raw: f64 = trees.iter().map(|t| t.score(row)).sum();
                    let proba = sigmoid(base_score + learning_rate * raw);
                    (proba >= 0.5, proba)
                }
            };
            labels.push(label);
            scores.push(score);
        }

        Ok(Prediction {
            labels,
            scores,
            convention: self.convention(),
        })
    }
}

/// Joint log-likelihood per class, normalized to the relevant-class
/// probability via log-sum-exp.
fn gaussian_nb_score(
    x: &[f64],
    class_prior: &[f64; 2],
    theta: &[Vec<f64>; 2],
    var: &[Vec<f64>; 2],
) -> (bool, f64) {
    let mut joint = [0.0f64; 2];
    for class in 0..2 {
        let mut log_likelihood = class_prior[class].ln();
        for (j, &value) in x.iter().enumerate() {
            let variance = var[class][j];
            let delta = value - theta[class][j];
            log_likelihood += -0.5 * (2.0 * PI * variance).ln() - delta * delta / (2.0 * variance);
        }
        joint[class] = log_likelihood;
    }

    let max = joint[0].max(joint[1]);
    let log_norm = max + ((joint[0] - max).exp() + (joint[1] - max).exp()).ln();
    let proba_relevant = (joint[1] - log_norm).exp();

    (joint[1] > joint[0], proba_relevant)
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Lazy, process-wide cache of loaded classifiers.
///
/// Artifacts live under a root directory, addressed by relative path
/// (`<provider>/<embedding-model>/<artifact>.json`). Each artifact is
/// read at most once per process; the cached classifier is shared and
/// never mutated.
pub struct ModelStore {
    root: PathBuf,
    cache: Mutex<HashMap<PathBuf, Arc<Classifier>>>,
}

impl ModelStore {
    /// Creates a store rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Loads the classifier at `relative` (cached after the first read).
    pub fn load(&self, relative: &str) -> Result<Arc<Classifier>> {
        let path = self.root.join(relative);

        let mut cache = self
            .cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if let Some(classifier) = cache.get(&path) {
            return Ok(Arc::clone(classifier));
        }

        let classifier = Arc::new(Classifier::load(&path)?);
        info!(
            path = %path.display(),
            n_features = classifier.n_features(),
            convention = ?classifier.convention(),
            "loaded classifier artifact"
        );
        cache.insert(path, Arc::clone(&classifier));
        Ok(classifier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier_from_json(json: serde_json::Value) -> Classifier {
        serde_json::from_value(json).unwrap()
    }

    /// A 1-feature Gaussian NB where class 1 centers at 1.0 and class 0
    /// at -1.0, equal priors and unit variances.
    fn toy_nb() -> Classifier {
        classifier_from_json(serde_json::json!({
            "algorithm": "gaussian_nb",
            "n_features": 1,
            "class_prior": [0.5, 0.5],
            "theta": [[-1.0], [1.0]],
            "var": [[1.0], [1.0]],
        }))
    }

    #[test]
    fn test_gaussian_nb_labels_and_probabilities() {
        let clf = toy_nb();
        let prediction = clf
            .predict(&[vec![2.0], vec![-2.0], vec![0.4]])
            .unwrap();

        assert_eq!(prediction.convention, ScoreConvention::Probability);
        assert_eq!(prediction.labels, vec![true, false, true]);

        // Probabilities match labels and stay in [0, 1]
        assert!(prediction.scores[0] > 0.5);
        assert!(prediction.scores[1] < 0.5);
        for score in &prediction.scores {
            assert!((0.0..=1.0).contains(score));
        }
    }

    #[test]
    fn test_gaussian_nb_symmetric_point() {
        let clf = toy_nb();
        let prediction = clf.predict(&[vec![0.0]]).unwrap();
        // Equidistant from both means: probability is exactly one half
        assert!((prediction.scores[0] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_ridge_margin_and_sign() {
        let clf = classifier_from_json(serde_json::json!({
            "algorithm": "ridge",
            "n_features": 2,
            "coef": [1.0, -2.0],
            "intercept": 0.25,
        }));

        let prediction = clf
            .predict(&[vec![1.0, 0.0], vec![0.0, 1.0]])
            .unwrap();

        assert_eq!(prediction.convention, ScoreConvention::Margin);
        assert_eq!(prediction.labels, vec![true, false]);
        assert!((prediction.scores[0] - 1.25).abs() < 1e-12);
        assert!((prediction.scores[1] + 1.75).abs() < 1e-12);
    }

    #[test]
    fn test_gradient_boosting_single_stump() {
        // One stump: x0 < 0.5 -> -2.0, else +2.0
        let clf = classifier_from_json(serde_json::json!({
            "algorithm": "gradient_boosting",
            "n_features": 1,
            "learning_rate": 1.0,
            "base_score": 0.0,
            "trees": [{
                "feature": [0, -1, -1],
                "threshold": [0.5, 0.0, 0.0],
                "left": [1, 0, 0],
                "right": [2, 0, 0],
                "value": [0.0, -2.0, 2.0],
            }],
        }));

        let prediction = clf.predict(&[vec![0.0], vec![1.0]]).unwrap();
        assert_eq!(prediction.labels, vec![false, true]);
        assert!((prediction.scores[0] - sigmoid(-2.0)).abs() < 1e-12);
        assert!((prediction.scores[1] - sigmoid(2.0)).abs() < 1e-12);
    }

    #[test]
    fn test_feature_mismatch_detected() {
        let clf = toy_nb();
        let err = clf.predict(&[vec![1.0, 2.0]]).unwrap_err();
        assert!(matches!(
            err,
            FilterError::FeatureMismatch {
                expected: 1,
                got: 2
            }
        ));
    }

    #[test]
    fn test_load_missing_artifact() {
        let err = Classifier::load(Path::new("/nonexistent/model.json")).unwrap_err();
        assert!(err.is_model_not_found());
    }

    #[test]
    fn test_model_store_caches() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = dir.path().join("ridge.json");
        std::fs::write(
            &artifact,
            serde_json::json!({
                "algorithm": "ridge",
                "n_features": 1,
                "coef": [1.0],
                "intercept": 0.0,
            })
            .to_string(),
        )
        .unwrap();

        let store = ModelStore::new(dir.path());
        let first = store.load("ridge.json").unwrap();

        // Delete the file; the cached classifier must still be served
        std::fs::remove_file(&artifact).unwrap();
        let second = store.load("ridge.json").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_model_store_missing() {
        let dir = tempfile::tempdir().unwrap();
        let store = ModelStore::new(dir.path());
        assert!(store.load("absent.json").unwrap_err().is_model_not_found());
    }
}
