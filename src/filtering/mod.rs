//! Per-provider relevance-filtering strategies.
//!
//! Each grey-literature source gets one [`FilterStrategy`]: it declares
//! which result fields to embed (always behind the user's intent
//! string), how to preprocess them, and which distance features to
//! concatenate into the vector its trained classifier expects. The
//! composition differs per provider *and* per embedding model — the
//! features must match exactly what the persisted classifier was
//! trained on.
//!
//! Strategy selection is a flat lookup on [`ProviderKind`], not an
//! inheritance chain; see [`strategy_for`]. Providers with no trained
//! classifier get [`PassthroughStrategy`]: everything relevant, never
//! an error.

mod html;
mod partition;

mod issues;
mod qa;
mod repos;
mod web;

pub use html::clean_html;
pub use issues::IssuesStrategy;
pub use partition::{partition, Partition, ScoredResult};
pub use qa::QaStrategy;
pub use repos::ReposStrategy;
pub use web::WebStrategy;

use crate::cancel::CancelToken;
use crate::classifier::ModelStore;
use crate::embedding::{Embedder, Embedding, EmbeddingModel, EmbeddingSpec};
use crate::error::Result;
use crate::provider::ProviderKind;
use crate::result::SearchResult;

/// Shared services handed to a strategy for one filtering pass.
pub struct FilterContext<'a> {
    /// Embedding service (batching and rate limiting included).
    pub embedder: &'a dyn Embedder,

    /// Classifier artifact store (lazy, cached).
    pub models: &'a ModelStore,

    /// Cancellation flag, polled between embedding batches.
    pub cancel: &'a CancelToken,
}

/// A provider's filtering capability.
///
/// `filter_small` and `filter_large` run the same pipeline against the
/// small/large embedding model respectively; the two differ in
/// dimensionality, feature composition, and which classifier artifact
/// they load.
pub trait FilterStrategy: Send + Sync {
    /// Filters `results` using the small embedding model's classifier.
    fn filter_small(
        &self,
        ctx: &FilterContext<'_>,
        intent: &str,
        results: &[SearchResult],
    ) -> Result<Partition>;

    /// Filters `results` using the large embedding model's classifier.
    fn filter_large(
        &self,
        ctx: &FilterContext<'_>,
        intent: &str,
        results: &[SearchResult],
    ) -> Result<Partition>;

    /// Dispatches on the requested model size.
    fn filter(
        &self,
        ctx: &FilterContext<'_>,
        intent: &str,
        results: &[SearchResult],
        model: EmbeddingModel,
    ) -> Result<Partition> {
        match model {
            EmbeddingModel::Small => self.filter_small(ctx, intent, results),
            EmbeddingModel::Large => self.filter_large(ctx, intent, results),
        }
    }
}

/// Fallback for providers without a trained classifier: returns all
/// results as relevant and an empty irrelevant list. Filtering is a
/// no-op for such providers, never an error.
pub struct PassthroughStrategy;

impl FilterStrategy for PassthroughStrategy {
    fn filter_small(
        &self,
        _ctx: &FilterContext<'_>,
        _intent: &str,
        results: &[SearchResult],
    ) -> Result<Partition> {
        Ok(Partition::passthrough(results))
    }

    fn filter_large(
        &self,
        _ctx: &FilterContext<'_>,
        _intent: &str,
        results: &[SearchResult],
    ) -> Result<Partition> {
        Ok(Partition::passthrough(results))
    }
}

/// Returns the strategy registered for a provider.
pub fn strategy_for(kind: ProviderKind) -> &'static dyn FilterStrategy {
    match kind {
        ProviderKind::Repos => &ReposStrategy,
        ProviderKind::Issues => &IssuesStrategy,
        ProviderKind::Qa => &QaStrategy,
        ProviderKind::Web => &WebStrategy,
    }
}

/// One result field a strategy embeds, with its preprocessing.
#[derive(Clone, Copy, Debug)]
pub(crate) struct FieldSpec {
    /// Field name, resolved through [`SearchResult::field_text`].
    pub name: &'static str,

    /// Whether the field value is HTML and must be cleaned first.
    pub clean_html: bool,
}

impl FieldSpec {
    pub(crate) const fn plain(name: &'static str) -> Self {
        Self {
            name,
            clean_html: false,
        }
    }

    pub(crate) const fn html(name: &'static str) -> Self {
        Self {
            name,
            clean_html: true,
        }
    }
}

/// Embeds the intent plus each declared field for every result.
///
/// Returns one vector group per result: `[intent, field_0, field_1, ..]`
/// in declaration order, index-aligned with `results`. The flattened
/// text list goes through the embedder in one pass so its batching can
/// pack across results.
pub(crate) fn embed_result_fields(
    ctx: &FilterContext<'_>,
    intent: &str,
    results: &[SearchResult],
    fields: &[FieldSpec],
    spec: EmbeddingSpec,
) -> Result<Vec<Vec<Embedding>>> {
    let stride = fields.len() + 1;

    let mut texts = Vec::with_capacity(results.len() * stride);
    for result in results {
        texts.push(intent.to_string());
        for field in fields {
            let raw = result.field_text(field.name);
            if field.clean_html {
                texts.push(clean_html(raw));
            } else {
                texts.push(raw.to_string());
            }
        }
    }

    let vectors = ctx.embedder.embed(&texts, &spec, ctx.cancel)?;
    Ok(vectors.chunks(stride).map(<[Embedding]>::to_vec).collect())
}

/// Composes scalar-distance features, metric-major: for each metric in
/// order, the intent-to-field distance of every field in order.
///
/// Two metrics over three fields yield six features per result.
pub(crate) fn scalar_distance_features(
    groups: &[Vec<Embedding>],
    metrics: &[fn(&[f32], &[f32]) -> f64],
) -> Vec<Vec<f64>> {
    groups
        .iter()
        .map(|group| {
            let intent = &group[0];
            let mut row = Vec::with_capacity(metrics.len() * (group.len() - 1));
            for metric in metrics {
                for field in &group[1..] {
                    row.push(metric(intent, field));
                }
            }
            row
        })
        .collect()
}

/// Composes element-wise vector features, field-major: the intent-to-
/// field vectors of every field in order, concatenated.
///
/// Three fields at 512 dimensions yield 1536 features per result.
pub(crate) fn elementwise_features(
    groups: &[Vec<Embedding>],
    op: fn(&[f32], &[f32]) -> Vec<f64>,
) -> Vec<Vec<f64>> {
    groups
        .iter()
        .map(|group| {
            let intent = &group[0];
            let mut row = Vec::new();
            for field in &group[1..] {
                row.extend(op(intent, field));
            }
            row
        })
        .collect()
}

#[cfg(test)]
pub(crate) mod testing {
    //! Deterministic embedder for strategy and pipeline tests.

    use super::*;
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    /// Produces a fixed vector per (text, dimensions) pair: a smooth
    /// curve seeded by the text's hash. Same text, same vector.
    pub struct MockEmbedder;

    impl MockEmbedder {
        pub fn vector_for(text: &str, dimensions: usize) -> Embedding {
            let mut hasher = DefaultHasher::new();
            text.hash(&mut hasher);
            let seed = (hasher.finish() % 1000) as f32;
            (0..dimensions)
                .map(|i| (seed * 0.1 + i as f32 * 0.01).sin())
                .collect()
        }
    }

    impl Embedder for MockEmbedder {
        fn embed(
            &self,
            texts: &[String],
            spec: &EmbeddingSpec,
            cancel: &CancelToken,
        ) -> Result<Vec<Embedding>> {
            cancel.check()?;
            Ok(texts
                .iter()
                .map(|t| Self::vector_for(t, spec.dimensions))
                .collect())
        }
    }

    /// Writes a Gaussian NB artifact with the given width under `root`.
    pub fn write_gaussian_nb(root: &std::path::Path, relative: &str, n_features: usize) {
        write_artifact(
            root,
            relative,
            serde_json::json!({
                "algorithm": "gaussian_nb",
                "n_features": n_features,
                "class_prior": [0.5, 0.5],
                "theta": [vec![0.25; n_features], vec![-0.25; n_features]],
                "var": [vec![1.0; n_features], vec![1.0; n_features]],
            }),
        );
    }

    /// Writes a Ridge (margin) artifact with the given width under `root`.
    pub fn write_ridge(root: &std::path::Path, relative: &str, n_features: usize) {
        write_artifact(
            root,
            relative,
            serde_json::json!({
                "algorithm": "ridge",
                "n_features": n_features,
                "coef": vec![0.1; n_features],
                "intercept": 0.05,
            }),
        );
    }

    /// Writes a one-stump gradient-boosting artifact under `root`.
    pub fn write_gradient_boosting(root: &std::path::Path, relative: &str, n_features: usize) {
        write_artifact(
            root,
            relative,
            serde_json::json!({
                "algorithm": "gradient_boosting",
                "n_features": n_features,
                "learning_rate": 0.3,
                "base_score": 0.0,
                "trees": [{
                    "feature": [0, -1, -1],
                    "threshold": [0.5, 0.0, 0.0],
                    "left": [1, 0, 0],
                    "right": [2, 0, 0],
                    "value": [0.0, -1.0, 1.0],
                }],
            }),
        );
    }

    fn write_artifact(root: &std::path::Path, relative: &str, artifact: serde_json::Value) {
        let path = root.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, artifact.to_string()).unwrap();
    }
}
