//! Splitting scored results into ranked relevant/irrelevant lists.
//!
//! Every result gets annotated with its predicted label and score, then
//! lands in exactly one of the two output lists. Sort order depends on
//! the classifier's scoring convention:
//!
//! - probability: both lists descending — the most confidently relevant
//!   results first, and the near-misses first among the irrelevant
//! - margin: relevant descending, irrelevant **ascending** — for a
//!   signed decision function, confidence in each class grows in
//!   opposite directions along the same axis
//!
//! Sorts are stable, so equal scores keep their input order and the
//! whole partition is deterministic.

use crate::classifier::{Prediction, ScoreConvention};
use crate::result::SearchResult;

/// One result after scoring, tagged with its position in the input list.
///
/// `source_index` lets callers map scores back onto the unmodified
/// session results (the partition holds annotated copies).
#[derive(Clone, Debug)]
pub struct ScoredResult {
    /// Index of this result in the strategy's input slice.
    pub source_index: usize,

    /// The recorded score (probability or margin, per the convention).
    pub score: f64,

    /// Annotated copy of the input result.
    pub result: SearchResult,
}

/// The relevant/irrelevant split produced by one provider's pass.
#[derive(Clone, Debug, Default)]
pub struct Partition {
    /// Results predicted relevant, in convention sort order.
    pub relevant: Vec<ScoredResult>,

    /// Results predicted irrelevant, in convention sort order.
    pub irrelevant: Vec<ScoredResult>,
}

impl Partition {
    /// The no-classifier fallback: every result is relevant, unannotated
    /// and in input order; the irrelevant list is empty.
    pub fn passthrough(results: &[SearchResult]) -> Self {
        Self {
            relevant: results
                .iter()
                .cloned()
                .enumerate()
                .map(|(source_index, result)| ScoredResult {
                    source_index,
                    score: 0.0,
                    result,
                })
                .collect(),
            irrelevant: Vec::new(),
        }
    }

    /// Total number of results across both lists.
    pub fn len(&self) -> usize {
        self.relevant.len() + self.irrelevant.len()
    }

    /// Returns true if the partition holds no results.
    pub fn is_empty(&self) -> bool {
        self.relevant.is_empty() && self.irrelevant.is_empty()
    }
}

/// Partitions `results` by the index-aligned `prediction`.
///
/// Input results are cloned and annotated; the caller's slice is left
/// untouched. Callers guarantee `prediction` came from features computed
/// over exactly these results, in this order.
pub fn partition(results: &[SearchResult], prediction: &Prediction) -> Partition {
    debug_assert_eq!(results.len(), prediction.labels.len());
    debug_assert_eq!(results.len(), prediction.scores.len());

    let mut relevant = Vec::new();
    let mut irrelevant = Vec::new();

    for (source_index, result) in results.iter().enumerate() {
        let label = prediction.labels[source_index];
        let score = prediction.scores[source_index];

        let mut entry = result.clone();
        match prediction.convention {
            ScoreConvention::Probability => entry.annotate_probability(label, score),
            ScoreConvention::Margin => entry.annotate_margin(label, score),
        }

        let scored = ScoredResult {
            source_index,
            score,
            result: entry,
        };
        if label {
            relevant.push(scored);
        } else {
            irrelevant.push(scored);
        }
    }

    match prediction.convention {
        ScoreConvention::Probability => {
            // Higher probability first in both lists
            relevant.sort_by(|a, b| b.score.total_cmp(&a.score));
            irrelevant.sort_by(|a, b| b.score.total_cmp(&a.score));
        }
        ScoreConvention::Margin => {
            // Most positive margin = most confident relevant
            relevant.sort_by(|a, b| b.score.total_cmp(&a.score));
            // Most negative margin = most confident irrelevant
            irrelevant.sort_by(|a, b| a.score.total_cmp(&b.score));
        }
    }

    Partition {
        relevant,
        irrelevant,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn results(n: usize) -> Vec<SearchResult> {
        (0..n)
            .map(|i| SearchResult::with_url(format!("https://example.org/{i}")))
            .collect()
    }

    fn prediction(
        labels: &[bool],
        scores: &[f64],
        convention: ScoreConvention,
    ) -> Prediction {
        Prediction {
            labels: labels.to_vec(),
            scores: scores.to_vec(),
            convention,
        }
    }

    #[test]
    fn test_partition_is_complete() {
        let input = results(4);
        let pred = prediction(
            &[true, false, true, false],
            &[0.9, 0.2, 0.6, 0.4],
            ScoreConvention::Probability,
        );

        let part = partition(&input, &pred);
        assert_eq!(part.len(), 4);
        assert_eq!(part.relevant.len(), 2);
        assert_eq!(part.irrelevant.len(), 2);

        // Every input index appears exactly once across both lists
        let mut indexes: Vec<usize> = part
            .relevant
            .iter()
            .chain(&part.irrelevant)
            .map(|entry| entry.source_index)
            .collect();
        indexes.sort_unstable();
        assert_eq!(indexes, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_probability_annotations() {
        let input = results(2);
        let pred = prediction(&[true, false], &[0.8, 0.3], ScoreConvention::Probability);

        let part = partition(&input, &pred);
        let top = &part.relevant[0].result;
        assert_eq!(top.relevant, Some(true));
        assert_eq!(top.relevant_proba, Some(0.8));
        assert!(top.relevant_score.is_none());
    }

    #[test]
    fn test_margin_annotations() {
        let input = results(2);
        let pred = prediction(&[true, false], &[1.5, -0.7], ScoreConvention::Margin);

        let part = partition(&input, &pred);
        let top = &part.relevant[0].result;
        assert_eq!(top.relevant_score, Some(1.5));
        assert!(top.relevant_proba.is_none());
    }

    #[test]
    fn test_probability_sorts_both_descending() {
        let input = results(6);
        let pred = prediction(
            &[true, true, true, false, false, false],
            &[0.6, 0.9, 0.7, 0.1, 0.4, 0.2],
            ScoreConvention::Probability,
        );

        let part = partition(&input, &pred);
        let relevant: Vec<f64> = part.relevant.iter().map(|e| e.score).collect();
        let irrelevant: Vec<f64> = part.irrelevant.iter().map(|e| e.score).collect();
        assert_eq!(relevant, vec![0.9, 0.7, 0.6]);
        assert_eq!(irrelevant, vec![0.4, 0.2, 0.1]);
    }

    #[test]
    fn test_margin_sorts_irrelevant_ascending() {
        let input = results(5);
        let pred = prediction(
            &[true, false, true, false, false],
            &[0.5, -2.0, 1.5, -0.1, -1.0],
            ScoreConvention::Margin,
        );

        let part = partition(&input, &pred);
        let relevant: Vec<f64> = part.relevant.iter().map(|e| e.score).collect();
        let irrelevant: Vec<f64> = part.irrelevant.iter().map(|e| e.score).collect();
        assert_eq!(relevant, vec![1.5, 0.5]);
        assert_eq!(irrelevant, vec![-2.0, -1.0, -0.1]);
    }

    #[test]
    fn test_equal_scores_keep_input_order() {
        let input = results(3);
        let pred = prediction(
            &[true, true, true],
            &[0.5, 0.5, 0.5],
            ScoreConvention::Probability,
        );

        let part = partition(&input, &pred);
        let indexes: Vec<usize> = part.relevant.iter().map(|e| e.source_index).collect();
        assert_eq!(indexes, vec![0, 1, 2]);
    }

    #[test]
    fn test_passthrough_keeps_everything() {
        let input = results(3);
        let part = Partition::passthrough(&input);
        assert_eq!(part.relevant.len(), 3);
        assert!(part.irrelevant.is_empty());
        // Passthrough never annotates
        assert!(part.relevant[0].result.relevant.is_none());
    }

    #[test]
    fn test_passthrough_empty() {
        let part = Partition::passthrough(&[]);
        assert!(part.is_empty());
    }
}
