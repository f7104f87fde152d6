//! Filtering strategy for issue-tracker results.
//!
//! Embeds the issue title and body excerpt against the intent. Both
//! model sizes use the same composition — cosine, euclidean, and L1
//! distances concatenated (six features) — but different
//! dimensionalities and classifier artifacts.

use crate::distance::{cosine_distance, euclidean_distance, l1_distance};
use crate::embedding::{EmbeddingModel, EmbeddingSpec};
use crate::error::Result;
use crate::result::SearchResult;

use super::partition::{partition, Partition};
use super::{embed_result_fields, scalar_distance_features, FieldSpec, FilterContext, FilterStrategy};

const FIELDS: [FieldSpec; 2] = [FieldSpec::plain("title"), FieldSpec::plain("snippet")];

const SMALL_DIMENSIONS: usize = 1024;
const SMALL_ARTIFACT: &str = "issues/text-embedding-3-small/gaussian-nb-distances.json";

const LARGE_DIMENSIONS: usize = 1536;
const LARGE_ARTIFACT: &str = "issues/text-embedding-3-large/gaussian-nb-distances.json";

/// Issue results strategy.
pub struct IssuesStrategy;

impl IssuesStrategy {
    fn run(
        &self,
        ctx: &FilterContext<'_>,
        intent: &str,
        results: &[SearchResult],
        spec: EmbeddingSpec,
        artifact: &str,
    ) -> Result<Partition> {
        if results.is_empty() {
            return Ok(Partition::default());
        }

        let classifier = ctx.models.load(artifact)?;
        let groups = embed_result_fields(ctx, intent, results, &FIELDS, spec)?;

        let features = scalar_distance_features(
            &groups,
            &[cosine_distance, euclidean_distance, l1_distance],
        );
        let prediction = classifier.predict(&features)?;
        Ok(partition(results, &prediction))
    }
}

impl FilterStrategy for IssuesStrategy {
    fn filter_small(
        &self,
        ctx: &FilterContext<'_>,
        intent: &str,
        results: &[SearchResult],
    ) -> Result<Partition> {
        let spec = EmbeddingSpec::new(EmbeddingModel::Small, SMALL_DIMENSIONS);
        self.run(ctx, intent, results, spec, SMALL_ARTIFACT)
    }

    fn filter_large(
        &self,
        ctx: &FilterContext<'_>,
        intent: &str,
        results: &[SearchResult],
    ) -> Result<Partition> {
        let spec = EmbeddingSpec::new(EmbeddingModel::Large, LARGE_DIMENSIONS);
        self.run(ctx, intent, results, spec, LARGE_ARTIFACT)
    }
}
