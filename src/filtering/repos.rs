//! Filtering strategy for repository search results.
//!
//! Embeds the repository name, description snippet, and readme against
//! the intent. The small-model classifier consumes cosine and euclidean
//! distances (six features); the large-model classifier is a
//! gradient-boosted ensemble over L1 distances (three features).

use crate::distance::{cosine_distance, euclidean_distance, l1_distance};
use crate::embedding::{EmbeddingModel, EmbeddingSpec};
use crate::error::Result;
use crate::result::SearchResult;

use super::partition::{partition, Partition};
use super::{embed_result_fields, scalar_distance_features, FieldSpec, FilterContext, FilterStrategy};

const FIELDS: [FieldSpec; 3] = [
    FieldSpec::plain("name"),
    FieldSpec::plain("snippet"),
    FieldSpec::plain("readme"),
];

const SMALL_DIMENSIONS: usize = 1536;
const SMALL_ARTIFACT: &str = "repos/text-embedding-3-small/gaussian-nb-cosine-euclidean.json";

const LARGE_DIMENSIONS: usize = 1024;
const LARGE_ARTIFACT: &str = "repos/text-embedding-3-large/gradient-boosting-l1.json";

/// Repository results strategy.
pub struct ReposStrategy;

impl FilterStrategy for ReposStrategy {
    fn filter_small(
        &self,
        ctx: &FilterContext<'_>,
        intent: &str,
        results: &[SearchResult],
    ) -> Result<Partition> {
        if results.is_empty() {
            return Ok(Partition::default());
        }

        let classifier = ctx.models.load(SMALL_ARTIFACT)?;
        let spec = EmbeddingSpec::new(EmbeddingModel::Small, SMALL_DIMENSIONS);
        let groups = embed_result_fields(ctx, intent, results, &FIELDS, spec)?;

        let features =
            scalar_distance_features(&groups, &[cosine_distance, euclidean_distance]);
        let prediction = classifier.predict(&features)?;
        Ok(partition(results, &prediction))
    }

    fn filter_large(
        &self,
        ctx: &FilterContext<'_>,
        intent: &str,
        results: &[SearchResult],
    ) -> Result<Partition> {
        if results.is_empty() {
            return Ok(Partition::default());
        }

        let classifier = ctx.models.load(LARGE_ARTIFACT)?;
        let spec = EmbeddingSpec::new(EmbeddingModel::Large, LARGE_DIMENSIONS);
        let groups = embed_result_fields(ctx, intent, results, &FIELDS, spec)?;

        let features = scalar_distance_features(&groups, &[l1_distance]);
        let prediction = classifier.predict(&features)?;
        Ok(partition(results, &prediction))
    }
}
