//! Filtering strategy for Q&A forum posts.
//!
//! Embeds the question title, the HTML-cleaned body excerpt, and the
//! post URL against the intent. The feature vectors here are wide:
//! element-wise compositions over every dimension of every field.
//!
//! - small model: overlap products (element-wise intent × field),
//!   3 fields × 512 dimensions
//! - large model: element-wise absolute differences scored by a Ridge
//!   classifier, whose signed margin drives the asymmetric sort in
//!   [`partition`](super::partition::partition)

use crate::distance::{difference_vector, overlap_product_vector};
use crate::embedding::{EmbeddingModel, EmbeddingSpec};
use crate::error::Result;
use crate::result::SearchResult;

use super::partition::{partition, Partition};
use super::{embed_result_fields, elementwise_features, FieldSpec, FilterContext, FilterStrategy};

const FIELDS: [FieldSpec; 3] = [
    FieldSpec::plain("title"),
    FieldSpec::html("snippet"),
    FieldSpec::plain("url"),
];

const SMALL_DIMENSIONS: usize = 512;
const SMALL_ARTIFACT: &str = "qa/text-embedding-3-small/gaussian-nb-overlap-product.json";

const LARGE_DIMENSIONS: usize = 1024;
const LARGE_ARTIFACT: &str = "qa/text-embedding-3-large/ridge-differences.json";

/// Q&A post results strategy.
pub struct QaStrategy;

impl FilterStrategy for QaStrategy {
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

        let features = elementwise_features(&groups, overlap_product_vector);
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

        let features = elementwise_features(&groups, difference_vector);
        let prediction = classifier.predict(&features)?;
        Ok(partition(results, &prediction))
    }
}
