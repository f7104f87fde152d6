//! Filtering strategy for general web-search results.
//!
//! The widest field set of any provider: title, plain snippet, the
//! HTML-cleaned snippet variant, meta description, structured-data
//! description, and URL. Both model sizes use element-wise absolute
//! differences concatenated across all six fields.

use crate::distance::difference_vector;
use crate::embedding::{EmbeddingModel, EmbeddingSpec};
use crate::error::Result;
use crate::result::SearchResult;

use super::partition::{partition, Partition};
use super::{embed_result_fields, elementwise_features, FieldSpec, FilterContext, FilterStrategy};

const FIELDS: [FieldSpec; 6] = [
    FieldSpec::plain("title"),
    FieldSpec::plain("snippet"),
    FieldSpec::html("html_snippet"),
    FieldSpec::plain("meta_desc"),
    FieldSpec::plain("schema_desc"),
    FieldSpec::plain("url"),
];

const SMALL_DIMENSIONS: usize = 512;
const SMALL_ARTIFACT: &str = "web/text-embedding-3-small/gaussian-nb-differences.json";

const LARGE_DIMENSIONS: usize = 1536;
const LARGE_ARTIFACT: &str = "web/text-embedding-3-large/gaussian-nb-differences.json";

/// Web search results strategy.
pub struct WebStrategy;

impl WebStrategy {
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

        let features = elementwise_features(&groups, difference_vector);
        let prediction = classifier.predict(&features)?;
        Ok(partition(results, &prediction))
    }
}

impl FilterStrategy for WebStrategy {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::CancelToken;
    use crate::classifier::ModelStore;
    use crate::filtering::testing::{self, MockEmbedder};

    fn page(title: &str) -> SearchResult {
        SearchResult {
            title: Some(title.to_string()),
            snippet: Some(format!("{title} snippet")),
            html_snippet: Some(format!("<em>{title}</em> highlighted")),
            meta_desc: Some(format!("{title} meta")),
            url: Some(format!("https://example.org/{title}")),
            // schema_desc deliberately missing: embeds as the placeholder
            ..Default::default()
        }
    }

    #[test]
    fn test_small_feature_width_spans_six_fields() {
        let dir = tempfile::tempdir().unwrap();
        testing::write_gaussian_nb(dir.path(), SMALL_ARTIFACT, 6 * SMALL_DIMENSIONS);

        let models = ModelStore::new(dir.path());
        let cancel = CancelToken::new();
        let ctx = FilterContext {
            embedder: &MockEmbedder,
            models: &models,
            cancel: &cancel,
        };

        let results = vec![page("tutorial"), page("reference"), page("blog")];
        let part = WebStrategy
            .filter_small(&ctx, "async runtimes", &results)
            .unwrap();
        assert_eq!(part.len(), 3);
    }

    #[test]
    fn test_large_feature_width_spans_six_fields() {
        let dir = tempfile::tempdir().unwrap();
        testing::write_gaussian_nb(dir.path(), LARGE_ARTIFACT, 6 * LARGE_DIMENSIONS);

        let models = ModelStore::new(dir.path());
        let cancel = CancelToken::new();
        let ctx = FilterContext {
            embedder: &MockEmbedder,
            models: &models,
            cancel: &cancel,
        };

        let results = vec![page("tutorial")];
        let part = WebStrategy
            .filter_large(&ctx, "async runtimes", &results)
            .unwrap();
        assert_eq!(part.len(), 1);
    }
}
