//! The search-result record and its relevance/filter overlays.
//!
//! Result schemas vary per provider (a repository hit carries a readme,
//! a web hit carries meta descriptions), so [`SearchResult`] models the
//! union: a fixed set of well-known optional fields plus an open
//! extension map for anything provider-specific. Strategies declare
//! which fields they read by name through [`SearchResult::field_text`],
//! which substitutes a placeholder for missing, non-string, or blank
//! values instead of failing.
//!
//! Two overlays ride on the record without disturbing the raw fields:
//! - relevance annotations (`relevant` plus exactly one of
//!   `relevant_proba` / `relevant_score`) written by a filtering pass
//! - the `_filters` map, which keeps one score per embedding model so
//!   results can be re-thresholded later without recomputation

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Placeholder substituted for missing, non-string, or blank field values.
pub const FIELD_PLACEHOLDER: &str = "N/A";

/// A single search result from any provider.
///
/// Only `url` is load-bearing for identity (deduplication and filter
/// overlays key on it); every other field is optional and read through
/// the safe accessor.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Provider label the result came from (display only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    /// Result title (issue title, Q&A question title, page title).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Canonical URL; identity key for dedup and overlays.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Short text excerpt (description, body excerpt, search snippet).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,

    /// Repository name (repository results only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Repository readme text (repository results only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub readme: Option<String>,

    /// Raw HTML-bearing snippet (web results only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_snippet: Option<String>,

    /// Page meta description (web results only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta_desc: Option<String>,

    /// Structured-data description (web results only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_desc: Option<String>,

    /// Predicted relevance label, set by a filtering pass.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevant: Option<bool>,

    /// Relevance probability, set when the classifier is probability-style.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevant_proba: Option<f64>,

    /// Relevance margin, set when the classifier is margin-style.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevant_score: Option<f64>,

    /// Per-filter scores, keyed by embedding-model identifier.
    ///
    /// Writing one filter's score never touches another's; all results
    /// of a pass get an entry, relevant or not.
    #[serde(
        rename = "_filters",
        default,
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub filters: BTreeMap<String, f64>,

    /// Provider-specific fields outside the well-known set.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl SearchResult {
    /// Creates a result with just a URL (the identity key).
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Default::default()
        }
    }

    /// Returns the named field as text, substituting [`FIELD_PLACEHOLDER`]
    /// for missing, non-string, or blank-after-trim values.
    ///
    /// Well-known fields are matched first; anything else is looked up in
    /// the extension map.
    pub fn field_text(&self, field: &str) -> &str {
        let known = match field {
            "source" => self.source.as_deref(),
            "title" => self.title.as_deref(),
            "url" => self.url.as_deref(),
            "snippet" => self.snippet.as_deref(),
            "name" => self.name.as_deref(),
            "readme" => self.readme.as_deref(),
            "html_snippet" => self.html_snippet.as_deref(),
            "meta_desc" => self.meta_desc.as_deref(),
            "schema_desc" => self.schema_desc.as_deref(),
            _ => self.extra.get(field).and_then(Value::as_str),
        };

        match known {
            Some(text) if !text.trim().is_empty() => text,
            _ => FIELD_PLACEHOLDER,
        }
    }

    /// Annotates the result with a probability-convention prediction.
    /// Clears any margin annotation so exactly one score kind is present.
    pub fn annotate_probability(&mut self, relevant: bool, proba: f64) {
        self.relevant = Some(relevant);
        self.relevant_proba = Some(proba);
        self.relevant_score = None;
    }

    /// Annotates the result with a margin-convention prediction.
    /// Clears any probability annotation so exactly one score kind is present.
    pub fn annotate_margin(&mut self, relevant: bool, score: f64) {
        self.relevant = Some(relevant);
        self.relevant_score = Some(score);
        self.relevant_proba = None;
    }

    /// Returns whichever relevance score is present (probability or margin).
    pub fn relevance_score(&self) -> Option<f64> {
        self.relevant_proba.or(self.relevant_score)
    }
}

/// Deduplicates results by URL, keeping the first occurrence of each.
///
/// Results without a URL are kept as-is (they cannot collide).
pub fn dedup_by_url(results: Vec<SearchResult>) -> Vec<SearchResult> {
    let mut seen = std::collections::HashSet::new();
    results
        .into_iter()
        .filter(|result| match &result.url {
            Some(url) => seen.insert(url.clone()),
            None => true,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_text_known_field() {
        let result = SearchResult {
            title: Some("Fixing borrow checker errors".to_string()),
            ..Default::default()
        };
        assert_eq!(result.field_text("title"), "Fixing borrow checker errors");
    }

    #[test]
    fn test_field_text_missing_gives_placeholder() {
        let result = SearchResult::default();
        assert_eq!(result.field_text("title"), FIELD_PLACEHOLDER);
        assert_eq!(result.field_text("no_such_field"), FIELD_PLACEHOLDER);
    }

    #[test]
    fn test_field_text_blank_gives_placeholder() {
        let result = SearchResult {
            snippet: Some("   \t".to_string()),
            ..Default::default()
        };
        assert_eq!(result.field_text("snippet"), FIELD_PLACEHOLDER);
    }

    #[test]
    fn test_field_text_extension_map() {
        let mut result = SearchResult::default();
        result
            .extra
            .insert("stars".to_string(), Value::from(1200));
        result
            .extra
            .insert("language".to_string(), Value::from("Rust"));

        // Non-string extension values fall back to the placeholder
        assert_eq!(result.field_text("stars"), FIELD_PLACEHOLDER);
        assert_eq!(result.field_text("language"), "Rust");
    }

    #[test]
    fn test_annotations_are_exclusive() {
        let mut result = SearchResult::default();

        result.annotate_probability(true, 0.83);
        assert_eq!(result.relevant, Some(true));
        assert_eq!(result.relevant_proba, Some(0.83));
        assert!(result.relevant_score.is_none());

        result.annotate_margin(false, -1.4);
        assert_eq!(result.relevant, Some(false));
        assert_eq!(result.relevant_score, Some(-1.4));
        assert!(result.relevant_proba.is_none());
        assert_eq!(result.relevance_score(), Some(-1.4));
    }

    #[test]
    fn test_serialization_overlay_keys() {
        let mut result = SearchResult::with_url("https://example.org/a");
        result.filters.insert("text-embedding-3-small".to_string(), 0.7);
        result.annotate_probability(true, 0.7);

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["_filters"]["text-embedding-3-small"], 0.7);
        assert_eq!(json["relevant"], true);
        assert_eq!(json["relevant_proba"], 0.7);
        assert!(json.get("relevant_score").is_none());
        assert!(json.get("title").is_none());
    }

    #[test]
    fn test_roundtrip_preserves_extras() {
        let json = serde_json::json!({
            "url": "https://example.org/q",
            "title": "How do I frobnicate?",
            "answer_count": 3,
            "_filters": { "text-embedding-3-large": -0.2 }
        });
        let result: SearchResult = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(result.extra["answer_count"], Value::from(3));
        assert_eq!(result.filters["text-embedding-3-large"], -0.2);

        let back = serde_json::to_value(&result).unwrap();
        assert_eq!(back, json);
    }

    #[test]
    fn test_dedup_by_url_first_wins() {
        let a = SearchResult {
            url: Some("https://example.org/x".to_string()),
            title: Some("first".to_string()),
            ..Default::default()
        };
        let b = SearchResult {
            url: Some("https://example.org/x".to_string()),
            title: Some("second".to_string()),
            ..Default::default()
        };
        let c = SearchResult::default(); // no URL, always kept

        let deduped = dedup_by_url(vec![a, b, c]);
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].title.as_deref(), Some("first"));
    }
}
