//! Token-budgeted batching of texts for embedding requests.
//!
//! The embedding endpoint accepts many inputs per request, but the
//! account quota is tokens-per-minute. [`TokenBatcher`] keeps each
//! request under a fixed token budget (15 % of the tier quota, see
//! [`ApiTier::safe_max_tokens_per_request`](crate::ApiTier)) by:
//!
//! 1. truncating each text independently to [`SINGLE_ITEM_LIMIT`] tokens,
//!    appending an ellipsis *inside* the budget when it does truncate
//! 2. greedily packing texts into batches in input order, charging a
//!    fixed per-item overhead on top of the text's own tokens
//!
//! Batches preserve input order: concatenating them reproduces the
//! (truncated) input sequence. A single text that alone exceeds the
//! request budget still becomes its own one-item batch — it is never
//! dropped and never split across requests.

use tiktoken_rs::{cl100k_base, CoreBPE};

use crate::config::FilterConfig;
use crate::error::{FilterError, Result};

/// Per-text truncation ceiling, in tokens.
///
/// The embedding models accept 8192 tokens per input; 8100 leaves slack
/// for tokenizer differences between client and server.
pub const SINGLE_ITEM_LIMIT: usize = 8100;

/// Marker appended to texts that were truncated.
const ELLIPSIS: &str = "...";

/// Splits texts into embedding-request batches under a token budget.
///
/// Construction loads the BPE ranks once; reuse the batcher across
/// requests rather than rebuilding it.
pub struct TokenBatcher {
    /// OpenAI `cl100k_base` encoding (used by both embedding models).
    bpe: CoreBPE,

    /// Maximum total tokens per batch (text tokens + per-item overhead).
    token_limit: usize,

    /// Overhead tokens charged per batched item.
    overhead_per_item: usize,
}

impl std::fmt::Debug for TokenBatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenBatcher")
            .field("token_limit", &self.token_limit)
            .field("overhead_per_item", &self.overhead_per_item)
            .finish()
    }
}

impl TokenBatcher {
    /// Creates a batcher with an explicit budget and per-item overhead.
    ///
    /// # Errors
    /// Returns [`FilterError::Tokenization`] if the BPE ranks fail to load.
    pub fn new(token_limit: usize, overhead_per_item: usize) -> Result<Self> {
        let bpe = cl100k_base()
            .map_err(|e| FilterError::Tokenization(format!("failed to load cl100k_base: {e}")))?;
        Ok(Self {
            bpe,
            token_limit,
            overhead_per_item,
        })
    }

    /// Creates a batcher from the pipeline configuration: budget from the
    /// tier's 15 % rule, overhead from `overhead_per_input`.
    pub fn from_config(config: &FilterConfig) -> Result<Self> {
        Self::new(
            config.tier.safe_max_tokens_per_request(),
            config.overhead_per_input,
        )
    }

    /// Returns the batch token budget.
    pub fn token_limit(&self) -> usize {
        self.token_limit
    }

    /// Counts the tokens in `text`.
    pub fn count_tokens(&self, text: &str) -> usize {
        self.bpe.encode_ordinary(text).len()
    }

    /// Truncates `text` to at most `limit` tokens.
    ///
    /// Returns the (possibly unchanged) text and its token count. When
    /// truncation happens, the ellipsis marker is appended and its own
    /// token cost is subtracted from the keep point, so the returned
    /// count never exceeds `limit`.
    pub fn truncate(&self, text: &str, limit: usize) -> Result<(String, usize)> {
        let tokens = self.bpe.encode_ordinary(text);
        if tokens.len() <= limit {
            return Ok((text.to_string(), tokens.len()));
        }

        let ellipsis = self.bpe.encode_ordinary(ELLIPSIS);
        let keep = limit.saturating_sub(ellipsis.len());

        let mut kept = tokens[..keep].to_vec();
        kept.extend_from_slice(&ellipsis);
        let count = kept.len();

        let truncated = self
            .bpe
            .decode(kept)
            .map_err(|e| FilterError::Tokenization(format!("decode after truncation: {e}")))?;

        Ok((truncated, count))
    }

    /// Groups `texts` into batches that fit the token budget.
    ///
    /// Each text is first truncated to [`SINGLE_ITEM_LIMIT`]; batches are
    /// then built greedily in input order. A batch is closed when adding
    /// the next text (plus overhead) would exceed the budget. Empty
    /// batches are never emitted.
    pub fn batches(&self, texts: &[String]) -> Result<Vec<Vec<String>>> {
        let mut grouped: Vec<Vec<String>> = Vec::new();
        let mut current: Vec<String> = Vec::new();
        let mut tokens_used = 0usize;

        for text in texts {
            let (adjusted, count) = self.truncate(text, SINGLE_ITEM_LIMIT)?;

            if tokens_used + count + self.overhead_per_item > self.token_limit {
                if !current.is_empty() {
                    grouped.push(std::mem::take(&mut current));
                }
                tokens_used = count + self.overhead_per_item;
                current.push(adjusted);
            } else {
                tokens_used += count + self.overhead_per_item;
                current.push(adjusted);
            }
        }

        if !current.is_empty() {
            grouped.push(current);
        }

        Ok(grouped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batcher(limit: usize, overhead: usize) -> TokenBatcher {
        TokenBatcher::new(limit, overhead).unwrap()
    }

    #[test]
    fn test_truncate_short_text_unchanged() {
        let b = batcher(1000, 0);
        let (text, count) = b.truncate("hello world", 100).unwrap();
        assert_eq!(text, "hello world");
        assert_eq!(count, b.count_tokens("hello world"));
    }

    #[test]
    fn test_truncate_long_text_ends_with_ellipsis() {
        let b = batcher(1000, 0);
        let long = "embedding ".repeat(500);
        let limit = 40;

        let (text, count) = b.truncate(&long, limit).unwrap();
        assert!(count <= limit);
        assert!(text.ends_with(ELLIPSIS));
        assert_eq!(b.count_tokens(&text), count);
    }

    #[test]
    fn test_batches_preserve_order_and_content() {
        let b = batcher(50, 5);
        let texts: Vec<String> = (0..10).map(|i| format!("short text number {i}")).collect();

        let batches = b.batches(&texts).unwrap();
        let flattened: Vec<String> = batches.into_iter().flatten().collect();
        assert_eq!(flattened, texts);
    }

    #[test]
    fn test_batches_respect_budget() {
        let b = batcher(60, 10);
        let texts: Vec<String> = (0..8)
            .map(|i| format!("a moderately sized text about topic {i}"))
            .collect();

        for batch in b.batches(&texts).unwrap() {
            if batch.len() == 1 {
                continue; // single oversized item is allowed to exceed
            }
            let total: usize = batch
                .iter()
                .map(|t| b.count_tokens(t) + 10)
                .sum();
            assert!(total <= 60, "batch cost {total} exceeds limit");
        }
    }

    #[test]
    fn test_oversized_item_gets_own_batch() {
        let b = batcher(20, 5);
        let texts = vec![
            "tiny".to_string(),
            "this single text is definitely far too large for the configured budget and must \
             still be sent alone rather than dropped"
                .to_string(),
            "tiny again".to_string(),
        ];

        let batches = b.batches(&texts).unwrap();
        let flattened: Vec<&String> = batches.iter().flatten().collect();
        assert_eq!(flattened.len(), 3);

        // The oversized text sits alone in its batch
        let oversized_batch = batches
            .iter()
            .find(|batch| batch.iter().any(|t| t.starts_with("this single text")))
            .unwrap();
        assert_eq!(oversized_batch.len(), 1);
    }

    #[test]
    fn test_no_empty_batches() {
        let b = batcher(15, 5);
        let texts = vec![
            "a first text that overflows the tiny budget on its own".to_string(),
            "second".to_string(),
        ];
        for batch in b.batches(&texts).unwrap() {
            assert!(!batch.is_empty());
        }
    }

    #[test]
    fn test_empty_input() {
        let b = batcher(100, 5);
        assert!(b.batches(&[]).unwrap().is_empty());
    }
}
