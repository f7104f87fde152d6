//! Error types for the relevance-filtering pipeline.
//!
//! The crate uses a single public error enum:
//! - [`FilterError`] is the top-level error returned by all public APIs
//! - Variants map one-to-one onto the failure classes a filtering pass
//!   can hit (configuration, missing classifier artifact, embedding call,
//!   feature-shape mismatch, cancellation, persistence)
//!
//! # Error Handling Pattern
//! ```rust,ignore
//! use greylit::{FilterConfig, RelevancePipeline, Result};
//!
//! fn example() -> Result<()> {
//!     let pipeline = RelevancePipeline::new(FilterConfig::default())?;
//!     // ... operations that may fail ...
//!     Ok(())
//! }
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for filtering operations.
pub type Result<T> = std::result::Result<T, FilterError>;

/// Top-level error enum for all filtering operations.
///
/// This is the only error type returned by public APIs.
/// Use pattern matching to handle specific error cases.
#[derive(Debug, Error)]
pub enum FilterError {
    /// Configuration error, surfaced before any network call is attempted
    /// (missing API key, invalid tier, bad storage path).
    #[error("Configuration error: {reason}")]
    Config {
        /// Description of what's wrong with the configuration.
        reason: String,
    },

    /// Requested classifier artifact is absent on disk.
    #[error("Classifier artifact not found: {0}")]
    ModelNotFound(PathBuf),

    /// A call to the embedding API failed. Not retried automatically;
    /// the batch index identifies which request of the pass failed.
    #[error("Embedding call failed (batch {batch_index}): {reason}")]
    Embedding {
        /// Zero-based index of the failed batch within the request.
        batch_index: usize,
        /// Underlying failure description (HTTP status, transport error, ...).
        reason: String,
    },

    /// A loaded classifier's expected input width does not match the
    /// computed feature vector length. Structural invariant violation,
    /// never produces predictions.
    #[error("Feature vector length mismatch: classifier expects {expected}, got {got}")]
    FeatureMismatch {
        /// Feature count the classifier was trained on.
        expected: usize,
        /// Feature count actually computed.
        got: usize,
    },

    /// Tokenizer failure while counting or truncating text for batching.
    #[error("Tokenization error: {0}")]
    Tokenization(String),

    /// The filtering pass was cancelled cooperatively.
    #[error("Filtering cancelled")]
    Cancelled,

    /// General I/O error (session persistence, artifact reads).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl FilterError {
    /// Creates a configuration error with the given reason.
    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config {
            reason: reason.into(),
        }
    }

    /// Creates an embedding-call error for the given batch.
    pub fn embedding(batch_index: usize, reason: impl Into<String>) -> Self {
        Self::Embedding {
            batch_index,
            reason: reason.into(),
        }
    }

    /// Returns true if this is a configuration error.
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config { .. })
    }

    /// Returns true if this is a missing-classifier error.
    pub fn is_model_not_found(&self) -> bool {
        matches!(self, Self::ModelNotFound(_))
    }

    /// Returns true if this is an embedding-call error.
    pub fn is_embedding(&self) -> bool {
        matches!(self, Self::Embedding { .. })
    }

    /// Returns true if this error came from a cancellation request.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = FilterError::config("API key missing");
        assert_eq!(err.to_string(), "Configuration error: API key missing");
        assert!(err.is_config());
    }

    #[test]
    fn test_model_not_found_display() {
        let err = FilterError::ModelNotFound(PathBuf::from("models/repos/x.json"));
        assert_eq!(
            err.to_string(),
            "Classifier artifact not found: models/repos/x.json"
        );
        assert!(err.is_model_not_found());
        assert!(!err.is_config());
    }

    #[test]
    fn test_embedding_error_display() {
        let err = FilterError::embedding(2, "http status: 429");
        assert_eq!(
            err.to_string(),
            "Embedding call failed (batch 2): http status: 429"
        );
        assert!(err.is_embedding());
    }

    #[test]
    fn test_feature_mismatch_display() {
        let err = FilterError::FeatureMismatch {
            expected: 6,
            got: 4,
        };
        assert_eq!(
            err.to_string(),
            "Feature vector length mismatch: classifier expects 6, got 4"
        );
    }

    #[test]
    fn test_cancelled_predicate() {
        assert!(FilterError::Cancelled.is_cancelled());
        assert!(!FilterError::config("x").is_cancelled());
    }

    #[test]
    fn test_io_error_conversion() {
        fn inner() -> Result<()> {
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"))?
        }
        assert!(inner().is_err());
    }
}
