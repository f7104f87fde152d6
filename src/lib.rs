//! # greylit-relevance
//!
//! Embedding-based relevance filtering for grey-literature search results.
//!
//! Given search results collected from heterogeneous sources (code
//! repositories, issue trackers, Q&A forums, general web search) and a
//! natural-language *intent*, this crate scores each result with a
//! previously trained binary classifier over embedding-distance
//! features and splits every provider's results into ranked relevant
//! and irrelevant lists.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use greylit::{
//!     ApiTier, CancelToken, EmbeddingModel, FilterConfig, RelevancePipeline, SessionResults,
//! };
//!
//! let config = FilterConfig::with_credentials("sk-...", ApiTier::Tier1);
//! let pipeline = RelevancePipeline::new(&config)?;
//!
//! // A session holds results per provider (from the search layer)
//! let mut session = SessionResults::new("flaky CI timeouts", providers, None);
//! session.add_results("issues", issue_results, Some(queries));
//!
//! // One pass: embed fields, score, rank, record scores in the overlay
//! let cancel = CancelToken::new();
//! let run = pipeline.filter_session(&mut session, "flaky CI timeouts",
//!                                   EmbeddingModel::Small, &cancel);
//!
//! // Later: re-query at any threshold without recomputation
//! let relevant = session.filtered_results("text-embedding-3-small", 0.7);
//! session.save(storage_root)?;
//! ```
//!
//! ## Key Concepts
//!
//! ### Strategies
//!
//! Each provider has a [`FilterStrategy`](filtering::FilterStrategy)
//! fixing which result fields get embedded, how they're preprocessed,
//! and which distance features feed its classifier. Providers without a
//! trained classifier fall through to a no-op strategy that keeps
//! everything.
//!
//! ### Filter overlay
//!
//! Every result of a pass — relevant or not — gets its score recorded
//! under the embedding model's identifier. Multiple filters coexist per
//! result, so different embedding models can be compared on the same
//! session without re-embedding anything.
//!
//! ## Concurrency
//!
//! The pipeline is synchronous and single-threaded: one
//! embedding batch in flight, a fixed delay between batches, and a
//! cooperative [`CancelToken`] polled between units of work. Run it off
//! the UI thread.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

// ============================================================================
// Module declarations
// ============================================================================

mod batch;
mod cancel;
mod config;
mod error;
mod pipeline;
mod provider;
mod result;
mod session;

pub mod classifier;
pub mod distance;
pub mod embedding;
pub mod filtering;

// ============================================================================
// Public API re-exports
// ============================================================================

// Pipeline facade
pub use pipeline::{FilterRun, ProviderOutcome, ProviderReport, RelevancePipeline};

// Configuration
pub use config::{ApiTier, FilterConfig, DEFAULT_BATCH_DELAY, DEFAULT_OVERHEAD_PER_INPUT};

// Error handling
pub use error::{FilterError, Result};

// Core types
pub use cancel::CancelToken;
pub use provider::ProviderKind;
pub use result::{dedup_by_url, SearchResult, FIELD_PLACEHOLDER};
pub use session::{SessionResults, DEFAULT_THRESHOLD};

// Embedding and batching
pub use batch::{TokenBatcher, SINGLE_ITEM_LIMIT};
pub use embedding::{Embedder, Embedding, EmbeddingModel, EmbeddingSpec};

// Classification
pub use classifier::{Classifier, ModelStore, Prediction, ScoreConvention};

// ============================================================================
// Prelude module for convenient imports
// ============================================================================

/// Convenient imports for common usage.
///
/// ```rust
/// use greylit::prelude::*;
/// ```
pub mod prelude {
    pub use crate::cancel::CancelToken;
    pub use crate::config::{ApiTier, FilterConfig};
    pub use crate::embedding::EmbeddingModel;
    pub use crate::error::{FilterError, Result};
    pub use crate::pipeline::{FilterRun, ProviderOutcome, RelevancePipeline};
    pub use crate::result::SearchResult;
    pub use crate::session::SessionResults;
}
