//! Configuration types for the filtering pipeline.
//!
//! The [`FilterConfig`] struct controls pipeline behavior including:
//! - Embedding API credentials and endpoint
//! - The account's usage tier (drives the per-request token budget)
//! - Token overhead per embedded input and the inter-batch delay
//! - Where classifier artifacts live on disk
//!
//! There is deliberately no ambient/global settings object: the
//! configuration is built once at composition time and passed into
//! [`RelevancePipeline::new`](crate::RelevancePipeline::new).
//!
//! # Example
//! ```rust
//! use greylit::{ApiTier, FilterConfig};
//!
//! let config = FilterConfig {
//!     api_key: "sk-...".to_string(),
//!     tier: ApiTier::Tier1,
//!     ..Default::default()
//! };
//! assert!(config.validate().is_ok());
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{FilterError, Result};

/// Default per-input token overhead charged against the request budget.
///
/// Embedding requests carry per-item protocol overhead beyond the raw
/// text tokens; 150 is a conservative allowance per input.
pub const DEFAULT_OVERHEAD_PER_INPUT: usize = 150;

/// Default delay inserted after each embedding request.
pub const DEFAULT_BATCH_DELAY: Duration = Duration::from_secs(1);

/// Pipeline configuration options.
///
/// All fields have defaults except the API key, which must be supplied
/// before any embedding call. Use struct update syntax to override
/// specific settings:
///
/// ```rust
/// use greylit::FilterConfig;
///
/// let config = FilterConfig {
///     api_key: "sk-...".to_string(),
///     ..Default::default()
/// };
/// ```
#[derive(Clone, Debug)]
pub struct FilterConfig {
    /// Embedding API key. Empty means unconfigured; validation fails
    /// before any network call is attempted.
    pub api_key: String,

    /// Base URL of the embedding API (`{api_base_url}/embeddings` is called).
    pub api_base_url: String,

    /// Account usage tier; determines the tokens-per-minute quota and
    /// therefore the per-request token budget.
    pub tier: ApiTier,

    /// Token overhead charged per embedded input when batching.
    pub overhead_per_input: usize,

    /// Fixed delay inserted after each embedding request.
    ///
    /// Requests are strictly sequential; the delay keeps the pipeline
    /// under the quota even when other clients share the account.
    pub batch_delay: Duration,

    /// Root directory holding classifier artifacts, laid out as
    /// `<models_dir>/<provider>/<embedding-model>/<artifact>.json`.
    pub models_dir: PathBuf,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base_url: "https://api.openai.com/v1".to_string(),
            tier: ApiTier::Free,
            overhead_per_input: DEFAULT_OVERHEAD_PER_INPUT,
            batch_delay: DEFAULT_BATCH_DELAY,
            models_dir: PathBuf::from("models-ml"),
        }
    }
}

impl FilterConfig {
    /// Creates a new FilterConfig with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a config with the given API key and tier, defaults elsewhere.
    pub fn with_credentials(api_key: impl Into<String>, tier: ApiTier) -> Self {
        Self {
            api_key: api_key.into(),
            tier,
            ..Default::default()
        }
    }

    /// Validates the configuration.
    ///
    /// Called by [`RelevancePipeline::new`](crate::RelevancePipeline::new);
    /// you can also call this explicitly to check settings up front.
    ///
    /// # Errors
    /// Returns [`FilterError::Config`] if:
    /// - `api_key` is empty or whitespace
    /// - `api_base_url` is empty
    /// - `overhead_per_input` leaves no room for text in a request
    pub fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(FilterError::config(
                "embedding API key is not set; configure it before filtering",
            ));
        }

        if self.api_base_url.trim().is_empty() {
            return Err(FilterError::config("embedding API base URL is empty"));
        }

        if self.overhead_per_input >= self.tier.safe_max_tokens_per_request() {
            return Err(FilterError::config(format!(
                "overhead_per_input ({}) exceeds the per-request token budget ({})",
                self.overhead_per_input,
                self.tier.safe_max_tokens_per_request()
            )));
        }

        Ok(())
    }
}

/// Embedding API usage tiers.
///
/// Each tier carries a tokens-per-minute quota published by the provider.
/// The pipeline never spends more than 15 % of the quota in a single
/// request, leaving headroom for bursty concurrent usage and quota drift.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiTier {
    /// Free trial tier with limited usage.
    #[default]
    Free,

    /// Tier 1 - after first successful payment.
    Tier1,

    /// Tier 2 - $50 paid and 7+ days since first payment.
    Tier2,

    /// Tier 3 - $100 paid and 7+ days since first payment.
    Tier3,

    /// Tier 4 - $250 paid and 14+ days since first payment.
    Tier4,

    /// Tier 5 - $1,000 paid and 30+ days since first payment.
    Tier5,
}

impl ApiTier {
    /// Returns the tokens-per-minute quota for this tier.
    pub const fn tokens_per_minute(&self) -> usize {
        match self {
            Self::Free => 200_000,
            Self::Tier1 => 1_000_000,
            Self::Tier2 => 1_000_000,
            Self::Tier3 => 5_000_000,
            Self::Tier4 => 5_000_000,
            Self::Tier5 => 10_000_000,
        }
    }

    /// Returns the safe maximum tokens to spend in a single request:
    /// 15 % of the tier's tokens-per-minute quota.
    pub const fn safe_max_tokens_per_request(&self) -> usize {
        self.tokens_per_minute() * 15 / 100
    }

    /// Returns the tier's stable identifier (used in logs and settings).
    pub const fn id(&self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Tier1 => "tier_1",
            Self::Tier2 => "tier_2",
            Self::Tier3 => "tier_3",
            Self::Tier4 => "tier_4",
            Self::Tier5 => "tier_5",
        }
    }
}
