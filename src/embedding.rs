//! Embedding generation for result fields.
//!
//! This module provides the trait and the HTTP implementation for
//! turning text into fixed-length vectors. Two hosted models are
//! supported; each strategy picks the model and the requested
//! dimensionality per filtering pass.
//!
//! # Throughput policy
//!
//! Requests are strictly sequential — one batch in flight, a fixed
//! delay after each call. Correctness (never exceeding the account
//! quota) is prioritized over parallel throughput: a filtering pass is
//! an interactive, human-supervised job, and a failed call is surfaced
//! immediately rather than retried behind the user's back.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::batch::TokenBatcher;
use crate::cancel::CancelToken;
use crate::config::FilterConfig;
use crate::error::{FilterError, Result};

/// A fixed-length embedding vector, as returned by the API.
pub type Embedding = Vec<f32>;

/// The hosted embedding models the classifiers were trained against.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EmbeddingModel {
    /// `text-embedding-3-small`.
    Small,

    /// `text-embedding-3-large`.
    Large,
}

impl EmbeddingModel {
    /// Returns the provider-side model identifier.
    ///
    /// This string is also the filter name under which scores are
    /// recorded in the session overlay.
    pub const fn id(&self) -> &'static str {
        match self {
            Self::Small => "text-embedding-3-small",
            Self::Large => "text-embedding-3-large",
        }
    }
}

impl std::fmt::Display for EmbeddingModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

/// Model plus requested dimensionality for one embedding pass.
///
/// The hosted models support shortened output vectors; each classifier
/// fixes the dimensionality its features were trained on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EmbeddingSpec {
    /// Which hosted model to call.
    pub model: EmbeddingModel,

    /// Requested vector dimensionality.
    pub dimensions: usize,
}

impl EmbeddingSpec {
    /// Creates a spec for the given model and dimensionality.
    pub const fn new(model: EmbeddingModel, dimensions: usize) -> Self {
        Self { model, dimensions }
    }
}

/// Embedding service trait.
///
/// The vector count and order of the output exactly match the input
/// texts; misalignment downstream would silently corrupt features, so
/// implementations must verify counts.
pub trait Embedder: Send + Sync {
    /// Embeds `texts`, preserving order.
    ///
    /// `cancel` is polled between discrete requests; a request already
    /// sent is never aborted.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::Embedding`] on any call failure (no
    /// automatic retry) and [`FilterError::Cancelled`] when cancellation
    /// is observed between batches.
    fn embed(
        &self,
        texts: &[String],
        spec: &EmbeddingSpec,
        cancel: &CancelToken,
    ) -> Result<Vec<Embedding>>;
}

/// HTTP client for the hosted embeddings endpoint.
///
/// Batches inputs through a [`TokenBatcher`] so no single request
/// exceeds the tier's safe token budget, and sleeps a fixed delay
/// after every request.
#[derive(Debug)]
pub struct OpenAiEmbedder {
    agent: ureq::Agent,
    api_key: String,
    base_url: String,
    batcher: TokenBatcher,
    batch_delay: Duration,
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Deserialize)]
struct EmbeddingItem {
    embedding: Vec<f32>,
}

impl OpenAiEmbedder {
    /// Creates an embedder from the pipeline configuration.
    ///
    /// Validates credentials up front: a missing API key fails here,
    /// before any network call is attempted.
    pub fn new(config: &FilterConfig) -> Result<Self> {
        config.validate()?;

        let agent: ureq::Agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(Duration::from_secs(60)))
            .build()
            .into();

        Ok(Self {
            agent,
            api_key: config.api_key.clone(),
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            batcher: TokenBatcher::from_config(config)?,
            batch_delay: config.batch_delay,
        })
    }

    /// Sends one batch and parses the vectors out of the response.
    fn request_batch(
        &self,
        batch_index: usize,
        batch: &[String],
        spec: &EmbeddingSpec,
    ) -> Result<Vec<Embedding>> {
        let url = format!("{}/embeddings", self.base_url);
        let payload = serde_json::json!({
            "model": spec.model.id(),
            "input": batch,
            "encoding_format": "float",
            "dimensions": spec.dimensions,
        });

        let auth = format!("Bearer {}", self.api_key);
        let mut response = self
            .agent
            .post(&url)
            .header("Authorization", auth.as_str())
            .send_json(&payload)
            .map_err(|e| FilterError::embedding(batch_index, e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| FilterError::embedding(batch_index, format!("reading body: {e}")))?;

        if status >= 400 {
            return Err(FilterError::embedding(
                batch_index,
                format!("http status {status}: {}", extract_error_message(&body)),
            ));
        }

        let parsed: EmbeddingsResponse = serde_json::from_str(&body)
            .map_err(|e| FilterError::embedding(batch_index, format!("parsing response: {e}")))?;

        Ok(parsed.data.into_iter().map(|item| item.embedding).collect())
    }
}

impl Embedder for OpenAiEmbedder {
    fn embed(
        &self,
        texts: &[String],
        spec: &EmbeddingSpec,
        cancel: &CancelToken,
    ) -> Result<Vec<Embedding>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let batches = self.batcher.batches(texts)?;
        let mut vectors: Vec<Embedding> = Vec::with_capacity(texts.len());

        for (batch_index, batch) in batches.iter().enumerate() {
            cancel.check()?;

            debug!(
                batch_index,
                inputs = batch.len(),
                model = spec.model.id(),
                dimensions = spec.dimensions,
                "requesting embeddings"
            );

            let batch_vectors = self.request_batch(batch_index, batch, spec)?;
            if batch_vectors.len() != batch.len() {
                return Err(FilterError::embedding(
                    batch_index,
                    format!(
                        "expected {} vectors, got {}",
                        batch.len(),
                        batch_vectors.len()
                    ),
                ));
            }
            vectors.extend(batch_vectors);

            std::thread::sleep(self.batch_delay);
        }

        debug_assert_eq!(vectors.len(), texts.len());
        Ok(vectors)
    }
}

/// Pulls a human-readable message out of an API error body.
fn extract_error_message(body: &str) -> String {
    let trimmed = body.trim();
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        if let Some(message) = value.pointer("/error/message").and_then(|v| v.as_str()) {
            return message.to_string();
        }
        if let Some(message) = value.get("message").and_then(|v| v.as_str()) {
            return message.to_string();
        }
    }
    let mut message = trimmed.to_string();
    message.truncate(400);
    message
}
