//! The top-level filtering pass over a session's results.
//!
//! [`RelevancePipeline`] owns the embedding client and the classifier
//! store and walks a session provider by provider: select the
//! provider's strategy, run it, record every score in the session's
//! filter overlay, and report the relevant/irrelevant split. The whole
//! pass runs synchronously on the calling thread; run it off any UI
//! event loop.
//!
//! # Failure isolation
//!
//! An error inside one provider's pass (missing artifact, embedding
//! failure, feature mismatch) fails *that provider only*: it is
//! reported in the run summary and the walk continues. Providers that
//! completed earlier keep their recorded scores.
//!
//! # Cancellation
//!
//! The token is polled before each provider and between embedding
//! batches. Scores are written only after a provider's strategy
//! finishes, so a cancelled provider records nothing — all-or-nothing
//! per provider — while previously completed providers keep theirs.

use tracing::{info, instrument, warn};

use crate::cancel::CancelToken;
use crate::classifier::ModelStore;
use crate::config::FilterConfig;
use crate::embedding::{Embedder, EmbeddingModel, OpenAiEmbedder};
use crate::error::Result;
use crate::filtering::{strategy_for, FilterContext, Partition};
use crate::provider::ProviderKind;
use crate::result::SearchResult;
use crate::session::SessionResults;

/// How one provider fared in a filtering run.
#[derive(Clone, Debug)]
pub enum ProviderOutcome {
    /// A strategy ran and split the provider's results.
    Filtered {
        /// Results predicted relevant, in strategy sort order.
        relevant: Vec<SearchResult>,
        /// Results predicted irrelevant, in strategy sort order.
        irrelevant: Vec<SearchResult>,
    },

    /// No strategy is registered for this provider; everything passes
    /// through as relevant, nothing is scored.
    Passthrough {
        /// The provider's results, unchanged and in input order.
        results: Vec<SearchResult>,
    },

    /// The provider's pass failed; its results are untouched.
    Failed {
        /// Why the pass failed, suitable for display.
        reason: String,
    },
}

/// Per-provider entry in a run report.
#[derive(Clone, Debug)]
pub struct ProviderReport {
    /// Provider identifier as keyed in the session.
    pub provider_id: String,

    /// Human-readable provider name for progress display.
    pub provider_name: String,

    /// Number of results the provider held going in.
    pub total: usize,

    /// What happened.
    pub outcome: ProviderOutcome,
}

/// Summary of one filtering run across a session.
#[derive(Clone, Debug)]
pub struct FilterRun {
    /// The filter name scores were recorded under (the embedding-model id).
    pub filter_name: String,

    /// Per-provider outcomes, in walk order.
    pub providers: Vec<ProviderReport>,

    /// True if the run stopped early on a cancellation request.
    pub cancelled: bool,
}

impl FilterRun {
    /// Total results predicted relevant across filtered providers.
    pub fn total_relevant(&self) -> usize {
        self.providers
            .iter()
            .map(|report| match &report.outcome {
                ProviderOutcome::Filtered { relevant, .. } => relevant.len(),
                ProviderOutcome::Passthrough { results } => results.len(),
                ProviderOutcome::Failed { .. } => 0,
            })
            .sum()
    }

    /// Total results predicted irrelevant across filtered providers.
    pub fn total_irrelevant(&self) -> usize {
        self.providers
            .iter()
            .map(|report| match &report.outcome {
                ProviderOutcome::Filtered { irrelevant, .. } => irrelevant.len(),
                _ => 0,
            })
            .sum()
    }
}

/// The relevance-filtering pipeline.
///
/// Construct once per configuration and reuse across runs; loaded
/// classifiers stay cached for the life of the pipeline.
pub struct RelevancePipeline {
    embedder: Box<dyn Embedder>,
    models: ModelStore,
}

impl RelevancePipeline {
    /// Creates a pipeline from the configuration.
    ///
    /// Validates credentials immediately: a missing API key fails here,
    /// not in the middle of a filtering pass.
    pub fn new(config: &FilterConfig) -> Result<Self> {
        let embedder = OpenAiEmbedder::new(config)?;
        Ok(Self {
            embedder: Box::new(embedder),
            models: ModelStore::new(&config.models_dir),
        })
    }

    /// Creates a pipeline with a custom embedding service.
    ///
    /// The primary seam for tests and for alternative embedding
    /// backends; the models store is built over `models_dir` as usual.
    pub fn with_embedder(embedder: Box<dyn Embedder>, models: ModelStore) -> Self {
        Self { embedder, models }
    }

    /// Runs one filtering pass over every provider in the session.
    ///
    /// Scores for all of a provider's results (relevant and irrelevant)
    /// are recorded in the session's filter overlay under the embedding
    /// model's identifier, so later threshold queries need no
    /// recomputation. The returned report carries the ranked split per
    /// provider for immediate display.
    #[instrument(skip(self, session, cancel), fields(model = %model.id(), intent_len = intent.len()))]
    pub fn filter_session(
        &self,
        session: &mut SessionResults,
        intent: &str,
        model: EmbeddingModel,
        cancel: &CancelToken,
    ) -> FilterRun {
        let filter_name = model.id().to_string();
        let mut run = FilterRun {
            filter_name: filter_name.clone(),
            providers: Vec::new(),
            cancelled: false,
        };

        for provider_id in session.provider_ids() {
            if cancel.is_cancelled() {
                run.cancelled = true;
                break;
            }

            let kind = ProviderKind::from_id(&provider_id);
            let provider_name = kind
                .map(|k| k.display_name().to_string())
                .unwrap_or_else(|| provider_id.clone());

            let results = session
                .provider_results(&provider_id)
                .map(<[SearchResult]>::to_vec)
                .unwrap_or_default();
            let total = results.len();

            info!(provider = %provider_id, total, "filtering provider");

            let Some(kind) = kind else {
                // Unknown provider: no trained classifier, no-op filter
                run.providers.push(ProviderReport {
                    provider_id,
                    provider_name,
                    total,
                    outcome: ProviderOutcome::Passthrough { results },
                });
                continue;
            };

            let ctx = FilterContext {
                embedder: self.embedder.as_ref(),
                models: &self.models,
                cancel,
            };

            let partition = match strategy_for(kind).filter(&ctx, intent, &results, model) {
                Ok(partition) => partition,
                Err(err) if err.is_cancelled() => {
                    // Nothing recorded for this provider: all-or-nothing
                    run.cancelled = true;
                    break;
                }
                Err(err) => {
                    warn!(provider = %provider_id, error = %err, "provider pass failed");
                    run.providers.push(ProviderReport {
                        provider_id,
                        provider_name,
                        total,
                        outcome: ProviderOutcome::Failed {
                            reason: err.to_string(),
                        },
                    });
                    continue;
                }
            };

            self.record_scores(session, &provider_id, &filter_name, &partition);

            info!(
                provider = %provider_id,
                relevant = partition.relevant.len(),
                irrelevant = partition.irrelevant.len(),
                "provider filtered"
            );

            run.providers.push(ProviderReport {
                provider_id,
                provider_name,
                total,
                outcome: ProviderOutcome::Filtered {
                    relevant: partition
                        .relevant
                        .iter()
                        .map(|entry| entry.result.clone())
                        .collect(),
                    irrelevant: partition
                        .irrelevant
                        .iter()
                        .map(|entry| entry.result.clone())
                        .collect(),
                },
            });
        }

        info!(
            filter = %run.filter_name,
            relevant = run.total_relevant(),
            irrelevant = run.total_irrelevant(),
            cancelled = run.cancelled,
            "filtering run finished"
        );
        run
    }

    /// Writes every scored entry of a provider's partition into the
    /// session overlay, keyed by original result index.
    fn record_scores(
        &self,
        session: &mut SessionResults,
        provider_id: &str,
        filter_name: &str,
        partition: &Partition,
    ) {
        for entry in partition.relevant.iter().chain(&partition.irrelevant) {
            session.record_filter_score(
                provider_id,
                entry.source_index,
                filter_name,
                entry.score,
            );
        }
    }
}
