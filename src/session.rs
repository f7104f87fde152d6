//! The persisted session aggregate: results per provider, the queries
//! that produced them, and the filter-score overlay.
//!
//! A [`SessionResults`] is created when a search run finishes and is
//! mutated by filtering passes (scores recorded in place) and by
//! incremental result additions. The summary count is recomputed after
//! every mutation.
//!
//! # Filter metadata store
//!
//! Scores live on each result under the reserved `_filters` key, one
//! entry per embedding-model identifier. All access goes through this
//! type: [`record_filter_score`](SessionResults::record_filter_score)
//! writes (idempotent, last-write-wins per key), and
//! [`filtered_results`](SessionResults::filtered_results) re-queries at
//! any threshold without recomputation. Recording one filter never
//! touches another filter's scores, so passes with different embedding
//! models can be compared side by side.
//!
//! # On-disk layout
//!
//! Each session saves to `<storage_root>/<instance_id>/` as three files:
//! `info.json` (metadata + summary counts), `results.json` (provider →
//! results, overlays embedded), and `queries.json` (provider → query
//! strings, written once).

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::Result;
use crate::result::{dedup_by_url, SearchResult};

/// Default relevance threshold for filter queries.
pub const DEFAULT_THRESHOLD: f64 = 0.5;

/// Suffix shared by all session directory names.
const INSTANCE_SUFFIX: &str = "_results";

const INFO_FILE: &str = "info.json";
const RESULTS_FILE: &str = "results.json";
const QUERIES_FILE: &str = "queries.json";

/// A search run's results across providers, with filter overlays.
#[derive(Clone, Debug)]
pub struct SessionResults {
    instance_id: String,
    created_at: DateTime<Utc>,
    query_generation_id: Option<String>,
    intent: String,
    providers: Vec<String>,
    filter_model: Option<String>,
    results: BTreeMap<String, Vec<SearchResult>>,
    queries: BTreeMap<String, Vec<String>>,
    queries_executed: BTreeMap<String, usize>,
    total_results: usize,
}

/// Serialized form of `info.json`.
#[derive(Serialize, Deserialize)]
struct SessionInfo {
    instance_id: String,
    created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    query_generation_id: Option<String>,
    intent: String,
    providers: Vec<String>,
    total_results: usize,
    #[serde(default)]
    queries_executed: BTreeMap<String, usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    filter_model: Option<String>,
}

impl SessionResults {
    /// Creates an empty session for the given intent and provider set.
    ///
    /// The instance id is derived from the current time and the first
    /// ten alphanumeric characters of the intent.
    pub fn new(
        intent: impl Into<String>,
        providers: Vec<String>,
        query_generation_id: Option<String>,
    ) -> Self {
        let intent = intent.into();
        let created_at = Utc::now();
        Self {
            instance_id: generate_instance_id(&intent, created_at),
            created_at,
            query_generation_id,
            intent,
            providers,
            filter_model: None,
            results: BTreeMap::new(),
            queries: BTreeMap::new(),
            queries_executed: BTreeMap::new(),
            total_results: 0,
        }
    }

    /// Returns the session's unique instance id.
    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    /// Returns the user intent these results were gathered for.
    pub fn intent(&self) -> &str {
        &self.intent
    }

    /// Returns the session creation time.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the providers this session searched.
    pub fn providers(&self) -> &[String] {
        &self.providers
    }

    /// Returns the total number of results across all providers.
    pub fn total_results(&self) -> usize {
        self.total_results
    }

    /// Returns how many queries each provider executed.
    pub fn queries_executed(&self) -> &BTreeMap<String, usize> {
        &self.queries_executed
    }

    /// Returns the query strings each provider ran, where recorded.
    pub fn queries(&self) -> &BTreeMap<String, Vec<String>> {
        &self.queries
    }

    /// Returns the filter this session was loaded/projected through, if any.
    pub fn filter_model(&self) -> Option<&str> {
        self.filter_model.as_deref()
    }

    /// Returns all results grouped by provider.
    pub fn results(&self) -> &BTreeMap<String, Vec<SearchResult>> {
        &self.results
    }

    /// Returns the provider ids that currently hold results.
    pub fn provider_ids(&self) -> Vec<String> {
        self.results.keys().cloned().collect()
    }

    /// Returns one provider's results.
    pub fn provider_results(&self, provider_id: &str) -> Option<&[SearchResult]> {
        self.results.get(provider_id).map(Vec::as_slice)
    }

    /// Sets a provider's results (and optionally the queries used),
    /// replacing whatever was there.
    pub fn add_results(
        &mut self,
        provider_id: impl Into<String>,
        results: Vec<SearchResult>,
        queries: Option<Vec<String>>,
    ) {
        let provider_id = provider_id.into();
        if let Some(queries) = queries {
            self.queries_executed
                .insert(provider_id.clone(), queries.len());
            self.queries.insert(provider_id.clone(), queries);
        }
        self.results.insert(provider_id, results);
        self.recompute_total();
    }

    /// Appends results to a provider, deduplicating by URL with
    /// first-occurrence-wins across the existing and new results.
    pub fn extend_results(&mut self, provider_id: impl Into<String>, new_results: Vec<SearchResult>) {
        let provider_id = provider_id.into();
        let mut combined = self.results.remove(&provider_id).unwrap_or_default();
        combined.extend(new_results);
        self.results.insert(provider_id, dedup_by_url(combined));
        self.recompute_total();
    }

    fn recompute_total(&mut self) {
        self.total_results = self.results.values().map(Vec::len).sum();
    }

    // ------------------------------------------------------------------
    // Filter metadata store
    // ------------------------------------------------------------------

    /// Records a filter score on one result.
    ///
    /// Idempotent per `(provider_id, result_index, filter_name)` with
    /// last-write-wins; other filters' entries on the same result are
    /// never touched. Out-of-range indices are ignored.
    pub fn record_filter_score(
        &mut self,
        provider_id: &str,
        result_index: usize,
        filter_name: &str,
        score: f64,
    ) {
        let Some(results) = self.results.get_mut(provider_id) else {
            return;
        };
        let Some(result) = results.get_mut(result_index) else {
            return;
        };
        result.filters.insert(filter_name.to_string(), score);
    }

    /// Returns, per provider, the results whose stored score for
    /// `filter_name` is at least `threshold`, sorted by score descending
    /// and annotated with `relevant = true` and the score.
    ///
    /// Providers with no qualifying results are omitted.
    pub fn filtered_results(
        &self,
        filter_name: &str,
        threshold: f64,
    ) -> BTreeMap<String, Vec<SearchResult>> {
        let mut filtered = BTreeMap::new();

        for (provider_id, results) in &self.results {
            let mut qualifying: Vec<SearchResult> = results
                .iter()
                .filter_map(|result| {
                    let score = *result.filters.get(filter_name)?;
                    if score >= threshold {
                        let mut entry = result.clone();
                        entry.annotate_margin(true, score);
                        Some(entry)
                    } else {
                        None
                    }
                })
                .collect();

            if !qualifying.is_empty() {
                qualifying.sort_by(|a, b| {
                    let a_score = a.relevant_score.unwrap_or(0.0);
                    let b_score = b.relevant_score.unwrap_or(0.0);
                    b_score.total_cmp(&a_score)
                });
                filtered.insert(provider_id.clone(), qualifying);
            }
        }

        filtered
    }

    /// Returns every distinct filter name recorded across all results.
    pub fn available_filters(&self) -> BTreeSet<String> {
        self.results
            .values()
            .flatten()
            .flat_map(|result| result.filters.keys().cloned())
            .collect()
    }

    /// Returns true if the given filter has scores on any result.
    pub fn has_filter(&self, filter_name: &str) -> bool {
        self.available_filters().contains(filter_name)
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    /// Saves the session under `storage_root`, creating the instance
    /// directory if needed. An existing `info.json`'s creation time is
    /// preserved; `queries.json` is only written once.
    ///
    /// Returns the instance directory path.
    pub fn save(&self, storage_root: &Path) -> Result<PathBuf> {
        let dir = storage_root.join(&self.instance_id);
        fs::create_dir_all(&dir)?;

        let info_path = dir.join(INFO_FILE);
        let created_at = if info_path.is_file() {
            let existing: SessionInfo = serde_json::from_str(&fs::read_to_string(&info_path)?)?;
            existing.created_at
        } else {
            self.created_at
        };

        let info = SessionInfo {
            instance_id: self.instance_id.clone(),
            created_at,
            query_generation_id: self.query_generation_id.clone(),
            intent: self.intent.clone(),
            providers: self.providers.clone(),
            total_results: self.total_results,
            queries_executed: self.queries_executed.clone(),
            filter_model: self.filter_model.clone(),
        };
        fs::write(&info_path, serde_json::to_string_pretty(&info)?)?;

        fs::write(
            dir.join(RESULTS_FILE),
            serde_json::to_string_pretty(&self.results)?,
        )?;

        let queries_path = dir.join(QUERIES_FILE);
        if !self.queries.is_empty() && !queries_path.is_file() {
            fs::write(&queries_path, serde_json::to_string_pretty(&self.queries)?)?;
        }

        info!(
            instance_id = %self.instance_id,
            total_results = self.total_results,
            "session saved"
        );
        Ok(dir)
    }

    /// Loads a session from `storage_root`.
    ///
    /// With `filter_model` set, the loaded results are projected through
    /// [`filtered_results`](Self::filtered_results) at the default
    /// threshold instead of being returned raw.
    pub fn load(
        storage_root: &Path,
        instance_id: &str,
        filter_model: Option<&str>,
    ) -> Result<Self> {
        let dir = storage_root.join(instance_id);

        let info: SessionInfo = serde_json::from_str(&fs::read_to_string(dir.join(INFO_FILE))?)?;

        let results_path = dir.join(RESULTS_FILE);
        let results: BTreeMap<String, Vec<SearchResult>> = if results_path.is_file() {
            serde_json::from_str(&fs::read_to_string(results_path)?)?
        } else {
            BTreeMap::new()
        };

        let queries_path = dir.join(QUERIES_FILE);
        let queries: BTreeMap<String, Vec<String>> = if queries_path.is_file() {
            serde_json::from_str(&fs::read_to_string(queries_path)?)?
        } else {
            BTreeMap::new()
        };

        let mut session = Self {
            instance_id: info.instance_id,
            created_at: info.created_at,
            query_generation_id: info.query_generation_id,
            intent: info.intent,
            providers: info.providers,
            filter_model: filter_model
                .map(String::from)
                .or(info.filter_model),
            results,
            queries,
            queries_executed: info.queries_executed,
            total_results: 0,
        };

        if let Some(filter) = filter_model {
            session.results = session.filtered_results(filter, DEFAULT_THRESHOLD);
        }
        session.recompute_total();

        Ok(session)
    }

    /// Lists saved session instance ids under `storage_root`.
    ///
    /// A missing root directory is an empty list, not an error.
    pub fn list_instances(storage_root: &Path) -> Result<Vec<String>> {
        if !storage_root.is_dir() {
            return Ok(Vec::new());
        }

        let mut instances = Vec::new();
        for entry in fs::read_dir(storage_root)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if name.ends_with(INSTANCE_SUFFIX) {
                    instances.push(name.to_string());
                }
            }
        }
        instances.sort();
        Ok(instances)
    }
}

/// Builds an instance id from the creation time and an intent slug.
fn generate_instance_id(intent: &str, created_at: DateTime<Utc>) -> String {
    let timestamp = created_at.format("%Y%m%d_%H%M%S");
    let slug: String = intent
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .take(10)
        .collect();

    if slug.is_empty() {
        // No usable characters in the intent: fall back to sub-second time
        format!(
            "{timestamp}_{:04}{INSTANCE_SUFFIX}",
            created_at.timestamp_subsec_millis()
        )
    } else {
        format!("{timestamp}_{slug}{INSTANCE_SUFFIX}")
    }
}
