//! Search index client.
//!
//! Wraps a [`SearchBackend`] with the lifecycle the search page relies on:
//!
//! ```text
//! Unloaded ──ensure_loaded()──▶ Loading ──▶ Ready
//!                                   └──────▶ LoadFailed (terminal)
//! ```
//!
//! Loading is single-flight: any number of concurrent `ensure_loaded` calls
//! share one `init()` + `filters()` round trip, bounded by the configured
//! timeout. A failed load is never retried; callers surface it as "search
//! unavailable".
//!
//! [`SearchSession`] adds the per-page superseded-request guard: every
//! search gets a sequence number and results from an older sequence are
//! discarded instead of overwriting newer ones.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use futures::future::join_all;
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use gemi_core::search::{FacetCounts, Facets, SearchBackend, SearchResult, MAX_RESULTS};

use crate::config::SearchConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    Unloaded,
    Loading,
    Ready,
    LoadFailed(String),
}

impl LoadState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoadState::Unloaded => "unloaded",
            LoadState::Loading => "loading",
            LoadState::Ready => "ready",
            LoadState::LoadFailed(_) => "load_failed",
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LoadError {
    #[error("search unavailable: index load timed out after {0}s")]
    Timeout(u64),
    #[error("search unavailable: {0}")]
    Backend(String),
}

pub struct SearchIndexClient<B> {
    backend: B,
    timeout: Duration,
    max_results: usize,
    started: AtomicBool,
    loaded: OnceCell<Result<FacetCounts, LoadError>>,
}

impl<B: SearchBackend> SearchIndexClient<B> {
    pub fn new(backend: B) -> Self {
        Self::with_limits(backend, Duration::from_secs(10), MAX_RESULTS)
    }

    pub fn from_config(backend: B, config: &SearchConfig) -> Self {
        Self::with_limits(
            backend,
            Duration::from_secs(config.timeout_secs),
            config.max_results,
        )
    }

    /// `max_results` is clamped to [`MAX_RESULTS`].
    pub fn with_limits(backend: B, timeout: Duration, max_results: usize) -> Self {
        Self {
            backend,
            timeout,
            max_results: max_results.clamp(1, MAX_RESULTS),
            started: AtomicBool::new(false),
            loaded: OnceCell::new(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn state(&self) -> LoadState {
        match self.loaded.get() {
            Some(Ok(_)) => LoadState::Ready,
            Some(Err(e)) => LoadState::LoadFailed(e.to_string()),
            None if self.started.load(Ordering::SeqCst) => LoadState::Loading,
            None => LoadState::Unloaded,
        }
    }

    /// Load the index if nobody has yet, and wait for the outcome.
    ///
    /// Returns the facet counts used to populate filter controls.
    pub async fn ensure_loaded(&self) -> Result<&FacetCounts, LoadError> {
        self.started.store(true, Ordering::SeqCst);
        let outcome = self
            .loaded
            .get_or_init(|| async {
                debug!("loading search index");
                match tokio::time::timeout(self.timeout, self.load()).await {
                    Ok(Ok(facets)) => Ok(facets),
                    Ok(Err(e)) => {
                        warn!("search index failed to load: {:#}", e);
                        Err(LoadError::Backend(format!("{:#}", e)))
                    }
                    Err(_) => {
                        warn!("search index load timed out after {:?}", self.timeout);
                        Err(LoadError::Timeout(self.timeout.as_secs()))
                    }
                }
            })
            .await;
        outcome.as_ref().map_err(|e| e.clone())
    }

    async fn load(&self) -> Result<FacetCounts> {
        self.backend.init().await?;
        self.backend.filters().await
    }

    /// Facet counts, if the index is ready.
    pub fn facets(&self) -> Option<&FacetCounts> {
        self.loaded.get().and_then(|r| r.as_ref().ok())
    }

    /// Run `query` against the index.
    ///
    /// Outside the `Ready` state, or for a blank query, returns no results
    /// without touching the backend. Results come back in rank order, capped
    /// at the configured maximum. When `known_ids` is given, results whose
    /// document identifier is not in it are dropped.
    pub async fn query(
        &self,
        query: &str,
        facets: &Facets,
        known_ids: Option<&HashSet<String>>,
    ) -> Result<Vec<SearchResult>> {
        if query.trim().is_empty() || self.facets().is_none() {
            return Ok(Vec::new());
        }

        let mut hits = self.backend.search(query, facets).await?;
        hits.truncate(self.max_results);

        let entries = join_all(hits.iter().map(|hit| self.backend.entry(hit))).await;

        let mut results = Vec::with_capacity(entries.len());
        for (hit, entry) in hits.iter().zip(entries) {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    warn!("dropping search hit {}: {:#}", hit.id, e);
                    continue;
                }
            };
            let Some(doc_id) = entry.document_id() else {
                warn!("dropping search hit {} with no document identifier ({})", hit.id, entry.url);
                continue;
            };
            if let Some(known) = known_ids {
                if !known.contains(&doc_id) {
                    warn!("search index refers to unknown document '{}'", doc_id);
                    continue;
                }
            }
            results.push(SearchResult::from_entry(doc_id, entry));
        }
        Ok(results)
    }
}

/// Outcome of one [`SearchSession::search`] call.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    /// These results are now the session's current results.
    Applied(Vec<SearchResult>),
    /// A newer search was issued while this one was in flight.
    Superseded,
}

#[derive(Default)]
struct Current {
    sequence: u64,
    query: String,
    results: Vec<SearchResult>,
}

/// The state behind one search box.
pub struct SearchSession<B> {
    client: Arc<SearchIndexClient<B>>,
    sequence: AtomicU64,
    current: Mutex<Current>,
}

impl<B: SearchBackend> SearchSession<B> {
    pub fn new(client: Arc<SearchIndexClient<B>>) -> Self {
        Self {
            client,
            sequence: AtomicU64::new(0),
            current: Mutex::new(Current::default()),
        }
    }

    pub fn client(&self) -> &Arc<SearchIndexClient<B>> {
        &self.client
    }

    pub async fn search(
        &self,
        query: &str,
        facets: &Facets,
        known_ids: Option<&HashSet<String>>,
    ) -> Result<SearchOutcome> {
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let outcome = self.client.query(query, facets, known_ids).await;

        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        if sequence != self.sequence.load(Ordering::SeqCst) || sequence < current.sequence {
            debug!("discarding results of superseded query '{}'", query);
            return Ok(SearchOutcome::Superseded);
        }

        current.sequence = sequence;
        current.query = query.to_string();
        match outcome {
            Ok(results) => {
                current.results = results.clone();
                Ok(SearchOutcome::Applied(results))
            }
            Err(e) => {
                current.results.clear();
                Err(e)
            }
        }
    }

    /// The query whose results are currently shown.
    pub fn query(&self) -> String {
        self.current
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .query
            .clone()
    }

    pub fn results(&self) -> Vec<SearchResult> {
        self.current
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .results
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gemi_core::search::memory::{IndexRecord, InMemoryIndex};
    use gemi_core::search::EntryFacets;

    fn record(id: &str, content: &str) -> IndexRecord {
        IndexRecord {
            doc_id: id.to_string(),
            url: format!("/documents/{}", id),
            title: id.to_string(),
            content: content.to_string(),
            facets: EntryFacets::for_document(1900, "automation", "en"),
        }
    }

    #[tokio::test]
    async fn test_query_before_load_is_empty() {
        let client = SearchIndexClient::new(InMemoryIndex::new(vec![record("a", "engine")]));
        assert_eq!(client.state(), LoadState::Unloaded);
        let results = client.query("engine", &Facets::default(), None).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_ready_after_load() {
        let client = SearchIndexClient::new(InMemoryIndex::new(vec![record("a", "engine")]));
        let facets = client.ensure_loaded().await.unwrap();
        assert_eq!(facets["topic"]["automation"], 1);
        assert_eq!(client.state(), LoadState::Ready);
        let results = client.query("engine", &Facets::default(), None).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].doc_id, "a");
    }

    #[tokio::test]
    async fn test_unknown_ids_dropped() {
        let client = SearchIndexClient::new(InMemoryIndex::new(vec![
            record("a", "engine"),
            record("ghost", "engine"),
        ]));
        client.ensure_loaded().await.unwrap();
        let known: HashSet<String> = ["a".to_string()].into_iter().collect();
        let results = client
            .query("engine", &Facets::default(), Some(&known))
            .await
            .unwrap();
        let ids: Vec<&str> = results.iter().map(|r| r.doc_id.as_str()).collect();
        assert_eq!(ids, vec!["a"]);
    }

    #[test]
    fn test_max_results_clamped() {
        let client = SearchIndexClient::with_limits(
            InMemoryIndex::new(vec![]),
            Duration::from_secs(1),
            500,
        );
        assert_eq!(client.max_results, MAX_RESULTS);
    }
}
