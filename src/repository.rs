//! Cached, file-backed access to the archive's JSON assets.
//!
//! Each asset (corpus index, quotes, drift report) is held by an
//! [`AssetCache`]: constructed once at startup, shared by reference, and
//! refreshed when the file's modification time changes. The loaded value is
//! immutable; a reload replaces it wholesale.
//!
//! # Loading
//!
//! 1. Stat the file. Missing files count as an empty asset.
//! 2. If the cached generation has the same modification time, return it.
//! 3. Otherwise take the load lock, re-check (another caller may have
//!    reloaded meanwhile), then read and parse.
//!
//! A missing file degrades to `T::default()` with a warning. A file that
//! exists but fails to parse is an error for the caller to surface.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};
use std::time::SystemTime;
use tracing::{debug, info, warn};

use gemi_core::drift::DriftReport;
use gemi_core::models::{Document, Quote};
use gemi_core::stats::{compute_stats, CorpusStats};

use crate::config::DataConfig;

struct Generation<T> {
    /// `None` when the file was absent at load time.
    modified: Option<SystemTime>,
    number: u64,
    value: Arc<T>,
}

/// A JSON asset cached in memory and reloaded when its file changes.
pub struct AssetCache<T> {
    path: PathBuf,
    label: &'static str,
    current: RwLock<Option<Generation<T>>>,
    load_lock: tokio::sync::Mutex<()>,
    on_load: Option<fn(&T)>,
}

impl<T> AssetCache<T>
where
    T: DeserializeOwned + Default + Send + Sync,
{
    pub fn new(label: &'static str, path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            label,
            current: RwLock::new(None),
            load_lock: tokio::sync::Mutex::new(()),
            on_load: None,
        }
    }

    /// Run `hook` on every freshly loaded value (e.g. to log data problems).
    pub fn with_load_hook(mut self, hook: fn(&T)) -> Self {
        self.on_load = Some(hook);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The current value, loading or reloading it if needed.
    pub async fn get(&self) -> Result<Arc<T>> {
        Ok(self.snapshot().await?.1)
    }

    /// The current value together with its generation number. The number
    /// increases every time the asset is reloaded.
    pub async fn snapshot(&self) -> Result<(u64, Arc<T>)> {
        let modified = modification_time(&self.path).await;
        if let Some(hit) = self.cached(modified) {
            return Ok(hit);
        }

        let _guard = self.load_lock.lock().await;
        // Re-stat under the lock: the file may have changed again, or another
        // task may already have loaded this version.
        let modified = modification_time(&self.path).await;
        if let Some(hit) = self.cached(modified) {
            return Ok(hit);
        }

        let value = Arc::new(self.load(modified.is_some()).await?);
        if let Some(hook) = self.on_load {
            hook(&value);
        }

        let mut current = self.current.write().unwrap_or_else(|e| e.into_inner());
        let number = current.as_ref().map_or(1, |g| g.number + 1);
        *current = Some(Generation {
            modified,
            number,
            value: value.clone(),
        });
        Ok((number, value))
    }

    fn cached(&self, modified: Option<SystemTime>) -> Option<(u64, Arc<T>)> {
        let current = self.current.read().unwrap_or_else(|e| e.into_inner());
        current
            .as_ref()
            .filter(|g| g.modified == modified)
            .map(|g| (g.number, g.value.clone()))
    }

    async fn load(&self, exists: bool) -> Result<T> {
        if !exists {
            warn!(
                "{} not found at {}, serving an empty collection",
                self.label,
                self.path.display()
            );
            return Ok(T::default());
        }
        let bytes = tokio::fs::read(&self.path)
            .await
            .with_context(|| format!("Failed to read {}: {}", self.label, self.path.display()))?;
        let value: T = serde_json::from_slice(&bytes)
            .with_context(|| format!("Failed to parse {}: {}", self.label, self.path.display()))?;
        info!("loaded {} from {}", self.label, self.path.display());
        Ok(value)
    }
}

async fn modification_time(path: &Path) -> Option<SystemTime> {
    tokio::fs::metadata(path)
        .await
        .ok()
        .and_then(|m| m.modified().ok())
}

fn log_corpus_problems(documents: &Vec<Document>) {
    let mut seen: HashSet<&str> = HashSet::new();
    for doc in documents {
        if !seen.insert(doc.identifier.as_str()) {
            warn!("duplicate document identifier in corpus index: {}", doc.identifier);
        }
    }
    debug!("corpus index holds {} documents", documents.len());
}

/// All archive assets, shared across requests.
pub struct Archive {
    pub corpus: AssetCache<Vec<Document>>,
    pub quotes: AssetCache<Vec<Quote>>,
    pub drift: AssetCache<DriftReport>,
    derived: Mutex<Option<Derived>>,
}

/// Values computed from one corpus generation.
struct Derived {
    generation: u64,
    stats: Arc<CorpusStats>,
    identifiers: Arc<HashSet<String>>,
}

impl Archive {
    pub fn new(data: &DataConfig) -> Self {
        Self {
            corpus: AssetCache::new("corpus index", &data.corpus_index)
                .with_load_hook(log_corpus_problems),
            quotes: AssetCache::new("quotes", &data.quotes),
            drift: AssetCache::new("semantic drift report", &data.drift),
            derived: Mutex::new(None),
        }
    }

    pub async fn documents(&self) -> Result<Arc<Vec<Document>>> {
        self.corpus.get().await
    }

    pub async fn quotes(&self) -> Result<Arc<Vec<Quote>>> {
        self.quotes.get().await
    }

    pub async fn drift(&self) -> Result<Arc<DriftReport>> {
        self.drift.get().await
    }

    /// Corpus statistics, recomputed only when the corpus generation changes.
    pub async fn stats(&self) -> Result<Arc<CorpusStats>> {
        Ok(self.derived().await?.0)
    }

    /// Identifiers of all documents in the current corpus.
    pub async fn identifiers(&self) -> Result<Arc<HashSet<String>>> {
        Ok(self.derived().await?.1)
    }

    async fn derived(&self) -> Result<(Arc<CorpusStats>, Arc<HashSet<String>>)> {
        let (generation, documents) = self.corpus.snapshot().await?;
        let mut cached = self.derived.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(d) = cached.as_ref().filter(|d| d.generation == generation) {
            return Ok((d.stats.clone(), d.identifiers.clone()));
        }
        let stats = Arc::new(compute_stats(&documents));
        let identifiers: Arc<HashSet<String>> =
            Arc::new(documents.iter().map(|d| d.identifier.clone()).collect());
        *cached = Some(Derived {
            generation,
            stats: stats.clone(),
            identifiers: identifiers.clone(),
        });
        Ok((stats, identifiers))
    }
}
