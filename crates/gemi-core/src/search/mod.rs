//! Search backend abstraction.
//!
//! The archive's full-text search runs against a pre-built index asset. The
//! [`SearchBackend`] trait is the seam between the search client (which owns
//! load state, result caps and request sequencing) and whatever answers the
//! queries: the bundled [`memory::InMemoryIndex`] or an asset loaded at
//! runtime by the application crate.
//!
//! # Operations
//!
//! | Method | Purpose |
//! |--------|---------|
//! | [`init`](SearchBackend::init) | One-time initialization (load the asset) |
//! | [`search`](SearchBackend::search) | Ranked hits for a query, facet-constrained |
//! | [`entry`](SearchBackend::entry) | Resolve a hit to its display record |
//! | [`filters`](SearchBackend::filters) | Facet values and their counts |

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Hard cap on results per query. There is no second page.
pub const MAX_RESULTS: usize = 50;

/// Facet names understood by every backend.
pub const FACET_NAMES: [&str; 3] = ["decade", "topic", "language"];

/// Facet equality constraints for a query. Facets AND together; `None` or
/// an empty value leaves the facet unconstrained.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Facets {
    /// Decade label as indexed, e.g. `"1850s"`.
    #[serde(default)]
    pub decade: Option<String>,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
}

impl Facets {
    /// The active constraints as `(facet, value)` pairs.
    pub fn active(&self) -> Vec<(&'static str, &str)> {
        FACET_NAMES
            .into_iter()
            .zip([&self.decade, &self.topic, &self.language])
            .filter_map(|(name, v)| v.as_deref().filter(|s| !s.is_empty()).map(|s| (name, s)))
            .collect()
    }

    pub fn matches(&self, facets: &EntryFacets) -> bool {
        self.active().into_iter().all(|(name, value)| match name {
            "decade" => facets.decade == value,
            "topic" => facets.topic == value,
            _ => facets.language == value,
        })
    }
}

/// Facet name → (facet value → document count).
pub type FacetCounts = BTreeMap<String, BTreeMap<String, usize>>;

/// Facet values attached to an indexed document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryFacets {
    pub year: i32,
    pub decade: String,
    pub topic: String,
    pub language: String,
}

impl EntryFacets {
    pub fn for_document(year: i32, topic: &str, language: &str) -> Self {
        Self {
            year,
            decade: decade_label(year),
            topic: topic.to_string(),
            language: language.to_string(),
        }
    }
}

/// Decade facet label, e.g. `1857 → "1850s"`.
pub fn decade_label(year: i32) -> String {
    format!("{}s", crate::models::decade_of(year))
}

/// A ranked hit, before its display record is fetched.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    /// Backend-specific handle used by [`SearchBackend::entry`].
    pub id: String,
    pub score: f64,
    /// Normalized query terms that matched, used for excerpt highlighting.
    pub terms: Vec<String>,
}

/// Display record for a hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchIndexEntry {
    /// Document identifier embedded by the index build step.
    #[serde(default)]
    pub doc_id: Option<String>,
    pub url: String,
    pub title: String,
    /// Excerpt HTML; text is escaped and matches are wrapped in `<mark>`.
    pub excerpt: String,
    pub facets: EntryFacets,
}

impl SearchIndexEntry {
    /// The document this entry refers to.
    ///
    /// Uses the embedded `doc_id`. Older assets without it fall back to the
    /// URL's filename stem, which the caller should validate against the
    /// corpus.
    pub fn document_id(&self) -> Option<String> {
        match self.doc_id.as_deref() {
            Some(id) if !id.is_empty() => Some(id.to_string()),
            _ => document_id_from_url(&self.url),
        }
    }
}

/// Filename stem of a URL path: `/texts/babbage_1864.html` → `babbage_1864`.
///
/// Query strings and fragments are ignored. Returns `None` when the path
/// has no usable final segment.
pub fn document_id_from_url(url: &str) -> Option<String> {
    let path = url.split(|c: char| c == '?' || c == '#').next().unwrap_or("");
    let file = path.rsplit('/').next().unwrap_or("");
    let stem = match file.rfind('.') {
        Some(0) | None => file,
        Some(dot) => &file[..dot],
    };
    if stem.is_empty() || stem.starts_with('.') {
        None
    } else {
        Some(stem.to_string())
    }
}

/// A resolved search result as shown on the search page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub doc_id: String,
    pub url: String,
    pub title: String,
    pub excerpt: String,
    pub year: i32,
    pub decade: String,
    pub topic: String,
    pub language: String,
}

impl SearchResult {
    pub fn from_entry(doc_id: String, entry: SearchIndexEntry) -> Self {
        Self {
            doc_id,
            url: entry.url,
            title: entry.title,
            excerpt: entry.excerpt,
            year: entry.facets.year,
            decade: entry.facets.decade,
            topic: entry.facets.topic,
            language: entry.facets.language,
        }
    }
}

/// Query interface to a pre-built search index.
///
/// Implementations must be `Send + Sync`; the application shares one
/// backend across all requests.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Prepare the index for queries. Called once before anything else.
    async fn init(&self) -> Result<()>;

    /// Ranked hits for `query`, restricted to documents matching `facets`.
    async fn search(&self, query: &str, facets: &Facets) -> Result<Vec<SearchHit>>;

    /// Fetch the display record for `hit`.
    async fn entry(&self, hit: &SearchHit) -> Result<SearchIndexEntry>;

    /// Available facet values with document counts.
    async fn filters(&self) -> Result<FacetCounts>;
}
