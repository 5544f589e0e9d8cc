//! Pre-built search index asset: loading and building.
//!
//! `gemi build-index` reads the corpus index and each document's text file
//! and writes `search-index.json` (an [`IndexAsset`]) with the document
//! identifier embedded in every record. At runtime [`AssetIndex`] loads that
//! asset from a local path or an `http(s)://` URL during
//! [`SearchBackend::init`] and answers queries from memory.

use std::path::Path;
use std::sync::OnceLock;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use tracing::{info, warn};

use gemi_core::search::memory::{IndexAsset, IndexRecord, InMemoryIndex};
use gemi_core::search::{FacetCounts, Facets, SearchBackend, SearchHit, SearchIndexEntry};

use crate::config::Config;
use crate::repository::AssetCache;
use crate::texts::TextStore;

/// [`SearchBackend`] over an index asset fetched on `init`.
pub struct AssetIndex {
    location: String,
    index: OnceLock<InMemoryIndex>,
}

impl AssetIndex {
    /// `location` is a filesystem path or an `http(s)://` URL.
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            index: OnceLock::new(),
        }
    }

    fn loaded(&self) -> Result<&InMemoryIndex> {
        self.index
            .get()
            .ok_or_else(|| anyhow!("search index not initialized"))
    }

    async fn fetch_asset(&self) -> Result<IndexAsset> {
        if is_remote(&self.location) {
            let resp = reqwest::get(&self.location)
                .await
                .with_context(|| format!("Failed to fetch search index: {}", self.location))?;
            if !resp.status().is_success() {
                bail!(
                    "search index request to {} returned {}",
                    self.location,
                    resp.status()
                );
            }
            resp.json::<IndexAsset>()
                .await
                .with_context(|| format!("Failed to parse search index: {}", self.location))
        } else {
            let bytes = tokio::fs::read(&self.location)
                .await
                .with_context(|| format!("Failed to read search index: {}", self.location))?;
            serde_json::from_slice(&bytes)
                .with_context(|| format!("Failed to parse search index: {}", self.location))
        }
    }
}

fn is_remote(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}

#[async_trait]
impl SearchBackend for AssetIndex {
    async fn init(&self) -> Result<()> {
        if self.index.get().is_some() {
            return Ok(());
        }
        let asset = self.fetch_asset().await?;
        let index = InMemoryIndex::from_asset(asset)?;
        info!("search index loaded: {} records from {}", index.len(), self.location);
        // A concurrent init may have won; either value is equivalent.
        let _ = self.index.set(index);
        Ok(())
    }

    async fn search(&self, query: &str, facets: &Facets) -> Result<Vec<SearchHit>> {
        self.loaded()?.search(query, facets).await
    }

    async fn entry(&self, hit: &SearchHit) -> Result<SearchIndexEntry> {
        self.loaded()?.entry(hit).await
    }

    async fn filters(&self) -> Result<FacetCounts> {
        self.loaded()?.filters().await
    }
}

/// Summary of a `build-index` run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
    pub indexed: usize,
    /// Documents indexed with title only because their text was unavailable.
    pub without_text: usize,
}

/// Build the index asset from the corpus index and document texts.
pub async fn build_index(config: &Config) -> Result<(IndexAsset, BuildReport)> {
    let corpus: AssetCache<Vec<gemi_core::models::Document>> =
        AssetCache::new("corpus index", &config.data.corpus_index);
    let documents = corpus.get().await?;
    let texts = TextStore::from_config(config);

    let mut report = BuildReport::default();
    let mut records = Vec::with_capacity(documents.len());
    for doc in documents.iter() {
        let content = match texts.document_text(doc).await {
            Ok(text) => text,
            Err(e) => {
                warn!("indexing {} without text: {}", doc.identifier, e);
                report.without_text += 1;
                String::new()
            }
        };
        records.push(IndexRecord::for_document(doc, content));
        report.indexed += 1;
    }
    Ok((IndexAsset::new(records), report))
}

/// Run the `build-index` command. Writes to `output`, or to the configured
/// local index path when `output` is `None`.
pub async fn run_build_index(config: &Config, output: Option<&Path>) -> Result<()> {
    let target = match output {
        Some(p) => p.to_path_buf(),
        None if is_remote(&config.search.index) => {
            bail!("search.index is a URL; pass --output to choose where to write the asset")
        }
        None => config.search.index.clone().into(),
    };

    let (asset, report) = build_index(config).await?;
    let json = serde_json::to_string(&asset)?;
    if let Some(parent) = target.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(&target, &json)
        .with_context(|| format!("Failed to write search index: {}", target.display()))?;

    eprintln!(
        "Indexed {} documents ({} without text) to {}",
        report.indexed,
        report.without_text,
        target.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use gemi_core::search::EntryFacets;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_uninitialized_backend_errors() {
        let index = AssetIndex::new("/nonexistent/search-index.json");
        assert!(index.search("engine", &Facets::default()).await.is_err());
        assert!(index.init().await.is_err());
    }

    #[tokio::test]
    async fn test_loads_local_asset() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("search-index.json");
        let asset = IndexAsset::new(vec![IndexRecord {
            doc_id: "babbage".to_string(),
            url: "/documents/babbage".to_string(),
            title: "Passages".to_string(),
            content: "The analytical engine".to_string(),
            facets: EntryFacets::for_document(1864, "calculating_machines", "en"),
        }]);
        std::fs::write(&path, serde_json::to_string(&asset).unwrap()).unwrap();

        let index = AssetIndex::new(path.to_string_lossy());
        index.init().await.unwrap();
        let hits = index.search("engine", &Facets::default()).await.unwrap();
        assert_eq!(hits.len(), 1);
        let entry = index.entry(&hits[0]).await.unwrap();
        assert_eq!(entry.document_id().as_deref(), Some("babbage"));
    }

    #[tokio::test]
    async fn test_build_index_embeds_ids() {
        let tmp = TempDir::new().unwrap();
        let texts = tmp.path().join("texts");
        std::fs::create_dir_all(&texts).unwrap();
        std::fs::write(texts.join("a.txt"), "automaton of Vaucanson").unwrap();
        let corpus = tmp.path().join("corpus.json");
        std::fs::write(
            &corpus,
            r#"[
                {"identifier": "a", "title": "Le flûteur", "year": 1738, "topic": "automata",
                 "language_code": "fr", "filename": "a.txt"},
                {"identifier": "b", "title": "Missing text", "year": 1950, "topic": "computing",
                 "filename": "b.txt"}
            ]"#,
        )
        .unwrap();

        let mut config = Config::default();
        config.data.corpus_index = corpus;
        config.data.texts_dir = texts;
        config.storage.remote_base_url = None;

        let (asset, report) = build_index(&config).await.unwrap();
        assert_eq!(report, BuildReport { indexed: 2, without_text: 1 });
        assert_eq!(asset.records[0].doc_id, "a");
        assert_eq!(asset.records[0].facets.decade, "1730s");
        assert!(asset.records[1].content.is_empty());
    }
}
