//! TOML configuration.
//!
//! Every section is optional; a missing file is not an error (the CLI falls
//! back to [`Config::default`], which points at the `public/` layout written
//! by the export step).
//!
//! ```toml
//! [data]
//! corpus_index = "public/data/corpus-index.json"
//! quotes = "public/data/quotes.json"
//! drift = "public/data/semantic-drift.json"
//! texts_dir = "public/raw_texts"
//! translations_dir = "public/translations"
//!
//! [storage]
//! remote_base_url = "https://example.supabase.co/storage/v1/object/public/corpus-texts"
//!
//! [search]
//! index = "public/data/search-index.json"
//! timeout_secs = 10
//! max_results = 50
//!
//! [biography]
//! endpoint = "https://en.wikipedia.org/api/rest_v1/page/summary"
//!
//! [server]
//! bind = "127.0.0.1:7341"
//! ```

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable overriding `[storage].remote_base_url`.
pub const STORAGE_URL_ENV: &str = "GEMI_STORAGE_URL";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub biography: BiographyConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DataConfig {
    #[serde(default = "default_corpus_index")]
    pub corpus_index: PathBuf,
    #[serde(default = "default_quotes")]
    pub quotes: PathBuf,
    #[serde(default = "default_drift")]
    pub drift: PathBuf,
    #[serde(default = "default_texts_dir")]
    pub texts_dir: PathBuf,
    #[serde(default = "default_translations_dir")]
    pub translations_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            corpus_index: default_corpus_index(),
            quotes: default_quotes(),
            drift: default_drift(),
            texts_dir: default_texts_dir(),
            translations_dir: default_translations_dir(),
        }
    }
}

fn default_corpus_index() -> PathBuf {
    PathBuf::from("public/data/corpus-index.json")
}
fn default_quotes() -> PathBuf {
    PathBuf::from("public/data/quotes.json")
}
fn default_drift() -> PathBuf {
    PathBuf::from("public/data/semantic-drift.json")
}
fn default_texts_dir() -> PathBuf {
    PathBuf::from("public/raw_texts")
}
fn default_translations_dir() -> PathBuf {
    PathBuf::from("public/translations")
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct StorageConfig {
    /// Base URL of the object-storage bucket holding text files.
    #[serde(default)]
    pub remote_base_url: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    /// Local path or `http(s)://` URL of the pre-built search index asset.
    #[serde(default = "default_search_index")]
    pub index: String,
    #[serde(default = "default_search_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            index: default_search_index(),
            timeout_secs: default_search_timeout(),
            max_results: default_max_results(),
        }
    }
}

fn default_search_index() -> String {
    "public/data/search-index.json".to_string()
}
fn default_search_timeout() -> u64 {
    10
}
fn default_max_results() -> usize {
    gemi_core::search::MAX_RESULTS
}

#[derive(Debug, Deserialize, Clone)]
pub struct BiographyConfig {
    #[serde(default = "default_biography_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_biography_timeout")]
    pub timeout_secs: u64,
}

impl Default for BiographyConfig {
    fn default() -> Self {
        Self {
            endpoint: default_biography_endpoint(),
            timeout_secs: default_biography_timeout(),
        }
    }
}

fn default_biography_endpoint() -> String {
    "https://en.wikipedia.org/api/rest_v1/page/summary".to_string()
}
fn default_biography_timeout() -> u64 {
    10
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7341".to_string()
}

impl Config {
    /// Remote storage base URL, with [`STORAGE_URL_ENV`] taking precedence.
    pub fn remote_base_url(&self) -> Option<String> {
        std::env::var(STORAGE_URL_ENV)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .or_else(|| self.storage.remote_base_url.clone())
            .map(|u| u.trim_end_matches('/').to_string())
    }
}

/// Parse and validate a configuration file.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config(&content)
}

/// Load `path` if it exists, otherwise return the defaults.
pub fn load_config_or_default(path: &Path) -> Result<Config> {
    if path.exists() {
        load_config(path)
    } else {
        tracing::debug!("no config at {}, using defaults", path.display());
        Ok(Config::default())
    }
}

pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;

    if config.search.timeout_secs == 0 {
        bail!("search.timeout_secs must be > 0");
    }

    if config.search.max_results == 0 || config.search.max_results > gemi_core::search::MAX_RESULTS {
        bail!(
            "search.max_results must be in [1, {}]",
            gemi_core::search::MAX_RESULTS
        );
    }

    if config.search.index.trim().is_empty() {
        bail!("search.index must not be empty");
    }

    if let Some(url) = &config.storage.remote_base_url {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            bail!("storage.remote_base_url must be an http(s) URL, got '{}'", url);
        }
    }

    if config.biography.timeout_secs == 0 {
        bail!("biography.timeout_secs must be > 0");
    }

    Ok(config)
}
