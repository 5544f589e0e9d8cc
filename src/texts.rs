//! Document text retrieval.
//!
//! Full texts live as plain files named by [`Document::filename`]. The local
//! texts directory is tried first; if the file is not there and a remote
//! storage base URL is configured, the text is fetched from
//! `{base}/{filename}`. Translations have their own local directory but sit
//! at the bucket root next to the originals.
//!
//! Concurrent requests for the same file share one fetch.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use thiserror::Error;
use tracing::{debug, warn};

use gemi_core::models::Document;

use crate::config::Config;

const REMOTE_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Error)]
pub enum TextError {
    /// The document has no text file (or no translation) recorded.
    #[error("no {0} file recorded for document")]
    Missing(&'static str),
    #[error("invalid text filename: {0}")]
    InvalidFilename(String),
    /// Neither local nor remote storage could supply the text.
    #[error("unable to load text: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextKind {
    Original,
    Translation,
}

impl TextKind {
    fn label(self) -> &'static str {
        match self {
            TextKind::Original => "text",
            TextKind::Translation => "translation",
        }
    }
}

type PendingFetch = Shared<BoxFuture<'static, Result<String, TextError>>>;

struct TextSource {
    texts_dir: PathBuf,
    translations_dir: PathBuf,
    remote_base_url: Option<String>,
    http: reqwest::Client,
}

pub struct TextStore {
    source: Arc<TextSource>,
    inflight: Mutex<HashMap<(TextKind, String), PendingFetch>>,
}

impl TextStore {
    pub fn new(
        texts_dir: impl Into<PathBuf>,
        translations_dir: impl Into<PathBuf>,
        remote_base_url: Option<String>,
    ) -> Self {
        let http = reqwest::Client::builder()
            .timeout(REMOTE_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            source: Arc::new(TextSource {
                texts_dir: texts_dir.into(),
                translations_dir: translations_dir.into(),
                remote_base_url,
                http,
            }),
            inflight: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            &config.data.texts_dir,
            &config.data.translations_dir,
            config.remote_base_url(),
        )
    }

    /// Full text of `doc`.
    pub async fn document_text(&self, doc: &Document) -> Result<String, TextError> {
        let filename = doc
            .filename
            .as_deref()
            .filter(|f| !f.is_empty())
            .ok_or(TextError::Missing("text"))?;
        self.fetch(filename, TextKind::Original).await
    }

    /// English translation of `doc`, if it has one.
    pub async fn translation_text(&self, doc: &Document) -> Result<String, TextError> {
        if !doc.has_translation {
            return Err(TextError::Missing("translation"));
        }
        let filename = doc
            .translation_filename
            .as_deref()
            .filter(|f| !f.is_empty())
            .ok_or(TextError::Missing("translation"))?;
        self.fetch(filename, TextKind::Translation).await
    }

    pub async fn fetch(&self, filename: &str, kind: TextKind) -> Result<String, TextError> {
        validate_filename(filename)?;

        let key = (kind, filename.to_string());
        let pending = {
            let mut inflight = self.inflight.lock().unwrap_or_else(|e| e.into_inner());
            inflight
                .entry(key.clone())
                .or_insert_with(|| {
                    let source = self.source.clone();
                    let filename = filename.to_string();
                    async move { source.fetch(&filename, kind).await }
                        .boxed()
                        .shared()
                })
                .clone()
        };

        let result = pending.clone().await;

        let mut inflight = self.inflight.lock().unwrap_or_else(|e| e.into_inner());
        if inflight.get(&key).is_some_and(|p| p.ptr_eq(&pending)) {
            inflight.remove(&key);
        }
        result
    }
}

impl TextSource {
    async fn fetch(&self, filename: &str, kind: TextKind) -> Result<String, TextError> {
        let dir = match kind {
            TextKind::Original => &self.texts_dir,
            TextKind::Translation => &self.translations_dir,
        };
        match read_local(&dir.join(filename)).await {
            Some(text) => return Ok(text),
            None => debug!("{} {} not found locally", kind.label(), filename),
        }

        let Some(base) = &self.remote_base_url else {
            return Err(TextError::Unavailable(format!(
                "{} not found locally and no remote storage configured",
                filename
            )));
        };
        self.fetch_remote(&format!("{}/{}", base, filename)).await
    }

    async fn fetch_remote(&self, url: &str) -> Result<String, TextError> {
        let resp = self.http.get(url).send().await.map_err(|e| {
            warn!("text fetch failed for {}: {}", url, e);
            TextError::Unavailable(e.to_string())
        })?;
        if !resp.status().is_success() {
            warn!("text fetch returned {} for {}", resp.status(), url);
            return Err(TextError::Unavailable(format!(
                "remote storage returned {}",
                resp.status()
            )));
        }
        resp.text()
            .await
            .map_err(|e| TextError::Unavailable(e.to_string()))
    }
}

async fn read_local(path: &Path) -> Option<String> {
    let bytes = tokio::fs::read(path).await.ok()?;
    Some(String::from_utf8_lossy(&bytes).into_owned())
}

/// Text filenames are bare names; anything that could escape the texts
/// directory is rejected.
pub fn validate_filename(filename: &str) -> Result<(), TextError> {
    let bad = filename.is_empty()
        || filename.contains('/')
        || filename.contains('\\')
        || filename.contains('\0')
        || filename == "."
        || filename == ".."
        || filename.starts_with("..");
    if bad {
        return Err(TextError::InvalidFilename(filename.to_string()));
    }
    Ok(())
}
