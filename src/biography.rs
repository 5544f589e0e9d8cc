//! Author biography lookup against a Wikipedia-style page summary API.
//!
//! Catalog creator strings look like `"Babbage, Charles, 1791-1871"` or
//! `"Vaucanson, Jacques de (1709-1782)"`. The name is cleaned, looked up,
//! and on a 404 retried once with the `Last, First` order flipped. A
//! disambiguation page counts as not found. Network failures are logged and
//! reported as no biography.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use reqwest::{StatusCode, Url};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::BiographyConfig;

/// Summary payload (subset of the REST `page/summary` shape).
#[derive(Debug, Clone, Deserialize)]
struct PageSummary {
    #[serde(rename = "type", default)]
    kind: String,
    title: String,
    #[serde(default)]
    extract: String,
    #[serde(default)]
    content_urls: Option<ContentUrls>,
    #[serde(default)]
    thumbnail: Option<Thumbnail>,
}

#[derive(Debug, Clone, Deserialize)]
struct ContentUrls {
    desktop: Option<PageUrl>,
}

#[derive(Debug, Clone, Deserialize)]
struct PageUrl {
    page: String,
}

#[derive(Debug, Clone, Deserialize)]
struct Thumbnail {
    source: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Biography {
    pub title: String,
    pub extract: String,
    pub url: Option<String>,
    pub thumbnail: Option<String>,
}

/// Strip life dates, parentheticals and trailing punctuation from a
/// catalog creator string.
pub fn clean_author_name(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut depth = 0usize;
    for c in raw.chars() {
        match c {
            '(' | '[' => depth += 1,
            ')' | ']' => depth = depth.saturating_sub(1),
            _ if depth == 0 => out.push(c),
            _ => {}
        }
    }

    // Drop trailing comma-separated parts that are dates ("1791-1871",
    // "b. 1815", "fl. 1750", "1912-").
    let mut parts: Vec<&str> = out.split(',').map(str::trim).collect();
    while parts.len() > 1 {
        match parts.last() {
            Some(last) if is_date_part(last) || last.is_empty() => {
                parts.pop();
            }
            _ => break,
        }
    }

    let joined = parts.join(", ");
    joined
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_end_matches(|c: char| c == ',' || c == '.' || c == ';' || c == ':')
        .trim()
        .to_string()
}

fn is_date_part(part: &str) -> bool {
    let has_digit = part.chars().any(|c| c.is_ascii_digit());
    has_digit
        && part.chars().all(|c| {
            c.is_ascii_digit() || c.is_whitespace() || matches!(c, '-' | '?' | '.' | 'b' | 'd' | 'f' | 'l' | 'c' | 'a')
        })
}

/// `"Babbage, Charles"` → `"Charles Babbage"`. `None` when the name has no
/// `Last, First` shape.
pub fn alternate_name(cleaned: &str) -> Option<String> {
    let (last, first) = cleaned.split_once(',')?;
    let (last, first) = (last.trim(), first.trim());
    if last.is_empty() || first.is_empty() {
        return None;
    }
    Some(format!("{} {}", first, last))
}

pub struct BiographyClient {
    endpoint: String,
    http: reqwest::Client,
}

impl BiographyClient {
    pub fn new(config: &BiographyConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("gemi-archive/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();
        Self {
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            http,
        }
    }

    /// Biography for a catalog creator string, or `None` if there is no
    /// usable single page for it.
    pub async fn lookup(&self, creator: &str) -> Option<Biography> {
        let cleaned = clean_author_name(creator);
        if cleaned.is_empty() {
            return None;
        }

        match self.fetch(&cleaned).await {
            Ok(Fetched::Found(bio)) => return Some(bio),
            Ok(Fetched::Rejected) => return None,
            Ok(Fetched::NotFound) => {}
            Err(e) => {
                warn!("biography lookup failed for '{}': {:#}", cleaned, e);
                return None;
            }
        }

        let alternate = alternate_name(&cleaned)?;
        debug!("retrying biography lookup as '{}'", alternate);
        match self.fetch(&alternate).await {
            Ok(Fetched::Found(bio)) => Some(bio),
            Ok(_) => None,
            Err(e) => {
                warn!("biography lookup failed for '{}': {:#}", alternate, e);
                None
            }
        }
    }

    async fn fetch(&self, name: &str) -> Result<Fetched> {
        let mut url = Url::parse(&self.endpoint)
            .with_context(|| format!("invalid biography endpoint: {}", self.endpoint))?;
        url.path_segments_mut()
            .map_err(|_| anyhow!("biography endpoint cannot take a path: {}", self.endpoint))?
            .push(&name.replace(' ', "_"));

        let resp = self.http.get(url).send().await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(Fetched::NotFound);
        }
        let resp = resp.error_for_status()?;
        let summary: PageSummary = resp.json().await?;
        if summary.kind == "disambiguation" {
            debug!("'{}' is a disambiguation page, ignoring", name);
            return Ok(Fetched::Rejected);
        }
        Ok(Fetched::Found(Biography {
            title: summary.title,
            extract: summary.extract,
            url: summary
                .content_urls
                .and_then(|c| c.desktop)
                .map(|d| d.page),
            thumbnail: summary.thumbnail.map(|t| t.source),
        }))
    }
}

enum Fetched {
    Found(Biography),
    NotFound,
    Rejected,
}
