//! In-memory [`SearchBackend`] over a list of index records.
//!
//! Builds a term → postings map once at construction. Matching is AND over
//! query terms, accent- and case-insensitive; the last query term also
//! matches as a prefix so partial words typed into the search box hit.
//! Title occurrences weigh more than body occurrences.
//!
//! Used directly in tests and wrapped by the application's asset loader.

use std::collections::{BTreeMap, HashMap, HashSet};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::markup::html_escape;
use crate::models::Document;
use crate::view::collation_key;

use super::{EntryFacets, FacetCounts, Facets, SearchBackend, SearchHit, SearchIndexEntry};

/// Version written into [`IndexAsset`]; bump on incompatible changes.
pub const ASSET_VERSION: u32 = 1;

const TITLE_WEIGHT: f64 = 5.0;
const EXCERPT_WORDS: usize = 30;
const EXCERPT_LEAD: usize = 8;

/// One searchable document as stored in the index asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexRecord {
    pub doc_id: String,
    pub url: String,
    pub title: String,
    pub content: String,
    pub facets: EntryFacets,
}

impl IndexRecord {
    /// Record for `doc` with body text `content`.
    pub fn for_document(doc: &Document, content: String) -> Self {
        Self {
            doc_id: doc.identifier.clone(),
            url: format!("/documents/{}", doc.identifier),
            title: doc.title.clone(),
            content,
            facets: EntryFacets::for_document(doc.year, &doc.topic, &doc.language_code),
        }
    }
}

/// Serialized form of a pre-built index (`search-index.json`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexAsset {
    pub version: u32,
    pub records: Vec<IndexRecord>,
}

impl IndexAsset {
    pub fn new(records: Vec<IndexRecord>) -> Self {
        Self {
            version: ASSET_VERSION,
            records,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Posting {
    record: usize,
    weight: f64,
}

/// In-memory search index.
pub struct InMemoryIndex {
    records: Vec<IndexRecord>,
    postings: HashMap<String, Vec<Posting>>,
}

impl InMemoryIndex {
    pub fn new(records: Vec<IndexRecord>) -> Self {
        let mut postings: HashMap<String, Vec<Posting>> = HashMap::new();
        for (idx, record) in records.iter().enumerate() {
            let mut weights: HashMap<String, f64> = HashMap::new();
            for term in tokenize(&record.content) {
                *weights.entry(term).or_insert(0.0) += 1.0;
            }
            for term in tokenize(&record.title) {
                *weights.entry(term).or_insert(0.0) += TITLE_WEIGHT;
            }
            for (term, weight) in weights {
                postings.entry(term).or_default().push(Posting {
                    record: idx,
                    weight,
                });
            }
        }
        Self { records, postings }
    }

    pub fn from_asset(asset: IndexAsset) -> Result<Self> {
        if asset.version != ASSET_VERSION {
            anyhow::bail!(
                "unsupported search index version {} (expected {})",
                asset.version,
                ASSET_VERSION
            );
        }
        Ok(Self::new(asset.records))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Record weights for one query term. `prefix` also accepts any indexed
    /// term that starts with `term`.
    fn term_weights(&self, term: &str, prefix: bool) -> HashMap<usize, f64> {
        let mut out: HashMap<usize, f64> = HashMap::new();
        let mut add = |list: &Vec<Posting>| {
            for p in list {
                *out.entry(p.record).or_insert(0.0) += p.weight;
            }
        };
        if prefix {
            for (indexed, list) in &self.postings {
                if indexed.starts_with(term) {
                    add(list);
                }
            }
        } else if let Some(list) = self.postings.get(term) {
            add(list);
        }
        out
    }

    fn rank(&self, query: &str, facets: &Facets) -> (Vec<String>, Vec<(usize, f64)>) {
        let terms = query_terms(query);
        if terms.is_empty() {
            return (terms, Vec::new());
        }

        let last = terms.len() - 1;
        let mut scores: Option<HashMap<usize, f64>> = None;
        for (i, term) in terms.iter().enumerate() {
            let weights = self.term_weights(term, i == last);
            scores = Some(match scores {
                None => weights,
                Some(mut acc) => {
                    acc.retain(|record, _| weights.contains_key(record));
                    for (record, score) in acc.iter_mut() {
                        *score += weights[record];
                    }
                    acc
                }
            });
        }

        let mut ranked: Vec<(usize, f64)> = scores
            .unwrap_or_default()
            .into_iter()
            .filter(|(record, _)| facets.matches(&self.records[*record].facets))
            .collect();
        ranked.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(self.records[a.0].facets.year.cmp(&self.records[b.0].facets.year))
                .then(a.0.cmp(&b.0))
        });
        (terms, ranked)
    }
}

#[async_trait]
impl SearchBackend for InMemoryIndex {
    async fn init(&self) -> Result<()> {
        Ok(())
    }

    async fn search(&self, query: &str, facets: &Facets) -> Result<Vec<SearchHit>> {
        let (terms, ranked) = self.rank(query, facets);
        Ok(ranked
            .into_iter()
            .map(|(record, score)| SearchHit {
                id: record.to_string(),
                score,
                terms: terms.clone(),
            })
            .collect())
    }

    async fn entry(&self, hit: &SearchHit) -> Result<SearchIndexEntry> {
        let idx: usize = hit
            .id
            .parse()
            .with_context(|| format!("invalid hit id: {}", hit.id))?;
        let record = self
            .records
            .get(idx)
            .ok_or_else(|| anyhow!("no index entry for hit {}", hit.id))?;
        Ok(SearchIndexEntry {
            doc_id: Some(record.doc_id.clone()),
            url: record.url.clone(),
            title: record.title.clone(),
            excerpt: excerpt(&record.content, &hit.terms),
            facets: record.facets.clone(),
        })
    }

    async fn filters(&self) -> Result<FacetCounts> {
        let mut counts: FacetCounts = BTreeMap::new();
        for record in &self.records {
            let f = &record.facets;
            for (name, value) in [
                ("decade", &f.decade),
                ("topic", &f.topic),
                ("language", &f.language),
            ] {
                *counts
                    .entry(name.to_string())
                    .or_default()
                    .entry(value.clone())
                    .or_insert(0) += 1;
            }
        }
        Ok(counts)
    }
}

/// Byte ranges of the alphanumeric words in `text`.
fn word_spans(text: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut start: Option<usize> = None;
    for (i, c) in text.char_indices() {
        match (c.is_alphanumeric(), start) {
            (true, None) => start = Some(i),
            (false, Some(s)) => {
                spans.push((s, i));
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        spans.push((s, text.len()));
    }
    spans
}

/// Normalized (accent-stripped, lowercased) words of `text`.
pub fn tokenize(text: &str) -> Vec<String> {
    word_spans(text)
        .into_iter()
        .map(|(s, e)| collation_key(&text[s..e]))
        .collect()
}

/// Distinct query terms in typed order, with the final typed word moved to
/// the end. Only that last term matches as a prefix.
fn query_terms(query: &str) -> Vec<String> {
    let mut tokens = tokenize(query);
    let Some(last) = tokens.pop() else {
        return tokens;
    };
    let mut seen: HashSet<String> = HashSet::new();
    let mut terms: Vec<String> = tokens
        .into_iter()
        .filter(|t| *t != last && seen.insert(t.clone()))
        .collect();
    terms.push(last);
    terms
}

/// Same matching rule as ranking: exact for every term but the last, which
/// also matches as a prefix.
fn is_match(word: &str, terms: &[String]) -> bool {
    let Some((last, rest)) = terms.split_last() else {
        return false;
    };
    let folded = collation_key(word);
    folded.starts_with(last.as_str()) || rest.iter().any(|t| *t == folded)
}

fn collapse_whitespace(gap: &str) -> String {
    let mut out = String::with_capacity(gap.len());
    let mut in_space = false;
    for c in gap.chars() {
        if c.is_whitespace() {
            if !in_space {
                out.push(' ');
            }
            in_space = true;
        } else {
            out.push(c);
            in_space = false;
        }
    }
    out
}

/// A window of about [`EXCERPT_WORDS`] words around the first match, HTML
/// escaped, with matching words wrapped in `<mark>`.
fn excerpt(content: &str, terms: &[String]) -> String {
    let spans = word_spans(content);
    if spans.is_empty() {
        return String::new();
    }

    let first = spans
        .iter()
        .position(|&(s, e)| is_match(&content[s..e], terms))
        .unwrap_or(0);
    let start = first.saturating_sub(EXCERPT_LEAD);
    let end = (start + EXCERPT_WORDS).min(spans.len());

    let mut out = String::new();
    if start > 0 {
        out.push('…');
    }
    let mut cursor = spans[start].0;
    for &(s, e) in &spans[start..end] {
        out.push_str(&html_escape(&collapse_whitespace(&content[cursor..s])));
        let word = &content[s..e];
        if is_match(word, terms) {
            out.push_str("<mark>");
            out.push_str(&html_escape(word));
            out.push_str("</mark>");
        } else {
            out.push_str(&html_escape(word));
        }
        cursor = e;
    }
    if end < spans.len() {
        out.push('…');
    }
    out
}
