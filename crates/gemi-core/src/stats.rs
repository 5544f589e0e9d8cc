//! Corpus aggregation.
//!
//! Derives the counts and distinct-value lists shown on the home, decade,
//! topic and language pages from the loaded [`Document`] collection.
//! Everything here is a pure function of its input slice; callers may cache
//! the result per corpus generation but never need to.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::models::{language_name, topic_label, Document};

/// Maximum length of [`CorpusStats::recent_documents`].
pub const RECENT_LIMIT: usize = 10;

/// The centuries the browse pages present as first-class buckets.
///
/// Documents outside this range still get a `by_century` entry of their own;
/// the UI simply lists these four first.
pub const CENTURY_BUCKETS: [i32; 4] = [17, 18, 19, 20];

/// Aggregate view over the whole corpus.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CorpusStats {
    pub total_documents: usize,
    /// Smallest year in the corpus, `0` when empty.
    pub min_year: i32,
    /// Largest year in the corpus, `0` when empty.
    pub max_year: i32,
    pub languages: Vec<String>,
    pub topics: Vec<String>,
    /// Distinct decades, ascending. Always equals the keys of `by_decade`.
    pub decades: Vec<i32>,
    pub by_century: BTreeMap<i32, usize>,
    pub by_decade: BTreeMap<i32, usize>,
    pub by_topic: BTreeMap<String, usize>,
    pub by_language: BTreeMap<String, usize>,
    pub recent_documents: Vec<Document>,
}

/// Compute [`CorpusStats`] in a single pass over `documents`.
///
/// An empty slice yields `CorpusStats::default()`.
pub fn compute_stats(documents: &[Document]) -> CorpusStats {
    if documents.is_empty() {
        return CorpusStats::default();
    }

    let mut stats = CorpusStats {
        total_documents: documents.len(),
        min_year: i32::MAX,
        max_year: i32::MIN,
        ..CorpusStats::default()
    };

    for doc in documents {
        stats.min_year = stats.min_year.min(doc.year);
        stats.max_year = stats.max_year.max(doc.year);
        *stats.by_decade.entry(doc.decade()).or_insert(0) += 1;
        *stats.by_century.entry(doc.century()).or_insert(0) += 1;
        *stats.by_topic.entry(doc.topic.clone()).or_insert(0) += 1;
        *stats
            .by_language
            .entry(doc.language_code.clone())
            .or_insert(0) += 1;
    }

    // BTreeMap keys are already sorted: decades numerically, codes lexically.
    stats.decades = stats.by_decade.keys().copied().collect();
    stats.topics = stats.by_topic.keys().cloned().collect();
    stats.languages = stats.by_language.keys().cloned().collect();
    stats.recent_documents = recent_documents(documents, RECENT_LIMIT);

    stats
}

/// The `limit` most recently added documents.
///
/// Sorted by `added_at` descending using string comparison (ISO-8601 sorts
/// lexically). Documents without `added_at` rank as the earliest possible
/// value and keep their natural order among themselves.
pub fn recent_documents(documents: &[Document], limit: usize) -> Vec<Document> {
    let mut refs: Vec<&Document> = documents.iter().collect();
    // `None < Some(_)`, so reversing the comparison puts missing values last.
    refs.sort_by(|a, b| b.added_at.cmp(&a.added_at));
    refs.into_iter().take(limit).cloned().collect()
}

/// Per-decade entry for the decades index page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecadeSummary {
    pub decade: i32,
    pub count: usize,
    pub topics: Vec<String>,
}

/// Per-topic entry for the topics index page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopicSummary {
    pub code: String,
    pub label: String,
    pub count: usize,
    pub first_year: i32,
    pub last_year: i32,
}

/// Per-language entry for the languages index page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LanguageSummary {
    pub code: String,
    pub name: String,
    pub count: usize,
    pub first_year: i32,
    pub last_year: i32,
}

/// Decades in ascending order with the topics each one covers.
pub fn decade_summaries(documents: &[Document]) -> Vec<DecadeSummary> {
    let mut map: BTreeMap<i32, (usize, BTreeSet<&str>)> = BTreeMap::new();
    for doc in documents {
        let entry = map.entry(doc.decade()).or_default();
        entry.0 += 1;
        entry.1.insert(doc.topic.as_str());
    }
    map.into_iter()
        .map(|(decade, (count, topics))| DecadeSummary {
            decade,
            count,
            topics: topics.into_iter().map(str::to_string).collect(),
        })
        .collect()
}

/// Topics ordered by document count (desc), then code.
pub fn topic_summaries(documents: &[Document]) -> Vec<TopicSummary> {
    let spans = year_spans(documents, |d| d.topic.as_str());
    let mut out: Vec<TopicSummary> = spans
        .into_iter()
        .map(|(code, (count, first_year, last_year))| TopicSummary {
            label: topic_label(code).to_string(),
            code: code.to_string(),
            count,
            first_year,
            last_year,
        })
        .collect();
    out.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.code.cmp(&b.code)));
    out
}

/// Languages ordered by document count (desc), then code.
pub fn language_summaries(documents: &[Document]) -> Vec<LanguageSummary> {
    let spans = year_spans(documents, |d| d.language_code.as_str());
    let mut out: Vec<LanguageSummary> = spans
        .into_iter()
        .map(|(code, (count, first_year, last_year))| LanguageSummary {
            name: language_name(code).to_string(),
            code: code.to_string(),
            count,
            first_year,
            last_year,
        })
        .collect();
    out.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.code.cmp(&b.code)));
    out
}

fn year_spans<'a, F>(documents: &'a [Document], key: F) -> BTreeMap<&'a str, (usize, i32, i32)>
where
    F: Fn(&'a Document) -> &'a str,
{
    let mut map: BTreeMap<&str, (usize, i32, i32)> = BTreeMap::new();
    for doc in documents {
        let entry = map.entry(key(doc)).or_insert((0, doc.year, doc.year));
        entry.0 += 1;
        entry.1 = entry.1.min(doc.year);
        entry.2 = entry.2.max(doc.year);
    }
    map
}
