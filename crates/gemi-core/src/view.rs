//! Filtered and sorted document views for the browse pages.
//!
//! [`derive_view`] is a pure function of its inputs: the caller re-runs it
//! whenever the filter or sort selection changes, and the same inputs always
//! yield the same order.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::models::Document;

/// Equality constraints on the document list. `None` or an empty string
/// means "no constraint".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentFilters {
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub topic: Option<String>,
}

impl DocumentFilters {
    pub fn matches(&self, doc: &Document) -> bool {
        active(&self.language).map_or(true, |l| doc.language_code == l)
            && active(&self.topic).map_or(true, |t| doc.topic == t)
    }
}

fn active(filter: &Option<String>) -> Option<&str> {
    filter.as_deref().filter(|v| !v.is_empty())
}

/// Sort order for the documents list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortMode {
    #[default]
    YearAsc,
    YearDesc,
    Title,
    Size,
}

impl FromStr for SortMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "year-asc" | "year" => Ok(SortMode::YearAsc),
            "year-desc" => Ok(SortMode::YearDesc),
            "title" => Ok(SortMode::Title),
            "size" => Ok(SortMode::Size),
            other => bail!(
                "Unknown sort mode: {}. Use year-asc, year-desc, title, or size.",
                other
            ),
        }
    }
}

impl fmt::Display for SortMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SortMode::YearAsc => "year-asc",
            SortMode::YearDesc => "year-desc",
            SortMode::Title => "title",
            SortMode::Size => "size",
        })
    }
}

/// Apply `filters` (AND) and then `sort` to `documents`.
///
/// The input is never mutated. All sorts are stable, so equal keys keep
/// their input order.
pub fn derive_view(documents: &[Document], filters: &DocumentFilters, sort: SortMode) -> Vec<Document> {
    let mut view: Vec<Document> = documents
        .iter()
        .filter(|d| filters.matches(d))
        .cloned()
        .collect();

    match sort {
        SortMode::YearAsc => view.sort_by_key(|d| d.year),
        SortMode::YearDesc => view.sort_by(|a, b| b.year.cmp(&a.year)),
        SortMode::Title => {
            // Compute each key once; titles can be long.
            let mut keyed: Vec<(String, Document)> =
                view.into_iter().map(|d| (collation_key(&d.title), d)).collect();
            keyed.sort_by(|(ka, a), (kb, b)| compare_titles(ka, &a.title, kb, &b.title));
            view = keyed.into_iter().map(|(_, d)| d).collect();
        }
        SortMode::Size => view.sort_by(|a, b| b.char_count.cmp(&a.char_count)),
    }

    view
}

/// Locale-style collation key: accents stripped, case folded.
///
/// "Élan" and "elan" share a key, so accented titles sort next to their
/// unaccented neighbours instead of after `z`.
pub fn collation_key(title: &str) -> String {
    title
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect()
}

fn compare_titles(key_a: &str, raw_a: &str, key_b: &str, raw_b: &str) -> Ordering {
    key_a.cmp(key_b).then_with(|| raw_a.cmp(raw_b))
}

/// Documents from `decade` (e.g. `1850`), year ascending.
pub fn documents_in_decade(documents: &[Document], decade: i32) -> Vec<Document> {
    let mut out: Vec<Document> = documents
        .iter()
        .filter(|d| d.decade() == decade)
        .cloned()
        .collect();
    out.sort_by_key(|d| d.year);
    out
}

/// Documents with topic `topic`, year ascending.
pub fn documents_with_topic(documents: &[Document], topic: &str) -> Vec<Document> {
    let filters = DocumentFilters {
        topic: Some(topic.to_string()),
        ..Default::default()
    };
    derive_view(documents, &filters, SortMode::YearAsc)
}

/// Documents in language `code`, year ascending.
pub fn documents_in_language(documents: &[Document], code: &str) -> Vec<Document> {
    let filters = DocumentFilters {
        language: Some(code.to_string()),
        ..Default::default()
    };
    derive_view(documents, &filters, SortMode::YearAsc)
}

/// Look up a document by identifier.
pub fn find_document<'a>(documents: &'a [Document], identifier: &str) -> Option<&'a Document> {
    documents.iter().find(|d| d.identifier == identifier)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_doc(id: &str, title: &str, year: i32, topic: &str, lang: &str, chars: u64) -> Document {
        Document {
            identifier: id.to_string(),
            title: title.to_string(),
            year,
            publication_year: None,
            gutenberg_release_year: None,
            year_source: None,
            creator: None,
            description: None,
            topic: topic.to_string(),
            language_code: lang.to_string(),
            language: None,
            source_url: None,
            source: None,
            char_count: chars,
            filename: None,
            has_translation: false,
            translation_filename: None,
            added_at: None,
        }
    }

    fn sample() -> Vec<Document> {
        vec![
            make_doc("doc1", "Zur Theorie", 1850, "automata", "en", 5000),
            make_doc("doc2", "Über Rechenmaschinen", 1920, "computing", "de", 12000),
            make_doc("doc3", "analytical engine", 1843, "calculating_machines", "en", 800),
            make_doc("doc4", "Automates", 1850, "automata", "fr", 3000),
            make_doc("doc5", "Babbage", 1864, "calculating_machines", "en", 12000),
        ]
    }

    fn ids(docs: &[Document]) -> Vec<&str> {
        docs.iter().map(|d| d.identifier.as_str()).collect()
    }

    #[test]
    fn test_size_scenario() {
        let docs = vec![
            make_doc("doc1", "A", 1850, "automata", "en", 5000),
            make_doc("doc2", "B", 1920, "computing", "de", 12000),
        ];
        let view = derive_view(&docs, &DocumentFilters::default(), SortMode::Size);
        assert_eq!(ids(&view), vec!["doc2", "doc1"]);
    }

    #[test]
    fn test_no_filter_is_permutation() {
        let docs = sample();
        for mode in [SortMode::YearAsc, SortMode::YearDesc, SortMode::Title, SortMode::Size] {
            let view = derive_view(&docs, &DocumentFilters::default(), mode);
            let mut got = ids(&view);
            let mut want = ids(&docs);
            got.sort();
            want.sort();
            assert_eq!(got, want, "mode {} dropped records", mode);
        }
    }

    #[test]
    fn test_year_sorts_are_stable_and_idempotent() {
        let docs = sample();
        let once = derive_view(&docs, &DocumentFilters::default(), SortMode::YearAsc);
        assert_eq!(ids(&once), vec!["doc3", "doc1", "doc4", "doc5", "doc2"]);
        let twice = derive_view(&once, &DocumentFilters::default(), SortMode::YearAsc);
        assert_eq!(ids(&once), ids(&twice));

        let desc = derive_view(&docs, &DocumentFilters::default(), SortMode::YearDesc);
        assert_eq!(ids(&desc), vec!["doc2", "doc5", "doc1", "doc4", "doc3"]);
    }

    #[test]
    fn test_title_sort_ignores_accents_and_case() {
        let docs = sample();
        let view = derive_view(&docs, &DocumentFilters::default(), SortMode::Title);
        assert_eq!(ids(&view), vec!["doc3", "doc4", "doc5", "doc2", "doc1"]);
    }

    #[test]
    fn test_filters_compose_with_and() {
        let docs = sample();
        let filters = DocumentFilters {
            language: Some("en".to_string()),
            topic: Some("calculating_machines".to_string()),
        };
        let view = derive_view(&docs, &filters, SortMode::YearAsc);
        assert_eq!(ids(&view), vec!["doc3", "doc5"]);
    }

    #[test]
    fn test_empty_filter_means_unconstrained() {
        let docs = sample();
        let filters = DocumentFilters {
            language: Some(String::new()),
            topic: None,
        };
        assert_eq!(derive_view(&docs, &filters, SortMode::YearAsc).len(), docs.len());
    }

    #[test]
    fn test_unknown_language_yields_empty() {
        let docs = sample();
        let filters = DocumentFilters {
            language: Some("ja".to_string()),
            topic: None,
        };
        assert!(derive_view(&docs, &filters, SortMode::Title).is_empty());
    }

    #[test]
    fn test_input_not_mutated() {
        let docs = sample();
        let before = docs.clone();
        let _ = derive_view(&docs, &DocumentFilters::default(), SortMode::Size);
        assert_eq!(docs, before);
    }

    #[test]
    fn test_sort_mode_parse() {
        assert_eq!("year-desc".parse::<SortMode>().unwrap(), SortMode::YearDesc);
        assert_eq!("size".parse::<SortMode>().unwrap(), SortMode::Size);
        assert!("random".parse::<SortMode>().is_err());
        assert_eq!(SortMode::Title.to_string(), "title");
    }

    #[test]
    fn test_browse_helpers() {
        let docs = sample();
        assert_eq!(ids(&documents_in_decade(&docs, 1850)), vec!["doc1", "doc4"]);
        assert_eq!(ids(&documents_with_topic(&docs, "automata")), vec!["doc1", "doc4"]);
        assert_eq!(ids(&documents_in_language(&docs, "de")), vec!["doc2"]);
        assert!(find_document(&docs, "doc5").is_some());
        assert!(find_document(&docs, "missing").is_none());
    }
}
