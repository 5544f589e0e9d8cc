//! Quote browser: tag filtering and sorting over the curated quotes.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::str::FromStr;

use crate::markup::render_emphasis;
use crate::models::{Document, Quote};

/// Sort order for the quote browser.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuoteSort {
    #[default]
    Oldest,
    Newest,
    /// Language code ascending, then year ascending.
    Language,
}

impl FromStr for QuoteSort {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "oldest" => Ok(QuoteSort::Oldest),
            "newest" => Ok(QuoteSort::Newest),
            "language" => Ok(QuoteSort::Language),
            other => bail!("Unknown quote sort: {}. Use oldest, newest, or language.", other),
        }
    }
}

/// The set of tags selected in the tag cloud.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagSelection {
    tags: BTreeSet<String>,
}

impl TagSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip `tag`: select it if absent, deselect it if present.
    pub fn toggle(&mut self, tag: &str) {
        if !self.tags.remove(tag) {
            self.tags.insert(tag.to_string());
        }
    }

    pub fn is_selected(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().map(String::as_str)
    }

    /// True when nothing is selected or the quote carries a selected tag.
    pub fn admits(&self, quote: &Quote) -> bool {
        self.tags.is_empty() || quote.tags.iter().any(|t| self.tags.contains(t))
    }
}

impl<S: Into<String>> FromIterator<S> for TagSelection {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            tags: iter
                .into_iter()
                .map(Into::into)
                .filter(|t: &String| !t.is_empty())
                .collect(),
        }
    }
}

/// Quotes whose tags intersect `selected` (all quotes when empty), sorted
/// by `mode`. Sorting is stable.
pub fn filter_and_sort(quotes: &[Quote], selected: &TagSelection, mode: QuoteSort) -> Vec<Quote> {
    let mut out: Vec<Quote> = quotes
        .iter()
        .filter(|q| selected.admits(q))
        .cloned()
        .collect();

    match mode {
        QuoteSort::Oldest => out.sort_by_key(|q| q.year),
        QuoteSort::Newest => out.sort_by(|a, b| b.year.cmp(&a.year)),
        QuoteSort::Language => out.sort_by(|a, b| {
            a.language_code
                .cmp(&b.language_code)
                .then_with(|| a.year.cmp(&b.year))
        }),
    }

    out
}

/// A tag and the number of quotes carrying it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagCount {
    pub tag: String,
    pub count: usize,
}

/// All tags in use, most frequent first, then alphabetical.
pub fn tag_counts(quotes: &[Quote]) -> Vec<TagCount> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for q in quotes {
        // A quote listing a tag twice still counts once.
        let unique: BTreeSet<&str> = q.tags.iter().map(String::as_str).collect();
        for tag in unique {
            *counts.entry(tag).or_insert(0) += 1;
        }
    }
    let mut out: Vec<TagCount> = counts
        .into_iter()
        .map(|(tag, count)| TagCount {
            tag: tag.to_string(),
            count,
        })
        .collect();
    out.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.tag.cmp(&b.tag)));
    out
}

/// A quote prepared for display: rendered HTML plus its source document
/// when the back-reference resolves.
#[derive(Debug, Clone, Serialize)]
pub struct QuoteCard {
    #[serde(flatten)]
    pub quote: Quote,
    pub html: String,
    /// `None` when `doc_id` names no document in the corpus.
    pub document_title: Option<String>,
    pub document_link: Option<String>,
}

/// Render quotes and resolve their document back-references.
///
/// Unresolvable `doc_id`s are tolerated: the card falls back to the quote's
/// own `source_title` and carries no link.
pub fn quote_cards(quotes: &[Quote], documents: &[Document]) -> Vec<QuoteCard> {
    let by_id: HashMap<&str, &Document> = documents
        .iter()
        .map(|d| (d.identifier.as_str(), d))
        .collect();

    quotes
        .iter()
        .map(|q| {
            let doc = by_id.get(q.doc_id.as_str());
            QuoteCard {
                html: render_emphasis(&q.text),
                document_title: doc
                    .map(|d| d.title.clone())
                    .or_else(|| q.source_title.clone()),
                document_link: doc.map(|d| format!("/documents/{}", d.identifier)),
                quote: q.clone(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_quote(id: &str, tags: &[&str], year: i32, lang: &str) -> Quote {
        Quote {
            id: id.to_string(),
            doc_id: format!("doc-{}", id),
            text: format!("quote {}", id),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            year,
            language_code: lang.to_string(),
            topic: None,
            page: None,
            source_title: None,
        }
    }

    fn sample() -> Vec<Quote> {
        vec![
            make_quote("q1", &["mind", "machine"], 1843, "en"),
            make_quote("q2", &["soul"], 1748, "fr"),
            make_quote("q3", &["machine"], 1950, "en"),
            make_quote("q4", &["memory"], 1890, "de"),
            make_quote("q5", &[], 1820, "de"),
        ]
    }

    fn ids(quotes: &[Quote]) -> Vec<&str> {
        quotes.iter().map(|q| q.id.as_str()).collect()
    }

    #[test]
    fn test_empty_selection_keeps_all() {
        let quotes = sample();
        let out = filter_and_sort(&quotes, &TagSelection::new(), QuoteSort::Oldest);
        assert_eq!(ids(&out), vec!["q2", "q5", "q1", "q4", "q3"]);
    }

    #[test]
    fn test_tag_filter_is_union() {
        let quotes = sample();
        let selected: TagSelection = ["machine", "soul"].into_iter().collect();
        let out = filter_and_sort(&quotes, &selected, QuoteSort::Newest);
        assert_eq!(ids(&out), vec!["q3", "q1", "q2"]);
    }

    #[test]
    fn test_language_sort_is_two_key() {
        let quotes = sample();
        let out = filter_and_sort(&quotes, &TagSelection::new(), QuoteSort::Language);
        assert_eq!(ids(&out), vec!["q5", "q4", "q1", "q3", "q2"]);
    }

    #[test]
    fn test_toggle_is_involution() {
        let mut selected = TagSelection::new();
        selected.toggle("machine");
        assert!(selected.is_selected("machine"));
        selected.toggle("machine");
        assert!(selected.is_empty());
    }

    #[test]
    fn test_tag_counts() {
        let mut quotes = sample();
        quotes[2].tags.push("machine".to_string());
        let counts = tag_counts(&quotes);
        assert_eq!(
            counts[0],
            TagCount {
                tag: "machine".to_string(),
                count: 2
            }
        );
        assert_eq!(counts.len(), 4);
        assert_eq!(counts[1].tag, "memory");
    }

    #[test]
    fn test_cards_tolerate_missing_documents() {
        let mut quotes = sample();
        quotes[0].text = "the **engine**".to_string();
        quotes[1].source_title = Some("L'Homme Machine".to_string());
        let docs: Vec<Document> = serde_json::from_str(
            r#"[{"identifier": "doc-q1", "title": "Sketch of the Analytical Engine",
                 "year": 1843, "topic": "calculating_machines"}]"#,
        )
        .unwrap();

        let cards = quote_cards(&quotes, &docs);
        assert_eq!(cards[0].html, "the <em>engine</em>");
        assert_eq!(cards[0].document_link.as_deref(), Some("/documents/doc-q1"));
        assert_eq!(cards[1].document_link, None);
        assert_eq!(cards[1].document_title.as_deref(), Some("L'Homme Machine"));
        assert_eq!(cards[2].document_title, None);
    }

    #[test]
    fn test_sort_parse() {
        assert_eq!("language".parse::<QuoteSort>().unwrap(), QuoteSort::Language);
        assert!("alphabetical".parse::<QuoteSort>().is_err());
    }
}
