//! Core data models for the GEMI archive.
//!
//! These types mirror the JSON assets produced by the corpus export step
//! (`corpus-index.json`, `quotes.json`) and are immutable once loaded.

use serde::{Deserialize, Deserializer, Serialize};

/// Topic codes used by the corpus builder, with display labels.
pub const TOPICS: &[(&str, &str)] = &[
    ("calculating_machines", "Calculating Machines"),
    ("automata", "Automata"),
    ("thinking_machines", "Thinking Machines"),
    ("computing", "Computing"),
    ("cybernetics", "Cybernetics"),
    ("automation", "Automation"),
];

/// Language codes present in the corpus, with display names.
pub const LANGUAGES: &[(&str, &str)] = &[
    ("en", "English"),
    ("de", "German"),
    ("fr", "French"),
    ("la", "Latin"),
    ("it", "Italian"),
    ("es", "Spanish"),
    ("nl", "Dutch"),
];

/// Display label for a topic code. Unknown codes are returned as-is.
pub fn topic_label(code: &str) -> &str {
    TOPICS
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, label)| *label)
        .unwrap_or(code)
}

/// Display name for a language code. Unknown codes are returned as-is.
pub fn language_name(code: &str) -> &str {
    LANGUAGES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, name)| *name)
        .unwrap_or(code)
}

/// Metadata record for a single archived text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Stable unique key; also the filename stem used by the search index.
    pub identifier: String,
    pub title: String,
    pub year: i32,
    #[serde(default)]
    pub publication_year: Option<i32>,
    #[serde(default)]
    pub gutenberg_release_year: Option<i32>,
    #[serde(default)]
    pub year_source: Option<String>,
    #[serde(default)]
    pub creator: Option<String>,
    /// Canonical description. The export step writes either a string or a
    /// list of strings; the first element of a list is kept.
    #[serde(default, deserialize_with = "deserialize_description")]
    pub description: Option<String>,
    pub topic: String,
    #[serde(default = "default_language_code")]
    pub language_code: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub source_url: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub char_count: u64,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub has_translation: bool,
    #[serde(default)]
    pub translation_filename: Option<String>,
    /// ISO-8601 timestamp of when the document entered the archive.
    #[serde(default)]
    pub added_at: Option<String>,
}

fn default_language_code() -> String {
    "en".to_string()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawDescription {
    One(String),
    Many(Vec<String>),
}

fn deserialize_description<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<RawDescription> = Option::deserialize(deserializer)?;
    let text = match raw {
        Some(RawDescription::One(s)) => Some(s),
        Some(RawDescription::Many(list)) => list.into_iter().next(),
        None => None,
    };
    Ok(text.filter(|s| !s.trim().is_empty()))
}

impl Document {
    /// Decade bucket: `floor(year / 10) * 10`.
    pub fn decade(&self) -> i32 {
        decade_of(self.year)
    }

    /// Ordinal century bucket: `floor(year / 100) + 1`, so 1850 is the 19th.
    pub fn century(&self) -> i32 {
        century_of(self.year)
    }

    /// Display label for this document's topic.
    pub fn topic_label(&self) -> &str {
        topic_label(&self.topic)
    }

    /// Display name for this document's language.
    pub fn language_name(&self) -> &str {
        match &self.language {
            Some(name) if !name.is_empty() => name,
            _ => language_name(&self.language_code),
        }
    }
}

/// Decade bucket for a year (floored, also for negative years).
pub fn decade_of(year: i32) -> i32 {
    year.div_euclid(10) * 10
}

/// Ordinal century for a year. Years `1800..=1899` fall in the 19th.
pub fn century_of(year: i32) -> i32 {
    year.div_euclid(100) + 1
}

/// A curated excerpt from a [`Document`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub id: String,
    /// Back-reference to [`Document::identifier`]. May not resolve.
    pub doc_id: String,
    /// Quote text; `**span**` marks an emphasized span.
    pub text: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub year: i32,
    #[serde(default = "default_language_code")]
    pub language_code: String,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub page: Option<String>,
    #[serde(default)]
    pub source_title: Option<String>,
}

impl Quote {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}
