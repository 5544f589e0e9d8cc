//! Browse commands: `gemi list`, `gemi show`, `gemi quotes`, `gemi drift`,
//! `gemi bio`.

use anyhow::{bail, Result};

use gemi_core::drift::{line_path, ChartLayout, DriftChart};
use gemi_core::markup::strip_emphasis;
use gemi_core::quotes::{filter_and_sort, tag_counts, QuoteSort, TagSelection};
use gemi_core::view::{derive_view, find_document, DocumentFilters, SortMode};

use crate::biography::BiographyClient;
use crate::config::Config;
use crate::repository::Archive;
use crate::texts::TextStore;

pub async fn run_list(config: &Config, filters: DocumentFilters, sort: SortMode) -> Result<()> {
    let archive = Archive::new(&config.data);
    let documents = archive.documents().await?;
    let view = derive_view(&documents, &filters, sort);

    if view.is_empty() {
        println!("No documents.");
        return Ok(());
    }

    println!(
        "{:<32} {:>6}  {:<4} {:<22} {:>9}  TITLE",
        "IDENTIFIER", "YEAR", "LANG", "TOPIC", "CHARS"
    );
    println!("{}", "-".repeat(100));
    for doc in &view {
        println!(
            "{:<32} {:>6}  {:<4} {:<22} {:>9}  {}",
            truncate(&doc.identifier, 32),
            doc.year,
            doc.language_code,
            doc.topic,
            doc.char_count,
            doc.title
        );
    }
    println!();
    println!("{} document(s), sorted by {}", view.len(), sort);
    Ok(())
}

/// Print one document's metadata, optionally followed by its text.
pub async fn run_show(config: &Config, id: &str, text: bool, translation: bool) -> Result<()> {
    let archive = Archive::new(&config.data);
    let documents = archive.documents().await?;
    let Some(doc) = find_document(&documents, id) else {
        bail!("No document with identifier: {}", id);
    };

    println!("── {} ──", doc.title);
    println!("identifier: {}", doc.identifier);
    println!("year:       {} ({}s, century {})", doc.year, doc.decade(), doc.century());
    if let Some(creator) = &doc.creator {
        println!("creator:    {}", creator);
    }
    println!("topic:      {}", doc.topic_label());
    println!("language:   {}", doc.language_name());
    if let Some(url) = &doc.source_url {
        println!("source:     {}", url);
    }
    println!("chars:      {}", doc.char_count);
    if let Some(description) = &doc.description {
        println!();
        println!("{}", description);
    }

    if text || translation {
        let store = TextStore::from_config(config);
        let body = if translation {
            store.translation_text(doc).await?
        } else {
            store.document_text(doc).await?
        };
        println!();
        println!("{}", body);
    }
    Ok(())
}

pub async fn run_quotes(config: &Config, tags: &[String], sort: QuoteSort) -> Result<()> {
    let archive = Archive::new(&config.data);
    let quotes = archive.quotes().await?;
    let documents = archive.documents().await?;

    let selected: TagSelection = tags.iter().map(String::as_str).collect();
    let shown = filter_and_sort(&quotes, &selected, sort);

    if shown.is_empty() {
        println!("No quotes.");
    }
    for q in &shown {
        let source = find_document(&documents, &q.doc_id)
            .map(|d| d.title.clone())
            .or_else(|| q.source_title.clone())
            .unwrap_or_else(|| q.doc_id.clone());
        println!("“{}”", strip_emphasis(&q.text));
        println!("    — {}, {} [{}]  #{}", source, q.year, q.language_code, q.tags.join(" #"));
        println!();
    }

    if selected.is_empty() {
        let cloud: Vec<String> = tag_counts(&quotes)
            .into_iter()
            .map(|t| format!("{} ({})", t.tag, t.count))
            .collect();
        if !cloud.is_empty() {
            println!("Tags: {}", cloud.join(", "));
        }
    }
    Ok(())
}

pub async fn run_drift(config: &Config, term: &str, selected: Option<&str>) -> Result<()> {
    let archive = Archive::new(&config.data);
    let report = archive.drift().await?;
    let Some(series) = report.term(term) else {
        let known: Vec<&str> = report.terms.keys().map(String::as_str).collect();
        if known.is_empty() {
            bail!("No drift data for term: {}", term);
        }
        bail!("No drift data for term: {}. Known terms: {}", term, known.join(", "));
    };

    let mut chart = DriftChart::new(term, series, ChartLayout::default());
    if let Some(decade) = selected {
        chart.select(decade);
    }

    println!("Semantic drift of \"{}\"", chart.term());
    if !series.variants.is_empty() {
        println!("  variants: {}", series.variants.join(", "));
    }
    println!();
    println!("  {:<8} {:>10} {:>10} {:>9}", "DECADE", "ORIGIN", "PREVIOUS", "CONTEXTS");
    for sample in &series.drift {
        println!(
            "  {:<8} {:>10.3} {:>10} {:>9}  {}",
            sample.decade,
            sample.similarity_to_origin,
            sample
                .similarity_to_previous
                .map(|v| format!("{:.3}", v))
                .unwrap_or_else(|| "-".to_string()),
            sample.num_contexts,
            bar(sample.similarity_to_origin)
        );
    }
    println!();
    println!("  path: {}", line_path(&chart.points()));

    if let Some(decade) = chart.selected() {
        println!();
        println!("  Examples from {}:", decade);
        for ex in chart.selected_examples() {
            println!("    “{}” ({}, {})", ex.text, ex.title, ex.year);
        }
    }
    Ok(())
}

pub async fn run_bio(config: &Config, name: &str) -> Result<()> {
    let client = BiographyClient::new(&config.biography);
    match client.lookup(name).await {
        Some(bio) => {
            println!("{}", bio.title);
            println!();
            println!("{}", bio.extract);
            if let Some(url) = bio.url {
                println!();
                println!("{}", url);
            }
        }
        None => println!("No biography found."),
    }
    Ok(())
}

fn bar(similarity: f64) -> String {
    let width = (similarity.clamp(0.0, 1.0) * 30.0).round() as usize;
    "█".repeat(width)
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
        out.push('…');
        out
    }
}
