//! Corpus statistics overview.
//!
//! Used by `gemi stats` to show what the corpus index holds: totals, year
//! range, and breakdowns by century, topic and language.

use anyhow::Result;

use gemi_core::models::{language_name, topic_label};
use gemi_core::stats::CENTURY_BUCKETS;

use crate::config::Config;
use crate::repository::Archive;

/// Run the stats command: load the corpus and print a summary.
pub async fn run_stats(config: &Config) -> Result<()> {
    let archive = Archive::new(&config.data);
    let stats = archive.stats().await?;
    let index_size = std::fs::metadata(archive.corpus.path())
        .map(|m| m.len())
        .unwrap_or(0);

    println!("GEMI Archive — Corpus Stats");
    println!("===========================");
    println!();
    println!("  Corpus index: {}", archive.corpus.path().display());
    println!("  Size:         {}", format_bytes(index_size));
    println!();
    println!("  Documents:    {}", stats.total_documents);
    if stats.total_documents == 0 {
        println!();
        return Ok(());
    }
    println!("  Years:        {} – {}", stats.min_year, stats.max_year);
    println!("  Decades:      {}", stats.decades.len());

    println!();
    println!("  By century:");
    for century in CENTURY_BUCKETS {
        let count = stats.by_century.get(&century).copied().unwrap_or(0);
        println!("    {:<8} {:>6}", ordinal_century(century), count);
    }
    for (century, count) in &stats.by_century {
        if !CENTURY_BUCKETS.contains(century) {
            println!("    {:<8} {:>6}", ordinal_century(*century), count);
        }
    }

    println!();
    println!("  {:<24} {:>6}", "TOPIC", "DOCS");
    println!("  {}", "-".repeat(31));
    for (topic, count) in &stats.by_topic {
        println!("  {:<24} {:>6}", topic_label(topic), count);
    }

    println!();
    println!("  {:<24} {:>6}", "LANGUAGE", "DOCS");
    println!("  {}", "-".repeat(31));
    for (code, count) in &stats.by_language {
        println!("  {:<24} {:>6}", language_name(code), count);
    }

    if !stats.recent_documents.is_empty() {
        println!();
        println!("  Recently added:");
        for doc in &stats.recent_documents {
            println!(
                "    {}  {} ({})",
                doc.added_at.as_deref().map(format_added).unwrap_or_else(|| "-".to_string()),
                doc.title,
                doc.year
            );
        }
    }

    println!();
    Ok(())
}

/// `19` → `"19th c."`.
fn ordinal_century(century: i32) -> String {
    let suffix = match (century.rem_euclid(100), century.rem_euclid(10)) {
        (11..=13, _) => "th",
        (_, 1) => "st",
        (_, 2) => "nd",
        (_, 3) => "rd",
        _ => "th",
    };
    format!("{}{} c.", century, suffix)
}

/// Date part of an ISO-8601 timestamp, or the raw value if it doesn't parse.
fn format_added(raw: &str) -> String {
    chrono::DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .or_else(|_| chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d").map(|d| d.to_string()))
        .unwrap_or_else(|_| raw.to_string())
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordinal_century() {
        assert_eq!(ordinal_century(19), "19th c.");
        assert_eq!(ordinal_century(21), "21st c.");
        assert_eq!(ordinal_century(11), "11th c.");
        assert_eq!(ordinal_century(2), "2nd c.");
    }

    #[test]
    fn test_format_added() {
        assert_eq!(format_added("2024-03-01T10:00:00Z"), "2024-03-01");
        assert_eq!(format_added("2024-03-01"), "2024-03-01");
        assert_eq!(format_added("last week"), "last week");
    }
}
