mod common;

use std::path::Path;
use std::process::Command;

use common::setup_archive;

fn run_gemi(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = env!("CARGO_BIN_EXE_gemi");
    let output = Command::new(binary)
        .arg("--config")
        .arg(config_path)
        .args(args)
        .env_remove("GEMI_STORAGE_URL")
        .env("RUST_LOG", "warn")
        .output()
        .unwrap_or_else(|e| panic!("Failed to run gemi binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

#[test]
fn test_stats() {
    let fx = setup_archive();
    let (stdout, stderr, success) = run_gemi(&fx.config_path, &["stats"]);
    assert!(success, "stats failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("Documents:    5"));
    assert!(stdout.contains("1738 – 1950"));
    assert!(stdout.contains("19th c."));
    assert!(stdout.contains("Calculating Machines"));
    assert!(stdout.contains("2024-03-01"));
}

#[test]
fn test_stats_with_missing_corpus() {
    let fx = setup_archive();
    std::fs::remove_file(&fx.config.data.corpus_index).unwrap();
    let (stdout, _, success) = run_gemi(&fx.config_path, &["stats"]);
    assert!(success);
    assert!(stdout.contains("Documents:    0"));
}

#[test]
fn test_list_sorted_by_size() {
    let fx = setup_archive();
    let (stdout, stderr, success) = run_gemi(&fx.config_path, &["list", "--sort", "size"]);
    assert!(success, "list failed: {}", stderr);

    let turing = stdout.find("turing_1950").unwrap();
    let wiener = stdout.find("wiener_1948").unwrap();
    let babbage = stdout.find("babbage_1864").unwrap();
    assert!(turing < wiener && wiener < babbage);
    assert!(stdout.contains("5 document(s), sorted by size"));
}

#[test]
fn test_list_filtered() {
    let fx = setup_archive();
    let (stdout, _, success) = run_gemi(&fx.config_path, &["list", "--language", "de"]);
    assert!(success);
    assert!(stdout.contains("rechenmaschinen_1892"));
    assert!(!stdout.contains("babbage_1864"));

    let (stdout, _, success) = run_gemi(&fx.config_path, &["list", "--topic", "alchemy"]);
    assert!(success);
    assert!(stdout.contains("No documents."));
}

#[test]
fn test_list_rejects_unknown_sort() {
    let fx = setup_archive();
    let (_, stderr, success) = run_gemi(&fx.config_path, &["list", "--sort", "color"]);
    assert!(!success);
    assert!(stderr.contains("color"));
}

#[test]
fn test_show_with_translation() {
    let fx = setup_archive();
    let (stdout, stderr, success) = run_gemi(
        &fx.config_path,
        &["show", "vaucanson_1738", "--translation"],
    );
    assert!(success, "show failed: {}", stderr);
    assert!(stdout.contains("Le mécanisme du flûteur automate"));
    assert!(stdout.contains("French"));
    assert!(stdout.contains("The automaton flute player"));
}

#[test]
fn test_show_unknown_document_fails() {
    let fx = setup_archive();
    let (_, stderr, success) = run_gemi(&fx.config_path, &["show", "nobody_1999"]);
    assert!(!success);
    assert!(stderr.contains("No document with identifier: nobody_1999"));
}

#[test]
fn test_build_index_then_search() {
    let fx = setup_archive();
    let (_, stderr, success) = run_gemi(&fx.config_path, &["build-index"]);
    assert!(success, "build-index failed: {}", stderr);
    assert!(stderr.contains("Indexed 5 documents (0 without text)"));
    assert!(fx.search_index_path().exists());

    let (stdout, stderr, success) = run_gemi(&fx.config_path, &["search", "engine"]);
    assert!(success, "search failed: {}", stderr);
    assert!(stdout.starts_with("1. Passages from the Life of a Philosopher"));
    assert!(stdout.contains("id: turing_1950"));
    assert!(stdout.contains("[Engine]"));

    let (stdout, _, success) = run_gemi(
        &fx.config_path,
        &["search", "engine", "--decade", "1860s"],
    );
    assert!(success);
    assert!(stdout.contains("id: babbage_1864"));
    assert!(!stdout.contains("turing_1950"));

    let (stdout, _, success) = run_gemi(&fx.config_path, &["search", "zeppelin"]);
    assert!(success);
    assert!(stdout.contains("No results."));
}

#[test]
fn test_search_blank_query() {
    let fx = setup_archive();
    // No index on disk; a blank query never needs one.
    let (stdout, _, success) = run_gemi(&fx.config_path, &["search", "  "]);
    assert!(success);
    assert!(stdout.contains("No results."));
}

#[test]
fn test_search_without_index_fails() {
    let fx = setup_archive();
    let (_, stderr, success) = run_gemi(&fx.config_path, &["search", "engine"]);
    assert!(!success);
    assert!(stderr.contains("search unavailable"));
}

#[test]
fn test_quotes_by_tag() {
    let fx = setup_archive();
    let (stdout, stderr, success) = run_gemi(
        &fx.config_path,
        &["quotes", "--tag", "machine", "--sort", "newest"],
    );
    assert!(success, "quotes failed: {}", stderr);
    let think = stdout.find("Can machines think?").unwrap();
    let orphan = stdout.find("An orphan <quote>").unwrap();
    assert!(think < orphan);
    assert!(stdout.contains("Lost Pamphlet"));
    assert!(!stdout.contains("automate"));
    assert!(!stdout.contains("Tags:"));
}

#[test]
fn test_quotes_tag_cloud() {
    let fx = setup_archive();
    let (stdout, _, success) = run_gemi(&fx.config_path, &["quotes"]);
    assert!(success);
    assert!(stdout.contains("Tags: machine (2)"));
}

#[test]
fn test_drift() {
    let fx = setup_archive();
    let (stdout, stderr, success) = run_gemi(
        &fx.config_path,
        &["drift", "machine", "--selected", "1950s"],
    );
    assert!(success, "drift failed: {}", stderr);
    assert!(stdout.contains("Semantic drift of \"machine\""));
    assert!(stdout.contains("variants: machine, machines"));
    assert!(stdout.contains("path: M 40.0 40.0"));
    assert!(stdout.contains("Examples from 1950s:"));
    assert!(stdout.contains("can a machine think"));
}

#[test]
fn test_drift_unknown_term() {
    let fx = setup_archive();
    let (_, stderr, success) = run_gemi(&fx.config_path, &["drift", "cogwheel"]);
    assert!(!success);
    assert!(stderr.contains("Known terms: automaton, machine"));
}

#[test]
fn test_completions() {
    let fx = setup_archive();
    let (stdout, _, success) = run_gemi(&fx.config_path, &["completions", "bash"]);
    assert!(success);
    assert!(stdout.contains("gemi"));
}
