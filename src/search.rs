//! `gemi search`: query the pre-built search index from the command line.

use anyhow::{bail, Result};

use gemi_core::search::Facets;

use crate::config::Config;
use crate::repository::Archive;
use crate::search_client::SearchIndexClient;
use crate::search_index::AssetIndex;

pub async fn run_search(config: &Config, query: &str, facets: Facets) -> Result<()> {
    if query.trim().is_empty() {
        println!("No results.");
        return Ok(());
    }

    let client = SearchIndexClient::from_config(
        AssetIndex::new(config.search.index.clone()),
        &config.search,
    );
    if let Err(e) = client.ensure_loaded().await {
        bail!("{}", e);
    }

    let archive = Archive::new(&config.data);
    let known = archive.identifiers().await?;
    let known = (!known.is_empty()).then_some(known);

    let results = client.query(query, &facets, known.as_deref()).await?;
    if results.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for (i, r) in results.iter().enumerate() {
        println!(
            "{}. {} ({}) [{} / {}]",
            i + 1,
            r.title,
            r.year,
            r.topic,
            r.language
        );
        println!("    id: {}", r.doc_id);
        println!("    {}", plain_excerpt(&r.excerpt));
        println!();
    }
    Ok(())
}

/// Excerpt HTML as terminal text: `<mark>` becomes `[...]`, entities decode.
fn plain_excerpt(html: &str) -> String {
    html.replace("<mark>", "[")
        .replace("</mark>", "]")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_excerpt() {
        assert_eq!(
            plain_excerpt("the <mark>engine</mark> &amp; &lt;loom&gt;"),
            "the [engine] & <loom>"
        );
    }
}
