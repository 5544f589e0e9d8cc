//! # GEMI Archive CLI (`gemi`)
//!
//! ## Usage
//!
//! ```bash
//! gemi --config ./config/gemi.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `gemi serve` | Start the JSON HTTP API |
//! | `gemi stats` | Corpus statistics |
//! | `gemi list` | List documents (filter by language/topic, sort) |
//! | `gemi show <id>` | Show one document, optionally with its text |
//! | `gemi search "<query>"` | Full-text search against the pre-built index |
//! | `gemi quotes` | Browse curated quotes by tag |
//! | `gemi drift <term>` | Semantic drift of a term across decades |
//! | `gemi bio "<name>"` | Look up an author biography |
//! | `gemi build-index` | Build the search index asset from the corpus |
//! | `gemi completions <shell>` | Print shell completions |
//!
//! ## Examples
//!
//! ```bash
//! gemi list --language de --sort year-desc
//! gemi search "analytical engine" --decade 1840s
//! gemi quotes --tag mind --tag mechanism --sort language
//! gemi drift machine --selected 1850s
//! ```
//!
//! Logging goes to stderr and is controlled with `RUST_LOG`.

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use gemi_core::quotes::QuoteSort;
use gemi_core::search::Facets;
use gemi_core::view::{DocumentFilters, SortMode};
use gemi_archive::{browse, config, search, search_index, server, stats};

/// GEMI archive: browse and search a corpus of historical texts on
/// calculating machines, automata and computing.
#[derive(Parser)]
#[command(name = "gemi", version, about)]
struct Cli {
    /// Path to configuration file (TOML). Missing file means defaults.
    #[arg(long, global = true, default_value = "./config/gemi.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the JSON HTTP API on `[server].bind`.
    Serve,

    /// Print corpus statistics.
    Stats,

    /// List documents.
    List {
        /// Language code, e.g. `en`, `de`.
        #[arg(long)]
        language: Option<String>,

        /// Topic code, e.g. `automata`.
        #[arg(long)]
        topic: Option<String>,

        /// year-asc, year-desc, title, or size.
        #[arg(long, default_value = "year-asc")]
        sort: SortMode,
    },

    /// Show a document's metadata.
    Show {
        id: String,

        /// Also print the full text.
        #[arg(long)]
        text: bool,

        /// Print the English translation instead of the original.
        #[arg(long, conflicts_with = "text")]
        translation: bool,
    },

    /// Full-text search.
    Search {
        query: String,

        /// Decade facet, e.g. `1850s`.
        #[arg(long)]
        decade: Option<String>,

        #[arg(long)]
        topic: Option<String>,

        #[arg(long)]
        language: Option<String>,
    },

    /// Browse curated quotes.
    Quotes {
        /// Show quotes carrying any of these tags (repeatable).
        #[arg(long = "tag")]
        tags: Vec<String>,

        /// oldest, newest, or language.
        #[arg(long, default_value = "oldest")]
        sort: QuoteSort,
    },

    /// Semantic drift of a term.
    Drift {
        term: String,

        /// Decade whose example citations to print, e.g. `1850s`.
        #[arg(long)]
        selected: Option<String>,
    },

    /// Look up an author biography.
    Bio { name: String },

    /// Build the search index asset from the corpus index and texts.
    BuildIndex {
        /// Output path. Defaults to `[search].index`.
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Print shell completions.
    Completions { shell: Shell },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    if let Commands::Completions { shell } = &cli.command {
        let mut command = Cli::command();
        generate(*shell, &mut command, "gemi", &mut std::io::stdout());
        return Ok(());
    }

    let cfg = config::load_config_or_default(&cli.config)?;

    match cli.command {
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
        Commands::Stats => {
            stats::run_stats(&cfg).await?;
        }
        Commands::List {
            language,
            topic,
            sort,
        } => {
            browse::run_list(&cfg, DocumentFilters { language, topic }, sort).await?;
        }
        Commands::Show {
            id,
            text,
            translation,
        } => {
            browse::run_show(&cfg, &id, text, translation).await?;
        }
        Commands::Search {
            query,
            decade,
            topic,
            language,
        } => {
            let facets = Facets {
                decade,
                topic,
                language,
            };
            search::run_search(&cfg, &query, facets).await?;
        }
        Commands::Quotes { tags, sort } => {
            browse::run_quotes(&cfg, &tags, sort).await?;
        }
        Commands::Drift { term, selected } => {
            browse::run_drift(&cfg, &term, selected.as_deref()).await?;
        }
        Commands::Bio { name } => {
            browse::run_bio(&cfg, &name).await?;
        }
        Commands::BuildIndex { output } => {
            search_index::run_build_index(&cfg, output.as_deref()).await?;
        }
        // Handled above (before config loading)
        Commands::Completions { .. } => {}
    }

    Ok(())
}
