//! # GEMI Archive
//!
//! Browse and search backend for the GEMI archive: a corpus of historical
//! texts on calculating machines, automata, thinking machines, computing,
//! cybernetics and automation.
//!
//! The archive is static data produced by an export step: a JSON corpus
//! index, curated quotes, a semantic drift report, plain-text document files
//! and a pre-built search index. This crate loads and caches those assets
//! and serves them through a CLI and a JSON HTTP API.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────┐   ┌──────────────┐   ┌──────────────┐
//! │ public/data/*.json│──▶│  Archive     │──▶│  gemi-core   │
//! │ raw_texts/        │   │  AssetCache  │   │ stats/view/  │
//! └──────────────────┘   └──────┬───────┘   │ quotes/drift │
//!                               │           └──────────────┘
//! ┌──────────────────┐   ┌──────┴───────┐
//! │ search-index.json │──▶│ SearchIndex- │
//! └──────────────────┘   │ Client       │
//!                        └──────┬───────┘
//!                  ┌────────────┴────────────┐
//!                  ▼                         ▼
//!             ┌──────────┐             ┌──────────┐
//!             │   CLI    │             │   HTTP   │
//!             │  (gemi)  │             │  (axum)  │
//!             └──────────┘             └──────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`repository`] | Cached JSON assets (corpus, quotes, drift) |
//! | [`search_client`] | Search index lifecycle, queries, superseded-request guard |
//! | [`search_index`] | Index asset loading and `build-index` |
//! | [`texts`] | Document text and translation retrieval |
//! | [`biography`] | Author biography lookup |
//! | [`server`] | JSON HTTP API |
//! | [`stats`], [`search`], [`browse`] | CLI command output |
//!
//! The pure data logic lives in [`gemi_core`], re-exported here.

pub mod biography;
pub mod browse;
pub mod config;
pub mod repository;
pub mod search;
pub mod search_client;
pub mod search_index;
pub mod server;
pub mod stats;
pub mod texts;

pub use gemi_core;
