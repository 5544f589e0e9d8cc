//! # GEMI Core
//!
//! Shared, WASM-safe logic for the GEMI archive: the corpus data model,
//! corpus aggregation, document and quote filtering, the semantic drift
//! chart, and the search backend abstraction.
//!
//! This crate contains no tokio, filesystem I/O, or network code. Loading
//! assets, caching, and the search client's request handling live in the
//! `gemi-archive` application crate.

pub mod drift;
pub mod markup;
pub mod models;
pub mod quotes;
pub mod search;
pub mod stats;
pub mod view;
