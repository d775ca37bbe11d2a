//! Hotel Ingest Library
//!
//! Imports hotel properties and guest reviews from delimited exports into a
//! relational store.
//!
//! # Pipeline
//!
//! - **Validation** ([`validation`], [`models`]): each row is checked once and
//!   becomes a typed record, or a skip reason
//! - **Collection** ([`collector`]): unique cities and regions from a first pass
//! - **Materialization** ([`materializer`]): parents persisted in one transaction
//! - **Loading** ([`loader`]): second pass, batched inserts through a bounded
//!   queue to a single writer task
//! - **Skip ledger** ([`ledger`]): rejected rows counted by reason
//!
//! # Example
//!
//! ```no_run
//! use hotel_ingest::{config::ImportConfig, hotels::HotelImporter, source::CsvSource};
//! use hotel_ingest::store::MemoryStore;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> hotel_common::Result<()> {
//!     let store = Arc::new(MemoryStore::new());
//!     let report = HotelImporter::new(store, CsvSource::tsv("hotels.tsv"), ImportConfig::default())
//!         .run()
//!         .await?;
//!     report.log_summary();
//!     Ok(())
//! }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod cli;
pub mod collector;
pub mod config;
pub mod db;
pub mod hotels;
pub mod ledger;
pub mod loader;
pub mod mapping;
pub mod materializer;
pub mod models;
pub mod progress;
pub mod report;
pub mod reviews;
pub mod source;
pub mod store;
pub mod validation;

pub use cli::Cli;
pub use report::{ImportKind, ImportReport};
