//! puckstat-ingest library interface
//!
//! Scrapes NHL statistics sources into the shared SQLite database. A pass fetches every
//! enabled source under its rate budget and retry policy, parses payloads through the
//! source's adapter, and upserts records idempotently by natural key.

pub mod adapters;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

pub use crate::adapters::{ParsedBatch, SourceAdapter};
pub use crate::config::{CliOverrides, IngestConfig, SourceSettings};
pub use crate::db::Repository;
pub use crate::error::{FetchError, ParseError, PersistenceError};
pub use crate::models::{PassReport, PassState};
pub use crate::services::{FetchClient, Orchestrator};
