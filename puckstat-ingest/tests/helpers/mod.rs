//! Test Helper Utilities
//!
//! Shared utilities for testing puckstat-ingest

#![allow(dead_code)]

pub mod fixtures;
pub mod transport;

pub use fixtures::{
    moneypuck_skaters_csv, player_record, puckpedia_cap_html, roster_json, schedule_json,
    StaticAdapter,
};
pub use transport::{Script, ScriptedTransport};

use puckstat_common::db::init_memory_database;
use puckstat_ingest::db::Repository;

/// Repository over a fresh in-memory database with the full schema
pub async fn test_repository() -> Repository {
    let pool = init_memory_database()
        .await
        .expect("in-memory database");
    Repository::new(pool)
}
