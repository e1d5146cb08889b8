//! Database access for the six entity tables

pub mod repository;

mod advanced_stats;
mod contracts;
mod games;
mod players;
mod rosters;
mod teams;

pub use repository::{
    BatchOutcome, PersistedRow, RecordFailure, Repository, RowFilter, UpsertOutcome,
};

/// Provenance columns written alongside every entity
pub(crate) struct RowMeta<'a> {
    pub source: &'a str,
    pub raw_data: &'a str,
    pub content_hash: &'a str,
    pub updated_at: &'a str,
}
