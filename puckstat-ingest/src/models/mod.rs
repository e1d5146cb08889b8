//! Data models for puckstat-ingest

pub mod fetch;
pub mod pass_report;
pub mod records;

pub use fetch::{FetchOutcome, FetchResult, FetchTarget, Payload, TargetLocation};
pub use pass_report::{FailureEntry, FailureStage, PassReport, PassState, SourceSummary};
pub use records::{
    AdvancedStat, Contract, EntityData, EntityKind, Game, NaturalKey, NormalizedRecord, Player,
    RosterEntry, Team,
};
