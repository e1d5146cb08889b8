//! Scrape pass state machine and report
//!
//! A pass progresses Idle → Running → Completed | Failed. Failures never abort the pass;
//! they are collected here with the stage they happened in.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Pass state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PassState {
    Idle,
    Running,
    Completed,
    Failed,
}

impl PassState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PassState::Completed | PassState::Failed)
    }
}

/// Pipeline stage a failure was observed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureStage {
    Fetch,
    Parse,
    Persist,
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stage = match self {
            FailureStage::Fetch => "fetch",
            FailureStage::Parse => "parse",
            FailureStage::Persist => "persist",
        };
        f.write_str(stage)
    }
}

/// One reported failure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureEntry {
    pub source: String,
    pub stage: FailureStage,
    /// Resource tag of the target involved
    pub target: Option<String>,
    /// Natural key of the record involved (persistence failures)
    pub record_key: Option<String>,
    pub reason: String,
}

impl fmt::Display for FailureEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.stage, self.source)?;
        if let Some(target) = &self.target {
            write!(f, " {}", target)?;
        }
        if let Some(key) = &self.record_key {
            write!(f, " {}", key)?;
        }
        write!(f, ": {}", self.reason)
    }
}

/// Per-source tallies
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceSummary {
    pub source: String,
    pub targets_succeeded: usize,
    pub targets_failed: usize,
    pub records_produced: usize,
    pub records_rejected: usize,
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub persist_failed: usize,
    /// Collection stopped early by cancellation or deadline
    pub cancelled: bool,
}

impl SourceSummary {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            ..Default::default()
        }
    }

    /// No records and no usable target, because every target errored or was cut off
    pub fn fully_failed(&self) -> bool {
        self.records_produced == 0
            && self.targets_succeeded == 0
            && (self.targets_failed > 0 || self.cancelled)
    }
}

/// Outcome of one pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PassReport {
    pub pass_id: Uuid,
    pub state: PassState,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub cancelled: bool,
    pub sources: Vec<SourceSummary>,
    pub failures: Vec<FailureEntry>,
}

impl PassReport {
    pub fn new() -> Self {
        Self {
            pass_id: Uuid::new_v4(),
            state: PassState::Idle,
            started_at: Utc::now(),
            ended_at: None,
            cancelled: false,
            sources: Vec::new(),
            failures: Vec::new(),
        }
    }

    /// Transition to a new state, stamping the end time on terminal states
    pub fn transition_to(&mut self, new_state: PassState) -> PassState {
        let old_state = self.state;
        self.state = new_state;

        match new_state {
            PassState::Running => self.started_at = Utc::now(),
            PassState::Completed | PassState::Failed => self.ended_at = Some(Utc::now()),
            PassState::Idle => {}
        }

        old_state
    }

    /// Terminal state for the collected tallies
    ///
    /// Completed when any record was produced; Failed when nothing was produced and every
    /// source failed entirely, or when no source ran at all.
    pub fn resolve_state(&self) -> PassState {
        if self.records_produced() > 0 {
            return PassState::Completed;
        }
        if self.sources.is_empty() || self.sources.iter().all(SourceSummary::fully_failed) {
            return PassState::Failed;
        }
        PassState::Completed
    }

    pub fn records_produced(&self) -> usize {
        self.sources.iter().map(|s| s.records_produced).sum()
    }

    pub fn inserted(&self) -> usize {
        self.sources.iter().map(|s| s.inserted).sum()
    }

    pub fn updated(&self) -> usize {
        self.sources.iter().map(|s| s.updated).sum()
    }

    pub fn unchanged(&self) -> usize {
        self.sources.iter().map(|s| s.unchanged).sum()
    }

    /// Rejected rows plus records the repository refused
    pub fn records_failed(&self) -> usize {
        self.sources
            .iter()
            .map(|s| s.records_rejected + s.persist_failed)
            .sum()
    }

    pub fn sources_fully_failed(&self) -> Vec<&str> {
        self.sources
            .iter()
            .filter(|s| s.fully_failed())
            .map(|s| s.source.as_str())
            .collect()
    }

    pub fn failures_at(&self, stage: FailureStage) -> impl Iterator<Item = &FailureEntry> {
        self.failures.iter().filter(move |f| f.stage == stage)
    }

    pub fn source(&self, source: &str) -> Option<&SourceSummary> {
        self.sources.iter().find(|s| s.source == source)
    }

    /// Process exit code: non-zero only for a Failed pass
    pub fn exit_code(&self) -> i32 {
        match self.state {
            PassState::Failed => 1,
            _ => 0,
        }
    }
}

impl Default for PassReport {
    fn default() -> Self {
        Self::new()
    }
}
