//! Source adapters
//!
//! An adapter knows one source's targets and payload shape. The orchestrator only sees the
//! [`SourceAdapter`] trait.

pub mod moneypuck;
pub mod nhl_api;
pub mod nhl_roster;
pub mod puckpedia;
pub mod teams;

pub use moneypuck::MoneyPuckAdapter;
pub use nhl_api::NhlApiAdapter;
pub use nhl_roster::NhlRosterAdapter;
pub use puckpedia::PuckPediaAdapter;

use crate::config::SourceSettings;
use crate::error::ParseError;
use crate::models::{FetchResult, FetchTarget, NormalizedRecord};
use puckstat_common::{Error, Result};
use std::sync::Arc;

pub const NHL_API: &str = "nhl_api";
pub const NHL_ROSTER: &str = "nhl_roster";
pub const MONEYPUCK: &str = "moneypuck";
pub const PUCKPEDIA: &str = "puckpedia";

/// Records parsed from one target, plus rows that could not be parsed
#[derive(Debug, Default)]
pub struct ParsedBatch {
    pub records: Vec<NormalizedRecord>,
    pub rejected: Vec<ParseError>,
}

impl ParsedBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: NormalizedRecord) {
        self.records.push(record);
    }

    pub fn reject(&mut self, error: ParseError) {
        self.rejected.push(error);
    }
}

/// One data source: what to fetch and how to read it
pub trait SourceAdapter: Send + Sync {
    fn source_id(&self) -> &str;

    /// Lazy, finite target sequence; each call starts a fresh enumeration
    fn targets(&self) -> Box<dyn Iterator<Item = FetchTarget> + Send + '_>;

    /// Turn a successful fetch into records
    ///
    /// `Err` means the whole target was unusable; row-level problems go to
    /// [`ParsedBatch::rejected`].
    fn parse(&self, result: &FetchResult) -> std::result::Result<ParsedBatch, ParseError>;
}

/// Adapter for a configured source id
pub fn build_adapter(
    source: &str,
    settings: &SourceSettings,
    season: &str,
) -> Result<Arc<dyn SourceAdapter>> {
    let adapter: Arc<dyn SourceAdapter> = match source {
        NHL_API => Arc::new(NhlApiAdapter::new(&settings.base_url, season)),
        NHL_ROSTER => Arc::new(NhlRosterAdapter::new(&settings.base_url, season)),
        MONEYPUCK => Arc::new(MoneyPuckAdapter::new(&settings.base_url, season)?),
        PUCKPEDIA => Arc::new(PuckPediaAdapter::new(&settings.base_url, season)),
        other => return Err(Error::Config(format!("No adapter for source '{}'", other))),
    };
    Ok(adapter)
}

/// Team abbreviation from a `kind:TEAM` resource tag
pub(crate) fn resource_team<'a>(resource: &'a str, prefix: &str) -> Option<&'a str> {
    resource
        .strip_prefix(prefix)
        .and_then(|rest| rest.strip_prefix(':'))
        .filter(|team| !team.is_empty())
}
