//! Configuration resolution for puckstat-ingest
//!
//! Per-source settings start from compiled defaults, then TOML `[sources.<id>]`
//! overrides, then the command line (`--source` narrows the enabled set).

use crate::adapters::{MONEYPUCK, NHL_API, NHL_ROSTER, PUCKPEDIA};
use crate::services::fetch_client::FetchPolicy;
use crate::services::rate_limiter::{RateSettings, MAX_INTERVAL};
use crate::services::retry_policy::RetryPolicy;
use puckstat_common::config::{resolve_database_path, SourceOverrides, TomlConfig};
use puckstat_common::time::{current_season, season_start_year};
use puckstat_common::{Error, Result};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

/// Every source the binary knows how to scrape
pub const KNOWN_SOURCES: [&str; 4] = [NHL_API, NHL_ROSTER, MONEYPUCK, PUCKPEDIA];

/// Effective settings for one source
#[derive(Debug, Clone, PartialEq)]
pub struct SourceSettings {
    pub enabled: bool,
    pub requests_per_second: f64,
    pub jitter: Duration,
    pub max_retries: u32,
    pub timeout: Duration,
    pub max_in_flight: usize,
    pub base_url: String,
}

impl SourceSettings {
    /// Compiled defaults for a known source
    pub fn defaults_for(source: &str) -> Option<Self> {
        let (requests_per_second, base_url) = match source {
            NHL_API => (2.0, "https://api-web.nhle.com/v1"),
            NHL_ROSTER => (2.0, "https://api-web.nhle.com/v1"),
            MONEYPUCK => (0.5, "https://moneypuck.com"),
            PUCKPEDIA => (0.3, "https://puckpedia.com"),
            _ => return None,
        };

        Some(Self {
            enabled: true,
            requests_per_second,
            jitter: Duration::from_millis(250),
            max_retries: 3,
            timeout: Duration::from_secs(30),
            max_in_flight: 1,
            base_url: base_url.to_string(),
        })
    }

    pub fn apply(&mut self, overrides: &SourceOverrides) {
        if let Some(enabled) = overrides.enabled {
            self.enabled = enabled;
        }
        if let Some(rps) = overrides.requests_per_second {
            self.requests_per_second = rps;
        }
        if let Some(jitter_ms) = overrides.jitter_ms {
            self.jitter = Duration::from_millis(jitter_ms);
        }
        if let Some(max_retries) = overrides.max_retries {
            self.max_retries = max_retries;
        }
        if let Some(timeout_secs) = overrides.timeout_secs {
            self.timeout = Duration::from_secs(timeout_secs);
        }
        if let Some(max_in_flight) = overrides.max_in_flight {
            self.max_in_flight = max_in_flight;
        }
        if let Some(base_url) = &overrides.base_url {
            self.base_url = base_url.clone();
        }
    }

    pub fn validate(&self, source: &str) -> Result<()> {
        if !(self.requests_per_second.is_finite() && self.requests_per_second > 0.0) {
            return Err(Error::Config(format!(
                "sources.{}.requests_per_second must be positive (got {})",
                source, self.requests_per_second
            )));
        }
        let min_rate = 1.0 / MAX_INTERVAL.as_secs_f64();
        if self.requests_per_second < min_rate {
            return Err(Error::Config(format!(
                "sources.{}.requests_per_second must be at least {} (got {})",
                source, min_rate, self.requests_per_second
            )));
        }
        if self.max_in_flight == 0 {
            return Err(Error::Config(format!(
                "sources.{}.max_in_flight must be at least 1",
                source
            )));
        }
        if self.timeout.is_zero() {
            return Err(Error::Config(format!(
                "sources.{}.timeout_secs must be at least 1",
                source
            )));
        }
        if self.base_url.trim().is_empty() {
            return Err(Error::Config(format!("sources.{}.base_url is empty", source)));
        }
        Ok(())
    }

    pub fn rate_settings(&self) -> RateSettings {
        RateSettings::new(self.requests_per_second).with_jitter(self.jitter)
    }

    pub fn fetch_policy(&self) -> FetchPolicy {
        FetchPolicy {
            timeout: self.timeout,
            retry: RetryPolicy::new(self.max_retries).with_jitter(self.jitter),
        }
    }
}

/// Command-line values that take precedence over the TOML file
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub database: Option<PathBuf>,
    pub season: Option<String>,
    /// Restrict the pass to these source ids (empty: every enabled source)
    pub sources: Vec<String>,
    pub deadline_secs: Option<u64>,
}

/// Fully resolved configuration for one pass
#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub database_path: PathBuf,
    pub season: String,
    pub deadline: Option<Duration>,
    pub sources: BTreeMap<String, SourceSettings>,
}

impl IngestConfig {
    pub fn resolve(toml: &TomlConfig, cli: &CliOverrides) -> Result<Self> {
        let database_path = resolve_database_path(cli.database.as_deref(), toml);

        let season = match cli.season.as_ref().or(toml.season.as_ref()) {
            Some(season) => season.clone(),
            None => {
                let season = current_season();
                info!("No season configured, using current season {}", season);
                season
            }
        };
        season_start_year(&season)?;

        let deadline = cli
            .deadline_secs
            .or(toml.deadline_secs)
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);

        for id in toml.sources.keys() {
            if !KNOWN_SOURCES.contains(&id.as_str()) {
                warn!("Ignoring unknown source '{}' in [sources]", id);
            }
        }
        for id in &cli.sources {
            if !KNOWN_SOURCES.contains(&id.as_str()) {
                return Err(Error::Config(format!(
                    "Unknown source '{}' (known: {})",
                    id,
                    KNOWN_SOURCES.join(", ")
                )));
            }
        }

        let mut sources = BTreeMap::new();
        for id in KNOWN_SOURCES {
            let Some(mut settings) = SourceSettings::defaults_for(id) else {
                continue;
            };
            if let Some(overrides) = toml.sources.get(id) {
                settings.apply(overrides);
            }
            if !cli.sources.is_empty() {
                settings.enabled = cli.sources.iter().any(|s| s == id);
            }
            settings.validate(id)?;
            sources.insert(id.to_string(), settings);
        }

        Ok(Self {
            database_path,
            season,
            deadline,
            sources,
        })
    }

    pub fn enabled_sources(&self) -> impl Iterator<Item = (&str, &SourceSettings)> {
        self.sources
            .iter()
            .filter(|(_, settings)| settings.enabled)
            .map(|(id, settings)| (id.as_str(), settings))
    }
}
