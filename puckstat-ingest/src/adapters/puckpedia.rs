//! PuckPedia team cap pages (HTML)
//!
//! Every table row with at least three cells is a contract candidate. Header rows and
//! names shorter than two characters are skipped. The first `$` cell is the cap hit and
//! the second the salary (defaulting to the cap hit).

use super::{resource_team, teams, ParsedBatch, SourceAdapter, PUCKPEDIA};
use crate::error::ParseError;
use crate::models::{Contract, FetchResult, FetchTarget, NormalizedRecord, TargetLocation};
use crate::utils::html::{table_rows, tag_blocks};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

const CONTRACTS: &str = "contracts";
const EXPIRY_STATUSES: [&str; 3] = ["UFA", "RFA", "10.2(C)"];
const HEADER_CELLS: [&str; 4] = ["player", "name", "pos", "position"];

static TERM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(\d+)\s*(?:yr|year)").expect("term regex"));

static SALARY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\$?\s*([0-9][0-9,]*(?:\.[0-9]+)?)\s*([mk])?$").expect("salary regex"));

/// Parse salary text such as `$1,500,000`, `$1.5M` or `$750K` into dollars
pub fn parse_salary(text: &str) -> Option<i64> {
    let caps = SALARY.captures(text.trim())?;
    let amount: f64 = caps.get(1)?.as_str().replace(',', "").parse().ok()?;
    let multiplier = match caps.get(2).map(|m| m.as_str().to_ascii_uppercase()) {
        Some(ref suffix) if suffix == "M" => 1_000_000.0,
        Some(ref suffix) if suffix == "K" => 1_000.0,
        _ => 1.0,
    };
    Some((amount * multiplier).round() as i64)
}

pub struct PuckPediaAdapter {
    base_url: String,
    season: String,
    teams: Vec<String>,
}

impl PuckPediaAdapter {
    pub fn new(base_url: &str, season: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            season: season.to_string(),
            teams: teams::all_abbrevs(),
        }
    }

    pub fn with_teams(mut self, teams: Vec<String>) -> Self {
        self.teams = teams;
        self
    }

    /// `Ok(None)` for rows that are not contracts (headers, blank names)
    fn parse_row(&self, team: &str, cells: &[String]) -> Result<Option<Contract>, String> {
        let player_name = cells[0].trim();
        if HEADER_CELLS.iter().any(|h| player_name.eq_ignore_ascii_case(h)) {
            return Ok(None);
        }

        if player_name.chars().count() < 2 {
            return Ok(None);
        }

        let mut cap_hit = None;
        let mut salary = None;
        let mut expiry_status = None;

        for text in &cells[1..] {
            if text.contains('$') {
                let value = parse_salary(text).ok_or_else(|| format!("unreadable amount '{}'", text))?;
                if cap_hit.is_none() {
                    cap_hit = Some(value);
                } else if salary.is_none() {
                    salary = Some(value);
                }
            } else {
                let upper = text.trim().to_uppercase();
                if EXPIRY_STATUSES.contains(&upper.as_str()) {
                    expiry_status = Some(upper);
                }
            }
        }

        let row_text = cells.join(" ");
        let total_years = TERM
            .captures(&row_text)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse::<i64>().ok())
            .unwrap_or(1);

        let upper = row_text.to_uppercase();

        Ok(Some(Contract {
            team_abbrev: team.to_string(),
            player_name: player_name.to_string(),
            season: self.season.clone(),
            cap_hit,
            salary: salary.or(cap_hit),
            aav: cap_hit,
            total_years: Some(total_years),
            expiry_status,
            has_nmc: upper.contains("NMC") || upper.contains("NO-MOVE"),
            has_ntc: upper.contains("NTC") || upper.contains("NO-TRADE"),
        }))
    }
}

impl SourceAdapter for PuckPediaAdapter {
    fn source_id(&self) -> &str {
        PUCKPEDIA
    }

    fn targets(&self) -> Box<dyn Iterator<Item = FetchTarget> + Send + '_> {
        Box::new(self.teams.iter().filter_map(move |abbrev| {
            let Some(team) = teams::find(abbrev) else {
                warn!(team = %abbrev, "No PuckPedia page for team");
                return None;
            };
            Some(FetchTarget::new(
                PUCKPEDIA,
                format!("{}:{}", CONTRACTS, team.abbrev),
                TargetLocation::join(&self.base_url, &format!("{}/cap", team.puckpedia_slug)),
            ))
        }))
    }

    fn parse(&self, result: &FetchResult) -> Result<ParsedBatch, ParseError> {
        let resource = result.target.resource.as_str();
        let team = resource_team(resource, CONTRACTS)
            .ok_or_else(|| ParseError::UnknownResource(resource.to_string()))?;

        let tables = tag_blocks(result.text()?, "table");
        if tables.is_empty() {
            return Err(ParseError::MissingSection(format!("cap table for {}", team)));
        }

        let mut batch = ParsedBatch::new();
        let mut line = 0;
        for table in tables {
            for cells in table_rows(table) {
                line += 1;
                if cells.len() < 3 {
                    continue;
                }
                match self.parse_row(team, &cells) {
                    Ok(Some(contract)) => {
                        let raw = Value::from(cells.clone()).to_string();
                        batch.push(NormalizedRecord::new(contract, PUCKPEDIA, raw));
                    }
                    Ok(None) => {}
                    Err(reason) => batch.reject(ParseError::row(line, reason)),
                }
            }
        }

        debug!(team = %team, contracts = batch.records.len(), "Parsed cap page");
        Ok(batch)
    }
}
