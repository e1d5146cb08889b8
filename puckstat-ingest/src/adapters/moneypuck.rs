//! MoneyPuck season summary CSVs (skaters and goalies)
//!
//! MoneyPuck keys seasons by start year; records are stored under the `YYYYYYYY` season id.
//! Numeric cells may be written as floats (`"82.0"`) and are truncated for integer columns.
//! Empty cells become NULL; a non-numeric cell rejects the row.

use super::{ParsedBatch, SourceAdapter, MONEYPUCK};
use crate::error::ParseError;
use crate::models::{AdvancedStat, FetchResult, FetchTarget, NormalizedRecord, TargetLocation};
use crate::utils::csv::{parse_rows, Header};
use puckstat_common::time::season_start_year;
use serde_json::{Map, Value};
use tracing::debug;

const SKATERS: &str = "skaters";
const GOALIES: &str = "goalies";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Table {
    Skaters,
    Goalies,
}

pub struct MoneyPuckAdapter {
    base_url: String,
    season: String,
    start_year: i32,
    situations: Vec<String>,
}

impl MoneyPuckAdapter {
    pub fn new(base_url: &str, season: &str) -> puckstat_common::Result<Self> {
        Ok(Self {
            base_url: base_url.to_string(),
            season: season.to_string(),
            start_year: season_start_year(season)?,
            situations: vec!["all".to_string()],
        })
    }

    /// Keep rows for these situations (`all`, `5on5`, `5on4`, ...)
    pub fn with_situations(mut self, situations: Vec<String>) -> Self {
        self.situations = situations;
        self
    }

    fn target(&self, resource: &str) -> FetchTarget {
        FetchTarget::new(
            MONEYPUCK,
            resource,
            TargetLocation::join(
                &self.base_url,
                &format!(
                    "moneypuck/playerData/seasonSummary/{}/regular/{}.csv",
                    self.start_year, resource
                ),
            ),
        )
    }

    fn parse_table(&self, text: &str, table: Table) -> Result<ParsedBatch, ParseError> {
        let rows = parse_rows(text);
        let (header_row, data_rows) = rows
            .split_first()
            .ok_or_else(|| ParseError::MissingSection("CSV header".to_string()))?;

        let header = Header::new(header_row);
        for required in ["playerId", "situation"] {
            if !header.contains(required) {
                return Err(ParseError::MissingSection(format!("{} column", required)));
            }
        }

        let mut batch = ParsedBatch::new();
        for (i, row) in data_rows.iter().enumerate() {
            // 1-based line number, header is line 1
            let line = i + 2;

            if row.len() != header.width() {
                batch.reject(ParseError::row(
                    line,
                    format!("expected {} fields, found {}", header.width(), row.len()),
                ));
                continue;
            }

            let situation = header.get(row, "situation").unwrap_or_default();
            if !self.situations.iter().any(|s| s == situation) {
                continue;
            }

            let parsed = match table {
                Table::Skaters => self.skater(&header, row),
                Table::Goalies => self.goalie(&header, row),
            };

            match parsed {
                Ok(stat) => batch.push(NormalizedRecord::new(
                    stat,
                    MONEYPUCK,
                    raw_row(header_row, row),
                )),
                Err(reason) => batch.reject(ParseError::row(line, reason)),
            }
        }

        debug!(
            table = ?table,
            records = batch.records.len(),
            rejected = batch.rejected.len(),
            "Parsed MoneyPuck CSV"
        );
        Ok(batch)
    }

    fn base_stat(&self, header: &Header, row: &[String]) -> Result<AdvancedStat, String> {
        let player_id = int_cell(header, row, "playerId")?.ok_or("missing playerId")?;
        let situation = header.get(row, "situation").unwrap_or("all");

        Ok(AdvancedStat {
            player_name: header.get(row, "name").map(str::to_string),
            team_abbrev: header.get(row, "team").map(str::to_string),
            position: header.get(row, "position").map(str::to_string),
            games_played: int_cell(header, row, "games_played")?,
            toi_seconds: int_cell(header, row, "icetime")?,
            ..AdvancedStat::new(player_id, self.season.clone(), situation)
        })
    }

    fn skater(&self, header: &Header, row: &[String]) -> Result<AdvancedStat, String> {
        let stat = self.base_stat(header, row)?;

        let goals = float_cell(header, row, "I_F_goals")?;
        let individual_xg = float_cell(header, row, "I_F_xGoals")?;
        let oz_start_pct = match float_cell(header, row, "offensiveZoneStartPct")? {
            Some(pct) => Some(pct),
            None => {
                let offensive = float_cell(header, row, "I_F_oZoneShiftStarts")?;
                let defensive = float_cell(header, row, "I_F_dZoneShiftStarts")?;
                match (offensive, defensive) {
                    (Some(o), Some(d)) if o + d > 0.0 => Some(o / (o + d) * 100.0),
                    _ => None,
                }
            }
        };

        let corsi_pct = float_cell(header, row, "onIce_corsiPercentage")?;
        let off_ice_corsi_pct = float_cell(header, row, "offIce_corsiPercentage")?;

        Ok(AdvancedStat {
            corsi_for: int_cell(header, row, "OnIce_F_shotAttempts")?,
            corsi_against: int_cell(header, row, "OnIce_A_shotAttempts")?,
            corsi_pct,
            corsi_rel: corsi_pct.zip(off_ice_corsi_pct).map(|(on, off)| on - off),
            fenwick_for: int_cell(header, row, "OnIce_F_unblockedShotAttempts")?,
            fenwick_against: int_cell(header, row, "OnIce_A_unblockedShotAttempts")?,
            fenwick_pct: float_cell(header, row, "onIce_fenwickPercentage")?,
            xg_for: float_cell(header, row, "OnIce_F_xGoals")?,
            xg_against: float_cell(header, row, "OnIce_A_xGoals")?,
            xg_pct: float_cell(header, row, "onIce_xGoalsPercentage")?,
            goals_above_expected: goals.zip(individual_xg).map(|(g, xg)| g - xg),
            oz_start_pct,
            hd_chances_for: int_cell(header, row, "OnIce_F_highDangerShotAttempts")?,
            hd_chances_against: int_cell(header, row, "OnIce_A_highDangerShotAttempts")?,
            ..stat
        })
    }

    fn goalie(&self, header: &Header, row: &[String]) -> Result<AdvancedStat, String> {
        let stat = self.base_stat(header, row)?;

        let expected = float_cell(header, row, "xGoals")?;
        let allowed = float_cell(header, row, "goals")?;
        let saved_above_expected = match float_cell(header, row, "goalsAboveExpected")? {
            Some(gsax) => Some(gsax),
            None => expected.zip(allowed).map(|(xg, g)| xg - g),
        };

        Ok(AdvancedStat {
            position: stat.position.clone().or_else(|| Some("G".to_string())),
            xg_against: expected,
            goals_above_expected: saved_above_expected,
            hd_chances_against: int_cell(header, row, "highDangerShotsOnGoal")?,
            ..stat
        })
    }
}

impl SourceAdapter for MoneyPuckAdapter {
    fn source_id(&self) -> &str {
        MONEYPUCK
    }

    fn targets(&self) -> Box<dyn Iterator<Item = FetchTarget> + Send + '_> {
        Box::new([SKATERS, GOALIES].into_iter().map(move |r| self.target(r)))
    }

    fn parse(&self, result: &FetchResult) -> Result<ParsedBatch, ParseError> {
        let table = match result.target.resource.as_str() {
            SKATERS => Table::Skaters,
            GOALIES => Table::Goalies,
            other => return Err(ParseError::UnknownResource(other.to_string())),
        };
        self.parse_table(result.text()?, table)
    }
}

fn float_cell(header: &Header, row: &[String], column: &str) -> Result<Option<f64>, String> {
    match header.get(row, column) {
        None => Ok(None),
        Some(cell) => cell
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(Some)
            .ok_or_else(|| format!("{}: invalid number '{}'", column, cell)),
    }
}

fn int_cell(header: &Header, row: &[String], column: &str) -> Result<Option<i64>, String> {
    Ok(float_cell(header, row, column)?.map(|v| v.trunc() as i64))
}

/// Row as a JSON object keyed by header names
fn raw_row(header: &[String], row: &[String]) -> String {
    let object: Map<String, Value> = header
        .iter()
        .zip(row)
        .map(|(name, cell)| (name.trim().to_string(), Value::String(cell.clone())))
        .collect();
    Value::Object(object).to_string()
}
