//! NHL web API: current club rosters
//!
//! Each roster player yields a RosterEntry for the club and season plus a Player profile.

use super::{resource_team, teams, ParsedBatch, SourceAdapter, NHL_ROSTER};
use crate::error::ParseError;
use crate::models::{FetchResult, FetchTarget, NormalizedRecord, Player, RosterEntry, TargetLocation};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

const ROSTER: &str = "roster";
const POSITION_GROUPS: [&str; 3] = ["forwards", "defensemen", "goalies"];

#[derive(Debug, Deserialize)]
struct LocalizedName {
    default: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RosterPlayer {
    id: i64,
    first_name: Option<LocalizedName>,
    last_name: Option<LocalizedName>,
    sweater_number: Option<i64>,
    position_code: Option<String>,
    shoots_catches: Option<String>,
    height_in_inches: Option<i64>,
    weight_in_pounds: Option<i64>,
    birth_date: Option<String>,
    birth_country: Option<String>,
}

pub struct NhlRosterAdapter {
    base_url: String,
    season: String,
    teams: Vec<String>,
}

impl NhlRosterAdapter {
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

    fn records_for(&self, team: &str, raw: &Value, player: RosterPlayer) -> [NormalizedRecord; 2] {
        let first_name = player.first_name.map(|n| n.default);
        let last_name = player.last_name.map(|n| n.default);
        let full_name = match (&first_name, &last_name) {
            (Some(first), Some(last)) => Some(format!("{} {}", first, last)),
            (Some(name), None) | (None, Some(name)) => Some(name.clone()),
            (None, None) => None,
        };
        let raw_payload = raw.to_string();

        let entry = RosterEntry {
            team_abbrev: team.to_string(),
            player_id: player.id,
            season: self.season.clone(),
            player_name: full_name,
            jersey_number: player.sweater_number,
            position: player.position_code.clone(),
            roster_status: "active".to_string(),
        };

        let profile = Player {
            player_id: player.id,
            first_name,
            last_name,
            position: player.position_code,
            team_abbrev: Some(team.to_string()),
            shoots_catches: player.shoots_catches,
            birth_date: player.birth_date,
            birth_country: player.birth_country,
            height_inches: player.height_in_inches,
            weight_pounds: player.weight_in_pounds,
        };

        [
            NormalizedRecord::new(entry, NHL_ROSTER, raw_payload.clone()),
            NormalizedRecord::new(profile, NHL_ROSTER, raw_payload),
        ]
    }
}

impl SourceAdapter for NhlRosterAdapter {
    fn source_id(&self) -> &str {
        NHL_ROSTER
    }

    fn targets(&self) -> Box<dyn Iterator<Item = FetchTarget> + Send + '_> {
        Box::new(self.teams.iter().map(move |team| {
            FetchTarget::new(
                NHL_ROSTER,
                format!("{}:{}", ROSTER, team),
                TargetLocation::join(&self.base_url, &format!("roster/{}/current", team)),
            )
        }))
    }

    fn parse(&self, result: &FetchResult) -> Result<ParsedBatch, ParseError> {
        let resource = result.target.resource.as_str();
        let team = resource_team(resource, ROSTER)
            .ok_or_else(|| ParseError::UnknownResource(resource.to_string()))?;

        let body: Value = serde_json::from_str(result.text()?)?;

        let groups: Vec<&Vec<Value>> = POSITION_GROUPS
            .iter()
            .filter_map(|group| body.get(group).and_then(Value::as_array))
            .collect();
        if groups.is_empty() {
            return Err(ParseError::MissingSection(format!("roster groups for {}", team)));
        }

        let mut batch = ParsedBatch::new();
        let mut row = 0;
        for players in groups {
            for raw in players {
                row += 1;
                match serde_json::from_value::<RosterPlayer>(raw.clone()) {
                    Ok(player) => {
                        for record in self.records_for(team, raw, player) {
                            batch.push(record);
                        }
                    }
                    Err(e) => batch.reject(ParseError::row(row, e.to_string())),
                }
            }
        }

        debug!(team = %team, players = batch.records.len() / 2, "Parsed roster");
        Ok(batch)
    }
}
