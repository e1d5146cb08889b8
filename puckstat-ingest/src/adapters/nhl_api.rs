//! NHL web API: standings and club schedules

use super::{resource_team, teams, ParsedBatch, SourceAdapter, NHL_API};
use crate::error::ParseError;
use crate::models::{FetchResult, FetchTarget, Game, NormalizedRecord, TargetLocation, Team};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

const STANDINGS: &str = "standings";
const SCHEDULE: &str = "schedule";

#[derive(Debug, Deserialize)]
struct LocalizedName {
    default: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StandingRow {
    team_abbrev: LocalizedName,
    team_name: Option<LocalizedName>,
    conference_name: Option<String>,
    division_name: Option<String>,
    games_played: Option<i64>,
    wins: Option<i64>,
    losses: Option<i64>,
    ot_losses: Option<i64>,
    points: Option<i64>,
    goal_differential: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct ScheduleTeam {
    abbrev: String,
    score: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScheduleGame {
    id: i64,
    season: i64,
    game_type: Option<i64>,
    game_date: Option<String>,
    game_state: Option<String>,
    home_team: ScheduleTeam,
    away_team: ScheduleTeam,
}

pub struct NhlApiAdapter {
    base_url: String,
    season: String,
    teams: Vec<String>,
}

impl NhlApiAdapter {
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

    fn parse_standings(&self, body: &Value) -> Result<ParsedBatch, ParseError> {
        let rows = body
            .get("standings")
            .and_then(Value::as_array)
            .ok_or_else(|| ParseError::MissingSection("standings".to_string()))?;

        let mut batch = ParsedBatch::new();
        for (i, row) in rows.iter().enumerate() {
            match serde_json::from_value::<StandingRow>(row.clone()) {
                Ok(standing) => batch.push(NormalizedRecord::new(
                    Team {
                        team_abbrev: standing.team_abbrev.default,
                        name: standing.team_name.map(|n| n.default),
                        conference: standing.conference_name,
                        division: standing.division_name,
                        games_played: standing.games_played,
                        wins: standing.wins,
                        losses: standing.losses,
                        ot_losses: standing.ot_losses,
                        points: standing.points,
                        goal_differential: standing.goal_differential,
                    },
                    NHL_API,
                    row.to_string(),
                )),
                Err(e) => batch.reject(ParseError::row(i + 1, e.to_string())),
            }
        }

        Ok(batch)
    }

    fn parse_schedule(&self, team: &str, body: &Value) -> Result<ParsedBatch, ParseError> {
        let games = body
            .get("games")
            .and_then(Value::as_array)
            .ok_or_else(|| ParseError::MissingSection(format!("games for {}", team)))?;

        let mut batch = ParsedBatch::new();
        for (i, row) in games.iter().enumerate() {
            match serde_json::from_value::<ScheduleGame>(row.clone()) {
                Ok(game) => batch.push(NormalizedRecord::new(
                    Game {
                        game_id: game.id,
                        season: game.season.to_string(),
                        game_date: game.game_date,
                        game_type: game.game_type,
                        home_team: game.home_team.abbrev,
                        away_team: game.away_team.abbrev,
                        home_score: game.home_team.score,
                        away_score: game.away_team.score,
                        game_state: game.game_state,
                    },
                    NHL_API,
                    row.to_string(),
                )),
                Err(e) => batch.reject(ParseError::row(i + 1, e.to_string())),
            }
        }

        debug!(team = %team, games = batch.records.len(), "Parsed club schedule");
        Ok(batch)
    }
}

impl SourceAdapter for NhlApiAdapter {
    fn source_id(&self) -> &str {
        NHL_API
    }

    fn targets(&self) -> Box<dyn Iterator<Item = FetchTarget> + Send + '_> {
        let standings = FetchTarget::new(
            NHL_API,
            STANDINGS,
            TargetLocation::join(&self.base_url, "standings/now"),
        );

        let schedules = self.teams.iter().map(move |team| {
            FetchTarget::new(
                NHL_API,
                format!("{}:{}", SCHEDULE, team),
                TargetLocation::join(
                    &self.base_url,
                    &format!("club-schedule-season/{}/{}", team, self.season),
                ),
            )
        });

        Box::new(std::iter::once(standings).chain(schedules))
    }

    fn parse(&self, result: &FetchResult) -> Result<ParsedBatch, ParseError> {
        let body: Value = serde_json::from_str(result.text()?)?;
        let resource = result.target.resource.as_str();

        if resource == STANDINGS {
            return self.parse_standings(&body);
        }
        match resource_team(resource, SCHEDULE) {
            Some(team) => self.parse_schedule(team, &body),
            None => Err(ParseError::UnknownResource(resource.to_string())),
        }
    }
}
