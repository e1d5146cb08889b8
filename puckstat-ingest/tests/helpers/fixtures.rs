//! Payload fixtures and a minimal adapter

use puckstat_ingest::adapters::{ParsedBatch, SourceAdapter};
use puckstat_ingest::error::ParseError;
use puckstat_ingest::models::{FetchResult, FetchTarget, NormalizedRecord, Player, TargetLocation};
use serde_json::{json, Value};

pub fn player_record(player_id: i64, last_name: &str, source: &str) -> NormalizedRecord {
    NormalizedRecord::new(
        Player {
            player_id,
            first_name: Some("Test".to_string()),
            last_name: Some(last_name.to_string()),
            position: Some("C".to_string()),
            team_abbrev: Some("EDM".to_string()),
            shoots_catches: None,
            birth_date: None,
            birth_country: None,
            height_inches: None,
            weight_pounds: None,
        },
        source,
        json!({ "id": player_id, "lastName": last_name }).to_string(),
    )
}

/// Adapter over fixed targets whose payloads list one player id per line
///
/// A line that is not an integer is a rejected row; a payload starting with `!` is
/// unusable as a whole.
pub struct StaticAdapter {
    source: String,
    locations: Vec<String>,
}

impl StaticAdapter {
    pub fn new(source: &str, locations: &[&str]) -> Self {
        Self {
            source: source.to_string(),
            locations: locations.iter().map(|l| l.to_string()).collect(),
        }
    }
}

impl SourceAdapter for StaticAdapter {
    fn source_id(&self) -> &str {
        &self.source
    }

    fn targets(&self) -> Box<dyn Iterator<Item = FetchTarget> + Send + '_> {
        Box::new(self.locations.iter().enumerate().map(move |(i, location)| {
            FetchTarget::new(
                self.source.as_str(),
                format!("page:{}", i),
                TargetLocation::parse(location),
            )
        }))
    }

    fn parse(&self, result: &FetchResult) -> Result<ParsedBatch, ParseError> {
        let text = result.text()?;
        if text.starts_with('!') {
            return Err(ParseError::MissingSection("player list".to_string()));
        }

        let mut batch = ParsedBatch::new();
        for (i, line) in text.lines().filter(|l| !l.trim().is_empty()).enumerate() {
            match line.trim().parse::<i64>() {
                Ok(id) => batch.push(player_record(id, &format!("Player{}", id), &self.source)),
                Err(_) => batch.reject(ParseError::row(i + 1, format!("not a player id: {}", line))),
            }
        }
        Ok(batch)
    }
}

/// Skater CSV with `rows` data rows; rows listed in `short_rows` lose their last field
pub fn moneypuck_skaters_csv(rows: usize, short_rows: &[usize]) -> String {
    let mut csv = String::from(
        "playerId,season,name,team,position,situation,games_played,icetime,\
OnIce_F_shotAttempts,OnIce_A_shotAttempts,onIce_corsiPercentage,I_F_goals,I_F_xGoals\n",
    );
    for i in 0..rows {
        let id = 8_470_000 + i;
        let mut line = format!(
            "{},2024,Skater {},EDM,C,all,82,65000.5,{},{},0.52,{},{}",
            id,
            i,
            900 + i,
            800 + i,
            10 + i % 20,
            9.5
        );
        if short_rows.contains(&i) {
            if let Some(pos) = line.rfind(',') {
                line.truncate(pos);
            }
        }
        csv.push_str(&line);
        csv.push('\n');
        // a 5on5 row for the same player, filtered out by the default situation list
        csv.push_str(&format!(
            "{},2024,Skater {},EDM,C,5on5,82,50000,1,1,0.5,1,1\n",
            id, i
        ));
    }
    csv
}

/// Roster payload: (id, first, last, position code, sweater)
pub fn roster_json(players: &[(i64, &str, &str, &str, i64)]) -> String {
    let mut groups: [Vec<Value>; 3] = Default::default();
    for (id, first, last, position, sweater) in players {
        let player = json!({
            "id": id,
            "firstName": { "default": first },
            "lastName": { "default": last },
            "sweaterNumber": sweater,
            "positionCode": position,
            "shootsCatches": "L",
            "heightInInches": 73,
            "weightInPounds": 193,
            "birthDate": "1997-01-13",
            "birthCountry": "CAN",
        });
        let group = match *position {
            "D" => 1,
            "G" => 2,
            _ => 0,
        };
        groups[group].push(player);
    }
    let [forwards, defensemen, goalies] = groups;
    json!({ "forwards": forwards, "defensemen": defensemen, "goalies": goalies }).to_string()
}

/// Club schedule payload: (game id, home, away, home score, away score)
pub fn schedule_json(games: &[(i64, &str, &str, i64, i64)]) -> String {
    let games: Vec<Value> = games
        .iter()
        .map(|(id, home, away, home_score, away_score)| {
            json!({
                "id": id,
                "season": 20242025,
                "gameType": 2,
                "gameDate": "2024-10-09",
                "gameState": "OFF",
                "homeTeam": { "abbrev": home, "score": home_score },
                "awayTeam": { "abbrev": away, "score": away_score },
            })
        })
        .collect();
    json!({ "games": games }).to_string()
}

pub fn puckpedia_cap_html() -> String {
    r#"<html><body>
<h2>Forwards</h2>
<table class="cap-table">
  <thead><tr><th>Player</th><th>Pos</th><th>Cap Hit</th><th>Salary</th><th>Term</th><th>Status</th></tr></thead>
  <tbody>
    <tr><td><a href="/auston-matthews">Auston Matthews</a></td><td>C</td><td>$13,250,000</td><td>$15,900,000</td><td>4 yrs</td><td>UFA</td></tr>
    <tr><td>William Nylander</td><td>RW</td><td>$11.5M</td><td>$10M</td><td>8 years</td><td>UFA</td><td>NTC</td></tr>
    <tr><td>Matthew Knies</td><td>LW</td><td>$925K</td><td>1 yr</td><td>RFA</td></tr>
    <tr><td>Bad Amount</td><td>C</td><td>$TBD</td><td>2 yrs</td></tr>
    <tr><td colspan="3">Totals</td></tr>
  </tbody>
</table>
</body></html>"#
        .to_string()
}
