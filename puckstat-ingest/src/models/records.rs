//! Normalized records produced by source adapters
//!
//! Every record carries exactly one entity, the id of the source that produced it and the
//! raw payload fragment it was parsed from. The natural key identifies the entity across
//! re-scrapes; the content hash covers key and value columns and drives no-op detection.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Entity kinds, one table each
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Player,
    Team,
    Game,
    Contract,
    AdvancedStat,
    RosterEntry,
}

impl EntityKind {
    pub const ALL: [EntityKind; 6] = [
        EntityKind::Player,
        EntityKind::Team,
        EntityKind::Game,
        EntityKind::Contract,
        EntityKind::AdvancedStat,
        EntityKind::RosterEntry,
    ];

    pub fn table_name(&self) -> &'static str {
        match self {
            EntityKind::Player => "players",
            EntityKind::Team => "teams",
            EntityKind::Game => "games",
            EntityKind::Contract => "contracts",
            EntityKind::AdvancedStat => "advanced_stats",
            EntityKind::RosterEntry => "rosters",
        }
    }

    /// Columns making up the natural key, in key order
    pub fn key_columns(&self) -> &'static [&'static str] {
        match self {
            EntityKind::Player => &["player_id"],
            EntityKind::Team => &["team_abbrev"],
            EntityKind::Game => &["game_id"],
            EntityKind::Contract => &["team_abbrev", "player_name", "season"],
            EntityKind::AdvancedStat => &["player_id", "season", "situation"],
            EntityKind::RosterEntry => &["team_abbrev", "player_id", "season"],
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table_name())
    }
}

/// Natural key of one entity: kind plus key column values in key order
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NaturalKey {
    pub kind: EntityKind,
    pub values: Vec<String>,
}

impl fmt::Display for NaturalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.kind)?;
        for (i, (column, value)) in self
            .kind
            .key_columns()
            .iter()
            .zip(&self.values)
            .enumerate()
        {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}={}", column, value)?;
        }
        f.write_str(")")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub player_id: i64,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub position: Option<String>,
    pub team_abbrev: Option<String>,
    pub shoots_catches: Option<String>,
    pub birth_date: Option<String>,
    pub birth_country: Option<String>,
    pub height_inches: Option<i64>,
    pub weight_pounds: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub team_abbrev: String,
    pub name: Option<String>,
    pub conference: Option<String>,
    pub division: Option<String>,
    pub games_played: Option<i64>,
    pub wins: Option<i64>,
    pub losses: Option<i64>,
    pub ot_losses: Option<i64>,
    pub points: Option<i64>,
    pub goal_differential: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Game {
    pub game_id: i64,
    pub season: String,
    pub game_date: Option<String>,
    pub game_type: Option<i64>,
    pub home_team: String,
    pub away_team: String,
    pub home_score: Option<i64>,
    pub away_score: Option<i64>,
    pub game_state: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contract {
    pub team_abbrev: String,
    pub player_name: String,
    pub season: String,
    pub cap_hit: Option<i64>,
    pub salary: Option<i64>,
    pub aav: Option<i64>,
    pub total_years: Option<i64>,
    pub expiry_status: Option<String>,
    pub has_nmc: bool,
    pub has_ntc: bool,
}

/// Per-player, per-season, per-situation analytics line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvancedStat {
    pub player_id: i64,
    pub season: String,
    pub situation: String,
    pub player_name: Option<String>,
    pub team_abbrev: Option<String>,
    pub position: Option<String>,
    pub games_played: Option<i64>,
    pub toi_seconds: Option<i64>,
    pub corsi_for: Option<i64>,
    pub corsi_against: Option<i64>,
    pub corsi_pct: Option<f64>,
    /// On-ice minus off-ice Corsi percentage
    pub corsi_rel: Option<f64>,
    pub fenwick_for: Option<i64>,
    pub fenwick_against: Option<i64>,
    pub fenwick_pct: Option<f64>,
    pub xg_for: Option<f64>,
    pub xg_against: Option<f64>,
    pub xg_pct: Option<f64>,
    pub goals_above_expected: Option<f64>,
    pub oz_start_pct: Option<f64>,
    pub hd_chances_for: Option<i64>,
    pub hd_chances_against: Option<i64>,
}

impl AdvancedStat {
    /// Empty line for a key; value columns are filled in by the adapter
    pub fn new(player_id: i64, season: impl Into<String>, situation: impl Into<String>) -> Self {
        Self {
            player_id,
            season: season.into(),
            situation: situation.into(),
            player_name: None,
            team_abbrev: None,
            position: None,
            games_played: None,
            toi_seconds: None,
            corsi_for: None,
            corsi_against: None,
            corsi_pct: None,
            corsi_rel: None,
            fenwick_for: None,
            fenwick_against: None,
            fenwick_pct: None,
            xg_for: None,
            xg_against: None,
            xg_pct: None,
            goals_above_expected: None,
            oz_start_pct: None,
            hd_chances_for: None,
            hd_chances_against: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub team_abbrev: String,
    pub player_id: i64,
    pub season: String,
    pub player_name: Option<String>,
    pub jersey_number: Option<i64>,
    pub position: Option<String>,
    pub roster_status: String,
}

/// One entity of any kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum EntityData {
    Player(Player),
    Team(Team),
    Game(Game),
    Contract(Contract),
    AdvancedStat(AdvancedStat),
    RosterEntry(RosterEntry),
}

impl EntityData {
    pub fn kind(&self) -> EntityKind {
        match self {
            EntityData::Player(_) => EntityKind::Player,
            EntityData::Team(_) => EntityKind::Team,
            EntityData::Game(_) => EntityKind::Game,
            EntityData::Contract(_) => EntityKind::Contract,
            EntityData::AdvancedStat(_) => EntityKind::AdvancedStat,
            EntityData::RosterEntry(_) => EntityKind::RosterEntry,
        }
    }

    pub fn natural_key(&self) -> NaturalKey {
        let values = match self {
            EntityData::Player(p) => vec![p.player_id.to_string()],
            EntityData::Team(t) => vec![t.team_abbrev.clone()],
            EntityData::Game(g) => vec![g.game_id.to_string()],
            EntityData::Contract(c) => {
                vec![c.team_abbrev.clone(), c.player_name.clone(), c.season.clone()]
            }
            EntityData::AdvancedStat(s) => {
                vec![s.player_id.to_string(), s.season.clone(), s.situation.clone()]
            }
            EntityData::RosterEntry(r) => {
                vec![r.team_abbrev.clone(), r.player_id.to_string(), r.season.clone()]
            }
        };

        NaturalKey {
            kind: self.kind(),
            values,
        }
    }

    /// SHA-256 (hex) of the entity's columns
    pub fn content_hash(&self) -> String {
        // Serializing plain structs of strings and numbers cannot fail
        let canonical = serde_json::to_string(self).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

macro_rules! impl_from_entity {
    ($($variant:ident),*) => {
        $(
            impl From<$variant> for EntityData {
                fn from(value: $variant) -> Self {
                    EntityData::$variant(value)
                }
            }
        )*
    };
}

impl_from_entity!(Player, Team, Game, Contract, AdvancedStat, RosterEntry);

/// Adapter output: one entity plus provenance
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRecord {
    pub entity: EntityData,
    /// Source id that produced the record
    pub source: String,
    /// JSON text of the payload fragment the entity was parsed from
    pub raw_payload: String,
}

impl NormalizedRecord {
    pub fn new(
        entity: impl Into<EntityData>,
        source: impl Into<String>,
        raw_payload: impl Into<String>,
    ) -> Self {
        Self {
            entity: entity.into(),
            source: source.into(),
            raw_payload: raw_payload.into(),
        }
    }

    pub fn kind(&self) -> EntityKind {
        self.entity.kind()
    }

    pub fn natural_key(&self) -> NaturalKey {
        self.entity.natural_key()
    }

    pub fn content_hash(&self) -> String {
        self.entity.content_hash()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stat(situation: &str, games: i64) -> AdvancedStat {
        AdvancedStat {
            games_played: Some(games),
            ..AdvancedStat::new(8478402, "20242025", situation)
        }
    }

    #[test]
    fn test_natural_key_display() {
        let record = NormalizedRecord::new(stat("all", 82), "moneypuck", "{}");
        assert_eq!(
            record.natural_key().to_string(),
            "advanced_stats(player_id=8478402, season=20242025, situation=all)"
        );
    }

    #[test]
    fn test_natural_key_distinguishes_situation() {
        let all = EntityData::from(stat("all", 82));
        let five = EntityData::from(stat("5on5", 82));
        assert_ne!(all.natural_key(), five.natural_key());
    }

    #[test]
    fn test_content_hash_ignores_provenance() {
        let a = NormalizedRecord::new(stat("all", 82), "moneypuck", r#"{"scraped":"a"}"#);
        let b = NormalizedRecord::new(stat("all", 82), "moneypuck", r#"{"scraped":"b"}"#);
        assert_eq!(a.content_hash(), b.content_hash());
        assert_eq!(a.content_hash().len(), 64);
    }

    #[test]
    fn test_content_hash_tracks_values() {
        let a = EntityData::from(stat("all", 81));
        let b = EntityData::from(stat("all", 82));
        assert_ne!(a.content_hash(), b.content_hash());
    }

    #[test]
    fn test_key_columns_match_tables() {
        for kind in EntityKind::ALL {
            assert!(!kind.key_columns().is_empty());
        }
        assert_eq!(EntityKind::RosterEntry.table_name(), "rosters");
        assert_eq!(
            EntityKind::Contract.key_columns(),
            &["team_abbrev", "player_name", "season"]
        );
    }
}
