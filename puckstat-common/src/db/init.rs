//! Database initialization
//!
//! Opens (or creates) the SQLite database and creates the six entity tables.
//! Every table carries a UNIQUE constraint over its natural key columns plus the
//! provenance columns `source`, `raw_data`, `content_hash` and `updated_at`.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Schema version written to `schema_version`
pub const SCHEMA_VERSION: i64 = 2;

/// Tables created by [`create_schema`], in creation order
pub const ENTITY_TABLES: [&str; 6] = [
    "players",
    "teams",
    "games",
    "contracts",
    "advanced_stats",
    "rosters",
];

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(8)
        .min_connections(1)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // WAL lets reporting readers proceed while a persistence batch is writing
    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;

    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&pool)
        .await?;

    create_schema(&pool).await?;

    Ok(pool)
}

/// Single-connection in-memory database with the full schema
///
/// `sqlite::memory:` is per-connection, so the pool is capped at one connection.
pub async fn init_memory_database() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;

    create_schema(&pool).await?;

    Ok(pool)
}

/// Create all tables (idempotent)
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_schema_version_table(pool).await?;
    create_players_table(pool).await?;
    create_teams_table(pool).await?;
    create_games_table(pool).await?;
    create_contracts_table(pool).await?;
    create_advanced_stats_table(pool).await?;
    create_rosters_table(pool).await?;
    migrate_v2(pool).await?;

    sqlx::query("INSERT OR IGNORE INTO schema_version (version) VALUES (?)")
        .bind(SCHEMA_VERSION)
        .execute(pool)
        .await?;

    Ok(())
}

/// v2: `advanced_stats.corsi_rel` for databases created before the column existed
async fn migrate_v2(pool: &SqlitePool) -> Result<()> {
    let has_column: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM pragma_table_info('advanced_stats') WHERE name = 'corsi_rel'",
    )
    .fetch_one(pool)
    .await?;

    if has_column == 0 {
        sqlx::query("ALTER TABLE advanced_stats ADD COLUMN corsi_rel REAL")
            .execute(pool)
            .await?;
        info!("Migration v2: added corsi_rel to advanced_stats");
    }

    Ok(())
}

async fn create_schema_version_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_players_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS players (
            id INTEGER PRIMARY KEY,
            player_id INTEGER NOT NULL,
            first_name TEXT,
            last_name TEXT,
            position TEXT,
            team_abbrev TEXT,
            shoots_catches TEXT,
            birth_date TEXT,
            birth_country TEXT,
            height_inches INTEGER,
            weight_pounds INTEGER,
            source TEXT NOT NULL,
            raw_data TEXT NOT NULL,
            content_hash TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE (player_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_teams_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS teams (
            id INTEGER PRIMARY KEY,
            team_abbrev TEXT NOT NULL,
            name TEXT,
            conference TEXT,
            division TEXT,
            games_played INTEGER,
            wins INTEGER,
            losses INTEGER,
            ot_losses INTEGER,
            points INTEGER,
            goal_differential INTEGER,
            source TEXT NOT NULL,
            raw_data TEXT NOT NULL,
            content_hash TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE (team_abbrev)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_games_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS games (
            id INTEGER PRIMARY KEY,
            game_id INTEGER NOT NULL,
            season TEXT NOT NULL,
            game_date TEXT,
            game_type INTEGER,
            home_team TEXT NOT NULL,
            away_team TEXT NOT NULL,
            home_score INTEGER,
            away_score INTEGER,
            game_state TEXT,
            source TEXT NOT NULL,
            raw_data TEXT NOT NULL,
            content_hash TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE (game_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_games_season ON games(season)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_contracts_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS contracts (
            id INTEGER PRIMARY KEY,
            team_abbrev TEXT NOT NULL,
            player_name TEXT NOT NULL,
            season TEXT NOT NULL,
            cap_hit INTEGER,
            salary INTEGER,
            aav INTEGER,
            total_years INTEGER,
            expiry_status TEXT,
            has_nmc INTEGER NOT NULL DEFAULT 0,
            has_ntc INTEGER NOT NULL DEFAULT 0,
            source TEXT NOT NULL,
            raw_data TEXT NOT NULL,
            content_hash TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE (team_abbrev, player_name, season)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_advanced_stats_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS advanced_stats (
            id INTEGER PRIMARY KEY,
            player_id INTEGER NOT NULL,
            season TEXT NOT NULL,
            situation TEXT NOT NULL,
            player_name TEXT,
            team_abbrev TEXT,
            position TEXT,
            games_played INTEGER,
            toi_seconds INTEGER,
            corsi_for INTEGER,
            corsi_against INTEGER,
            corsi_pct REAL,
            corsi_rel REAL,
            fenwick_for INTEGER,
            fenwick_against INTEGER,
            fenwick_pct REAL,
            xg_for REAL,
            xg_against REAL,
            xg_pct REAL,
            goals_above_expected REAL,
            oz_start_pct REAL,
            hd_chances_for INTEGER,
            hd_chances_against INTEGER,
            source TEXT NOT NULL,
            raw_data TEXT NOT NULL,
            content_hash TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE (player_id, season, situation)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_rosters_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS rosters (
            id INTEGER PRIMARY KEY,
            team_abbrev TEXT NOT NULL,
            player_id INTEGER NOT NULL,
            season TEXT NOT NULL,
            player_name TEXT,
            jersey_number INTEGER,
            position TEXT,
            roster_status TEXT NOT NULL DEFAULT 'active',
            source TEXT NOT NULL,
            raw_data TEXT NOT NULL,
            content_hash TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE (team_abbrev, player_id, season)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_rosters_team_season ON rosters(team_abbrev, season)")
        .execute(pool)
        .await?;

    Ok(())
}
