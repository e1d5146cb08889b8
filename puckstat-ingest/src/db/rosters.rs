//! Roster persistence

use super::RowMeta;
use crate::models::RosterEntry;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

pub(crate) async fn stored_hash(
    conn: &mut SqliteConnection,
    entry: &RosterEntry,
) -> Result<Option<String>, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT content_hash FROM rosters WHERE team_abbrev = ? AND player_id = ? AND season = ?",
    )
    .bind(&entry.team_abbrev)
    .bind(entry.player_id)
    .bind(&entry.season)
    .fetch_optional(conn)
    .await
}

pub(crate) async fn upsert(
    conn: &mut SqliteConnection,
    entry: &RosterEntry,
    meta: &RowMeta<'_>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO rosters (
            team_abbrev, player_id, season, player_name, jersey_number, position,
            roster_status, source, raw_data, content_hash, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(team_abbrev, player_id, season) DO UPDATE SET
            player_name = excluded.player_name,
            jersey_number = excluded.jersey_number,
            position = excluded.position,
            roster_status = excluded.roster_status,
            source = excluded.source,
            raw_data = excluded.raw_data,
            content_hash = excluded.content_hash,
            updated_at = MAX(rosters.updated_at, excluded.updated_at)
        WHERE rosters.content_hash <> excluded.content_hash
        "#,
    )
    .bind(&entry.team_abbrev)
    .bind(entry.player_id)
    .bind(&entry.season)
    .bind(&entry.player_name)
    .bind(entry.jersey_number)
    .bind(&entry.position)
    .bind(&entry.roster_status)
    .bind(meta.source)
    .bind(meta.raw_data)
    .bind(meta.content_hash)
    .bind(meta.updated_at)
    .execute(conn)
    .await?;

    Ok(())
}

pub(crate) fn from_row(row: &SqliteRow) -> Result<RosterEntry, sqlx::Error> {
    Ok(RosterEntry {
        team_abbrev: row.try_get("team_abbrev")?,
        player_id: row.try_get("player_id")?,
        season: row.try_get("season")?,
        player_name: row.try_get("player_name")?,
        jersey_number: row.try_get("jersey_number")?,
        position: row.try_get("position")?,
        roster_status: row.try_get("roster_status")?,
    })
}
