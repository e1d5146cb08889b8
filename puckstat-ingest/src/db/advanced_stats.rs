//! Advanced stats persistence (one row per player, season and situation)

use super::RowMeta;
use crate::models::AdvancedStat;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

pub(crate) async fn stored_hash(
    conn: &mut SqliteConnection,
    stat: &AdvancedStat,
) -> Result<Option<String>, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT content_hash FROM advanced_stats WHERE player_id = ? AND season = ? AND situation = ?",
    )
    .bind(stat.player_id)
    .bind(&stat.season)
    .bind(&stat.situation)
    .fetch_optional(conn)
    .await
}

pub(crate) async fn upsert(
    conn: &mut SqliteConnection,
    stat: &AdvancedStat,
    meta: &RowMeta<'_>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO advanced_stats (
            player_id, season, situation, player_name, team_abbrev, position,
            games_played, toi_seconds,
            corsi_for, corsi_against, corsi_pct, corsi_rel,
            fenwick_for, fenwick_against, fenwick_pct,
            xg_for, xg_against, xg_pct,
            goals_above_expected, oz_start_pct, hd_chances_for, hd_chances_against,
            source, raw_data, content_hash, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(player_id, season, situation) DO UPDATE SET
            player_name = excluded.player_name,
            team_abbrev = excluded.team_abbrev,
            position = excluded.position,
            games_played = excluded.games_played,
            toi_seconds = excluded.toi_seconds,
            corsi_for = excluded.corsi_for,
            corsi_against = excluded.corsi_against,
            corsi_pct = excluded.corsi_pct,
            corsi_rel = excluded.corsi_rel,
            fenwick_for = excluded.fenwick_for,
            fenwick_against = excluded.fenwick_against,
            fenwick_pct = excluded.fenwick_pct,
            xg_for = excluded.xg_for,
            xg_against = excluded.xg_against,
            xg_pct = excluded.xg_pct,
            goals_above_expected = excluded.goals_above_expected,
            oz_start_pct = excluded.oz_start_pct,
            hd_chances_for = excluded.hd_chances_for,
            hd_chances_against = excluded.hd_chances_against,
            source = excluded.source,
            raw_data = excluded.raw_data,
            content_hash = excluded.content_hash,
            updated_at = MAX(advanced_stats.updated_at, excluded.updated_at)
        WHERE advanced_stats.content_hash <> excluded.content_hash
        "#,
    )
    .bind(stat.player_id)
    .bind(&stat.season)
    .bind(&stat.situation)
    .bind(&stat.player_name)
    .bind(&stat.team_abbrev)
    .bind(&stat.position)
    .bind(stat.games_played)
    .bind(stat.toi_seconds)
    .bind(stat.corsi_for)
    .bind(stat.corsi_against)
    .bind(stat.corsi_pct)
    .bind(stat.corsi_rel)
    .bind(stat.fenwick_for)
    .bind(stat.fenwick_against)
    .bind(stat.fenwick_pct)
    .bind(stat.xg_for)
    .bind(stat.xg_against)
    .bind(stat.xg_pct)
    .bind(stat.goals_above_expected)
    .bind(stat.oz_start_pct)
    .bind(stat.hd_chances_for)
    .bind(stat.hd_chances_against)
    .bind(meta.source)
    .bind(meta.raw_data)
    .bind(meta.content_hash)
    .bind(meta.updated_at)
    .execute(conn)
    .await?;

    Ok(())
}

pub(crate) fn from_row(row: &SqliteRow) -> Result<AdvancedStat, sqlx::Error> {
    Ok(AdvancedStat {
        player_id: row.try_get("player_id")?,
        season: row.try_get("season")?,
        situation: row.try_get("situation")?,
        player_name: row.try_get("player_name")?,
        team_abbrev: row.try_get("team_abbrev")?,
        position: row.try_get("position")?,
        games_played: row.try_get("games_played")?,
        toi_seconds: row.try_get("toi_seconds")?,
        corsi_for: row.try_get("corsi_for")?,
        corsi_against: row.try_get("corsi_against")?,
        corsi_pct: row.try_get("corsi_pct")?,
        corsi_rel: row.try_get("corsi_rel")?,
        fenwick_for: row.try_get("fenwick_for")?,
        fenwick_against: row.try_get("fenwick_against")?,
        fenwick_pct: row.try_get("fenwick_pct")?,
        xg_for: row.try_get("xg_for")?,
        xg_against: row.try_get("xg_against")?,
        xg_pct: row.try_get("xg_pct")?,
        goals_above_expected: row.try_get("goals_above_expected")?,
        oz_start_pct: row.try_get("oz_start_pct")?,
        hd_chances_for: row.try_get("hd_chances_for")?,
        hd_chances_against: row.try_get("hd_chances_against")?,
    })
}
