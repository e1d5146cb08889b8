//! Game persistence

use super::RowMeta;
use crate::models::Game;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

pub(crate) async fn stored_hash(
    conn: &mut SqliteConnection,
    game: &Game,
) -> Result<Option<String>, sqlx::Error> {
    sqlx::query_scalar("SELECT content_hash FROM games WHERE game_id = ?")
        .bind(game.game_id)
        .fetch_optional(conn)
        .await
}

pub(crate) async fn upsert(
    conn: &mut SqliteConnection,
    game: &Game,
    meta: &RowMeta<'_>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO games (
            game_id, season, game_date, game_type, home_team, away_team,
            home_score, away_score, game_state,
            source, raw_data, content_hash, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(game_id) DO UPDATE SET
            season = excluded.season,
            game_date = excluded.game_date,
            game_type = excluded.game_type,
            home_team = excluded.home_team,
            away_team = excluded.away_team,
            home_score = excluded.home_score,
            away_score = excluded.away_score,
            game_state = excluded.game_state,
            source = excluded.source,
            raw_data = excluded.raw_data,
            content_hash = excluded.content_hash,
            updated_at = MAX(games.updated_at, excluded.updated_at)
        WHERE games.content_hash <> excluded.content_hash
        "#,
    )
    .bind(game.game_id)
    .bind(&game.season)
    .bind(&game.game_date)
    .bind(game.game_type)
    .bind(&game.home_team)
    .bind(&game.away_team)
    .bind(game.home_score)
    .bind(game.away_score)
    .bind(&game.game_state)
    .bind(meta.source)
    .bind(meta.raw_data)
    .bind(meta.content_hash)
    .bind(meta.updated_at)
    .execute(conn)
    .await?;

    Ok(())
}

pub(crate) fn from_row(row: &SqliteRow) -> Result<Game, sqlx::Error> {
    Ok(Game {
        game_id: row.try_get("game_id")?,
        season: row.try_get("season")?,
        game_date: row.try_get("game_date")?,
        game_type: row.try_get("game_type")?,
        home_team: row.try_get("home_team")?,
        away_team: row.try_get("away_team")?,
        home_score: row.try_get("home_score")?,
        away_score: row.try_get("away_score")?,
        game_state: row.try_get("game_state")?,
    })
}
