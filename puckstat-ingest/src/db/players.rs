//! Player persistence

use super::RowMeta;
use crate::models::Player;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

pub(crate) async fn stored_hash(
    conn: &mut SqliteConnection,
    player: &Player,
) -> Result<Option<String>, sqlx::Error> {
    sqlx::query_scalar("SELECT content_hash FROM players WHERE player_id = ?")
        .bind(player.player_id)
        .fetch_optional(conn)
        .await
}

pub(crate) async fn upsert(
    conn: &mut SqliteConnection,
    player: &Player,
    meta: &RowMeta<'_>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO players (
            player_id, first_name, last_name, position, team_abbrev, shoots_catches,
            birth_date, birth_country, height_inches, weight_pounds,
            source, raw_data, content_hash, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(player_id) DO UPDATE SET
            first_name = excluded.first_name,
            last_name = excluded.last_name,
            position = excluded.position,
            team_abbrev = excluded.team_abbrev,
            shoots_catches = excluded.shoots_catches,
            birth_date = excluded.birth_date,
            birth_country = excluded.birth_country,
            height_inches = excluded.height_inches,
            weight_pounds = excluded.weight_pounds,
            source = excluded.source,
            raw_data = excluded.raw_data,
            content_hash = excluded.content_hash,
            updated_at = MAX(players.updated_at, excluded.updated_at)
        WHERE players.content_hash <> excluded.content_hash
        "#,
    )
    .bind(player.player_id)
    .bind(&player.first_name)
    .bind(&player.last_name)
    .bind(&player.position)
    .bind(&player.team_abbrev)
    .bind(&player.shoots_catches)
    .bind(&player.birth_date)
    .bind(&player.birth_country)
    .bind(player.height_inches)
    .bind(player.weight_pounds)
    .bind(meta.source)
    .bind(meta.raw_data)
    .bind(meta.content_hash)
    .bind(meta.updated_at)
    .execute(conn)
    .await?;

    Ok(())
}

pub(crate) fn from_row(row: &SqliteRow) -> Result<Player, sqlx::Error> {
    Ok(Player {
        player_id: row.try_get("player_id")?,
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        position: row.try_get("position")?,
        team_abbrev: row.try_get("team_abbrev")?,
        shoots_catches: row.try_get("shoots_catches")?,
        birth_date: row.try_get("birth_date")?,
        birth_country: row.try_get("birth_country")?,
        height_inches: row.try_get("height_inches")?,
        weight_pounds: row.try_get("weight_pounds")?,
    })
}
