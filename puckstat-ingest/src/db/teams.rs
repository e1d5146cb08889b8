//! Team (standings) persistence

use super::RowMeta;
use crate::models::Team;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

pub(crate) async fn stored_hash(
    conn: &mut SqliteConnection,
    team: &Team,
) -> Result<Option<String>, sqlx::Error> {
    sqlx::query_scalar("SELECT content_hash FROM teams WHERE team_abbrev = ?")
        .bind(&team.team_abbrev)
        .fetch_optional(conn)
        .await
}

pub(crate) async fn upsert(
    conn: &mut SqliteConnection,
    team: &Team,
    meta: &RowMeta<'_>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO teams (
            team_abbrev, name, conference, division, games_played, wins, losses,
            ot_losses, points, goal_differential,
            source, raw_data, content_hash, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(team_abbrev) DO UPDATE SET
            name = excluded.name,
            conference = excluded.conference,
            division = excluded.division,
            games_played = excluded.games_played,
            wins = excluded.wins,
            losses = excluded.losses,
            ot_losses = excluded.ot_losses,
            points = excluded.points,
            goal_differential = excluded.goal_differential,
            source = excluded.source,
            raw_data = excluded.raw_data,
            content_hash = excluded.content_hash,
            updated_at = MAX(teams.updated_at, excluded.updated_at)
        WHERE teams.content_hash <> excluded.content_hash
        "#,
    )
    .bind(&team.team_abbrev)
    .bind(&team.name)
    .bind(&team.conference)
    .bind(&team.division)
    .bind(team.games_played)
    .bind(team.wins)
    .bind(team.losses)
    .bind(team.ot_losses)
    .bind(team.points)
    .bind(team.goal_differential)
    .bind(meta.source)
    .bind(meta.raw_data)
    .bind(meta.content_hash)
    .bind(meta.updated_at)
    .execute(conn)
    .await?;

    Ok(())
}

pub(crate) fn from_row(row: &SqliteRow) -> Result<Team, sqlx::Error> {
    Ok(Team {
        team_abbrev: row.try_get("team_abbrev")?,
        name: row.try_get("name")?,
        conference: row.try_get("conference")?,
        division: row.try_get("division")?,
        games_played: row.try_get("games_played")?,
        wins: row.try_get("wins")?,
        losses: row.try_get("losses")?,
        ot_losses: row.try_get("ot_losses")?,
        points: row.try_get("points")?,
        goal_differential: row.try_get("goal_differential")?,
    })
}
