//! Contract persistence

use super::RowMeta;
use crate::models::Contract;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

pub(crate) async fn stored_hash(
    conn: &mut SqliteConnection,
    contract: &Contract,
) -> Result<Option<String>, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT content_hash FROM contracts WHERE team_abbrev = ? AND player_name = ? AND season = ?",
    )
    .bind(&contract.team_abbrev)
    .bind(&contract.player_name)
    .bind(&contract.season)
    .fetch_optional(conn)
    .await
}

pub(crate) async fn upsert(
    conn: &mut SqliteConnection,
    contract: &Contract,
    meta: &RowMeta<'_>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO contracts (
            team_abbrev, player_name, season, cap_hit, salary, aav, total_years,
            expiry_status, has_nmc, has_ntc,
            source, raw_data, content_hash, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(team_abbrev, player_name, season) DO UPDATE SET
            cap_hit = excluded.cap_hit,
            salary = excluded.salary,
            aav = excluded.aav,
            total_years = excluded.total_years,
            expiry_status = excluded.expiry_status,
            has_nmc = excluded.has_nmc,
            has_ntc = excluded.has_ntc,
            source = excluded.source,
            raw_data = excluded.raw_data,
            content_hash = excluded.content_hash,
            updated_at = MAX(contracts.updated_at, excluded.updated_at)
        WHERE contracts.content_hash <> excluded.content_hash
        "#,
    )
    .bind(&contract.team_abbrev)
    .bind(&contract.player_name)
    .bind(&contract.season)
    .bind(contract.cap_hit)
    .bind(contract.salary)
    .bind(contract.aav)
    .bind(contract.total_years)
    .bind(&contract.expiry_status)
    .bind(contract.has_nmc)
    .bind(contract.has_ntc)
    .bind(meta.source)
    .bind(meta.raw_data)
    .bind(meta.content_hash)
    .bind(meta.updated_at)
    .execute(conn)
    .await?;

    Ok(())
}

pub(crate) fn from_row(row: &SqliteRow) -> Result<Contract, sqlx::Error> {
    Ok(Contract {
        team_abbrev: row.try_get("team_abbrev")?,
        player_name: row.try_get("player_name")?,
        season: row.try_get("season")?,
        cap_hit: row.try_get("cap_hit")?,
        salary: row.try_get("salary")?,
        aav: row.try_get("aav")?,
        total_years: row.try_get("total_years")?,
        expiry_status: row.try_get("expiry_status")?,
        has_nmc: row.try_get("has_nmc")?,
        has_ntc: row.try_get("has_ntc")?,
    })
}
