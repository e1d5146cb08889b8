//! Idempotent persistence of normalized records
//!
//! One row per natural key per table. An upsert whose content hash matches the stored row
//! is a no-op and leaves `updated_at` alone; any other upsert replaces the value columns
//! and `raw_data`, with `updated_at` never moving backward.

use super::{advanced_stats, contracts, games, players, rosters, teams, RowMeta};
use crate::error::PersistenceError;
use crate::models::{EntityData, EntityKind, NaturalKey, NormalizedRecord};
use crate::utils::retry_on_lock;
use chrono::{DateTime, Utc};
use puckstat_common::time::{parse_db_timestamp, to_db_timestamp};
use sqlx::sqlite::SqliteRow;
use sqlx::{Connection, QueryBuilder, Row, Sqlite, SqliteConnection, SqlitePool};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Longest time a batch keeps retrying while the database is locked
const DEFAULT_MAX_LOCK_WAIT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
    Unchanged,
}

/// A record the repository refused; the rest of its batch is unaffected
#[derive(Debug)]
pub struct RecordFailure {
    pub key: NaturalKey,
    pub error: PersistenceError,
}

#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub failures: Vec<RecordFailure>,
}

impl BatchOutcome {
    fn tally(&mut self, outcome: UpsertOutcome) {
        match outcome {
            UpsertOutcome::Inserted => self.inserted += 1,
            UpsertOutcome::Updated => self.updated += 1,
            UpsertOutcome::Unchanged => self.unchanged += 1,
        }
    }

    pub fn persisted(&self) -> usize {
        self.inserted + self.updated + self.unchanged
    }
}

/// Row selection for [`Repository::query`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowFilter {
    pub season: Option<String>,
    pub team_abbrev: Option<String>,
    pub player_id: Option<i64>,
    pub limit: Option<u32>,
}

impl RowFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn season(mut self, season: impl Into<String>) -> Self {
        self.season = Some(season.into());
        self
    }

    pub fn team(mut self, team_abbrev: impl Into<String>) -> Self {
        self.team_abbrev = Some(team_abbrev.into());
        self
    }

    pub fn player(mut self, player_id: i64) -> Self {
        self.player_id = Some(player_id);
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// A stored entity with its provenance columns
#[derive(Debug, Clone, PartialEq)]
pub struct PersistedRow {
    pub entity: EntityData,
    pub source: String,
    pub raw_data: String,
    pub content_hash: String,
    pub updated_at: DateTime<Utc>,
}

impl PersistedRow {
    pub fn kind(&self) -> EntityKind {
        self.entity.kind()
    }

    pub fn natural_key(&self) -> NaturalKey {
        self.entity.natural_key()
    }
}

#[derive(Debug, Clone)]
pub struct Repository {
    pool: SqlitePool,
    max_lock_wait: Duration,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            max_lock_wait: DEFAULT_MAX_LOCK_WAIT,
        }
    }

    pub fn with_max_lock_wait(mut self, max_lock_wait: Duration) -> Self {
        self.max_lock_wait = max_lock_wait;
        self
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Upsert one record in its own transaction
    pub async fn upsert(&self, record: &NormalizedRecord) -> Result<UpsertOutcome, PersistenceError> {
        self.upsert_at(record, Utc::now()).await
    }

    /// Upsert one record stamping `updated_at` with `now`
    pub async fn upsert_at(
        &self,
        record: &NormalizedRecord,
        now: DateTime<Utc>,
    ) -> Result<UpsertOutcome, PersistenceError> {
        let updated_at = to_db_timestamp(now);
        let updated_at = updated_at.as_str();
        retry_on_lock("upsert", self.max_lock_wait, || {
            self.upsert_once(record, updated_at)
        })
        .await
    }

    async fn upsert_once(
        &self,
        record: &NormalizedRecord,
        updated_at: &str,
    ) -> Result<UpsertOutcome, PersistenceError> {
        let mut tx = self.pool.begin().await?;
        let outcome = upsert_in(&mut tx, record, updated_at).await?;
        tx.commit().await?;
        Ok(outcome)
    }

    /// Upsert a batch in one transaction, one savepoint per record
    ///
    /// A record that fails rolls back alone and is reported in
    /// [`BatchOutcome::failures`]. Lock contention aborts and retries the whole batch.
    pub async fn upsert_batch(
        &self,
        records: &[NormalizedRecord],
    ) -> Result<BatchOutcome, PersistenceError> {
        self.upsert_batch_at(records, Utc::now()).await
    }

    pub async fn upsert_batch_at(
        &self,
        records: &[NormalizedRecord],
        now: DateTime<Utc>,
    ) -> Result<BatchOutcome, PersistenceError> {
        if records.is_empty() {
            return Ok(BatchOutcome::default());
        }

        let updated_at = to_db_timestamp(now);
        let updated_at = updated_at.as_str();
        let outcome = retry_on_lock("upsert batch", self.max_lock_wait, || {
            self.upsert_batch_once(records, updated_at)
        })
        .await?;

        info!(
            records = records.len(),
            inserted = outcome.inserted,
            updated = outcome.updated,
            unchanged = outcome.unchanged,
            failed = outcome.failures.len(),
            "Persisted batch"
        );

        Ok(outcome)
    }

    async fn upsert_batch_once(
        &self,
        records: &[NormalizedRecord],
        updated_at: &str,
    ) -> Result<BatchOutcome, PersistenceError> {
        let mut tx = self.pool.begin().await?;
        let mut outcome = BatchOutcome::default();

        for record in records {
            let mut savepoint = Connection::begin(&mut *tx).await?;

            match upsert_in(&mut savepoint, record, updated_at).await {
                Ok(result) => {
                    savepoint.commit().await?;
                    outcome.tally(result);
                }
                Err(e) if e.is_lock_contention() => return Err(e),
                Err(e) => {
                    savepoint.rollback().await?;
                    let key = record.natural_key();
                    warn!(key = %key, error = %e, "Record rejected by storage");
                    outcome.failures.push(RecordFailure { key, error: e });
                }
            }
        }

        tx.commit().await?;
        Ok(outcome)
    }

    /// Rows of one entity kind, in insertion order
    pub async fn query(
        &self,
        kind: EntityKind,
        filter: &RowFilter,
    ) -> Result<Vec<PersistedRow>, PersistenceError> {
        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT * FROM {} WHERE 1 = 1", kind.table_name()));

        if let Some(season) = &filter.season {
            require_column(kind, "season")?;
            builder.push(" AND season = ").push_bind(season.clone());
        }

        if let Some(team) = &filter.team_abbrev {
            if kind == EntityKind::Game {
                builder
                    .push(" AND (home_team = ")
                    .push_bind(team.clone())
                    .push(" OR away_team = ")
                    .push_bind(team.clone())
                    .push(")");
            } else {
                require_column(kind, "team_abbrev")?;
                builder.push(" AND team_abbrev = ").push_bind(team.clone());
            }
        }

        if let Some(player_id) = filter.player_id {
            require_column(kind, "player_id")?;
            builder.push(" AND player_id = ").push_bind(player_id);
        }

        builder.push(" ORDER BY id");

        if let Some(limit) = filter.limit {
            builder.push(" LIMIT ").push_bind(i64::from(limit));
        }

        let rows = builder.build().fetch_all(&self.pool).await?;
        debug!(table = kind.table_name(), rows = rows.len(), "Queried rows");

        rows.iter().map(|row| persisted_row(kind, row)).collect()
    }

    /// Row count per table
    pub async fn counts(&self) -> Result<BTreeMap<EntityKind, i64>, PersistenceError> {
        let mut counts = BTreeMap::new();
        for kind in EntityKind::ALL {
            let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", kind.table_name()))
                .fetch_one(&self.pool)
                .await?;
            counts.insert(kind, count);
        }
        Ok(counts)
    }
}

async fn upsert_in(
    conn: &mut SqliteConnection,
    record: &NormalizedRecord,
    updated_at: &str,
) -> Result<UpsertOutcome, PersistenceError> {
    let content_hash = record.content_hash();

    let stored = match &record.entity {
        EntityData::Player(p) => players::stored_hash(conn, p).await?,
        EntityData::Team(t) => teams::stored_hash(conn, t).await?,
        EntityData::Game(g) => games::stored_hash(conn, g).await?,
        EntityData::Contract(c) => contracts::stored_hash(conn, c).await?,
        EntityData::AdvancedStat(s) => advanced_stats::stored_hash(conn, s).await?,
        EntityData::RosterEntry(r) => rosters::stored_hash(conn, r).await?,
    };

    if stored.as_deref() == Some(content_hash.as_str()) {
        return Ok(UpsertOutcome::Unchanged);
    }

    let meta = RowMeta {
        source: &record.source,
        raw_data: &record.raw_payload,
        content_hash: &content_hash,
        updated_at,
    };

    match &record.entity {
        EntityData::Player(p) => players::upsert(conn, p, &meta).await?,
        EntityData::Team(t) => teams::upsert(conn, t, &meta).await?,
        EntityData::Game(g) => games::upsert(conn, g, &meta).await?,
        EntityData::Contract(c) => contracts::upsert(conn, c, &meta).await?,
        EntityData::AdvancedStat(s) => advanced_stats::upsert(conn, s, &meta).await?,
        EntityData::RosterEntry(r) => rosters::upsert(conn, r, &meta).await?,
    }

    Ok(if stored.is_some() {
        UpsertOutcome::Updated
    } else {
        UpsertOutcome::Inserted
    })
}

fn require_column(kind: EntityKind, column: &str) -> Result<(), PersistenceError> {
    let present = match column {
        "season" => matches!(
            kind,
            EntityKind::Game | EntityKind::Contract | EntityKind::AdvancedStat | EntityKind::RosterEntry
        ),
        "team_abbrev" => kind != EntityKind::Game,
        "player_id" => matches!(
            kind,
            EntityKind::Player | EntityKind::AdvancedStat | EntityKind::RosterEntry
        ),
        _ => false,
    };

    if present {
        Ok(())
    } else {
        Err(PersistenceError::InvalidQuery(format!(
            "{} has no {} column",
            kind.table_name(),
            column
        )))
    }
}

fn persisted_row(kind: EntityKind, row: &SqliteRow) -> Result<PersistedRow, PersistenceError> {
    let entity = match kind {
        EntityKind::Player => EntityData::Player(players::from_row(row)?),
        EntityKind::Team => EntityData::Team(teams::from_row(row)?),
        EntityKind::Game => EntityData::Game(games::from_row(row)?),
        EntityKind::Contract => EntityData::Contract(contracts::from_row(row)?),
        EntityKind::AdvancedStat => EntityData::AdvancedStat(advanced_stats::from_row(row)?),
        EntityKind::RosterEntry => EntityData::RosterEntry(rosters::from_row(row)?),
    };

    let updated_at: String = row.try_get("updated_at")?;

    Ok(PersistedRow {
        entity,
        source: row.try_get("source")?,
        raw_data: row.try_get("raw_data")?,
        content_hash: row.try_get("content_hash")?,
        updated_at: parse_db_timestamp(&updated_at)
            .map_err(|e| PersistenceError::Corrupt(e.to_string()))?,
    })
}
