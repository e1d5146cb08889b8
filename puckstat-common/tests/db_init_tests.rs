//! Database initialization: creation, reopening, schema and natural-key constraints

use puckstat_common::db::init::{
    create_schema, init_database, init_memory_database, ENTITY_TABLES, SCHEMA_VERSION,
};
use tempfile::TempDir;

#[tokio::test]
async fn test_database_creation_when_missing() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("nested").join("puckstat.db");

    let result = init_database(&db_path).await;

    assert!(result.is_ok(), "Database initialization failed: {:?}", result.err());
    assert!(db_path.exists(), "Database file was not created");
}

#[tokio::test]
async fn test_database_opens_existing() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("puckstat.db");

    let pool1 = init_database(&db_path).await.unwrap();
    pool1.close().await;

    let pool2 = init_database(&db_path).await;
    assert!(pool2.is_ok(), "Failed to open existing database: {:?}", pool2.err());
}

#[tokio::test]
async fn test_all_entity_tables_exist() {
    let pool = init_memory_database().await.unwrap();

    for table in ENTITY_TABLES {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name = ?)",
        )
        .bind(table)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert!(exists, "Table '{}' was not created", table);

        for column in ["source", "raw_data", "content_hash", "updated_at"] {
            let has_column: i64 = sqlx::query_scalar(&format!(
                "SELECT COUNT(*) FROM pragma_table_info('{}') WHERE name = ?",
                table
            ))
            .bind(column)
            .fetch_one(&pool)
            .await
            .unwrap();
            assert_eq!(has_column, 1, "Table '{}' is missing column '{}'", table, column);
        }
    }
}

#[tokio::test]
async fn test_create_schema_is_idempotent() {
    let pool = init_memory_database().await.unwrap();

    create_schema(&pool).await.unwrap();
    create_schema(&pool).await.unwrap();

    let versions: Vec<i64> = sqlx::query_scalar("SELECT version FROM schema_version")
        .fetch_all(&pool)
        .await
        .unwrap();
    assert_eq!(versions, vec![SCHEMA_VERSION]);
}

#[tokio::test]
async fn test_natural_key_unique_constraint_rejects_duplicates() {
    let pool = init_memory_database().await.unwrap();

    let insert = r#"
        INSERT INTO advanced_stats (player_id, season, situation, source, raw_data, content_hash, updated_at)
        VALUES (8478402, '20242025', 'all', 'moneypuck', '{}', 'h', '2024-10-04T00:00:00.000000Z')
    "#;

    sqlx::query(insert).execute(&pool).await.unwrap();
    let duplicate = sqlx::query(insert).execute(&pool).await;

    assert!(duplicate.is_err(), "Duplicate natural key must violate UNIQUE");
}

#[tokio::test]
async fn test_older_advanced_stats_table_gains_corsi_rel() {
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    sqlx::query(
        r#"
        CREATE TABLE advanced_stats (
            id INTEGER PRIMARY KEY,
            player_id INTEGER NOT NULL,
            season TEXT NOT NULL,
            situation TEXT NOT NULL,
            corsi_pct REAL,
            source TEXT NOT NULL,
            raw_data TEXT NOT NULL,
            content_hash TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE (player_id, season, situation)
        )
        "#,
    )
    .execute(&pool)
    .await
    .unwrap();

    create_schema(&pool).await.unwrap();
    create_schema(&pool).await.unwrap();

    let has_column: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM pragma_table_info('advanced_stats') WHERE name = 'corsi_rel'",
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(has_column, 1);
}
