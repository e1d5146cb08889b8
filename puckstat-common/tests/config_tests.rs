//! Configuration loading and graceful degradation
//!
//! Uses serial_test: tests that touch PUCKSTAT_* environment variables run sequentially.

use puckstat_common::config::{
    default_data_folder, load_or_default, load_toml_config, resolve_database_path,
    resolve_data_folder, SourceOverrides, TomlConfig, DATABASE_FILE_NAME, DATA_FOLDER_ENV_VAR,
};
use serial_test::serial;
use std::env;
use std::path::PathBuf;
use tempfile::TempDir;

#[test]
fn test_parse_full_config() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("puckstat.toml");
    std::fs::write(
        &path,
        r#"
database_path = "/srv/puckstat/stats.db"
season = "20242025"
deadline_secs = 600

[logging]
level = "debug"

[sources.moneypuck]
requests_per_second = 0.25
max_retries = 5

[sources.puckpedia]
enabled = false
"#,
    )
    .unwrap();

    let config = load_toml_config(&path).unwrap();

    assert_eq!(config.database_path, Some(PathBuf::from("/srv/puckstat/stats.db")));
    assert_eq!(config.season.as_deref(), Some("20242025"));
    assert_eq!(config.deadline_secs, Some(600));
    assert_eq!(config.logging.level, "debug");
    assert_eq!(
        config.sources.get("moneypuck"),
        Some(&SourceOverrides {
            requests_per_second: Some(0.25),
            max_retries: Some(5),
            ..Default::default()
        })
    );
    assert_eq!(config.sources["puckpedia"].enabled, Some(false));
}

#[test]
fn test_empty_config_uses_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("puckstat.toml");
    std::fs::write(&path, "").unwrap();

    let config = load_toml_config(&path).unwrap();

    assert!(config.database_path.is_none());
    assert!(config.sources.is_empty());
    assert_eq!(config.logging.level, "info");
}

#[test]
fn test_malformed_config_is_config_error() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("puckstat.toml");
    std::fs::write(&path, "season = [unterminated").unwrap();

    let err = load_toml_config(&path).unwrap_err();
    assert!(err.to_string().contains("Configuration error"));
}

#[test]
fn test_explicit_missing_config_is_error() {
    let missing = PathBuf::from("/nonexistent/puckstat-test/puckstat.toml");
    assert!(load_or_default(Some(&missing)).is_err());
}

#[test]
fn test_cli_database_path_wins() {
    let config = TomlConfig {
        database_path: Some(PathBuf::from("/from/toml.db")),
        ..Default::default()
    };
    let cli = PathBuf::from("/from/cli.db");

    assert_eq!(resolve_database_path(Some(&cli), &config), cli);
    assert_eq!(
        resolve_database_path(None, &config),
        PathBuf::from("/from/toml.db")
    );
}

#[test]
#[serial]
fn test_data_folder_env_overrides_toml() {
    env::set_var(DATA_FOLDER_ENV_VAR, "/tmp/puckstat-env-folder");
    let config = TomlConfig {
        data_folder: Some(PathBuf::from("/tmp/puckstat-toml-folder")),
        ..Default::default()
    };

    assert_eq!(
        resolve_data_folder(&config),
        PathBuf::from("/tmp/puckstat-env-folder")
    );
    assert_eq!(
        resolve_database_path(None, &config),
        PathBuf::from("/tmp/puckstat-env-folder").join(DATABASE_FILE_NAME)
    );

    env::remove_var(DATA_FOLDER_ENV_VAR);
}

#[test]
#[serial]
fn test_data_folder_falls_back_to_default() {
    env::remove_var(DATA_FOLDER_ENV_VAR);

    let folder = resolve_data_folder(&TomlConfig::default());

    assert_eq!(folder, default_data_folder());
    assert!(!folder.as_os_str().is_empty());
}
