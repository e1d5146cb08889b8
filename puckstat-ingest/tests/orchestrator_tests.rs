//! Scrape pass integration tests
//!
//! Full passes over scripted transports into an in-memory database.

mod helpers;

use helpers::{moneypuck_skaters_csv, schedule_json, test_repository, ScriptedTransport, StaticAdapter};
use puckstat_ingest::adapters::{MoneyPuckAdapter, NhlApiAdapter};
use puckstat_ingest::db::{Repository, RowFilter};
use puckstat_ingest::error::FetchError;
use puckstat_ingest::models::{EntityKind, FailureStage, PassState};
use puckstat_common::db::init_database;
use puckstat_ingest::services::{
    DefaultTransport, FetchClient, FetchPolicy, Orchestrator, RateLimiter, RateSettings,
    RetryPolicy,
};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn fast_policy() -> FetchPolicy {
    FetchPolicy {
        timeout: Duration::from_secs(10),
        retry: RetryPolicy::new(1)
            .with_base_delay(Duration::from_millis(10))
            .with_jitter(Duration::ZERO),
    }
}

fn fetch_client(transport: Arc<ScriptedTransport>, sources: &[(&str, f64)]) -> Arc<FetchClient> {
    let mut limiter = RateLimiter::new();
    for (source, rps) in sources {
        limiter.register(*source, RateSettings::new(*rps));
    }
    Arc::new(FetchClient::new(limiter, transport).with_default_policy(fast_policy()))
}

fn server_error() -> FetchError {
    FetchError::ServerError {
        status: 502,
        message: "bad gateway".to_string(),
    }
}

async fn player_count(repo: &Repository) -> i64 {
    repo.counts().await.unwrap()[&EntityKind::Player]
}

#[tokio::test]
async fn test_partial_source_failure_still_completes() {
    let repo = test_repository().await;
    let transport = Arc::new(
        ScriptedTransport::new()
            .ok("https://a.test/1", "1\n2\n")
            .fail("https://a.test/2", server_error())
            .ok("https://b.test/1", "3\n"),
    );
    let orchestrator = Orchestrator::new(
        fetch_client(transport, &[("alpha", 50.0), ("beta", 50.0)]),
        repo.clone(),
    )
    .register(
        Arc::new(StaticAdapter::new("alpha", &["https://a.test/1", "https://a.test/2"])),
        2,
    )
    .register(Arc::new(StaticAdapter::new("beta", &["https://b.test/1"])), 1);

    let report = orchestrator.run(CancellationToken::new()).await;

    assert_eq!(report.state, PassState::Completed);
    assert_eq!(report.exit_code(), 0);
    let alpha = report.source("alpha").unwrap();
    assert_eq!(alpha.targets_succeeded, 1);
    assert_eq!(alpha.targets_failed, 1);
    assert_eq!(report.failures_at(FailureStage::Fetch).count(), 1);
    assert_eq!(report.inserted(), 3);
    assert_eq!(player_count(&repo).await, 3);
}

#[tokio::test]
async fn test_every_source_failing_fails_pass() {
    let repo = test_repository().await;
    let transport = Arc::new(
        ScriptedTransport::new()
            .fail("https://a.test/1", server_error())
            .fail(
                "https://b.test/1",
                FetchError::ClientError {
                    status: 403,
                    message: "forbidden".to_string(),
                },
            ),
    );
    let orchestrator = Orchestrator::new(
        fetch_client(transport, &[("alpha", 50.0), ("beta", 50.0)]),
        repo.clone(),
    )
    .register(Arc::new(StaticAdapter::new("alpha", &["https://a.test/1"])), 1)
    .register(Arc::new(StaticAdapter::new("beta", &["https://b.test/1"])), 1);

    let report = orchestrator.run(CancellationToken::new()).await;

    assert_eq!(report.state, PassState::Failed);
    assert_eq!(report.exit_code(), 1);
    assert_eq!(report.sources_fully_failed(), vec!["alpha", "beta"]);
    assert_eq!(player_count(&repo).await, 0);
}

#[tokio::test]
async fn test_pass_without_sources_fails() {
    let repo = test_repository().await;
    let orchestrator = Orchestrator::new(
        fetch_client(Arc::new(ScriptedTransport::new()), &[]),
        repo,
    );

    let report = orchestrator.run(CancellationToken::new()).await;

    assert_eq!(report.state, PassState::Failed);
    assert!(report.ended_at.is_some());
}

#[tokio::test]
async fn test_malformed_csv_row_reported_rest_persisted() {
    let repo = test_repository().await;
    let base = "https://mp.test";
    let skaters = format!("{}/moneypuck/playerData/seasonSummary/2024/regular/skaters.csv", base);
    let goalies = format!("{}/moneypuck/playerData/seasonSummary/2024/regular/goalies.csv", base);
    let transport = Arc::new(
        ScriptedTransport::new()
            .ok(&skaters, moneypuck_skaters_csv(100, &[57]))
            .ok(&goalies, "playerId,name,situation,xGoals,goals\n"),
    );
    let adapter = MoneyPuckAdapter::new(base, "20242025").unwrap();
    let orchestrator = Orchestrator::new(fetch_client(transport, &[("moneypuck", 50.0)]), repo.clone())
        .register(Arc::new(adapter), 1);

    let report = orchestrator.run(CancellationToken::new()).await;

    assert_eq!(report.state, PassState::Completed);
    let parse_failures: Vec<_> = report.failures_at(FailureStage::Parse).collect();
    assert_eq!(parse_failures.len(), 1);
    assert_eq!(parse_failures[0].target.as_deref(), Some("skaters"));
    assert!(parse_failures[0]
        .to_string()
        .starts_with("[parse] moneypuck skaters: row "));

    let rows = repo
        .query(EntityKind::AdvancedStat, &RowFilter::new().season("20242025"))
        .await
        .unwrap();
    assert_eq!(rows.len(), 99);
    assert!(rows.iter().all(|r| r.source == "moneypuck"));
}

#[tokio::test]
async fn test_rate_budget_spaces_source_requests() {
    let repo = test_repository().await;
    let locations: Vec<String> = (1..=5).map(|i| format!("https://slow.test/{}", i)).collect();
    let mut transport = ScriptedTransport::new();
    for (i, location) in locations.iter().enumerate() {
        transport = transport.ok(location, format!("{}\n", i + 1));
    }
    let transport = Arc::new(transport);
    let refs: Vec<&str> = locations.iter().map(String::as_str).collect();
    let orchestrator = Orchestrator::new(
        fetch_client(transport.clone(), &[("slow", 2.0)]),
        repo.clone(),
    )
    .register(Arc::new(StaticAdapter::new("slow", &refs)), 5);

    let started = tokio::time::Instant::now();
    let report = orchestrator.run(CancellationToken::new()).await;

    assert_eq!(report.state, PassState::Completed);
    assert!(started.elapsed() >= Duration::from_secs(2));

    let calls = transport.calls();
    assert_eq!(calls.len(), 5);
    for pair in calls.windows(2) {
        assert!(pair[1].1 - pair[0].1 >= Duration::from_millis(490));
    }
    assert_eq!(player_count(&repo).await, 5);
}

async fn run_with_bound(max_in_flight: usize) -> (Arc<ScriptedTransport>, Duration) {
    let repo = test_repository().await;
    let locations: Vec<String> = (1..=6).map(|i| format!("https://wide.test/{}", i)).collect();
    let mut transport = ScriptedTransport::new().with_latency(Duration::from_millis(200));
    for (i, location) in locations.iter().enumerate() {
        transport = transport.ok(location, format!("{}\n", i + 1));
    }
    let transport = Arc::new(transport);
    let refs: Vec<&str> = locations.iter().map(String::as_str).collect();
    let orchestrator = Orchestrator::new(fetch_client(transport.clone(), &[("wide", 1000.0)]), repo)
        .register(Arc::new(StaticAdapter::new("wide", &refs)), max_in_flight);

    let started = tokio::time::Instant::now();
    let report = orchestrator.run(CancellationToken::new()).await;
    let elapsed = started.elapsed();

    assert_eq!(report.state, PassState::Completed);
    assert_eq!(report.inserted(), 6);
    (transport, elapsed)
}

#[tokio::test]
async fn test_single_in_flight_serializes_reads() {
    let (transport, elapsed) = run_with_bound(1).await;

    assert_eq!(transport.peak_in_flight(), 1);
    assert!(elapsed >= Duration::from_millis(1200));
}

#[tokio::test]
async fn test_in_flight_bound_allows_overlap_up_to_limit() {
    let (transport, elapsed) = run_with_bound(3).await;

    assert!(transport.peak_in_flight() > 1);
    assert!(transport.peak_in_flight() <= 3);
    assert!(elapsed < Duration::from_millis(1200));
}

#[tokio::test]
async fn test_cancellation_keeps_completed_records() {
    let repo = test_repository().await;
    let transport = Arc::new(
        ScriptedTransport::new()
            .ok("https://c.test/1", "1\n")
            .ok("https://c.test/2", "2\n")
            .hang("https://c.test/3"),
    );
    let orchestrator = Orchestrator::new(fetch_client(transport, &[("cut", 50.0)]), repo.clone())
        .register(
            Arc::new(StaticAdapter::new(
                "cut",
                &["https://c.test/1", "https://c.test/2", "https://c.test/3"],
            )),
            1,
        );

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        trigger.cancel();
    });

    let report = orchestrator.run(cancel).await;

    assert!(report.cancelled);
    assert_eq!(report.state, PassState::Completed);
    assert!(report.source("cut").unwrap().cancelled);
    assert_eq!(report.inserted(), 2);
    assert_eq!(player_count(&repo).await, 2);
}

#[tokio::test]
async fn test_deadline_stops_collection() {
    let repo = test_repository().await;
    let transport = Arc::new(ScriptedTransport::new().hang("https://d.test/1"));
    let orchestrator = Orchestrator::new(fetch_client(transport, &[("late", 50.0)]), repo.clone())
        .register(Arc::new(StaticAdapter::new("late", &["https://d.test/1"])), 1)
        .with_deadline(Duration::from_millis(200));

    let started = tokio::time::Instant::now();
    let report = orchestrator.run(CancellationToken::new()).await;

    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(report.cancelled);
    // nothing collected before the cutoff
    assert_eq!(report.state, PassState::Failed);
}

#[tokio::test]
async fn test_game_seen_in_two_schedules_stored_once() {
    let repo = test_repository().await;
    let base = "https://nhl.test/v1";
    let shared = (2024020001, "EDM", "WPG", 6, 0);
    let transport = Arc::new(
        ScriptedTransport::new()
            .fail(
                &format!("{}/standings/now", base),
                FetchError::ClientError {
                    status: 404,
                    message: "gone".to_string(),
                },
            )
            .ok(
                &format!("{}/club-schedule-season/EDM/20242025", base),
                schedule_json(&[shared, (2024020015, "VAN", "EDM", 2, 3)]),
            )
            .ok(
                &format!("{}/club-schedule-season/WPG/20242025", base),
                schedule_json(&[shared]),
            ),
    );
    let adapter =
        NhlApiAdapter::new(base, "20242025").with_teams(vec!["EDM".to_string(), "WPG".to_string()]);
    let orchestrator = Orchestrator::new(fetch_client(transport, &[("nhl_api", 50.0)]), repo.clone())
        .register(Arc::new(adapter), 2);

    let report = orchestrator.run(CancellationToken::new()).await;

    assert_eq!(report.state, PassState::Completed);
    assert_eq!(report.records_produced(), 3);
    assert_eq!(report.inserted(), 2);
    assert_eq!(report.unchanged(), 1);

    let games = repo
        .query(EntityKind::Game, &RowFilter::new().team("WPG"))
        .await
        .unwrap();
    assert_eq!(games.len(), 1);
}

#[tokio::test]
async fn test_second_pass_reports_unchanged() {
    let repo = test_repository().await;
    let transport = Arc::new(ScriptedTransport::new().ok("https://a.test/1", "1\n2\n3\n"));
    let orchestrator = Orchestrator::new(fetch_client(transport, &[("alpha", 50.0)]), repo.clone())
        .register(Arc::new(StaticAdapter::new("alpha", &["https://a.test/1"])), 1);

    let first = orchestrator.run(CancellationToken::new()).await;
    let second = orchestrator.run(CancellationToken::new()).await;

    assert_eq!(first.inserted(), 3);
    assert_eq!(second.inserted(), 0);
    assert_eq!(second.unchanged(), 3);
    assert_ne!(first.pass_id, second.pass_id);
    assert_eq!(player_count(&repo).await, 3);
}

#[tokio::test]
async fn test_csv_drop_folder_into_database_file() {
    let drop_dir = tempfile::tempdir().unwrap();
    let season_dir = drop_dir
        .path()
        .join("moneypuck/playerData/seasonSummary/2024/regular");
    std::fs::create_dir_all(&season_dir).unwrap();
    std::fs::write(season_dir.join("skaters.csv"), moneypuck_skaters_csv(4, &[])).unwrap();
    // goalies.csv missing: permanent FileNotFound for that target only

    let db_dir = tempfile::tempdir().unwrap();
    let pool = init_database(&db_dir.path().join("puckstat.db")).await.unwrap();
    let repo = Repository::new(pool);

    let limiter = RateLimiter::new().with_source("moneypuck", RateSettings::new(50.0));
    let client = FetchClient::new(limiter, Arc::new(DefaultTransport::new().unwrap()))
        .with_default_policy(fast_policy());
    let adapter =
        MoneyPuckAdapter::new(drop_dir.path().to_str().unwrap(), "20242025").unwrap();
    let orchestrator =
        Orchestrator::new(Arc::new(client), repo.clone()).register(Arc::new(adapter), 2);

    let report = orchestrator.run(CancellationToken::new()).await;

    assert_eq!(report.state, PassState::Completed);
    let summary = report.source("moneypuck").unwrap();
    assert_eq!(summary.targets_succeeded, 1);
    assert_eq!(summary.targets_failed, 1);
    assert_eq!(report.inserted(), 4);
    assert_eq!(
        repo.counts().await.unwrap()[&EntityKind::AdvancedStat],
        4
    );
}
