//! Scrape pass orchestration
//!
//! One pass walks every registered source concurrently. Within a source, targets are
//! fetched through the shared [`FetchClient`] (which applies the source's rate budget and
//! retry policy) with at most `max_in_flight` requests outstanding, and each successful
//! payload is handed to the adapter's parser. Once collection ends, normally or by
//! cancellation, everything parsed so far is written through the [`Repository`].
//!
//! Failures never abort a pass: each one lands in the [`PassReport`] tagged with the stage
//! it happened in.

use crate::adapters::{build_adapter, ParsedBatch, SourceAdapter};
use crate::config::IngestConfig;
use crate::db::Repository;
use crate::error::ParseError;
use crate::models::{
    FailureEntry, FailureStage, FetchResult, NormalizedRecord, PassReport, PassState,
    SourceSummary,
};
use crate::services::fetch_client::{DefaultTransport, FetchClient};
use crate::services::rate_limiter::RateLimiter;
use futures::future::join_all;
use futures::stream::{self, StreamExt};
use puckstat_common::{Error, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

struct RegisteredSource {
    adapter: Arc<dyn SourceAdapter>,
    max_in_flight: usize,
}

/// What one source produced before persistence
struct Collection {
    summary: SourceSummary,
    failures: Vec<FailureEntry>,
    records: Vec<NormalizedRecord>,
}

impl Collection {
    fn new(source: &str) -> Self {
        Self {
            summary: SourceSummary::new(source),
            failures: Vec::new(),
            records: Vec::new(),
        }
    }

    fn failure(&mut self, stage: FailureStage, target: Option<&str>, reason: String) {
        self.failures.push(FailureEntry {
            source: self.summary.source.clone(),
            stage,
            target: target.map(str::to_string),
            record_key: None,
            reason,
        });
    }

    fn absorb(&mut self, result: FetchResult, parsed: Option<std::result::Result<ParsedBatch, ParseError>>) {
        let resource = result.target.resource.clone();

        let parsed = match (result.error(), parsed) {
            (Some(error), _) => {
                self.summary.targets_failed += 1;
                self.failure(FailureStage::Fetch, Some(&resource), error.to_string());
                return;
            }
            (None, Some(parsed)) => parsed,
            (None, None) => return,
        };

        match parsed {
            Ok(batch) => {
                self.summary.targets_succeeded += 1;
                self.summary.records_produced += batch.records.len();
                self.summary.records_rejected += batch.rejected.len();
                for rejected in batch.rejected {
                    warn!(source = %self.summary.source, resource = %resource, error = %rejected, "Rejected row");
                    self.failure(FailureStage::Parse, Some(&resource), rejected.to_string());
                }
                self.records.extend(batch.records);
            }
            Err(e) => {
                warn!(source = %self.summary.source, resource = %resource, error = %e, "Unusable payload");
                self.summary.targets_failed += 1;
                self.failure(FailureStage::Parse, Some(&resource), e.to_string());
            }
        }
    }
}

pub struct Orchestrator {
    sources: Vec<RegisteredSource>,
    fetch_client: Arc<FetchClient>,
    repository: Repository,
    deadline: Option<Duration>,
}

impl Orchestrator {
    pub fn new(fetch_client: Arc<FetchClient>, repository: Repository) -> Self {
        Self {
            sources: Vec::new(),
            fetch_client,
            repository,
            deadline: None,
        }
    }

    /// Add a source; `max_in_flight` bounds its concurrent fetches (minimum 1)
    pub fn register(mut self, adapter: Arc<dyn SourceAdapter>, max_in_flight: usize) -> Self {
        self.sources.push(RegisteredSource {
            adapter,
            max_in_flight: max_in_flight.max(1),
        });
        self
    }

    /// Stop collecting once this much time has passed since the pass started
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Wire adapters, rate budgets and fetch policies for every enabled source
    pub fn from_config(config: &IngestConfig, repository: Repository) -> Result<Self> {
        let mut rate_limiter = RateLimiter::new();
        let mut registered = Vec::new();

        for (id, settings) in config.enabled_sources() {
            rate_limiter.register(id, settings.rate_settings());
            registered.push((id, settings, build_adapter(id, settings, &config.season)?));
        }

        let transport = DefaultTransport::new()
            .map_err(|e| Error::Internal(format!("HTTP client setup failed: {}", e)))?;
        let mut fetch_client = FetchClient::new(rate_limiter, Arc::new(transport));
        for (id, settings, _) in &registered {
            fetch_client = fetch_client.with_policy(*id, settings.fetch_policy());
        }

        let mut orchestrator = Self::new(Arc::new(fetch_client), repository);
        for (_, settings, adapter) in registered {
            orchestrator = orchestrator.register(adapter, settings.max_in_flight);
        }
        if let Some(deadline) = config.deadline {
            orchestrator = orchestrator.with_deadline(deadline);
        }

        Ok(orchestrator)
    }

    /// Run one pass to completion, cancellation, or deadline
    ///
    /// Cancelling `cancel` stops new fetches and abandons in-flight ones; records parsed
    /// before that point are still persisted and counted.
    pub async fn run(&self, cancel: CancellationToken) -> PassReport {
        let mut report = PassReport::new();
        report.transition_to(PassState::Running);

        info!(
            pass_id = %report.pass_id,
            sources = self.sources.len(),
            "Starting scrape pass"
        );

        let pass_token = cancel.child_token();
        let deadline_watcher = self.deadline.map(|deadline| {
            let token = pass_token.clone();
            tokio::spawn(async move {
                tokio::select! {
                    _ = tokio::time::sleep(deadline) => {
                        warn!(deadline_secs = deadline.as_secs_f64(), "Pass deadline reached, cancelling");
                        token.cancel();
                    }
                    _ = token.cancelled() => {}
                }
            })
        });

        let collections =
            join_all(self.sources.iter().map(|source| self.collect(source, &pass_token))).await;

        if let Some(watcher) = deadline_watcher {
            watcher.abort();
        }
        report.cancelled = pass_token.is_cancelled();

        for mut collection in collections {
            self.persist(&mut collection).await;
            report.sources.push(collection.summary);
            report.failures.extend(collection.failures);
        }

        let state = report.resolve_state();
        report.transition_to(state);

        info!(
            pass_id = %report.pass_id,
            state = ?report.state,
            cancelled = report.cancelled,
            produced = report.records_produced(),
            inserted = report.inserted(),
            updated = report.updated(),
            unchanged = report.unchanged(),
            failed = report.records_failed(),
            "Scrape pass finished"
        );
        for source in report.sources_fully_failed() {
            error!(source = %source, "Source produced nothing");
        }

        report
    }

    async fn collect(&self, source: &RegisteredSource, cancel: &CancellationToken) -> Collection {
        let adapter = source.adapter.as_ref();
        let source_id = adapter.source_id();
        let client = self.fetch_client.as_ref();
        let mut collection = Collection::new(source_id);

        let mut fetches = stream::iter(adapter.targets())
            .map(move |target| async move {
                let result = client.fetch(source_id, &target).await;
                let parsed = result.is_success().then(|| adapter.parse(&result));
                (result, parsed)
            })
            .buffer_unordered(source.max_in_flight);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!(source = %source_id, "Collection cancelled");
                    collection.summary.cancelled = true;
                    break;
                }
                next = fetches.next() => match next {
                    Some((result, parsed)) => collection.absorb(result, parsed),
                    None => break,
                },
            }
        }

        debug!(
            source = %source_id,
            succeeded = collection.summary.targets_succeeded,
            failed = collection.summary.targets_failed,
            records = collection.records.len(),
            "Collection finished"
        );
        collection
    }

    async fn persist(&self, collection: &mut Collection) {
        let records = std::mem::take(&mut collection.records);
        if records.is_empty() {
            return;
        }

        match self.repository.upsert_batch(&records).await {
            Ok(outcome) => {
                let summary = &mut collection.summary;
                summary.inserted += outcome.inserted;
                summary.updated += outcome.updated;
                summary.unchanged += outcome.unchanged;
                summary.persist_failed += outcome.failures.len();

                for failure in outcome.failures {
                    collection.failures.push(FailureEntry {
                        source: summary.source.clone(),
                        stage: FailureStage::Persist,
                        target: None,
                        record_key: Some(failure.key.to_string()),
                        reason: failure.error.to_string(),
                    });
                }
            }
            Err(e) => {
                error!(source = %collection.summary.source, error = %e, "Batch persistence failed");
                collection.summary.persist_failed += records.len();
                for record in &records {
                    collection.failures.push(FailureEntry {
                        source: collection.summary.source.clone(),
                        stage: FailureStage::Persist,
                        target: None,
                        record_key: Some(record.natural_key().to_string()),
                        reason: e.to_string(),
                    });
                }
            }
        }
    }
}
