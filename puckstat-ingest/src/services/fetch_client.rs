//! Rate-limited, retrying fetches
//!
//! `fetch` never returns an error: every failure ends up inside the [`FetchResult`].
//! Each attempt, retries included, first acquires the source's rate budget.

use crate::error::FetchError;
use crate::models::{FetchResult, FetchTarget, Payload, TargetLocation};
use crate::services::rate_limiter::RateLimiter;
use crate::services::retry_policy::{RetryDecision, RetryPolicy};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Longest error body kept in a FetchError message
const MAX_ERROR_BODY: usize = 200;

/// Delay named by a `Retry-After` value, either delta-seconds or an HTTP-date
///
/// A date already in the past means no wait.
pub fn parse_retry_after(value: &str, now: DateTime<Utc>) -> Option<Duration> {
    let value = value.trim();
    if let Ok(secs) = value.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }
    let at = DateTime::parse_from_rfc2822(value).ok()?.with_timezone(&Utc);
    Some((at - now).to_std().unwrap_or(Duration::ZERO))
}

/// Reads the payload for one target
#[async_trait]
pub trait Transport: Send + Sync {
    async fn read(&self, target: &FetchTarget, timeout: Duration) -> Result<Payload, FetchError>;
}

/// `http(s)` reads through a shared reqwest client
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(puckstat_common::config::user_agent())
            .build()
            .map_err(|e| FetchError::Connection(e.to_string()))?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn read(&self, target: &FetchTarget, timeout: Duration) -> Result<Payload, FetchError> {
        let url = match &target.location {
            TargetLocation::Http(url) => url,
            TargetLocation::File(path) => {
                return Err(FetchError::MalformedTarget(format!(
                    "not an http location: {}",
                    path.display()
                )))
            }
        };

        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| map_reqwest_error(e, timeout))?;

        let status = response.status();

        if status.as_u16() == 429 {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| parse_retry_after(v, Utc::now()));
            return Err(FetchError::TooManyRequests { retry_after });
        }

        if status.is_server_error() || status.is_client_error() {
            let body = response.text().await.unwrap_or_default();
            let message: String = body.chars().take(MAX_ERROR_BODY).collect();
            return Err(if status.is_server_error() {
                FetchError::ServerError {
                    status: status.as_u16(),
                    message,
                }
            } else {
                FetchError::ClientError {
                    status: status.as_u16(),
                    message,
                }
            });
        }

        if !status.is_success() {
            return Err(FetchError::UnexpectedStatus(status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let bytes = response
            .bytes()
            .await
            .map_err(|e| map_reqwest_error(e, timeout))?;

        Ok(Payload {
            bytes: bytes.to_vec(),
            content_type,
        })
    }
}

fn map_reqwest_error(err: reqwest::Error, timeout: Duration) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout(timeout)
    } else if err.is_builder() {
        FetchError::MalformedTarget(err.to_string())
    } else {
        FetchError::Connection(err.to_string())
    }
}

/// Local file reads (manual drops, fixtures)
#[derive(Debug, Clone, Copy, Default)]
pub struct FileTransport;

#[async_trait]
impl Transport for FileTransport {
    async fn read(&self, target: &FetchTarget, _timeout: Duration) -> Result<Payload, FetchError> {
        let path = match &target.location {
            TargetLocation::File(path) => path,
            TargetLocation::Http(url) => {
                return Err(FetchError::MalformedTarget(format!("not a file location: {}", url)))
            }
        };

        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(Payload::new(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(FetchError::FileNotFound(path.display().to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Dispatches on the target location
#[derive(Debug, Clone)]
pub struct DefaultTransport {
    http: HttpTransport,
    file: FileTransport,
}

impl DefaultTransport {
    pub fn new() -> Result<Self, FetchError> {
        Ok(Self {
            http: HttpTransport::new()?,
            file: FileTransport,
        })
    }
}

#[async_trait]
impl Transport for DefaultTransport {
    async fn read(&self, target: &FetchTarget, timeout: Duration) -> Result<Payload, FetchError> {
        match target.location {
            TargetLocation::Http(_) => self.http.read(target, timeout).await,
            TargetLocation::File(_) => self.file.read(target, timeout).await,
        }
    }
}

/// Per-source timeout and retry policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchPolicy {
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
        }
    }
}

pub struct FetchClient {
    rate_limiter: RateLimiter,
    transport: Arc<dyn Transport>,
    policies: HashMap<String, FetchPolicy>,
    default_policy: FetchPolicy,
}

impl FetchClient {
    pub fn new(rate_limiter: RateLimiter, transport: Arc<dyn Transport>) -> Self {
        Self {
            rate_limiter,
            transport,
            policies: HashMap::new(),
            default_policy: FetchPolicy::default(),
        }
    }

    pub fn with_policy(mut self, source: impl Into<String>, policy: FetchPolicy) -> Self {
        self.policies.insert(source.into(), policy);
        self
    }

    pub fn with_default_policy(mut self, policy: FetchPolicy) -> Self {
        self.default_policy = policy;
        self
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }

    pub fn policy_for(&self, source: &str) -> &FetchPolicy {
        self.policies.get(source).unwrap_or(&self.default_policy)
    }

    /// Fetch one target, retrying transient failures per the source's policy
    pub async fn fetch(&self, source: &str, target: &FetchTarget) -> FetchResult {
        if let Err(error) = target.location.validate() {
            warn!(source = %source, target = %target, error = %error, "Rejected fetch target");
            return FetchResult::failure(target.clone(), error, 0);
        }

        let policy = self.policy_for(source);
        let mut attempts = 0u32;
        let mut retries = 0u32;
        let mut previous_delay = Duration::ZERO;

        loop {
            self.rate_limiter.acquire(source).await;
            attempts += 1;

            let started = tokio::time::Instant::now();
            let outcome = match tokio::time::timeout(
                policy.timeout,
                self.transport.read(target, policy.timeout),
            )
            .await
            {
                Ok(outcome) => outcome,
                Err(_) => Err(FetchError::Timeout(policy.timeout)),
            };

            let error = match outcome {
                Ok(payload) => {
                    debug!(
                        source = %source,
                        resource = %target.resource,
                        attempt = attempts,
                        bytes = payload.bytes.len(),
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "Fetched target"
                    );
                    return FetchResult::success(target.clone(), payload, attempts);
                }
                Err(error) => error,
            };

            match policy.retry.decide(&error, retries, previous_delay) {
                RetryDecision::Retry { delay } => {
                    warn!(
                        source = %source,
                        resource = %target.resource,
                        attempt = attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "Transient fetch failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    previous_delay = delay;
                    retries += 1;
                }
                RetryDecision::GiveUp(reason) => {
                    warn!(
                        source = %source,
                        resource = %target.resource,
                        attempt = attempts,
                        reason = ?reason,
                        error = %error,
                        "Fetch failed"
                    );
                    return FetchResult::failure(target.clone(), error, attempts);
                }
            }
        }
    }
}
