//! Per-source request pacing
//!
//! Each source owns one [`RateBudget`]. `acquire` holds the budget's async mutex while it
//! waits, so concurrent callers for the same source are granted one at a time and never
//! less than the minimum interval apart. Budgets for different sources share nothing.

use rand::Rng;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Longest spacing a budget will enforce, whatever the configured rate
pub const MAX_INTERVAL: Duration = Duration::from_secs(3600);

/// Pacing settings for one source
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateSettings {
    pub requests_per_second: f64,
    /// Upper bound of the random extra delay added after each grant
    pub jitter: Duration,
}

impl RateSettings {
    pub fn new(requests_per_second: f64) -> Self {
        Self {
            requests_per_second,
            jitter: Duration::ZERO,
        }
    }

    pub fn with_jitter(mut self, jitter: Duration) -> Self {
        self.jitter = jitter;
        self
    }

    /// Minimum spacing between grants
    ///
    /// Zero for a non-positive or non-finite rate, capped at [`MAX_INTERVAL`].
    pub fn interval(&self) -> Duration {
        if !(self.requests_per_second.is_finite() && self.requests_per_second > 0.0) {
            return Duration::ZERO;
        }
        Duration::try_from_secs_f64(1.0 / self.requests_per_second)
            .map_or(MAX_INTERVAL, |interval| interval.min(MAX_INTERVAL))
    }
}

/// Next-allowed time for one source
#[derive(Debug)]
pub struct RateBudget {
    source: String,
    min_interval: Duration,
    jitter: Duration,
    next_allowed: Mutex<Option<Instant>>,
}

impl RateBudget {
    pub fn new(source: impl Into<String>, settings: RateSettings) -> Self {
        Self {
            source: source.into(),
            min_interval: settings.interval(),
            jitter: settings.jitter,
            next_allowed: Mutex::new(None),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Wait until the budget allows a request, then claim it
    ///
    /// Returns the grant instant. Dropping the future while it waits leaves the budget
    /// untouched.
    pub async fn acquire(&self) -> Instant {
        let mut next = self.next_allowed.lock().await;

        if let Some(at) = *next {
            if at > Instant::now() {
                debug!(
                    source = %self.source,
                    wait_ms = (at - Instant::now()).as_millis() as u64,
                    "Rate limiting"
                );
                tokio::time::sleep_until(at).await;
            }
        }

        let granted = Instant::now();
        *next = Some(granted + self.min_interval + self.sample_jitter());
        granted
    }

    fn sample_jitter(&self) -> Duration {
        let bound = self.jitter.as_millis() as u64;
        if bound == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::thread_rng().gen_range(0..=bound))
    }
}

/// Registry of budgets keyed by source id
#[derive(Debug, Clone, Default)]
pub struct RateLimiter {
    budgets: HashMap<String, Arc<RateBudget>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the budget for a source
    pub fn register(&mut self, source: impl Into<String>, settings: RateSettings) {
        let source = source.into();
        let budget = Arc::new(RateBudget::new(source.clone(), settings));
        self.budgets.insert(source, budget);
    }

    pub fn with_source(mut self, source: impl Into<String>, settings: RateSettings) -> Self {
        self.register(source, settings);
        self
    }

    pub fn budget(&self, source: &str) -> Option<&Arc<RateBudget>> {
        self.budgets.get(source)
    }

    /// Wait for the source's next slot
    ///
    /// An unregistered source is not paced.
    pub async fn acquire(&self, source: &str) -> Instant {
        match self.budgets.get(source) {
            Some(budget) => budget.acquire().await,
            None => {
                warn!(source = %source, "No rate budget registered, request not paced");
                Instant::now()
            }
        }
    }
}
