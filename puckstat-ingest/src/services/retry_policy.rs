//! Retry decisions as data
//!
//! Backoff for retry `n` (0-based) is `min(base_delay * 2^n, max_delay)` plus a random
//! jitter, raised to any server `Retry-After` (capped at `max_delay`) and never below the
//! previous delay of the same fetch.

use crate::error::{ErrorClass, FetchError};
use rand::Rng;
use std::time::Duration;

/// Why a failing fetch stops retrying
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GiveUpReason {
    Permanent,
    Exhausted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Retry { delay: Duration },
    GiveUp(GiveUpReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            jitter: Duration::from_millis(250),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Default::default()
        }
    }

    pub fn no_retries() -> Self {
        Self::new(0)
    }

    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    pub fn with_jitter(mut self, jitter: Duration) -> Self {
        self.jitter = jitter;
        self
    }

    /// Capped exponential backoff before retry `retry` (0-based), without jitter
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.min(31));
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Delay before retry `retry` given a jitter sample, server hint and previous delay
    pub fn scheduled_delay(
        &self,
        retry: u32,
        jitter_sample: Duration,
        retry_after: Option<Duration>,
        previous: Duration,
    ) -> Duration {
        let mut delay = self.backoff(retry) + jitter_sample.min(self.jitter);

        if let Some(hint) = retry_after {
            delay = delay.max(hint.min(self.max_delay));
        }

        delay.max(previous)
    }

    /// Decide what to do after `error`, with `retries_so_far` retries already spent
    pub fn decide(
        &self,
        error: &FetchError,
        retries_so_far: u32,
        previous: Duration,
    ) -> RetryDecision {
        if error.class() == ErrorClass::Permanent {
            return RetryDecision::GiveUp(GiveUpReason::Permanent);
        }
        if retries_so_far >= self.max_retries {
            return RetryDecision::GiveUp(GiveUpReason::Exhausted);
        }

        let delay = self.scheduled_delay(
            retries_so_far,
            self.sample_jitter(),
            error.retry_after(),
            previous,
        );
        RetryDecision::Retry { delay }
    }

    fn sample_jitter(&self) -> Duration {
        let bound = self.jitter.as_millis() as u64;
        if bound == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::thread_rng().gen_range(0..=bound))
    }
}
