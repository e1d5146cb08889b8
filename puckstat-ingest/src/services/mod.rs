//! Fetch pipeline services
//!
//! Rate budgets and retry policy feed the fetch client; the orchestrator drives a pass.

pub mod fetch_client;
pub mod orchestrator;
pub mod rate_limiter;
pub mod retry_policy;

pub use fetch_client::{
    DefaultTransport, FetchClient, FetchPolicy, FileTransport, HttpTransport, Transport,
};
pub use orchestrator::Orchestrator;
pub use rate_limiter::{RateBudget, RateLimiter, RateSettings};
pub use retry_policy::{GiveUpReason, RetryDecision, RetryPolicy};
