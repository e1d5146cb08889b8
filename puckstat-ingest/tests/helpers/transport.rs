//! Scripted transport
//!
//! Responses are queued per location. The last queued response for a location repeats,
//! so a single `ServerError` scripts an endpoint that is always down.

use async_trait::async_trait;
use puckstat_ingest::error::FetchError;
use puckstat_ingest::models::{FetchTarget, Payload};
use puckstat_ingest::services::Transport;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone)]
pub enum Script {
    Respond(Result<Payload, FetchError>),
    /// Never completes; only a timeout or cancellation ends the read
    Hang,
}

#[derive(Default)]
pub struct ScriptedTransport {
    scripts: Mutex<HashMap<String, VecDeque<Script>>>,
    calls: Mutex<Vec<(String, Instant)>>,
    latency: Duration,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulated time each read takes before answering
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn push(&self, location: &str, script: Script) {
        self.scripts
            .lock()
            .unwrap()
            .entry(location.to_string())
            .or_default()
            .push_back(script);
    }

    pub fn ok(self, location: &str, body: impl Into<Vec<u8>>) -> Self {
        self.push(location, Script::Respond(Ok(Payload::new(body))));
        self
    }

    pub fn fail(self, location: &str, error: FetchError) -> Self {
        self.push(location, Script::Respond(Err(error)));
        self
    }

    pub fn hang(self, location: &str) -> Self {
        self.push(location, Script::Hang);
        self
    }

    /// Locations read so far with the instant of each read, in call order
    pub fn calls(&self) -> Vec<(String, Instant)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, location: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(l, _)| l == location)
            .count()
    }

    /// Most reads that were ever outstanding at the same moment
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    fn next_script(&self, location: &str) -> Option<Script> {
        let mut scripts = self.scripts.lock().unwrap();
        let queue = scripts.get_mut(location)?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn read(&self, target: &FetchTarget, _timeout: Duration) -> Result<Payload, FetchError> {
        let location = target.location.to_string();
        self.calls
            .lock()
            .unwrap()
            .push((location.clone(), Instant::now()));

        let script = self.next_script(&location);

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(current, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match script {
            Some(Script::Respond(result)) => result,
            Some(Script::Hang) => std::future::pending().await,
            None => Err(FetchError::ClientError {
                status: 404,
                message: format!("no scripted response for {}", location),
            }),
        }
    }
}
