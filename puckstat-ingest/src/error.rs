//! Error types for puckstat-ingest
//!
//! Fetch, parse and persistence failures are captured as data at their point of
//! origin and folded into the pass report; none of them aborts a pass.

use std::time::Duration;
use thiserror::Error;

/// Whether a fetch failure is worth retrying
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Timeout, 5xx, 429, connection trouble: retried with backoff
    Transient,
    /// 4xx (except 429), malformed target, missing file: never retried
    Permanent,
}

/// Failure of a single read attempt
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("server error {status}: {message}")]
    ServerError { status: u16, message: String },

    #[error("too many requests (429)")]
    TooManyRequests { retry_after: Option<Duration> },

    #[error("client error {status}: {message}")]
    ClientError { status: u16, message: String },

    #[error("unexpected status {0}")]
    UnexpectedStatus(u16),

    #[error("malformed target: {0}")]
    MalformedTarget(String),

    #[error("file not found: {0}")]
    FileNotFound(String),

    #[error("io error ({kind:?}): {message}")]
    Io {
        kind: std::io::ErrorKind,
        message: String,
    },
}

impl FetchError {
    pub fn class(&self) -> ErrorClass {
        use std::io::ErrorKind;

        match self {
            FetchError::Timeout(_)
            | FetchError::Connection(_)
            | FetchError::ServerError { .. }
            | FetchError::TooManyRequests { .. } => ErrorClass::Transient,
            FetchError::Io { kind, .. } => match kind {
                ErrorKind::Interrupted
                | ErrorKind::TimedOut
                | ErrorKind::WouldBlock
                | ErrorKind::ConnectionReset
                | ErrorKind::ConnectionAborted => ErrorClass::Transient,
                _ => ErrorClass::Permanent,
            },
            FetchError::ClientError { .. }
            | FetchError::UnexpectedStatus(_)
            | FetchError::MalformedTarget(_)
            | FetchError::FileNotFound(_) => ErrorClass::Permanent,
        }
    }

    pub fn is_transient(&self) -> bool {
        self.class() == ErrorClass::Transient
    }

    /// Server-provided minimum wait before the next attempt
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            FetchError::TooManyRequests { retry_after } => *retry_after,
            _ => None,
        }
    }
}

impl From<std::io::Error> for FetchError {
    fn from(err: std::io::Error) -> Self {
        FetchError::Io {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// An adapter could not interpret a payload (whole target or a single row)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("no payload to parse: {0}")]
    NoPayload(String),

    #[error("payload is not valid UTF-8")]
    Encoding,

    #[error("malformed JSON: {0}")]
    Json(String),

    #[error("missing section: {0}")]
    MissingSection(String),

    #[error("unknown resource '{0}'")]
    UnknownResource(String),

    #[error("row {row}: {reason}")]
    Row { row: usize, reason: String },
}

impl ParseError {
    pub fn row(row: usize, reason: impl Into<String>) -> Self {
        ParseError::Row {
            row,
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for ParseError {
    fn from(err: serde_json::Error) -> Self {
        ParseError::Json(err.to_string())
    }
}

/// Storage failure surfaced by the repository
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// UNIQUE / CHECK / trigger rejection of one record
    #[error("constraint violation: {0}")]
    Constraint(String),

    /// Locked, busy, pool exhausted or I/O failure
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// A stored row could not be decoded
    #[error("corrupt row: {0}")]
    Corrupt(String),

    /// Filter not supported by the queried table
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("database error: {0}")]
    Database(String),
}

impl PersistenceError {
    /// SQLite lock contention; the batch is worth retrying after a backoff
    pub fn is_lock_contention(&self) -> bool {
        match self {
            PersistenceError::Unavailable(msg) => {
                msg.contains("database is locked") || msg.contains("database is busy")
            }
            _ => false,
        }
    }
}

impl From<sqlx::Error> for PersistenceError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db_err) => {
                let message = db_err.message().to_string();
                let code = db_err.code().map(|c| c.to_string()).unwrap_or_default();
                // SQLITE_BUSY (5) / SQLITE_LOCKED (6) and their extended codes
                let busy = matches!(code.as_str(), "5" | "6" | "261" | "262" | "517")
                    || message.contains("database is locked")
                    || message.contains("database is busy");
                if busy {
                    PersistenceError::Unavailable(message)
                } else if db_err.is_unique_violation()
                    || db_err.is_check_violation()
                    || db_err.is_foreign_key_violation()
                    || code == "19"
                    || code.starts_with("19")
                    || message.contains("constraint")
                {
                    PersistenceError::Constraint(message)
                } else {
                    PersistenceError::Database(message)
                }
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                PersistenceError::Unavailable(err.to_string())
            }
            sqlx::Error::ColumnNotFound(_)
            | sqlx::Error::ColumnDecode { .. }
            | sqlx::Error::Decode(_) => PersistenceError::Corrupt(err.to_string()),
            _ => PersistenceError::Database(err.to_string()),
        }
    }
}

impl From<puckstat_common::Error> for PersistenceError {
    fn from(err: puckstat_common::Error) -> Self {
        match err {
            puckstat_common::Error::Database(db_err) => db_err.into(),
            puckstat_common::Error::InvalidInput(msg) => PersistenceError::InvalidQuery(msg),
            puckstat_common::Error::Io(io_err) => PersistenceError::Unavailable(io_err.to_string()),
            other => PersistenceError::Database(other.to_string()),
        }
    }
}
