//! Utility modules for puckstat-ingest

pub mod csv;
pub mod db_retry;
pub mod html;

pub use db_retry::retry_on_lock;
