//! # puckstat Common Library
//!
//! Shared code for the puckstat workspace:
//! - Error type and result alias
//! - Bootstrap configuration (TOML) and data folder resolution
//! - Database initialization (pool, pragmas, table creation)
//! - Timestamp and NHL season helpers

pub mod config;
#[cfg(feature = "sqlx")]
pub mod db;
pub mod error;
pub mod time;

pub use error::{Error, Result};
