//! # skilltag common library
//!
//! Shared code for the skilltag workspace:
//! - Error and result types
//! - TOML configuration loading and root folder resolution
//! - Atomic file writes
//! - Event types (`TaggingEvent`) and the `EventBus`
//! - Run identifier and timestamp helpers
//! - SQLite checkpoint database initialization

pub mod config;
#[cfg(feature = "sqlx")]
pub mod db;
pub mod error;
pub mod events;
pub mod time;

pub use error::{Error, Result};
