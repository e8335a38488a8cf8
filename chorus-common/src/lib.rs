//! Common types and utilities shared across Chorus crates.
//!
//! This crate defines the shared error type and the observability helpers used
//! throughout the Chorus workspace. It stays small so that every crate can depend
//! on it without pulling in the HTTP or analysis stacks.
//!
//! # Overview
//!
//! - [`observability`]: Centralised tracing/logging initialisation
//! - [`ChorusError`] and [`Result`]: Shared error handling
//!
//! # Examples
//!
//! ```rust
//! use chorus_common::{ChorusError, Result};
//!
//! fn check(count: usize) -> Result<usize> {
//!     if count == 0 {
//!         return Err(ChorusError::Config("count must be positive".into()));
//!     }
//!     Ok(count)
//! }
//!
//! assert!(check(0).is_err());
//! assert_eq!(check(3).unwrap(), 3);
//! ```
pub mod observability;

/// Error types used across the Chorus system.
#[derive(thiserror::Error, Debug)]
pub enum ChorusError {
    /// Configuration was incomplete or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The polarity scorer could not process a piece of text.
    #[error("Scorer error: {0}")]
    Scorer(String),

    /// Writing a table or series to disk failed.
    #[error("Export error: {0}")]
    Export(String),

    /// Underlying filesystem or stream failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization of an exported document failed.
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenient alias for results that use [`ChorusError`].
pub type Result<T> = std::result::Result<T, ChorusError>;
