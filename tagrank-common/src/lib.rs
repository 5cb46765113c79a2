//! Common types and utilities shared across tagrank crates.
//!
//! This crate defines the shared error type and the observability helpers used
//! throughout the tagrank workspace. It stays dependency-light so that every
//! crate can depend on it without pulling in the HTTP or storage stacks.
//!
//! # Overview
//!
//! - [`TagrankError`] and [`Result`]: shared error handling
//! - [`observability`]: centralised tracing/logging initialisation
//!
//! # Examples
//!
//! ```rust
//! use tagrank_common::TagrankError;
//!
//! let err = TagrankError::InvalidInput("empty hashtag".into());
//! assert_eq!(err.to_string(), "Invalid input: empty hashtag");
//! assert!(!err.is_remote());
//! ```

pub mod observability;

/// Error types used across the tagrank system.
#[derive(thiserror::Error, Debug)]
pub enum TagrankError {
    /// A remote call failed: transport error or non-2xx response.
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// A remote response could not be decoded into the expected shape.
    #[error("Parse error: {0}")]
    Parse(String),

    /// The local cache backend failed.
    #[error("Cache error: {0}")]
    Cache(String),

    /// Configuration was incomplete or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Caller supplied an unusable instance or hashtag.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl TagrankError {
    /// True for failures that originate on the remote instance.
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Fetch(_) | Self::Parse(_))
    }
}

/// Convenient alias for results that use [`TagrankError`].
pub type Result<T> = std::result::Result<T, TagrankError>;
