//! Mastodon API integration surface.
//!
//! Submodules provide instance sanitisation, the HTTP client wrapper, and
//! strongly typed response models for the two read-only endpoints we use.
pub mod client;
pub mod instance;
pub mod types;

pub use client::MastodonApi;
pub use instance::sanitize_instance;
