//! Social network clients used by tagrank.
//!
//! Only the Mastodon-compatible REST API is implemented. The [`HashtagSource`]
//! trait is the seam the crawler depends on, so tests can swap in fixtures.
pub mod mastodon;
pub mod source;

pub use source::HashtagSource;
