//! Hashtag co-occurrence ranking.
//!
//! [`HashtagRanker::crawl`] reads a seed hashtag's timeline, counts how often
//! every co-occurring hashtag appears (the rank), resolves each hashtag's
//! historical usage total through a [`tagrank_cache::KeyValueCache`], and
//! returns one [`CrawlDatum`] per distinct hashtag.
pub mod datum;
pub mod dispatch;
pub mod ranker;

pub use datum::CrawlDatum;
pub use dispatch::DispatchPolicy;
pub use ranker::{HashtagRanker, cache_key, multipliers, total_uses, unique_hashtags};
