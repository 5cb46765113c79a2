use serde::{Deserialize, Serialize};
use tagrank_social::mastodon::types::TagEntry;

use crate::ranker::total_uses;

/// One ranked hashtag.
///
/// Serialised as-is into the cache; `rank` is overwritten on every crawl.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlDatum {
    pub label: String,
    pub uri: String,
    pub count: u64,
    #[serde(default = "default_rank")]
    pub rank: u32,
}

fn default_rank() -> u32 {
    1
}

impl CrawlDatum {
    /// Datum for a freshly fetched tag, before any rank is known.
    pub fn from_tag(tag: &TagEntry) -> Self {
        Self {
            label: tag.name.clone(),
            uri: tag.url.clone(),
            count: total_uses(tag),
            rank: default_rank(),
        }
    }
}
