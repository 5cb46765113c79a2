use crate::mastodon::types::{TagEntry, TimelineEntry};
use async_trait::async_trait;
use tagrank_common::Result;

/// Read-only access to an instance's hashtag data.
///
/// `host` is always a sanitised host (see [`crate::mastodon::sanitize_instance`]).
#[async_trait]
pub trait HashtagSource: Send + Sync {
    /// Recent posts tagged with `hashtag`.
    async fn timeline(&self, host: &str, hashtag: &str) -> Result<Vec<TimelineEntry>>;

    /// Usage history of a single hashtag.
    async fn tag(&self, host: &str, hashtag: &str) -> Result<TagEntry>;
}

#[async_trait]
impl<T: HashtagSource + ?Sized> HashtagSource for std::sync::Arc<T> {
    async fn timeline(&self, host: &str, hashtag: &str) -> Result<Vec<TimelineEntry>> {
        (**self).timeline(host, hashtag).await
    }

    async fn tag(&self, host: &str, hashtag: &str) -> Result<TagEntry> {
        (**self).tag(host, hashtag).await
    }
}
