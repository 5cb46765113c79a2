//! Thin wrapper around the two public Mastodon endpoints the crawler reads.
//!
//! Both calls are unauthenticated by default; an access token can be attached
//! for instances that require authorized fetch. Transport failures and non-2xx
//! answers surface as [`TagrankError::Fetch`], undecodable bodies as
//! [`TagrankError::Parse`].
use crate::mastodon::instance::{base_url, sanitize_instance};
use crate::mastodon::types::{TagEntry, TimelineEntry};
use crate::source::HashtagSource;
use async_trait::async_trait;
use std::borrow::Cow;
use tagrank_common::{Result, TagrankError};
use tagrank_http::{Auth, HttpClient, HttpError, RequestOpts};

#[derive(Clone)]
pub struct MastodonApi {
    http: HttpClient,
    access_token: Option<String>,
    timeline_limit: Option<u32>,
}

impl MastodonApi {
    /// Wrap a preconfigured client. Its scheme is reused for every host.
    pub fn new(http: HttpClient) -> Self {
        Self {
            http,
            access_token: None,
            timeline_limit: None,
        }
    }

    /// Client for `https://{instance}` with default HTTP settings.
    pub fn for_instance(instance: &str) -> Result<Self> {
        let host = sanitize_instance(instance);
        let http = HttpClient::new(&base_url(&host)).map_err(map_http)?;
        Ok(Self::new(http))
    }

    pub fn with_access_token(mut self, token: Option<String>) -> Self {
        self.access_token = token.filter(|t| !t.trim().is_empty());
        self
    }

    /// Ask for up to `limit` posts (Mastodon caps this at 40).
    pub fn with_timeline_limit(mut self, limit: Option<u32>) -> Self {
        self.timeline_limit = limit.map(|l| l.clamp(1, 40));
        self
    }

    fn opts(&self) -> RequestOpts<'_> {
        RequestOpts {
            auth: self.access_token.as_deref().map(Auth::Bearer),
            allow_absolute: true,
            ..Default::default()
        }
    }

    pub async fn fetch_timeline(&self, host: &str, hashtag: &str) -> Result<Vec<TimelineEntry>> {
        let client = self.http.rebase(host).map_err(map_http)?;
        let url = client
            .url_for(&["api", "v1", "timelines", "tag", hashtag])
            .map_err(map_http)?;

        let mut opts = self.opts();
        if let Some(limit) = self.timeline_limit {
            opts.query = Some(vec![("limit", Cow::Owned(limit.to_string()))]);
        }

        let entries: Vec<TimelineEntry> = client
            .get_json(url.as_str(), opts)
            .await
            .map_err(map_http)?;
        tracing::debug!(host, hashtag, posts = entries.len(), "mastodon.timeline");
        Ok(entries)
    }

    pub async fn fetch_tag(&self, host: &str, hashtag: &str) -> Result<TagEntry> {
        let client = self.http.rebase(host).map_err(map_http)?;
        let url = client
            .url_for(&["api", "v1", "tags", hashtag])
            .map_err(map_http)?;

        let tag: TagEntry = client
            .get_json(url.as_str(), self.opts())
            .await
            .map_err(map_http)?;
        tracing::debug!(host, hashtag, periods = tag.history.len(), "mastodon.tag");
        Ok(tag)
    }
}

#[async_trait]
impl HashtagSource for MastodonApi {
    async fn timeline(&self, host: &str, hashtag: &str) -> Result<Vec<TimelineEntry>> {
        self.fetch_timeline(host, hashtag).await
    }

    async fn tag(&self, host: &str, hashtag: &str) -> Result<TagEntry> {
        self.fetch_tag(host, hashtag).await
    }
}

/// Decode failures are parse errors; everything else is a fetch error.
pub fn map_http(err: HttpError) -> TagrankError {
    match err {
        HttpError::Decode(..) => TagrankError::Parse(err.to_string()),
        other => TagrankError::Fetch(other.to_string()),
    }
}
