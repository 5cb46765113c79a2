use crate::datum::CrawlDatum;
use crate::dispatch::DispatchPolicy;
use std::collections::{HashMap, HashSet};
use tagrank_cache::KeyValueCache;
use tagrank_common::{Result, TagrankError};
use tagrank_social::HashtagSource;
use tagrank_social::mastodon::sanitize_instance;
use tagrank_social::mastodon::types::{TagEntry, TimelineEntry};
use tracing::{debug, info, warn};

/// `{host}_{hashtag}`.
pub fn cache_key(host: &str, hashtag: &str) -> String {
    format!("{host}_{hashtag}")
}

/// How many timeline entries mention each hashtag (seed included).
pub fn multipliers(timeline: &[TimelineEntry]) -> HashMap<String, u32> {
    let mut counts = HashMap::new();
    for entry in timeline {
        for tag in &entry.tags {
            *counts.entry(tag.name.clone()).or_insert(0) += 1;
        }
    }
    counts
}

/// Distinct tag names across the timeline, in first-seen order.
pub fn unique_hashtags(timeline: &[TimelineEntry]) -> Vec<String> {
    let mut seen = HashSet::new();
    timeline
        .iter()
        .flat_map(|entry| entry.tags.iter())
        .filter(|tag| seen.insert(tag.name.as_str()))
        .map(|tag| tag.name.clone())
        .collect()
}

/// Sum of `history[].uses`. Entries that are not unsigned integers count as zero.
pub fn total_uses(tag: &TagEntry) -> u64 {
    tag.history
        .iter()
        .filter_map(|h| match h.uses.trim().parse::<u64>() {
            Ok(n) => Some(n),
            Err(err) => {
                warn!(tag = %tag.name, uses = %h.uses, error = %err, "crawl.history.unparsable");
                None
            }
        })
        .fold(0u64, u64::saturating_add)
}

fn normalize_hashtag(raw: &str) -> Result<String> {
    let name = raw.trim().trim_start_matches('#');
    if name.is_empty() {
        return Err(TagrankError::InvalidInput(format!(
            "hashtag {raw:?} is empty"
        )));
    }
    Ok(name.to_string())
}

/// Crawls a seed hashtag's timeline and ranks the hashtags it co-occurs with.
pub struct HashtagRanker<S, C> {
    source: S,
    cache: C,
    dispatch: DispatchPolicy,
}

impl<S: HashtagSource, C: KeyValueCache> HashtagRanker<S, C> {
    pub fn new(source: S, cache: C) -> Self {
        Self {
            source,
            cache,
            dispatch: DispatchPolicy::default(),
        }
    }

    pub fn with_dispatch(mut self, dispatch: DispatchPolicy) -> Self {
        self.dispatch = dispatch;
        self
    }

    pub fn dispatch(&self) -> DispatchPolicy {
        self.dispatch
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }

    /// One datum per distinct hashtag on `seed`'s timeline, in first-seen order.
    ///
    /// Any failed fetch or cache operation aborts the whole crawl.
    pub async fn crawl(&self, instance: &str, seed: &str) -> Result<Vec<CrawlDatum>> {
        let host = sanitize_instance(instance);
        if host.is_empty() {
            return Err(TagrankError::InvalidInput(format!(
                "instance {instance:?} has no host"
            )));
        }
        let seed = normalize_hashtag(seed)?;

        let timeline = self.source.timeline(&host, &seed).await?;
        let ranks = multipliers(&timeline);
        let hashtags = unique_hashtags(&timeline);
        info!(
            host = %host,
            seed = %seed,
            posts = timeline.len(),
            hashtags = hashtags.len(),
            dispatch = ?self.dispatch,
            "crawl.timeline.fetched"
        );

        let resolved = self
            .dispatch
            .join_all(hashtags.iter().map(|name| self.resolve(&host, name)))
            .await?;

        let datums: Vec<CrawlDatum> = resolved
            .into_iter()
            .zip(&hashtags)
            .map(|(mut datum, name)| {
                // Keyed by the requested name; the returned label may be another timeline tag.
                datum.rank = ranks.get(name).copied().unwrap_or(1);
                datum
            })
            .collect();

        info!(host = %host, seed = %seed, datums = datums.len(), "crawl.finished");
        Ok(datums)
    }

    /// Cached datum for `name`, or fetch, total and cache it.
    async fn resolve(&self, host: &str, name: &str) -> Result<CrawlDatum> {
        let key = cache_key(host, name);
        if let Some(raw) = self.cache.get(&key).await? {
            match serde_json::from_str::<CrawlDatum>(&raw) {
                Ok(datum) => {
                    debug!(key = %key, "crawl.cache.hit");
                    return Ok(datum);
                }
                Err(err) => warn!(key = %key, error = %err, "crawl.cache.unreadable"),
            }
        }

        let entry = self.source.tag(host, name).await?;
        let datum = CrawlDatum::from_tag(&entry);
        let raw = serde_json::to_string(&datum).map_err(|e| TagrankError::Cache(e.to_string()))?;
        self.cache.set(&key, &raw).await?;
        debug!(key = %key, count = datum.count, "crawl.tag.fetched");
        Ok(datum)
    }
}
