use crate::cli::{CrawlArgs, OutputFormat};
use crate::output::{arrange, render_json, render_table};
use anyhow::{Context, Result};
use chrono::Local;
use std::sync::Arc;
use std::time::Duration;
use tagrank_cache::{CacheManager, KeyValueCache, MemoryCache, SqliteCache};
use tagrank_config::{CacheBackend, CacheConfig, HttpConfig, TagrankConfig};
use tagrank_crawler::{DispatchPolicy, HashtagRanker};
use tagrank_http::HttpClient;
use tagrank_social::mastodon::instance::base_url;
use tagrank_social::mastodon::{MastodonApi, sanitize_instance};

async fn open_cache(cfg: &CacheConfig, ephemeral: bool) -> Result<Arc<dyn KeyValueCache>> {
    if ephemeral || cfg.backend == CacheBackend::Memory {
        return Ok(Arc::new(MemoryCache::new()));
    }
    let path = cfg.resolved_path();
    let cache = SqliteCache::open(&path)
        .await
        .with_context(|| format!("opening cache at {}", path.display()))?;
    Ok(Arc::new(cache))
}

fn mastodon_api(http_cfg: &HttpConfig, host: &str) -> Result<MastodonApi> {
    let base = base_url(host);
    let http = match &http_cfg.user_agent {
        Some(ua) => HttpClient::with_user_agent(&base, ua)?,
        None => HttpClient::new(&base)?,
    }
    .with_timeout(http_cfg.timeout_secs.map(Duration::from_secs))
    .with_retries(http_cfg.retries);

    Ok(MastodonApi::new(http)
        .with_access_token(http_cfg.access_token.clone())
        .with_timeline_limit(http_cfg.timeline_limit))
}

pub async fn crawl(cfg: &TagrankConfig, args: CrawlArgs) -> Result<()> {
    let instance = args.instance.as_deref().unwrap_or(&cfg.instance);
    let host = sanitize_instance(instance);
    anyhow::ensure!(!host.is_empty(), "instance {instance:?} has no host");
    let interval_ms = args.interval_ms.unwrap_or(cfg.dispatch.interval_ms);

    let cache = open_cache(&cfg.cache, args.no_cache).await?;
    if cfg.cache.daily_invalidation {
        let cleared = CacheManager::new(cache.clone())
            .invalidate_if_stale(Local::now().date_naive())
            .await?;
        tracing::debug!(cleared, "cache.daily_check");
    }

    let ranker = HashtagRanker::new(mastodon_api(&cfg.http, &host)?, cache)
        .with_dispatch(DispatchPolicy::from_millis(interval_ms));

    let started = std::time::Instant::now();
    let datums = ranker
        .crawl(instance, &args.hashtag)
        .await
        .with_context(|| format!("crawling #{} on {}", args.hashtag.trim_start_matches('#'), host))?;
    tracing::info!(
        host = %host,
        hashtags = datums.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "crawl.done"
    );

    let rows = arrange(datums, args.sort, args.limit);
    match args.format {
        OutputFormat::Json => println!("{}", render_json(&rows)?),
        OutputFormat::Table => print!("{}", render_table(&rows)),
    }
    Ok(())
}

pub async fn clear_cache(cfg: &TagrankConfig) -> Result<()> {
    let cache = open_cache(&cfg.cache, false).await?;
    CacheManager::new(cache).clear().await?;
    if cfg.cache.backend == CacheBackend::Sqlite {
        println!("cleared {}", cfg.cache.resolved_path().display());
    }
    Ok(())
}
