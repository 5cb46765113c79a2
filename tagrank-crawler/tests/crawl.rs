use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tagrank_cache::{KeyValueCache, MemoryCache};
use tagrank_common::{Result, TagrankError};
use tagrank_crawler::{CrawlDatum, DispatchPolicy, HashtagRanker, cache_key};
use tagrank_social::HashtagSource;
use tagrank_social::mastodon::types::{History, Tag, TagEntry, TimelineEntry};

#[derive(Default)]
struct FakeSource {
    timeline: Vec<TimelineEntry>,
    tags: HashMap<String, TagEntry>,
    failing_tag: Option<String>,
    timeline_calls: Mutex<Vec<(String, String)>>,
    tag_calls: Mutex<Vec<(String, String)>>,
}

impl FakeSource {
    fn new(timeline: &[&[&str]]) -> Self {
        Self {
            timeline: timeline
                .iter()
                .map(|tags| TimelineEntry {
                    id: None,
                    tags: tags
                        .iter()
                        .map(|name| Tag {
                            name: name.to_string(),
                            url: format!("https://example.social/tags/{name}"),
                        })
                        .collect(),
                })
                .collect(),
            ..Default::default()
        }
    }

    fn with_history(mut self, name: &str, uses: &[&str]) -> Self {
        self.tags.insert(
            name.to_string(),
            TagEntry {
                name: name.to_string(),
                url: format!("https://example.social/tags/{name}"),
                history: uses
                    .iter()
                    .map(|u| History {
                        day: None,
                        uses: u.to_string(),
                        accounts: None,
                    })
                    .collect(),
            },
        );
        self
    }

    fn tag_calls(&self) -> usize {
        self.tag_calls.lock().unwrap().len()
    }
}

#[async_trait]
impl HashtagSource for FakeSource {
    async fn timeline(&self, host: &str, hashtag: &str) -> Result<Vec<TimelineEntry>> {
        self.timeline_calls
            .lock()
            .unwrap()
            .push((host.to_string(), hashtag.to_string()));
        Ok(self.timeline.clone())
    }

    async fn tag(&self, host: &str, hashtag: &str) -> Result<TagEntry> {
        self.tag_calls
            .lock()
            .unwrap()
            .push((host.to_string(), hashtag.to_string()));
        if self.failing_tag.as_deref() == Some(hashtag) {
            return Err(TagrankError::Fetch(format!("{hashtag}: 503")));
        }
        self.tags
            .get(hashtag)
            .cloned()
            .ok_or_else(|| TagrankError::Fetch(format!("{hashtag}: 404")))
    }
}

fn ranker(source: FakeSource) -> (Arc<FakeSource>, HashtagRanker<Arc<FakeSource>, Arc<MemoryCache>>) {
    let source = Arc::new(source);
    let cache = Arc::new(MemoryCache::new());
    let ranker = HashtagRanker::new(source.clone(), cache).with_dispatch(DispatchPolicy::Immediate);
    (source, ranker)
}

fn by_label(datums: &[CrawlDatum]) -> HashMap<&str, &CrawlDatum> {
    datums.iter().map(|d| (d.label.as_str(), d)).collect()
}

#[tokio::test]
async fn worked_example() {
    let source = FakeSource::new(&[&["art", "photo"], &["art"]])
        .with_history("art", &["30", "10"])
        .with_history("photo", &["5"]);
    let (_, ranker) = ranker(source);

    let datums = ranker.crawl("example.social", "art").await.unwrap();
    assert_eq!(datums.len(), 2);

    let got = by_label(&datums);
    assert_eq!(got["art"].count, 40);
    assert_eq!(got["art"].rank, 2);
    assert_eq!(got["art"].uri, "https://example.social/tags/art");
    assert_eq!(got["photo"].count, 5);
    assert_eq!(got["photo"].rank, 1);
}

#[tokio::test]
async fn canonical_name_does_not_borrow_another_tags_rank() {
    // The instance answers "art" with its canonical "Art", which is also on the timeline.
    let mut source = FakeSource::new(&[&["art", "Art"], &["Art"]]).with_history("Art", &["3"]);
    let mut canonical = source.tags["Art"].clone();
    canonical.history[0].uses = "7".into();
    source.tags.insert("art".into(), canonical);
    let (_, ranker) = ranker(source);

    let datums = ranker.crawl("example.social", "art").await.unwrap();
    assert_eq!(datums.len(), 2);
    assert!(datums.iter().all(|d| d.label == "Art"));
    assert_eq!((datums[0].count, datums[0].rank), (7, 1));
    assert_eq!((datums[1].count, datums[1].rank), (3, 2));
}

#[tokio::test]
async fn empty_timeline_fetches_nothing_else() {
    let (source, ranker) = ranker(FakeSource::new(&[]));
    let datums = ranker.crawl("example.social", "art").await.unwrap();
    assert!(datums.is_empty());
    assert_eq!(source.tag_calls(), 0);
}

#[tokio::test]
async fn every_hashtag_appears_exactly_once_with_its_rank() {
    let timeline: &[&[&str]] = &[
        &["a", "b", "c"],
        &["b", "c"],
        &["c"],
        &[],
        &["d", "a"],
    ];
    let mut source = FakeSource::new(timeline);
    for name in ["a", "b", "c", "d"] {
        source = source.with_history(name, &["1", "2"]);
    }
    let (source, ranker) = ranker(source);

    let datums = ranker.crawl("example.social", "c").await.unwrap();
    let labels: Vec<&str> = datums.iter().map(|d| d.label.as_str()).collect();
    assert_eq!(labels, vec!["a", "b", "c", "d"]);
    assert_eq!(source.tag_calls(), 4);

    for datum in &datums {
        let expected = timeline
            .iter()
            .filter(|tags| tags.contains(&datum.label.as_str()))
            .count() as u32;
        assert_eq!(datum.rank, expected, "rank of {}", datum.label);
        assert_eq!(datum.count, 3);
    }
}

#[tokio::test]
async fn second_crawl_is_served_from_cache() {
    let source = FakeSource::new(&[&["art", "photo"], &["art"]])
        .with_history("art", &["40"])
        .with_history("photo", &["5"]);
    let (source, ranker) = ranker(source);

    let first = ranker.crawl("example.social", "art").await.unwrap();
    let second = ranker.crawl("https://example.social/explore", "art").await.unwrap();

    assert_eq!(source.tag_calls(), 2);
    assert_eq!(source.timeline_calls.lock().unwrap().len(), 2);
    assert_eq!(first, second);
    assert!(
        ranker
            .cache()
            .get(&cache_key("example.social", "photo"))
            .await
            .unwrap()
            .is_some()
    );
}

#[tokio::test]
async fn cached_rank_is_overwritten() {
    let (source, ranker) = ranker(FakeSource::new(&[&["art"], &["art"], &["art"]]));
    let stale = CrawlDatum {
        label: "art".into(),
        uri: "https://example.social/tags/art".into(),
        count: 99,
        rank: 17,
    };
    ranker
        .cache()
        .set(
            &cache_key("example.social", "art"),
            &serde_json::to_string(&stale).unwrap(),
        )
        .await
        .unwrap();

    let datums = ranker.crawl("example.social", "art").await.unwrap();
    assert_eq!(source.tag_calls(), 0);
    assert_eq!(datums[0].count, 99);
    assert_eq!(datums[0].rank, 3);
}

#[tokio::test]
async fn unreadable_cache_entry_is_refetched() {
    let source = FakeSource::new(&[&["art"]]).with_history("art", &["8"]);
    let (source, ranker) = ranker(source);
    let key = cache_key("example.social", "art");
    ranker.cache().set(&key, "not json").await.unwrap();

    let datums = ranker.crawl("example.social", "art").await.unwrap();
    assert_eq!(source.tag_calls(), 1);
    assert_eq!(datums[0].count, 8);
    let repaired = ranker.cache().get(&key).await.unwrap().unwrap();
    assert!(serde_json::from_str::<CrawlDatum>(&repaired).is_ok());
}

#[tokio::test]
async fn one_failed_tag_aborts_the_crawl() {
    let mut source = FakeSource::new(&[&["art", "photo"]]).with_history("art", &["1"]);
    source.failing_tag = Some("photo".into());
    let (_, ranker) = ranker(source);

    let err = ranker.crawl("example.social", "art").await.unwrap_err();
    assert!(matches!(err, TagrankError::Fetch(ref msg) if msg.contains("photo")));
}

#[tokio::test]
async fn instance_is_sanitized_before_use() {
    let source = FakeSource::new(&[&["art"]]).with_history("art", &["1"]);
    let (source, ranker) = ranker(source);

    for instance in [
        "https://example.social/foo",
        "http://example.social",
        "example.social",
    ] {
        ranker.crawl(instance, "#art").await.unwrap();
    }

    let timeline_calls = source.timeline_calls.lock().unwrap();
    assert!(
        timeline_calls
            .iter()
            .all(|(host, tag)| host == "example.social" && tag == "art")
    );
    assert_eq!(source.tag_calls(), 1);
}

#[tokio::test]
async fn rejects_unusable_input() {
    let (source, ranker) = ranker(FakeSource::new(&[&["art"]]));
    assert!(matches!(
        ranker.crawl("https://", "art").await,
        Err(TagrankError::InvalidInput(_))
    ));
    assert!(matches!(
        ranker.crawl("example.social", "#").await,
        Err(TagrankError::InvalidInput(_))
    ));
    assert!(source.timeline_calls.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn paced_dispatch_still_returns_everything() {
    let source = FakeSource::new(&[&["a", "b", "c"]])
        .with_history("a", &["1"])
        .with_history("b", &["2"])
        .with_history("c", &["3"]);
    let source = Arc::new(source);
    let ranker = HashtagRanker::new(source.clone(), MemoryCache::new())
        .with_dispatch(DispatchPolicy::from_millis(25));

    let t0 = tokio::time::Instant::now();
    let datums = ranker.crawl("example.social", "a").await.unwrap();
    assert_eq!(datums.len(), 3);
    assert!(tokio::time::Instant::now() - t0 >= std::time::Duration::from_millis(50));
}
