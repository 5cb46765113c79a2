use crate::cli::SortOrder;
use tagrank_crawler::CrawlDatum;

/// Apply presentation order and limit. The crawl itself is unordered.
pub fn arrange(mut datums: Vec<CrawlDatum>, sort: SortOrder, limit: Option<usize>) -> Vec<CrawlDatum> {
    match sort {
        SortOrder::Rank => datums.sort_by(|a, b| {
            b.rank
                .cmp(&a.rank)
                .then(b.count.cmp(&a.count))
                .then_with(|| a.label.cmp(&b.label))
        }),
        SortOrder::Count => datums.sort_by(|a, b| {
            b.count
                .cmp(&a.count)
                .then(b.rank.cmp(&a.rank))
                .then_with(|| a.label.cmp(&b.label))
        }),
        SortOrder::None => {}
    }
    if let Some(n) = limit {
        datums.truncate(n);
    }
    datums
}

pub fn render_json(datums: &[CrawlDatum]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(datums)
}

pub fn render_table(datums: &[CrawlDatum]) -> String {
    let label_w = datums
        .iter()
        .map(|d| d.label.chars().count() + 1)
        .max()
        .unwrap_or(0)
        .max("HASHTAG".len());

    let mut out = format!(
        "{:>6}  {:>10}  {:<label_w$}  {}\n",
        "RANK", "COUNT", "HASHTAG", "URL"
    );
    for d in datums {
        out.push_str(&format!(
            "{:>6}  {:>10}  {:<label_w$}  {}\n",
            d.rank,
            d.count,
            format!("#{}", d.label),
            d.uri
        ));
    }
    out
}
