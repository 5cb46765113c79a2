use serde::{Deserialize, Serialize};

/// One post from `GET /api/v1/timelines/tag/{hashtag}`.
///
/// Statuses carry many more fields; only the tag list matters for ranking.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct TimelineEntry {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Tag {
    pub name: String,
    pub url: String,
}

/// Response of `GET /api/v1/tags/{hashtag}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TagEntry {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub history: Vec<History>,
}

/// Usage counters for one period. Mastodon encodes the numbers as strings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct History {
    #[serde(default)]
    pub day: Option<String>,
    pub uses: String,
    #[serde(default)]
    pub accounts: Option<String>,
}
