use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One candidate article as it appeared in a feed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedEntry {
    pub link: Option<String>,
    pub id: Option<String>,
    pub href: Option<String>,
    pub title: Option<String>,
    /// Plain-text summary, or the description when the feed has no summary.
    pub inline_summary: Option<String>,
}

impl FeedEntry {
    /// Resolve the article URL: link, then id, then href. Blank values don't count.
    pub fn candidate_url(&self) -> Option<&str> {
        [&self.link, &self.id, &self.href]
            .into_iter()
            .filter_map(|value| value.as_deref())
            .map(str::trim)
            .find(|value| !value.is_empty())
    }
}

/// Title and body text pulled from an article page. Both are empty when extraction failed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedArticle {
    pub title: String,
    pub text: String,
}

impl ExtractedArticle {
    pub fn empty() -> Self {
        Self::default()
    }
}

/// A URL that has already gone out in a digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentRecord {
    pub url: String,
    pub title: String,
    pub sent_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigestItem {
    pub url: String,
    pub title: String,
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryDigest {
    pub name: String,
    pub items: Vec<DigestItem>,
}

/// Items collected in one run, grouped by category in configuration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Digest {
    pub categories: Vec<CategoryDigest>,
}

impl Digest {
    /// Create a digest with an empty slot for every category name.
    pub fn with_categories<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            categories: names
                .into_iter()
                .map(|name| CategoryDigest {
                    name: name.into(),
                    items: Vec::new(),
                })
                .collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&[DigestItem]> {
        self.categories
            .iter()
            .find(|category| category.name == name)
            .map(|category| category.items.as_slice())
    }

    pub fn total_items(&self) -> usize {
        self.categories.iter().map(|c| c.items.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total_items() == 0
    }
}
