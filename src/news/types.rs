// src/news/types.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One headline. Both fields are non-empty once produced by a parser.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeedItem {
    pub title: String,
    pub link: String,
}

impl FeedItem {
    /// Trims both fields; `None` if either ends up empty.
    pub fn new(title: &str, link: &str) -> Option<Self> {
        let title = title.trim();
        let link = link.trim();
        if title.is_empty() || link.is_empty() {
            return None;
        }
        Some(Self {
            title: title.to_string(),
            link: link.to_string(),
        })
    }
}

/// Immutable result of one refresh cycle for one topic.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TopicSnapshot {
    pub items: Vec<FeedItem>,
    pub fetched_at: DateTime<Utc>,
}

/// Fetches one feed URL. Implementations swallow every failure into an empty list.
#[async_trait::async_trait]
pub trait FeedFetcher: Send + Sync {
    async fn fetch(&self, url: &str, limit: usize) -> Vec<FeedItem>;
}
