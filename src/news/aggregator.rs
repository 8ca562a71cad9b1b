// src/news/aggregator.rs
use std::sync::Arc;

use crate::config::FeedsConfig;
use crate::news::types::{FeedFetcher, FeedItem};

/// Merges the configured sources of one topic into a single capped list.
pub struct FeedAggregator {
    fetcher: Arc<dyn FeedFetcher>,
    feeds: Arc<FeedsConfig>,
}

impl FeedAggregator {
    pub fn new(fetcher: Arc<dyn FeedFetcher>, feeds: Arc<FeedsConfig>) -> Self {
        Self { fetcher, feeds }
    }

    /// Sources are fetched in configured order; a failing source contributes nothing
    /// and never stops the ones after it. Unknown topics use the `general` sources.
    pub async fn fetch_topic(&self, topic: &str) -> Vec<FeedItem> {
        let cap = self.feeds.topic_cap;
        let mut merged = Vec::with_capacity(cap);
        for url in self.feeds.resolve(topic) {
            let mut items = self.fetcher.fetch(url, self.feeds.per_source_limit).await;
            if items.is_empty() {
                tracing::debug!(topic, url = %url, "source contributed no items");
            }
            merged.append(&mut items);
        }
        merged.truncate(cap);
        merged
    }
}
