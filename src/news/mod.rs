// src/news/mod.rs
pub mod aggregator;
pub mod cache;
pub mod scheduler;
pub mod source;
pub mod types;

pub use aggregator::FeedAggregator;
pub use cache::{NewsCache, NewsView};
pub use scheduler::{RefreshScheduler, RefreshSchedulerCfg};
pub use source::{parse_feed, HttpFeedSource};
pub use types::{FeedFetcher, FeedItem, TopicSnapshot};

use std::sync::Arc;
use std::time::Duration;

use crate::config::FeedsConfig;

/// Wire the HTTP source, aggregator, cache and scheduler for a feeds config.
/// The scheduler is returned idle.
pub fn build(feeds: Arc<FeedsConfig>) -> anyhow::Result<(Arc<NewsCache>, RefreshScheduler)> {
    let source = HttpFeedSource::new(Duration::from_secs(feeds.fetch_timeout_secs))?;
    Ok(build_with_fetcher(feeds, Arc::new(source)))
}

pub fn build_with_fetcher(
    feeds: Arc<FeedsConfig>,
    fetcher: Arc<dyn FeedFetcher>,
) -> (Arc<NewsCache>, RefreshScheduler) {
    let topics = feeds.topic_names();
    let cache = Arc::new(NewsCache::new(topics.clone()));
    let cfg = RefreshSchedulerCfg {
        interval: Duration::from_secs(feeds.refresh_interval_secs),
        topics,
    };
    let aggregator = Arc::new(FeedAggregator::new(fetcher, feeds));
    let scheduler = RefreshScheduler::new(aggregator, cache.clone(), cfg);
    (cache, scheduler)
}
