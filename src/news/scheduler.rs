// src/news/scheduler.rs
use metrics::{counter, gauge};
use once_cell::sync::OnceCell;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::news::aggregator::FeedAggregator;
use crate::news::cache::NewsCache;

#[derive(Clone, Debug)]
pub struct RefreshSchedulerCfg {
    pub interval: Duration,
    /// Processing order within one cycle.
    pub topics: Vec<String>,
}

/// Background refresher: the only writer of [`NewsCache`].
///
/// Idle until [`RefreshScheduler::start`] is first called, then one loop runs for the
/// rest of the process. Repeated or concurrent `start` calls never spawn a second loop.
pub struct RefreshScheduler {
    aggregator: Arc<FeedAggregator>,
    cache: Arc<NewsCache>,
    cfg: RefreshSchedulerCfg,
    handle: OnceCell<JoinHandle<()>>,
}

impl RefreshScheduler {
    pub fn new(aggregator: Arc<FeedAggregator>, cache: Arc<NewsCache>, cfg: RefreshSchedulerCfg) -> Self {
        Self {
            aggregator,
            cache,
            cfg,
            handle: OnceCell::new(),
        }
    }

    /// Spawn the refresh loop on the current tokio runtime.
    /// Returns `true` only for the call that actually started it.
    pub fn start(&self) -> bool {
        let mut spawned = false;
        self.handle.get_or_init(|| {
            spawned = true;
            let aggregator = self.aggregator.clone();
            let cache = self.cache.clone();
            let cfg = self.cfg.clone();
            tracing::info!(
                target: "news",
                interval_secs = cfg.interval.as_secs(),
                topics = cfg.topics.len(),
                "starting news refresh loop"
            );
            tokio::spawn(run_loop(aggregator, cache, cfg))
        });
        spawned
    }

    pub fn is_running(&self) -> bool {
        self.handle.get().is_some_and(|h| !h.is_finished())
    }
}

async fn run_loop(aggregator: Arc<FeedAggregator>, cache: Arc<NewsCache>, cfg: RefreshSchedulerCfg) {
    loop {
        run_cycle(&aggregator, &cache, &cfg.topics).await;
        tokio::time::sleep(cfg.interval).await;
    }
}

/// One refresh cycle: fetch every topic in order, then publish them together.
///
/// Each topic runs in its own task so a panic while fetching degrades to an empty
/// list for that topic instead of killing the loop.
pub async fn run_cycle(aggregator: &Arc<FeedAggregator>, cache: &NewsCache, topics: &[String]) {
    let mut results = Vec::with_capacity(topics.len());
    for topic in topics {
        let agg = aggregator.clone();
        let t = topic.clone();
        let items = match tokio::spawn(async move { agg.fetch_topic(&t).await }).await {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!(target: "news", error = %e, topic = %topic, "topic refresh failed");
                counter!("news_refresh_topic_failures_total").increment(1);
                Vec::new()
            }
        };
        results.push((topic.clone(), items));
    }

    let counts: Vec<usize> = results.iter().map(|(_, items)| items.len()).collect();
    let stamp = cache.publish(results);

    counter!("news_refresh_cycles_total").increment(1);
    gauge!("news_refresh_last_run_ts").set(stamp.timestamp() as f64);
    tracing::info!(target: "news", ?counts, updated_at = %stamp, "news refresh tick");
}
