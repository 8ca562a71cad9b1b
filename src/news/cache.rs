// src/news/cache.rs
//! Shared news cache. A refresh cycle is published as one immutable [`Cycle`]
//! (every topic snapshot plus the cycle's `updated_at`) swapped in a single step.
//!
//! The scheduler is the only writer. Readers clone the current `Arc<Cycle>` under a
//! read lock that is never held across I/O, so a refresh in flight never blocks them
//! and a view never pairs one cycle's items with another cycle's timestamp.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::config::feeds::{resolve_topic_name, FALLBACK_TOPIC};
use crate::news::types::{FeedItem, TopicSnapshot};

/// What a reader gets for one topic.
#[derive(Debug, Clone, Serialize)]
pub struct NewsView {
    pub topic: String,
    pub items: Vec<FeedItem>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Everything one publication made visible.
#[derive(Debug, Default)]
struct Cycle {
    topics: HashMap<String, Arc<TopicSnapshot>>,
    updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug)]
pub struct NewsCache {
    /// Known topic names; `general` is always among them.
    topics: Vec<String>,
    current: RwLock<Arc<Cycle>>,
}

impl NewsCache {
    /// Empty cache for the known topics; `general` is always added.
    pub fn new<I, S>(topics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut names: Vec<String> = Vec::new();
        for t in topics {
            let t = t.into();
            if !names.contains(&t) {
                names.push(t);
            }
        }
        if !names.iter().any(|t| t == FALLBACK_TOPIC) {
            names.push(FALLBACK_TOPIC.to_string());
        }
        Self {
            topics: names,
            current: RwLock::new(Arc::new(Cycle::default())),
        }
    }

    /// Canonical name for a requested topic; unknown names map to `general`.
    pub fn canonical_name<'a>(&'a self, requested: &str) -> &'a str {
        resolve_topic_name(self.topics.iter().map(String::as_str), requested)
    }

    fn current(&self) -> Arc<Cycle> {
        read(&self.current).clone()
    }

    /// Latest published snapshot for a topic, `None` before the first cycle.
    pub fn snapshot(&self, topic: &str) -> Option<Arc<TopicSnapshot>> {
        self.current().topics.get(self.canonical_name(topic)).cloned()
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.current().updated_at
    }

    /// Items and `updated_at` both come from the same published cycle.
    pub fn view(&self, topic: &str) -> NewsView {
        let name = self.canonical_name(topic).to_string();
        let cycle = self.current();
        let items = cycle
            .topics
            .get(&name)
            .map(|s| s.items.clone())
            .unwrap_or_default();
        NewsView {
            topic: name,
            items,
            updated_at: cycle.updated_at,
        }
    }

    /// Publish one cycle as a whole. Topics absent from `results` keep their previous
    /// snapshot; `updated_at` never goes backwards and stamps every new snapshot.
    pub fn publish(&self, results: Vec<(String, Vec<FeedItem>)>) -> DateTime<Utc> {
        let mut guard = write(&self.current);
        let now = Utc::now();
        let stamp = match guard.updated_at {
            Some(prev) if prev > now => prev,
            _ => now,
        };

        let mut topics = guard.topics.clone();
        for (topic, items) in results {
            if !self.topics.contains(&topic) {
                tracing::warn!(topic = %topic, "dropping results for unconfigured topic");
                continue;
            }
            let snapshot = Arc::new(TopicSnapshot {
                items,
                fetched_at: stamp,
            });
            topics.insert(topic, snapshot);
        }

        *guard = Arc::new(Cycle {
            topics,
            updated_at: Some(stamp),
        });
        stamp
    }
}

// A poisoned lock still holds a whole value (writes are single assignments).
fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poison| poison.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poison| poison.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(n: usize) -> FeedItem {
        FeedItem::new(&format!("t{n}"), &format!("https://x.example/{n}")).unwrap()
    }

    #[test]
    fn empty_before_first_publish() {
        let cache = NewsCache::new(["general", "tech"]);
        assert!(cache.snapshot("tech").is_none());
        let v = cache.view("tech");
        assert_eq!(v.topic, "tech");
        assert!(v.items.is_empty());
        assert!(v.updated_at.is_none());
    }

    #[test]
    fn publish_replaces_whole_topic_and_stamps() {
        let cache = NewsCache::new(["general", "tech"]);
        cache.publish(vec![
            ("general".into(), vec![item(1), item(2)]),
            ("tech".into(), vec![item(3)]),
        ]);
        let first = cache.snapshot("general").unwrap();
        let stamp1 = cache.updated_at().unwrap();
        assert_eq!(first.items.len(), 2);
        assert_eq!(first.fetched_at, stamp1);

        cache.publish(vec![("general".into(), vec![]), ("tech".into(), vec![item(4)])]);
        // Earlier readers keep their snapshot intact.
        assert_eq!(first.items.len(), 2);
        assert!(cache.snapshot("general").unwrap().items.is_empty());
        assert!(cache.updated_at().unwrap() >= stamp1);
    }

    #[test]
    fn unknown_topic_reads_general() {
        let cache = NewsCache::new(["tech"]);
        cache.publish(vec![("general".into(), vec![item(7)])]);
        let sports = cache.view("sports");
        assert_eq!(sports.topic, "general");
        assert_eq!(sports.items, cache.view("general").items);
        assert_eq!(cache.view("TECH").topic, "tech");
    }

    #[test]
    fn concurrent_views_never_mix_cycles() {
        use std::sync::atomic::{AtomicBool, Ordering};
        use std::thread;

        const CYCLES: usize = 20_000;
        let cache = Arc::new(NewsCache::new(["general"]));
        let done = Arc::new(AtomicBool::new(false));

        let writer = {
            let cache = cache.clone();
            let done = done.clone();
            thread::spawn(move || {
                let stamps: Vec<DateTime<Utc>> = (0..CYCLES)
                    .map(|n| cache.publish(vec![("general".into(), vec![item(n)])]))
                    .collect();
                done.store(true, Ordering::SeqCst);
                stamps
            })
        };

        let mut seen = Vec::new();
        while !done.load(Ordering::SeqCst) {
            let v = cache.view("general");
            if let Some(first) = v.items.first() {
                seen.push((first.title.clone(), v.updated_at));
            }
        }
        let stamps = writer.join().unwrap();

        for (title, updated_at) in seen {
            let n: usize = title.trim_start_matches('t').parse().unwrap();
            assert_eq!(updated_at, Some(stamps[n]), "items of cycle {n} with another cycle's stamp");
        }
    }

    #[test]
    fn results_for_unknown_topics_are_ignored() {
        let cache = NewsCache::new(["general"]);
        cache.publish(vec![("weather".into(), vec![item(1)])]);
        assert!(cache.snapshot("general").is_none());
        assert!(cache.updated_at().is_some());
    }
}
