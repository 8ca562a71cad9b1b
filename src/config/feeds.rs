// src/config/feeds.rs
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const ENV_PATH: &str = "FEEDS_CONFIG_PATH";
const DEFAULT_PATH: &str = "config/feeds.toml";

/// Topic every unknown name resolves to.
pub const FALLBACK_TOPIC: &str = "general";

fn default_per_source_limit() -> usize {
    8
}
fn default_topic_cap() -> usize {
    16
}
fn default_refresh_interval_secs() -> u64 {
    120
}
fn default_fetch_timeout_secs() -> u64 {
    10
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicFeeds {
    pub name: String,
    #[serde(default)]
    pub sources: Vec<String>,
}

/// Topics, their source URLs and the refresh knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedsConfig {
    /// Processing order of a refresh cycle follows this list.
    #[serde(rename = "topic", default)]
    pub topics: Vec<TopicFeeds>,
    #[serde(default = "default_per_source_limit")]
    pub per_source_limit: usize,
    #[serde(default = "default_topic_cap")]
    pub topic_cap: usize,
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
}

impl Default for FeedsConfig {
    fn default() -> Self {
        Self {
            topics: builtin_topics(),
            per_source_limit: default_per_source_limit(),
            topic_cap: default_topic_cap(),
            refresh_interval_secs: default_refresh_interval_secs(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
        }
    }
}

fn builtin_topics() -> Vec<TopicFeeds> {
    let topic = |name: &str, sources: &[&str]| TopicFeeds {
        name: name.to_string(),
        sources: sources.iter().map(|s| s.to_string()).collect(),
    };
    vec![
        topic(
            "general",
            &[
                "https://news.google.com/rss?hl=pt-BR&gl=BR&ceid=BR:pt-419",
                "https://feeds.bbci.co.uk/news/rss.xml",
                "https://rss.cnn.com/rss/edition.rss",
                "https://feeds.reuters.com/reuters/worldNews",
            ],
        ),
        topic(
            "tech",
            &[
                "https://feeds.arstechnica.com/arstechnica/index",
                "https://www.theverge.com/rss/index.xml",
                "https://www.wired.com/feed/rss",
            ],
        ),
        topic(
            "games",
            &[
                "https://www.gamespot.com/feeds/game-news/",
                "https://kotaku.com/rss",
                "https://www.eurogamer.net/feed/news",
                "https://www.pcgamer.com/rss/",
            ],
        ),
    ]
}

impl FeedsConfig {
    /// Parse a TOML document and normalize it.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let cfg: FeedsConfig = toml::from_str(s).context("parsing feeds config toml")?;
        Ok(cfg.normalized())
    }

    /// Load from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading feeds config from {}", path.display()))?;
        Self::from_toml_str(&content)
    }

    /// Load using env var + fallbacks:
    /// 1) $FEEDS_CONFIG_PATH
    /// 2) config/feeds.toml
    /// 3) built-in topics
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_PATH) {
            let pb = PathBuf::from(p);
            if pb.exists() {
                return Self::load_from(&pb);
            } else {
                return Err(anyhow!("FEEDS_CONFIG_PATH points to non-existent path"));
            }
        }
        let default_p = PathBuf::from(DEFAULT_PATH);
        if default_p.exists() {
            return Self::load_from(&default_p);
        }
        Ok(Self::default())
    }

    /// Lower-case + trim names, drop blank URLs and duplicate topics, guarantee `general`.
    fn normalized(mut self) -> Self {
        let mut out: Vec<TopicFeeds> = Vec::with_capacity(self.topics.len());
        for t in self.topics.drain(..) {
            let name = t.name.trim().to_lowercase();
            if name.is_empty() || out.iter().any(|o| o.name == name) {
                continue;
            }
            let sources = t
                .sources
                .into_iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
            out.push(TopicFeeds { name, sources });
        }
        if !out.iter().any(|t| t.name == FALLBACK_TOPIC) {
            if let Some(general) = builtin_topics().into_iter().find(|t| t.name == FALLBACK_TOPIC) {
                out.insert(0, general);
            }
        }
        self.topics = out;
        if self.per_source_limit == 0 {
            self.per_source_limit = default_per_source_limit();
        }
        if self.topic_cap == 0 {
            self.topic_cap = default_topic_cap();
        }
        if self.refresh_interval_secs == 0 {
            self.refresh_interval_secs = default_refresh_interval_secs();
        }
        if self.fetch_timeout_secs == 0 {
            self.fetch_timeout_secs = default_fetch_timeout_secs();
        }
        self
    }

    pub fn topic_names(&self) -> Vec<String> {
        self.topics.iter().map(|t| t.name.clone()).collect()
    }

    /// Canonical topic name for a free-form request; unknown names map to `general`.
    pub fn canonical_name(&self, requested: &str) -> &str {
        resolve_topic_name(self.topics.iter().map(|t| t.name.as_str()), requested)
    }

    /// Source list for a topic, with the same fallback as `canonical_name`.
    pub fn resolve(&self, requested: &str) -> &[String] {
        let name = self.canonical_name(requested);
        self.topics
            .iter()
            .find(|t| t.name == name)
            .map(|t| t.sources.as_slice())
            .unwrap_or(&[])
    }
}

/// The one topic-name rule shared by the aggregator and the cache: trim and
/// lower-case, then pick the matching known name or fall back to `general`.
pub fn resolve_topic_name<'a, I>(known: I, requested: &str) -> &'a str
where
    I: IntoIterator<Item = &'a str>,
{
    let wanted = requested.trim().to_lowercase();
    known
        .into_iter()
        .find(|name| *name == wanted)
        .unwrap_or(FALLBACK_TOPIC)
}
