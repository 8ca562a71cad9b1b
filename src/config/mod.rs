// src/config/mod.rs
pub mod ai;
pub mod feeds;

pub use ai::{CredentialPresence, GatewayConfig};
pub use feeds::{FeedsConfig, TopicFeeds};
