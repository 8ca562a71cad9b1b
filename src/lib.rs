// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod api;
pub mod config;
pub mod conversation;
pub mod gateway;
pub mod news;
pub mod telemetry;

pub use crate::api::{router, AppState};
pub use crate::gateway::{GatewayError, Message, ProviderGateway, Reply, Role};

use std::sync::Arc;

use axum::Router;
use tracing::info;

use crate::config::{FeedsConfig, GatewayConfig};
use crate::news::FeedFetcher;

/// Resolve the gateway and wire the news pipeline. The scheduler is left idle.
pub async fn build_state(gateway_cfg: &GatewayConfig, feeds: Arc<FeedsConfig>) -> anyhow::Result<AppState> {
    let (news, scheduler) = news::build(feeds)?;
    state_from_parts(gateway_cfg, news, scheduler).await
}

/// Same as [`build_state`] but with a caller-supplied feed fetcher.
pub async fn build_state_with_fetcher(
    gateway_cfg: &GatewayConfig,
    feeds: Arc<FeedsConfig>,
    fetcher: Arc<dyn FeedFetcher>,
) -> anyhow::Result<AppState> {
    let (news, scheduler) = news::build_with_fetcher(feeds, fetcher);
    state_from_parts(gateway_cfg, news, scheduler).await
}

async fn state_from_parts(
    gateway_cfg: &GatewayConfig,
    news: Arc<news::NewsCache>,
    scheduler: news::RefreshScheduler,
) -> anyhow::Result<AppState> {
    let gateway = ProviderGateway::from_config(gateway_cfg).await?;
    Ok(AppState {
        gateway: Arc::new(gateway),
        news,
        scheduler: Arc::new(scheduler),
        credentials: gateway_cfg.credentials(),
    })
}

/// Build the whole application from the environment: gateway, news refresh
/// loop (started), Prometheus recorder and router.
pub async fn app() -> anyhow::Result<Router> {
    let gateway_cfg = GatewayConfig::from_env();
    let feeds = Arc::new(FeedsConfig::load_default()?);
    info!(
        topics = ?feeds.topic_names(),
        interval_secs = feeds.refresh_interval_secs,
        "feeds config loaded"
    );

    let state = build_state(&gateway_cfg, feeds).await?;
    state.scheduler.start();

    let metrics = telemetry::Metrics::install()?;
    Ok(router(state).merge(metrics.router()))
}
