// src/telemetry.rs
use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

#[derive(Clone)]
pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder once per process; later calls reuse it.
    pub fn install() -> anyhow::Result<Self> {
        static HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();
        let handle = HANDLE.get_or_try_init(|| {
            let handle = PrometheusBuilder::new().install_recorder()?;
            describe_all();
            Ok::<_, anyhow::Error>(handle)
        })?;
        Ok(Self {
            handle: handle.clone(),
        })
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router<S>(&self) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}

/// Register descriptions so series show up on /metrics before first use.
fn describe_all() {
    describe_counter!("feed_fetch_total", "Feed URLs fetched.");
    describe_counter!(
        "feed_fetch_errors_total",
        "Feed fetches that yielded nothing due to an http or parse failure."
    );
    describe_counter!("feed_items_total", "Items parsed from feeds.");
    describe_histogram!("feed_parse_ms", "Feed parse time in milliseconds.");
    describe_counter!("news_refresh_cycles_total", "Completed news refresh cycles.");
    describe_counter!(
        "news_refresh_topic_failures_total",
        "Topic refreshes that panicked and published an empty list."
    );
    describe_gauge!("news_refresh_last_run_ts", "Unix ts of the last published cycle.");
    describe_counter!("gateway_requests_total", "Turns sent to a model backend.");
    describe_counter!("gateway_failover_total", "Groq retired-model failovers.");
    describe_counter!("gateway_auth_failures_total", "Turns answered with the unavailable text.");
    describe_counter!("gateway_backend_errors_total", "Turns that failed with a backend error.");
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use http::Request;
    use tower::ServiceExt;

    #[tokio::test]
    async fn install_is_idempotent_and_renders_described_series() {
        let first = Metrics::install().unwrap();
        let _second = Metrics::install().unwrap();

        metrics::counter!("feed_fetch_total").increment(1);

        let resp = first
            .router::<()>()
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let text = String::from_utf8(to_bytes(resp.into_body(), usize::MAX).await.unwrap().to_vec()).unwrap();
        assert!(text.contains("feed_fetch_total"));
    }
}
