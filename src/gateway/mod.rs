//! Health and metrics HTTP endpoint.
//!
//! - `GET /health`: JSON liveness summary
//! - `GET /metrics`: Prometheus text exposition
//!
//! Only started when `[gateway].bind` (or `WEATHERBOT_GATEWAY_BIND`) is set.

use crate::memory::LocationCache;
use crate::observability::Metrics;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower_http::timeout::TimeoutLayer;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct AppState {
    pub metrics: Arc<Metrics>,
    pub cache: Arc<LocationCache>,
    pub provider: String,
    pub started_at: Instant,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handle_health))
        .route("/metrics", get(handle_metrics))
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .with_state(state)
}

/// Bind and serve until the task is dropped.
pub async fn serve(bind: &str, state: AppState) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind gateway on {bind}: {e}"))?;
    tracing::info!("Gateway listening on {}", listener.local_addr()?);
    axum::serve(listener, router(state)).await?;
    Ok(())
}

/// GET /health
async fn handle_health(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "provider": state.provider,
        "uptime_secs": state.started_at.elapsed().as_secs(),
        "cached_locations": state.cache.len(),
    }))
}

/// GET /metrics
async fn handle_metrics(State(state): State<AppState>) -> impl IntoResponse {
    state.metrics.set_cached_locations(state.cache.len());
    match state.metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to encode metrics: {e}"),
        )
            .into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::Coordinates;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn state() -> AppState {
        AppState {
            metrics: Arc::new(Metrics::new().unwrap()),
            cache: Arc::new(LocationCache::new()),
            provider: "yandex".into(),
            started_at: Instant::now(),
        }
    }

    async fn get_body(app: Router, uri: &str) -> (StatusCode, String) {
        let resp = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn health_reports_cache_size() {
        let state = state();
        state.cache.save(1, Coordinates::new(1.0, 2.0));

        let (status, body) = get_body(router(state), "/health").await;
        assert_eq!(status, StatusCode::OK);

        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["provider"], "yandex");
        assert_eq!(json["cached_locations"], 1);
    }

    #[tokio::test]
    async fn metrics_are_exposed_as_text() {
        let state = state();
        state.metrics.record_outcome("delivered");
        state.cache.save(3, Coordinates::new(0.0, 0.0));

        let (status, body) = get_body(router(state), "/metrics").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("weatherbot_queries_total{outcome=\"delivered\"} 1"));
        assert!(body.contains("weatherbot_cached_locations 1"));
    }

    #[tokio::test]
    async fn unknown_route_is_404() {
        let (status, _) = get_body(router(state()), "/nope").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
