// Scrape endpoint HTTP API
// This file provides the metrics endpoint, a landing page and a health check

use crate::collector::{FamilyBuffer, SnapshotCollector};
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use prometheus::{Encoder, TextEncoder};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::error;

pub struct AppState {
    collector: SnapshotCollector,
    metrics_path: String,
}

impl AppState {
    pub fn new(collector: SnapshotCollector, metrics_path: impl Into<String>) -> Self {
        Self {
            collector,
            metrics_path: metrics_path.into(),
        }
    }
}

/// Create the HTTP router serving the metrics path from `state`
pub fn create_router(state: Arc<AppState>) -> Router {
    let metrics_path = state.metrics_path.clone();
    Router::new()
        .route("/", get(index))
        .route("/health", get(health_check))
        .route(&metrics_path, get(metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn index(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(format!(
        r#"<html>
<head><title>Opsgenie Exporter</title></head>
<body>
<h1>Opsgenie Exporter</h1>
<p><a href="{path}">see metrics</a></p>
</body>
</html>"#,
        path = state.metrics_path
    ))
}

async fn health_check() -> StatusCode {
    StatusCode::OK
}

/// Collect a fresh snapshot and encode it together with the process and
/// exporter metrics from the default registry.
async fn metrics(State(state): State<Arc<AppState>>) -> Response {
    let mut buffer = FamilyBuffer::new();
    state.collector.collect(&mut buffer).await;

    let mut families = buffer.into_families();
    families.extend(prometheus::gather());

    let encoder = TextEncoder::new();
    let mut body = Vec::new();
    if let Err(err) = encoder.encode(&families, &mut body) {
        error!(error = %err, "failed to encode metrics");
        return (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response();
    }

    (
        [(header::CONTENT_TYPE, encoder.format_type().to_string())],
        body,
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptors::DescriptorSet;
    use crate::errors::ExporterError;
    use crate::source::{DataSource, Team, UserRoleCount};
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    struct StaticSource;

    #[async_trait]
    impl DataSource for StaticSource {
        async fn count_alerts(&self, _query: &str) -> Result<f64, ExporterError> {
            Ok(1.0)
        }

        async fn list_teams(&self) -> Result<Vec<Team>, ExporterError> {
            Ok(vec![Team::new("Everyone")])
        }

        async fn count_users_by_role(&self) -> Result<UserRoleCount, ExporterError> {
            Err(ExporterError::Transport("connection refused".into()))
        }
    }

    fn app() -> Router {
        let collector =
            SnapshotCollector::new(Arc::new(StaticSource), Arc::new(DescriptorSet::new()));
        create_router(Arc::new(AppState::new(collector, "/metrics")))
    }

    async fn get(uri: &str) -> (StatusCode, String) {
        let resp = app()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = resp.status();
        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn metrics_endpoint_serves_partial_snapshot() {
        let (status, body) = get("/metrics").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("opsgenie_teams_count 1"));
        assert!(body.contains(
            "opsgenie_alerts_status_count{status=\"open\",team=\"Everyone\",priority=\"P5\"} 1"
        ));
        assert!(!body.contains("opsgenie_users_count"));
        assert!(body.contains("opsgenie_exporter_scrape_failures_total{family=\"users_count\"}"));
    }

    #[tokio::test]
    async fn index_links_to_metrics_path() {
        let (status, body) = get("/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains(r#"<a href="/metrics">"#));
    }

    #[tokio::test]
    async fn health_and_unknown_paths() {
        assert_eq!(get("/health").await.0, StatusCode::OK);
        assert_eq!(get("/nope").await.0, StatusCode::NOT_FOUND);
    }
}
