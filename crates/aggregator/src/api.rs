//! HTTP API for platform health, liveness and Prometheus metrics

use aggregator_lib::{collector::collect_metrics, HealthAggregator, HealthMetrics};
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{error, info};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub aggregator: Arc<HealthAggregator>,
    pub metrics: HealthMetrics,
}

impl AppState {
    pub fn new(aggregator: Arc<HealthAggregator>, metrics: HealthMetrics) -> Self {
        Self {
            aggregator,
            metrics,
        }
    }
}

/// Platform health - returns 200 if healthy or degraded, 503 if unhealthy
async fn platform_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let report = state.aggregator.check_all().await;

    let status_code = if report.status.is_operational() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(report))
}

/// Liveness of the aggregator itself
async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Prometheus metrics endpoint, refreshed by a fresh aggregation cycle
async fn metrics(State(state): State<Arc<AppState>>) -> Response {
    collect_metrics(&state.aggregator, &state.metrics).await;

    match state.metrics.render() {
        Ok(buffer) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, state.metrics.content_type())],
            buffer,
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "Failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/platform/health", get(platform_health))
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Start the API server, stopping when a shutdown message arrives
pub async fn serve(
    port: u16,
    state: Arc<AppState>,
    mut shutdown: broadcast::Receiver<()>,
) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
        })
        .await?;

    Ok(())
}
