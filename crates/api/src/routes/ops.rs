//! Operations routes
//!
//! Health and metrics endpoints for monitoring. These routes do not touch
//! the source set.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use crate::state::AppState;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Server status
    pub status: &'static str,
    /// Uptime in seconds
    pub uptime_secs: u64,
    /// Active source count
    pub active_sources: usize,
    /// Failed source count awaiting retry
    pub failed_sources: usize,
}

/// Metrics response
#[derive(Debug, Serialize)]
pub struct MetricsResponse {
    /// Server uptime in seconds
    pub uptime_secs: u64,
    /// Packets accepted into the chain
    pub packets_submitted: u64,
    /// Packets dropped because the chain was full
    pub packets_dropped: u64,
    /// Payload bytes accepted into the chain
    pub bytes_submitted: u64,
}

/// Operations routes (health, metrics)
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
}

/// Health check endpoint
///
/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        uptime_secs: state.uptime_secs(),
        active_sources: state.tracker.active_count(),
        failed_sources: state.tracker.failed_count(),
    })
}

/// Packet chain metrics endpoint
///
/// GET /metrics
async fn metrics_handler(State(state): State<AppState>) -> Json<MetricsResponse> {
    let snapshot = state.chain_metrics.as_ref().map(|m| m.snapshot());

    Json(MetricsResponse {
        uptime_secs: state.uptime_secs(),
        packets_submitted: snapshot.map(|s| s.packets_submitted).unwrap_or(0),
        packets_dropped: snapshot.map(|s| s.packets_dropped).unwrap_or(0),
        bytes_submitted: snapshot.map(|s| s.bytes_submitted).unwrap_or(0),
    })
}
