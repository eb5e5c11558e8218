//! Health check endpoint

use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

use crate::AppState;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// "ok", or "degraded" when no predictor is loaded
    pub status: String,
    /// Module name ("parkcast-live")
    pub module: String,
    /// Crate version from Cargo.toml
    pub version: String,
    /// Seconds since service started
    pub uptime_seconds: u64,
    /// Loaded predictor, if any
    pub predictor: Option<String>,
    /// Lots in the metadata table
    pub metadata_lots: usize,
    /// Occupancy adapters in priority order
    pub occupancy_sources: Vec<String>,
    /// Weather adapters in priority order
    pub weather_sources: Vec<String>,
    /// Last error message if any (for diagnostics)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let uptime = Utc::now().signed_duration_since(state.startup_time);
    let uptime_seconds = uptime.num_seconds().max(0) as u64;

    let last_error = state.last_error.read().await.clone();
    let predictor = state.cycle.predictor_name().map(str::to_string);
    let (occupancy_sources, weather_sources) = state.cycle.source_ids();

    Json(HealthResponse {
        status: if predictor.is_some() { "ok" } else { "degraded" }.to_string(),
        module: "parkcast-live".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds,
        predictor,
        metadata_lots: state.cycle.metadata().len(),
        occupancy_sources,
        weather_sources,
        last_error,
    })
}

/// Build health check routes
pub fn health_routes() -> Router<crate::AppState> {
    Router::new().route("/health", get(health_check))
}
