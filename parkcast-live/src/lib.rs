//! parkcast-live library interface
//!
//! Live parking occupancy acquisition and forecasting: source adapters,
//! fallback coordination, feature assembly, scoring and the HTTP API.

pub mod api;
pub mod error;
pub mod fallback;
pub mod features;
pub mod forecast;
pub mod pipeline;
pub mod scoring;
pub mod sources;
pub mod summary;

pub use crate::error::{ApiError, ApiResult};
pub use crate::pipeline::{CycleReport, RefreshCycle};

use axum::Router;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::debug;
use uuid::Uuid;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub cycle: Arc<RefreshCycle>,
    /// Cycle currently running; cancelled when a newer request starts
    pub inflight: Arc<Mutex<Option<(Uuid, CancellationToken)>>>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last degradation or error for diagnostics
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(cycle: RefreshCycle) -> Self {
        Self {
            cycle: Arc::new(cycle),
            inflight: Arc::new(Mutex::new(None)),
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }

    /// Cancel the in-flight cycle (if any) and register a fresh one
    pub async fn begin_cycle(&self) -> (Uuid, CancellationToken) {
        let id = Uuid::new_v4();
        let token = CancellationToken::new();
        if let Some((previous_id, previous)) =
            self.inflight.lock().await.replace((id, token.clone()))
        {
            debug!(cycle = %previous_id, "Superseding in-flight cycle");
            previous.cancel();
        }
        (id, token)
    }

    /// Unregister cycle `id` unless a newer one already replaced it
    pub async fn finish_cycle(&self, id: Uuid) {
        let mut inflight = self.inflight.lock().await;
        if inflight.as_ref().is_some_and(|(current, _)| *current == id) {
            *inflight = None;
        }
    }

    pub async fn set_last_error(&self, error: Option<String>) {
        *self.last_error.write().await = error;
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::health_routes())
        .merge(api::prediction_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
