//! Health check endpoint.

use axum::extract::State;
use axum::{Json, Router, routing::get};
use narrator_core::store::StateStore;
use serde::Serialize;

use crate::state::AppState;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status.
    pub status: &'static str,
    /// Service version.
    pub version: &'static str,
    /// Current narration epoch.
    pub narration_id: u64,
    /// Whether a narration is on display.
    pub narrating: bool,
}

/// GET /health
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let narration = state.store.get().narration;
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        narration_id: narration.id,
        narrating: narration.is_open(),
    })
}

/// Returns the health check router.
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
