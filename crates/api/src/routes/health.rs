//! Health check endpoint.

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;
use tracing::warn;

use crate::AppState;

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    /// `healthy`, or `degraded` when the database is unreachable.
    pub status: &'static str,
    /// Database reachability.
    pub database: &'static str,
    /// Service version.
    pub version: &'static str,
}

async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let (status, database) = match state.db.ping().await {
        Ok(()) => ("healthy", "up"),
        Err(e) => {
            warn!(error = %e, "Database ping failed");
            ("degraded", "down")
        }
    };

    Json(HealthResponse {
        status,
        database,
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Creates health check routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
