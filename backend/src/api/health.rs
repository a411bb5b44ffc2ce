//! Health check endpoints

use axum::{Json, Router, extract::State, http::StatusCode, routing::get};
use serde::Serialize;
use tracing::warn;

use crate::app::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

#[derive(Serialize)]
pub struct ReadyResponse {
    pub ready: bool,
    pub backend: bool,
}

/// Liveness check - always returns OK if the server is running
async fn liveness() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Readiness check - verifies the search backend answers
async fn readiness(State(state): State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    let backend_ok = match state.repository.ping().await {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, "Search backend is not ready");
            false
        }
    };

    let status = if backend_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (
        status,
        Json(ReadyResponse {
            ready: backend_ok,
            backend: backend_ok,
        }),
    )
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/liveness", get(liveness))
        .route("/readiness", get(readiness).post(readiness))
}
