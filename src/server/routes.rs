//! Plain HTTP routes.

use super::AppState;
use crate::session::SessionSummary;
use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde_json::{Value, json};
use tracing::{debug, error, instrument};

/// Lists live sessions with their participant count and round state.
#[instrument(skip_all)]
pub async fn list_sessions(
    State(state): State<AppState>,
) -> Result<Json<Vec<SessionSummary>>, (StatusCode, Json<Value>)> {
    match state.coordinator.registry().list() {
        Ok(sessions) => {
            debug!(count = sessions.len(), "Serving session list");
            Ok(Json(sessions))
        }
        Err(e) => {
            error!(error = %e, "Failed to list sessions");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Internal Server Error" })),
            ))
        }
    }
}

/// Liveness probe.
pub async fn health() -> &'static str {
    "ok"
}
