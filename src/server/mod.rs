//! HTTP and WebSocket server setup.
//!
//! - `GET /ws` upgrades to a WebSocket carrying the JSON action/event protocol
//! - `GET /api/sessions` lists live sessions
//! - `GET /health` liveness probe

mod routes;
mod ws;

pub use routes::{health, list_sessions};
pub use ws::{dispatch, ws_handler};

use crate::hub::{EventSink, Hub};
use crate::session::{SessionCoordinator, SessionRegistry};
use axum::Router;
use axum::routing::get;
use std::sync::Arc;
use tracing::{info, instrument};

/// State shared by every request handler.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Applies inbound actions.
    pub coordinator: SessionCoordinator,
    /// Per-connection outboxes.
    pub hub: Arc<Hub>,
}

impl AppState {
    /// Creates state over a fresh registry with random session ids.
    pub fn new() -> Self {
        Self::with_registry(SessionRegistry::new())
    }

    /// Creates state over the given registry.
    #[instrument(skip(registry))]
    pub fn with_registry(registry: SessionRegistry) -> Self {
        info!("Creating application state");
        let hub = Arc::new(Hub::new());
        let sink: Arc<dyn EventSink> = hub.clone();
        Self {
            coordinator: SessionCoordinator::new(Arc::new(registry), sink),
            hub,
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/api/sessions", get(list_sessions))
        .route("/health", get(health))
        .with_state(state)
}
