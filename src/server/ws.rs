//! WebSocket connection adapter.
//!
//! One task per socket reads frames and dispatches them in arrival order;
//! a companion task drains the connection's outbox into the socket.

use super::AppState;
use crate::hub::EventSink;
use crate::protocol::{ClientAction, ServerEvent};
use crate::session::{ConnectionId, SessionError};
use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use std::panic::{AssertUnwindSafe, catch_unwind};
use tracing::{debug, error, info, instrument, warn};

/// Upgrades the request and hands the socket to the adapter.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

#[instrument(skip_all)]
async fn handle_socket(socket: WebSocket, state: AppState) {
    let (connection, mut events) = state.hub.connect();
    info!(%connection, "User connected");

    let (mut outbound, mut inbound) = socket.split();

    let writer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            let text = match serde_json::to_string(&event) {
                Ok(text) => text,
                Err(e) => {
                    error!(%connection, error = %e, "Failed to encode event");
                    continue;
                }
            };
            if outbound.send(Message::Text(text.into())).await.is_err() {
                debug!(%connection, "Socket closed while sending");
                break;
            }
        }
    });

    while let Some(frame) = inbound.next().await {
        match frame {
            Ok(Message::Text(text)) => dispatch(&state, connection, text.as_str()),
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                warn!(%connection, error = %e, "Socket error");
                break;
            }
        }
    }

    info!(%connection, "User disconnected");
    if let Err(e) = state.coordinator.disconnect(connection) {
        error!(%connection, error = %e, "Error in disconnect");
    }
    state.hub.disconnect(connection);
    writer.abort();
}

/// Parses one text frame and applies it.
///
/// Faults are logged and answered with an `error` event to the sender
/// only; they never touch other connections.
#[instrument(skip(state, text), fields(%connection))]
pub fn dispatch(state: &AppState, connection: ConnectionId, text: &str) {
    let action: ClientAction = match serde_json::from_str(text) {
        Ok(action) => action,
        Err(e) => {
            warn!(error = %e, "Malformed message");
            state
                .hub
                .send_to(connection, &ServerEvent::error("Malformed message"));
            return;
        }
    };

    debug!(?action, "Dispatching action");
    let failure = action.failure_message();
    let result = catch_unwind(AssertUnwindSafe(|| {
        state.coordinator.handle(connection, action)
    }))
    .unwrap_or_else(|_| Err(SessionError::new("Panic while handling action")));

    match result {
        Ok(outcome) => debug!(%outcome, "Action handled"),
        Err(e) => {
            error!(error = %e, "{}", failure);
            state.hub.send_to(connection, &ServerEvent::error(failure));
        }
    }
}
