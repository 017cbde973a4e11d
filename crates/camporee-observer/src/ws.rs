//! `WebSocket` handler for bracket change notices.
//!
//! Clients connect to `GET /ws/brackets` and receive a JSON-encoded
//! [`BracketChange`](crate::state::BracketChange) after every successful
//! mutation. Notices carry no bracket data; renderers refetch the
//! snapshot for the game named in the notice.
//!
//! If a client falls behind, lagged messages are skipped and the client
//! resumes from the most recent notice.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use crate::state::AppState;

/// Upgrade an HTTP request to a `WebSocket` connection and begin
/// streaming change notices.
///
/// # Route
///
/// `GET /ws/brackets`
pub async fn ws_brackets(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_ws(socket, state))
}

async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
    debug!("WebSocket client connected");

    let mut rx = state.subscribe();

    loop {
        tokio::select! {
            result = rx.recv() => {
                match result {
                    Ok(change) => {
                        let json = match serde_json::to_string(&change) {
                            Ok(j) => j,
                            Err(e) => {
                                warn!("Failed to serialize bracket change: {e}");
                                continue;
                            }
                        };
                        if socket.send(Message::Text(json.into())).await.is_err() {
                            debug!("WebSocket client disconnected (send failed)");
                            return;
                        }
                    }
                    Err(RecvError::Lagged(n)) => {
                        warn!(skipped = n, "WebSocket client lagged, change notices dropped");
                    }
                    Err(RecvError::Closed) => {
                        debug!("Broadcast channel closed, shutting down WebSocket");
                        return;
                    }
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => {
                        debug!("WebSocket client disconnected");
                        return;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            debug!("WebSocket client disconnected (pong failed)");
                            return;
                        }
                    }
                    Some(Err(e)) => {
                        debug!("WebSocket error: {e}");
                        return;
                    }
                    // Clients only listen.
                    _ => {}
                }
            }
        }
    }
}
