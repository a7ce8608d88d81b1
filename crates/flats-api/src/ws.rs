//! `WebSocket` endpoint for change notifications.
//!
//! Clients connect to `GET /notifications`, receive a `CONNECTED`
//! acknowledgement carrying their session id, and from then on every
//! change notification the services broadcast. A text frame `ping` is
//! answered with `PONG`, any other text with `ERROR`.
//!
//! Each socket task drains its own bounded queue registered with the
//! [`Broadcaster`](flats_core::Broadcaster). Every frame send is bounded by
//! the configured send timeout; a client that cannot keep up is dropped.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, Utf8Bytes, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use flats_core::Connection;
use flats_types::{Notification, NotificationEvent, SessionId};
use tracing::{debug, warn};

use crate::state::AppState;

/// Upgrade an HTTP request to a notification `WebSocket`.
///
/// # Route
///
/// `GET /notifications`
pub async fn notifications(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_ws(socket, state))
}

/// Send one frame, giving up after `limit`. Returns whether it was sent.
async fn send_frame(socket: &mut WebSocket, message: Message, limit: Duration) -> bool {
    match tokio::time::timeout(limit, socket.send(message)).await {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            debug!("WebSocket send failed: {e}");
            false
        }
        Err(_) => {
            debug!(timeout_ms = limit.as_millis(), "WebSocket send timed out");
            false
        }
    }
}

/// Serialize and send a notification addressed to this socket only.
async fn send_event(socket: &mut WebSocket, event: NotificationEvent, limit: Duration) -> bool {
    match Notification::now(event).to_json() {
        Ok(json) => send_frame(socket, Message::Text(json.into()), limit).await,
        Err(e) => {
            warn!("Failed to serialize notification: {e}");
            true
        }
    }
}

/// Reply to a client text frame.
fn reply_to(text: &str) -> NotificationEvent {
    if text.trim() == "ping" {
        NotificationEvent::pong()
    } else {
        NotificationEvent::error(format!("Unknown command: {text}"))
    }
}

/// Handle the `WebSocket` lifecycle: acknowledge, register, forward
/// broadcasts and answer client frames until either side goes away.
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
    let session_id = SessionId::new();
    let limit = state.limits.ws_send_timeout;
    let broadcaster = &state.services.broadcaster;
    debug!(%session_id, "WebSocket client connected");

    if !send_event(&mut socket, NotificationEvent::connected(session_id), limit).await {
        return;
    }

    let (connection, mut rx) = Connection::channel(state.limits.ws_channel_capacity);
    broadcaster.register(session_id, connection).await;

    loop {
        tokio::select! {
            // A broadcast queued for this client.
            outbound = rx.recv() => {
                let Some(text) = outbound else {
                    debug!(%session_id, "Connection pruned by broadcaster");
                    break;
                };
                if !send_frame(&mut socket, Message::Text(Utf8Bytes::from(&*text)), limit).await {
                    break;
                }
            }
            // A frame from the client.
            inbound = socket.recv() => {
                match inbound {
                    Some(Ok(Message::Text(text))) => {
                        if !send_event(&mut socket, reply_to(text.as_str()), limit).await {
                            break;
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if !send_frame(&mut socket, Message::Pong(data), limit).await {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        debug!(%session_id, "WebSocket client disconnected");
                        break;
                    }
                    Some(Err(e)) => {
                        debug!(%session_id, "WebSocket error: {e}");
                        break;
                    }
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    broadcaster.deregister(session_id).await;
}
