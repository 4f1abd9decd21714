//! `WebSocket` handlers for real-time incident streaming.
//!
//! Two streams exist: the responder feed (`GET /ws/incidents`), which
//! pushes a full rebuilt snapshot per collection change, and the
//! reporter status stream (`GET /ws/incidents/{id}`), which pushes
//! status updates for one incident and closes after `accepted` is
//! delivered.
//!
//! If a feed client falls behind, lagged snapshots are silently skipped
//! and the client resumes from the most recent one -- lossless, since
//! every snapshot is a full rebuild.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Path, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use chrono::{DateTime, Utc};
use lifesync_types::{IncidentId, IncidentStatus};
use serde::Serialize;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::state::AppState;

/// Status update pushed over the reporter stream.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
    /// The watched incident.
    pub id: IncidentId,
    /// Current lifecycle state.
    pub status: IncidentStatus,
    /// Acceptance timestamp, once accepted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accepted_at: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// GET /ws/incidents -- responder feed stream
// ---------------------------------------------------------------------------

/// Upgrade to a `WebSocket` and stream feed snapshots.
pub async fn ws_feed(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_feed(socket, state))
}

/// Feed stream lifecycle: push the current snapshot, then forward each
/// broadcast snapshot as a text frame.
async fn handle_feed(mut socket: WebSocket, state: Arc<AppState>) {
    debug!("feed client connected");

    // Initial snapshot so the client renders without waiting for the
    // next change.
    match state.feed.snapshot().await {
        Ok(snapshot) => {
            if send_json(&mut socket, &snapshot).await.is_err() {
                return;
            }
        }
        Err(e) => warn!(error = %e, "initial snapshot failed"),
    }

    let mut rx = state.subscribe_feed();

    loop {
        tokio::select! {
            result = rx.recv() => {
                match result {
                    Ok(snapshot) => {
                        if send_json(&mut socket, &snapshot).await.is_err() {
                            debug!("feed client disconnected (send failed)");
                            return;
                        }
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                        debug!(skipped = n, "feed client lagged, skipping ahead");
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                        debug!("feed broadcast closed, shutting down stream");
                        return;
                    }
                }
            }
            msg = socket.recv() => {
                if client_gone(msg, &mut socket).await {
                    debug!("feed client disconnected");
                    return;
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// GET /ws/incidents/{id} -- reporter status stream
// ---------------------------------------------------------------------------

/// Upgrade to a `WebSocket` and stream one incident's status.
pub async fn ws_incident_status(
    ws: WebSocketUpgrade,
    Path(id): Path<Uuid>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_incident_status(socket, state, IncidentId::from(id)))
}

/// Push status updates for one incident until it is accepted or the
/// client leaves. The store watch is dropped (and its subscription
/// released) on every exit path.
async fn handle_incident_status(mut socket: WebSocket, state: Arc<AppState>, id: IncidentId) {
    debug!(incident_id = %id, "status client connected");

    let mut watch = state.store.watch_incident(id).await;

    loop {
        tokio::select! {
            result = watch.changed() => {
                match result {
                    Ok(incident) => {
                        let update = StatusUpdate {
                            id: incident.id,
                            status: incident.status,
                            accepted_at: incident.accepted_at,
                        };
                        if send_json(&mut socket, &update).await.is_err() {
                            debug!(incident_id = %id, "status client disconnected (send failed)");
                            return;
                        }
                        if incident.status == IncidentStatus::Accepted {
                            // Terminal state delivered; nothing further
                            // can happen on this stream.
                            debug!(incident_id = %id, "acceptance delivered, closing stream");
                            let _ = socket.send(Message::Close(None)).await;
                            return;
                        }
                    }
                    Err(e) => {
                        warn!(incident_id = %id, error = %e, "status watch ended");
                        let _ = socket.send(Message::Close(None)).await;
                        return;
                    }
                }
            }
            msg = socket.recv() => {
                if client_gone(msg, &mut socket).await {
                    debug!(incident_id = %id, "status client disconnected");
                    return;
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Shared frame plumbing
// ---------------------------------------------------------------------------

/// Serialize a value and send it as a text frame.
async fn send_json<T: Serialize>(socket: &mut WebSocket, value: &T) -> Result<(), ()> {
    let json = match serde_json::to_string(value) {
        Ok(json) => json,
        Err(e) => {
            warn!(error = %e, "failed to serialize frame");
            return Ok(());
        }
    };
    socket
        .send(Message::Text(json.into()))
        .await
        .map_err(|_| ())
}

/// Handle an inbound client message; returns `true` when the client is
/// gone and the stream should stop.
async fn client_gone(msg: Option<Result<Message, axum::Error>>, socket: &mut WebSocket) -> bool {
    match msg {
        Some(Ok(Message::Close(_))) | None => true,
        Some(Ok(Message::Ping(data))) => socket.send(Message::Pong(data)).await.is_err(),
        Some(Err(e)) => {
            debug!("websocket error: {e}");
            true
        }
        _ => {
            // Ignore other message types (text, binary from client).
            false
        }
    }
}
