//! WebSocket handler — the live board channel.
//!
//! DESIGN
//! ======
//! The connection is keyed by the `userId`/`boardId` query parameters and
//! entered into the registry, then serves a `select!` loop:
//! - Inbound frames → validate, stamp, arbitrate locks, apply, relay.
//! - Broadcast envelopes from board peers → forward to the socket.
//!
//! The protocol is fire-and-forget: nothing is ever replied to the sender,
//! and invalid traffic is dropped silently.
//!
//! LIFECYCLE
//! =========
//! 1. Upgrade → refuse with close code 1008 when either id is missing
//! 2. Register, replacing any prior channel for the same user+board
//! 3. Hydrate the board replica on first member, broadcast `userJoined`
//! 4. Serve frames until close, error, or replacement
//! 5. Unregister → sweep stale locks → broadcast `userLeft` → evict replica

use std::collections::HashMap;

use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::Response;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::message::{Body, Envelope};
use crate::registry::Member;
use crate::services;
use crate::services::lock::{BlurOutcome, FocusOutcome};
use crate::state::AppState;

/// WebSocket close code for policy violations (RFC 6455 §7.4.1).
const CLOSE_POLICY_VIOLATION: u16 = 1008;

/// Reason sent with the refusal close frame.
const REFUSAL_REASON: &str = "userId and boardId query parameters are required";

/// Default capacity of each member's outbound queue.
const DEFAULT_QUEUE_CAPACITY: usize = 256;

fn queue_capacity() -> usize {
    std::env::var("CHANNEL_QUEUE_CAPACITY")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_QUEUE_CAPACITY)
}

// =============================================================================
// UPGRADE
// =============================================================================

pub async fn handle_ws(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
    ws: WebSocketUpgrade,
) -> Response {
    let user_id = params.get("userId").filter(|v| !v.is_empty()).cloned();
    let board_id = params.get("boardId").filter(|v| !v.is_empty()).cloned();

    ws.on_upgrade(move |socket| async move {
        match (user_id, board_id) {
            (Some(user_id), Some(board_id)) => run_ws(socket, state, user_id, board_id).await,
            _ => refuse(socket).await,
        }
    })
}

/// Close the socket with a policy-violation code and reason; the connection
/// never enters the registry.
async fn refuse(mut socket: WebSocket) {
    warn!("ws: refusing connection without userId and boardId");
    let close = Message::Close(Some(CloseFrame {
        code: CLOSE_POLICY_VIOLATION,
        reason: REFUSAL_REASON.into(),
    }));
    let _ = socket.send(close).await;
}

// =============================================================================
// CONNECTION
// =============================================================================

async fn run_ws(mut socket: WebSocket, state: AppState, user_id: String, board_id: String) {
    let connection_id = Uuid::new_v4();
    let (tx, mut rx) = mpsc::channel::<Envelope>(queue_capacity());

    // The registry owns the sender. Registering the same user+board again
    // drops it, which closes `rx` and ends this loop.
    let member = Member {
        connection_id,
        user_id: user_id.clone(),
        board_id: board_id.clone(),
        tx,
    };
    if let Some(prior) = state.registry.register(member).await {
        info!(%connection_id, prior = %prior.connection_id, %user_id, %board_id, "ws: replaced existing channel");
    }

    services::board::join_board(&state, &board_id).await;

    let mut joined = Envelope::new(Body::UserJoined).with_board(&board_id);
    joined.stamp(&user_id);
    services::board::broadcast(&state, &board_id, &joined, Some(connection_id)).await;
    info!(%connection_id, %user_id, %board_id, "ws: client connected");

    loop {
        tokio::select! {
            inbound = socket.recv() => {
                let Some(Ok(msg)) = inbound else { break };
                match msg {
                    Message::Text(text) => {
                        process_inbound(&state, &board_id, &user_id, connection_id, text.as_str()).await;
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
            outbound = rx.recv() => {
                let Some(envelope) = outbound else {
                    // Replaced by a newer channel for the same user+board.
                    break;
                };
                if send_envelope(&mut socket, &envelope).await.is_err() {
                    break;
                }
            }
        }
    }

    // Only the still-registered connection owns the departure broadcasts; a
    // replaced channel finds its entry gone and leaves quietly.
    if state.registry.unregister(connection_id).await.is_some() {
        services::board::leave_board(&state, &board_id, &user_id).await;
    }
    info!(%connection_id, %user_id, "ws: client disconnected");
}

// =============================================================================
// INBOUND DISPATCH
// =============================================================================

/// Parse, validate, stamp, and dispatch one inbound text frame.
///
/// Separated from the socket loop so tests can drive the relay path without
/// a live websocket.
async fn process_inbound(
    state: &AppState,
    board_id: &str,
    user_id: &str,
    connection_id: Uuid,
    text: &str,
) {
    let mut envelope: Envelope = match serde_json::from_str(text) {
        Ok(envelope) => envelope,
        Err(e) => {
            // Malformed JSON and unrecognized kinds alike: drop, no reply.
            debug!(%connection_id, error = %e, "ws: dropping unrecognized frame");
            return;
        }
    };
    envelope.stamp(user_id);

    match envelope.body.clone() {
        Body::BoardUpdate { objects, .. } => {
            let (objects, revision) = services::board::apply_update(state, board_id, objects).await;
            let relayed = Envelope {
                body: Body::BoardUpdate { objects, revision: Some(revision) },
                ..envelope
            };
            services::board::broadcast(state, board_id, &relayed, Some(connection_id)).await;
        }
        Body::ObjectFocus { object_id } => {
            match services::board::focus_object(state, board_id, &object_id, user_id).await {
                FocusOutcome::Granted => {
                    services::board::broadcast(state, board_id, &envelope, Some(connection_id)).await;
                }
                FocusOutcome::Held { holder } => {
                    debug!(%connection_id, %object_id, %holder, "ws: focus denied, object is held");
                }
                FocusOutcome::UnknownObject => {
                    debug!(%connection_id, %object_id, "ws: focus on unknown object dropped");
                }
            }
        }
        Body::ObjectBlur { object_id } => {
            match services::board::blur_object(state, board_id, &object_id, user_id).await {
                BlurOutcome::Cleared => {
                    services::board::broadcast(state, board_id, &envelope, Some(connection_id)).await;
                }
                BlurOutcome::NotHolder | BlurOutcome::UnknownObject => {
                    debug!(%connection_id, %object_id, "ws: blur without holding the lock dropped");
                }
            }
        }
        Body::CursorPosition { .. } => {
            services::board::broadcast(state, board_id, &envelope, Some(connection_id)).await;
        }
        Body::UserJoined | Body::UserLeft => {
            // Presence messages are server-origin only.
            debug!(%connection_id, kind = envelope.body.kind(), "ws: dropping client-sent presence frame");
        }
    }
}

// =============================================================================
// HELPERS
// =============================================================================

async fn send_envelope(socket: &mut WebSocket, envelope: &Envelope) -> Result<(), ()> {
    let json = match serde_json::to_string(envelope) {
        Ok(json) => json,
        Err(e) => {
            warn!(error = %e, "ws: failed to serialize envelope");
            return Err(());
        }
    };
    socket.send(Message::Text(json.into())).await.map_err(|_| ())
}

#[cfg(test)]
#[path = "ws_test.rs"]
mod tests;
