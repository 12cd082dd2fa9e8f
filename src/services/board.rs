//! Board membership, the live replica, and broadcast fan-out.
//!
//! DESIGN
//! ======
//! The replica for a board is hydrated from the durable store when its first
//! member joins and evicted when its last member leaves. Updates replace the
//! full object set (last write wins, no merge) under the board write lock;
//! the relay happens after the lock is released, so the revision stamped on
//! each update is what orders deliveries for consumers.
//!
//! ERROR HANDLING
//! ==============
//! Hydration failure is logged and the board starts empty rather than
//! refusing the join — clients load their own snapshot from the store and
//! the next `boardUpdate` repopulates the replica. A peer whose outbound
//! queue has closed is evicted mid-fan-out without disturbing delivery to
//! the remaining members.

use std::collections::HashMap;

use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::message::{Body, Envelope};
use crate::object::BoardObject;
use crate::services::lock::{self, BlurOutcome, FocusOutcome};
use crate::state::{AppState, LiveBoard};

// =============================================================================
// JOIN / LEAVE
// =============================================================================

/// Ensure a live replica exists for the board, hydrating from the store on
/// the first member's join.
pub async fn join_board(state: &AppState, board_id: &str) {
    {
        let boards = state.boards.read().await;
        if boards.contains_key(board_id) {
            return;
        }
    }

    // Fetch the snapshot outside the lock; a concurrent join racing us wins
    // harmlessly via the entry check below.
    let snapshot = match state.store.load(board_id).await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            warn!(board_id, error = %e, "board hydration failed; starting empty");
            return hydrate_empty(state, board_id).await;
        }
    };

    let mut boards = state.boards.write().await;
    let entry = boards
        .entry(board_id.to_owned())
        .or_insert_with(|| LiveBoard::from_snapshot(snapshot));
    info!(board_id, count = entry.objects.len(), revision = entry.revision, "board replica live");
}

async fn hydrate_empty(state: &AppState, board_id: &str) {
    let mut boards = state.boards.write().await;
    boards.entry(board_id.to_owned()).or_insert_with(LiveBoard::new);
}

/// Departure path for a disconnected member: sweep the user's stale locks
/// (broadcasting a synthetic `objectBlur` per cleared object), announce
/// `userLeft`, and evict the replica once the board has no members left.
pub async fn leave_board(state: &AppState, board_id: &str, user_id: &str) {
    let released = {
        let mut boards = state.boards.write().await;
        boards
            .get_mut(board_id)
            .map(|board| lock::release_all(board, user_id))
            .unwrap_or_default()
    };

    for object_id in released {
        debug!(board_id, user_id, %object_id, "releasing stale lock for departed user");
        let mut envelope = Envelope::new(Body::ObjectBlur { object_id });
        envelope.stamp(user_id);
        broadcast(state, board_id, &envelope, None).await;
    }

    let mut left = Envelope::new(Body::UserLeft).with_board(board_id);
    left.stamp(user_id);
    broadcast(state, board_id, &left, None).await;

    if state.registry.board_is_empty(board_id).await {
        let mut boards = state.boards.write().await;
        if boards.remove(board_id).is_some() {
            info!(board_id, "evicted board replica from memory");
        }
    }
}

// =============================================================================
// UPDATES
// =============================================================================

/// Apply a full-set update to the replica: last write wins, the server's
/// lock state overlays whatever the client sent, and the revision is bumped.
/// Returns the authoritative set and its new revision for relay.
pub async fn apply_update(
    state: &AppState,
    board_id: &str,
    incoming: Vec<BoardObject>,
) -> (Vec<BoardObject>, u64) {
    let mut boards = state.boards.write().await;
    let board = boards.entry(board_id.to_owned()).or_insert_with(LiveBoard::new);

    // Lock lifecycle is exclusively focus/blur/sweep: re-apply the replica's
    // locks per object id and strip any client-supplied values.
    let locks: HashMap<String, String> = board
        .objects
        .iter()
        .filter_map(|obj| obj.locked_by.clone().map(|holder| (obj.id.clone(), holder)))
        .collect();

    let mut objects = incoming;
    for obj in &mut objects {
        obj.locked_by = locks.get(&obj.id).cloned();
    }

    board.objects.clone_from(&objects);
    board.revision += 1;
    (objects, board.revision)
}

/// Arbitrate a focus request against the replica.
pub async fn focus_object(state: &AppState, board_id: &str, object_id: &str, user_id: &str) -> FocusOutcome {
    let mut boards = state.boards.write().await;
    let Some(board) = boards.get_mut(board_id) else {
        return FocusOutcome::UnknownObject;
    };
    lock::focus(board, object_id, user_id)
}

/// Arbitrate a blur request against the replica.
pub async fn blur_object(state: &AppState, board_id: &str, object_id: &str, user_id: &str) -> BlurOutcome {
    let mut boards = state.boards.write().await;
    let Some(board) = boards.get_mut(board_id) else {
        return BlurOutcome::UnknownObject;
    };
    lock::blur(board, object_id, user_id)
}

// =============================================================================
// BROADCAST
// =============================================================================

/// Fan an envelope out to every member of a board, optionally excluding one
/// connection. Best-effort, at-most-once per live peer: a full queue drops
/// this envelope for that peer, a closed queue evicts the peer entirely.
pub async fn broadcast(state: &AppState, board_id: &str, envelope: &Envelope, exclude: Option<Uuid>) {
    let members = state.registry.members_of(board_id, exclude).await;
    for member in members {
        match member.tx.try_send(envelope.clone()) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!(
                    board_id,
                    connection_id = %member.connection_id,
                    kind = envelope.body.kind(),
                    "peer queue full; dropping frame"
                );
            }
            Err(TrySendError::Closed(_)) => {
                info!(
                    board_id,
                    connection_id = %member.connection_id,
                    "peer channel closed; evicting from registry"
                );
                state.registry.unregister(member.connection_id).await;
            }
        }
    }
}

#[cfg(test)]
#[path = "board_test.rs"]
mod tests;
