//! Lock coordinator — authoritative per-object focus arbitration.
//!
//! DESIGN
//! ======
//! A lock is the `lockedBy` attribute on the object itself, so lock state
//! travels with every `boardUpdate` for free. The coordinator arbitrates
//! transitions on the server replica before anything is relayed: a focus on
//! an object held by another user never leaves the server, and a blur only
//! clears a lock its own holder set. Re-focus by the current holder is
//! granted (idempotent).
//!
//! Locks have no timeout. A disconnecting user's locks are released by the
//! departure sweep in `services::board`, which emits a synthetic `objectBlur`
//! per cleared object.

#[cfg(test)]
#[path = "lock_test.rs"]
mod tests;

use crate::state::LiveBoard;

/// Result of a focus request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FocusOutcome {
    /// The lock is now (or already was) held by the requester. Relay.
    Granted,
    /// Another user holds the lock. Drop, never relay.
    Held { holder: String },
    /// The replica has no such object; the coordinator cannot vouch for it.
    UnknownObject,
}

/// Result of a blur request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlurOutcome {
    /// The requester held the lock and it is now cleared. Relay.
    Cleared,
    /// The requester does not hold the lock; state is unchanged.
    NotHolder,
    /// The replica has no such object.
    UnknownObject,
}

/// Try to lock an object for `user_id`.
pub fn focus(board: &mut LiveBoard, object_id: &str, user_id: &str) -> FocusOutcome {
    let Some(obj) = board.find_mut(object_id) else {
        return FocusOutcome::UnknownObject;
    };
    match obj.locked_by.as_deref() {
        None => {
            obj.locked_by = Some(user_id.to_owned());
            FocusOutcome::Granted
        }
        Some(holder) if holder == user_id => FocusOutcome::Granted,
        Some(holder) => FocusOutcome::Held { holder: holder.to_owned() },
    }
}

/// Try to release an object's lock for `user_id`.
pub fn blur(board: &mut LiveBoard, object_id: &str, user_id: &str) -> BlurOutcome {
    let Some(obj) = board.find_mut(object_id) else {
        return BlurOutcome::UnknownObject;
    };
    match obj.locked_by.as_deref() {
        Some(holder) if holder == user_id => {
            obj.locked_by = None;
            BlurOutcome::Cleared
        }
        _ => BlurOutcome::NotHolder,
    }
}

/// Release every lock held by `user_id`, returning the affected object ids
/// in display order. Used when a lock holder disconnects mid-edit.
pub fn release_all(board: &mut LiveBoard, user_id: &str) -> Vec<String> {
    let mut released = Vec::new();
    for obj in &mut board.objects {
        if obj.locked_by.as_deref() == Some(user_id) {
            obj.locked_by = None;
            released.push(obj.id.clone());
        }
    }
    released
}
