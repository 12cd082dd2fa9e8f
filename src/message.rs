//! Wire protocol for the live board channel.
//!
//! DESIGN
//! ======
//! Every message is one flat JSON object tagged by `type`. The tagged body
//! carries the kind-specific payload; the envelope carries the fields common
//! to all kinds: the originating `userId`, a server-assigned `timestamp`, and
//! (on server-emitted presence messages) the `boardId`. Relayed
//! `boardUpdate`s additionally carry the board's server-assigned revision so
//! consumers can discard stale writes.
//!
//! The protocol is fire-and-forget: there are no replies, no acknowledgments,
//! and no error frames. Malformed JSON and unrecognized `type` values are
//! dropped by the receiver without a response.

#[cfg(test)]
#[path = "message_test.rs"]
mod message_test;

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::object::BoardObject;

/// Current time as milliseconds since Unix epoch.
#[must_use]
pub fn now_ms() -> i64 {
    let Ok(dur) = SystemTime::now().duration_since(UNIX_EPOCH) else {
        return 0;
    };
    i64::try_from(dur.as_millis()).unwrap_or(0)
}

/// Kind-specific payload, tagged by `type` on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Body {
    /// Full object set for the board. Never a diff.
    #[serde(rename = "boardUpdate")]
    BoardUpdate {
        objects: Vec<BoardObject>,
        /// Server-assigned per-board revision; absent on client-originated
        /// copies, stamped by the router on relay.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        revision: Option<u64>,
    },
    /// A user started manipulating an object.
    #[serde(rename = "objectFocus")]
    ObjectFocus {
        #[serde(rename = "objectId")]
        object_id: String,
    },
    /// A user stopped manipulating an object.
    #[serde(rename = "objectBlur")]
    ObjectBlur {
        #[serde(rename = "objectId")]
        object_id: String,
    },
    /// Ephemeral pointer position; relayed, never persisted.
    #[serde(rename = "cursorPosition")]
    CursorPosition { x: f64, y: f64 },
    /// Server-emitted on channel open, to the other board members.
    #[serde(rename = "userJoined")]
    UserJoined,
    /// Server-emitted on channel close, to the remaining board members.
    #[serde(rename = "userLeft")]
    UserLeft,
}

impl Body {
    /// Wire name of this message kind.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::BoardUpdate { .. } => "boardUpdate",
            Self::ObjectFocus { .. } => "objectFocus",
            Self::ObjectBlur { .. } => "objectBlur",
            Self::CursorPosition { .. } => "cursorPosition",
            Self::UserJoined => "userJoined",
            Self::UserLeft => "userLeft",
        }
    }
}

/// One wire message: common fields plus the tagged body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(flatten)]
    pub body: Body,
    /// Originating user. Overwritten by the router with the authenticated
    /// identity of the sending connection.
    #[serde(rename = "userId", default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Board the message belongs to; set on server-emitted presence messages.
    #[serde(rename = "boardId", default, skip_serializing_if = "Option::is_none")]
    pub board_id: Option<String>,
    /// Milliseconds since Unix epoch, assigned by the server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

impl Envelope {
    /// Bare envelope around a body. Identity and timestamp are stamped by the
    /// router before relay.
    #[must_use]
    pub fn new(body: Body) -> Self {
        Self { body, user_id: None, board_id: None, timestamp: None }
    }

    #[must_use]
    pub fn with_board(mut self, board_id: impl Into<String>) -> Self {
        self.board_id = Some(board_id.into());
        self
    }

    /// Overwrite `userId` and `timestamp` with the authenticated sender and
    /// the server clock. Client-supplied values are never trusted.
    pub fn stamp(&mut self, user_id: &str) {
        self.user_id = Some(user_id.to_owned());
        self.timestamp = Some(now_ms());
    }
}
