//! Connection registry: one live channel per (user, board) pair.
//!
//! DESIGN
//! ======
//! The registry is an explicitly owned value injected through `AppState`,
//! never a process-global, so tests instantiate isolated registries. Each
//! entry maps a (user, board) key to the connection's outbound queue.
//! Registering the same key again replaces the prior entry and drops its
//! sender; the prior connection task observes its queue closing, exits, and
//! its socket closes with it.
//!
//! Connection ids disambiguate replaced channels: a replaced connection's
//! late `unregister` is a no-op and must never remove its replacement.

#[cfg(test)]
#[path = "registry_test.rs"]
mod registry_test;

use std::collections::HashMap;

use tokio::sync::{RwLock, mpsc};
use uuid::Uuid;

use crate::message::Envelope;

/// Registry key: one channel per user per board.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ConnKey {
    user_id: String,
    board_id: String,
}

/// A live registered connection.
#[derive(Debug, Clone)]
pub struct Member {
    /// Unique id of the underlying connection.
    pub connection_id: Uuid,
    pub user_id: String,
    pub board_id: String,
    /// Outbound queue draining to the member's socket.
    pub tx: mpsc::Sender<Envelope>,
}

/// Table of live connections, keyed by (user, board).
#[derive(Default)]
pub struct Registry {
    connections: RwLock<HashMap<ConnKey, Member>>,
}

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the entry for the member's (user, board) pair.
    /// Returns the evicted prior member, whose dropped sender ends its
    /// connection task.
    pub async fn register(&self, member: Member) -> Option<Member> {
        let key = ConnKey { user_id: member.user_id.clone(), board_id: member.board_id.clone() };
        let mut connections = self.connections.write().await;
        connections.insert(key, member)
    }

    /// Remove the entry whose connection id matches. Idempotent: `None` when
    /// the entry is already gone or was replaced by a newer channel.
    pub async fn unregister(&self, connection_id: Uuid) -> Option<Member> {
        let mut connections = self.connections.write().await;
        let key = connections
            .iter()
            .find(|(_, member)| member.connection_id == connection_id)
            .map(|(key, _)| key.clone())?;
        connections.remove(&key)
    }

    /// All live members of a board, excluding at most one connection.
    pub async fn members_of(&self, board_id: &str, exclude: Option<Uuid>) -> Vec<Member> {
        let connections = self.connections.read().await;
        connections
            .values()
            .filter(|member| member.board_id == board_id)
            .filter(|member| exclude != Some(member.connection_id))
            .cloned()
            .collect()
    }

    /// Whether a board currently has no live members.
    pub async fn board_is_empty(&self, board_id: &str) -> bool {
        let connections = self.connections.read().await;
        !connections.values().any(|member| member.board_id == board_id)
    }

    /// Total number of live connections.
    pub async fn len(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Whether the registry holds no connections at all.
    pub async fn is_empty(&self) -> bool {
        self.connections.read().await.is_empty()
    }
}
