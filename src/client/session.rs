//! Board session: wires the engine to the live channel and the durable store.
//!
//! DESIGN
//! ======
//! A session owns one [`EngineCore`], the outbound half of the live channel,
//! and the durable store adapter. Engine actions flow out (broadcasts become
//! stamped envelopes, persists become store saves); inbound envelopes flow
//! into the engine, with stale `boardUpdate`s discarded by revision. Presence
//! and peer cursors are tracked here — the engine only cares about objects.
//!
//! ERROR HANDLING
//! ==============
//! A failed save is recoverable: the optimistic local state and the broadcast
//! that already went out are never rolled back, the remaining actions of the
//! gesture (the lock release in particular) still run, and the caller can
//! retry the mutation. A failed load aborts the open — there is nothing to
//! edit yet.

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::client::engine::{Action, EngineCore};
use crate::client::input::{Point, Tool};
use crate::message::{Body, Envelope};
use crate::object::BoardObject;
use crate::services::store::{BoardStore, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("failed to load board {board_id}: {source}")]
    LoadFailed { board_id: String, source: StoreError },
    #[error("failed to persist board {board_id}: {source}")]
    SaveFailed { board_id: String, source: StoreError },
}

impl SessionError {
    /// Whether the user can simply retry the mutation. Save failures are;
    /// the live broadcast already reached the board's peers.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::SaveFailed { .. })
    }
}

/// One user's live connection to one board.
pub struct BoardSession {
    board_id: String,
    engine: EngineCore,
    store: Arc<dyn BoardStore>,
    outbound: mpsc::Sender<Envelope>,
    /// Highest live revision seen from the channel; lower or equal is stale.
    last_revision: u64,
    peers: BTreeSet<String>,
    peer_cursors: HashMap<String, Point>,
}

impl BoardSession {
    /// Open a session: load the at-rest snapshot into a fresh engine.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::LoadFailed`] when the store read fails.
    pub async fn open(
        board_id: impl Into<String>,
        user_id: impl Into<String>,
        store: Arc<dyn BoardStore>,
        outbound: mpsc::Sender<Envelope>,
    ) -> Result<Self, SessionError> {
        let board_id = board_id.into();
        let snapshot = store
            .load(&board_id)
            .await
            .map_err(|source| SessionError::LoadFailed { board_id: board_id.clone(), source })?;

        let mut engine = EngineCore::new(user_id);
        engine.load_snapshot(snapshot.objects);

        Ok(Self {
            board_id,
            engine,
            store,
            outbound,
            // Live revisions are assigned per relay; nothing seen yet.
            last_revision: 0,
            peers: BTreeSet::new(),
            peer_cursors: HashMap::new(),
        })
    }

    // --- Queries ---

    #[must_use]
    pub fn board_id(&self) -> &str {
        &self.board_id
    }

    #[must_use]
    pub fn engine(&self) -> &EngineCore {
        &self.engine
    }

    #[must_use]
    pub fn objects(&self) -> &[BoardObject] {
        self.engine.objects()
    }

    /// Highest live revision seen so far.
    #[must_use]
    pub fn last_revision(&self) -> u64 {
        self.last_revision
    }

    /// Users currently known to be on the board, from presence messages.
    #[must_use]
    pub fn peers(&self) -> &BTreeSet<String> {
        &self.peers
    }

    /// Last known cursor position of a peer.
    #[must_use]
    pub fn peer_cursor(&self, user_id: &str) -> Option<Point> {
        self.peer_cursors.get(user_id).copied()
    }

    // --- Local interaction ---

    /// # Errors
    ///
    /// Propagates a recoverable [`SessionError::SaveFailed`] from any persist
    /// the gesture triggers.
    pub async fn pointer_down(&mut self, point: Point) -> Result<(), SessionError> {
        let actions = self.engine.on_pointer_down(point);
        self.dispatch(actions).await
    }

    /// # Errors
    ///
    /// Propagates a recoverable [`SessionError::SaveFailed`].
    pub async fn pointer_move(&mut self, point: Point) -> Result<(), SessionError> {
        let actions = self.engine.on_pointer_move(point);
        self.dispatch(actions).await
    }

    /// # Errors
    ///
    /// Propagates a recoverable [`SessionError::SaveFailed`]; the final
    /// update and the lock release have been broadcast regardless.
    pub async fn pointer_up(&mut self, point: Point) -> Result<(), SessionError> {
        let actions = self.engine.on_pointer_up(point);
        self.dispatch(actions).await
    }

    /// # Errors
    ///
    /// Propagates a recoverable [`SessionError::SaveFailed`].
    pub async fn add_object(&mut self, tool: Tool) -> Result<(), SessionError> {
        let actions = self.engine.add_object(tool);
        self.dispatch(actions).await
    }

    /// # Errors
    ///
    /// Propagates a recoverable [`SessionError::SaveFailed`].
    pub async fn edit_text(&mut self, id: &str, content: &str) -> Result<(), SessionError> {
        let actions = self.engine.edit_text(id, content);
        self.dispatch(actions).await
    }

    /// Announce the local cursor position. Ephemeral: relayed, never persisted.
    pub fn cursor_moved(&self, point: Point) {
        self.send(Body::CursorPosition { x: point.x, y: point.y });
    }

    // --- Inbound ---

    /// Apply one envelope received from the live channel.
    pub fn handle_message(&mut self, envelope: Envelope) {
        match envelope.body {
            Body::BoardUpdate { objects, revision } => {
                if let Some(revision) = revision {
                    if revision <= self.last_revision {
                        debug!(
                            revision,
                            last = self.last_revision,
                            "discarding stale board update"
                        );
                        return;
                    }
                    self.last_revision = revision;
                }
                self.engine.apply_board_update(objects);
            }
            Body::ObjectFocus { object_id } => {
                if let Some(user_id) = envelope.user_id {
                    self.engine.apply_focus(&object_id, &user_id);
                }
            }
            Body::ObjectBlur { object_id } => {
                self.engine.apply_blur(&object_id);
            }
            Body::CursorPosition { x, y } => {
                if let Some(user_id) = envelope.user_id {
                    self.peer_cursors.insert(user_id, Point::new(x, y));
                }
            }
            Body::UserJoined => {
                if let Some(user_id) = envelope.user_id {
                    self.peers.insert(user_id);
                }
            }
            Body::UserLeft => {
                if let Some(user_id) = envelope.user_id {
                    self.peers.remove(&user_id);
                    self.peer_cursors.remove(&user_id);
                }
            }
        }
    }

    // --- Dispatch ---

    /// Perform the engine's outbound work. A save failure is remembered but
    /// does not stop later actions — the blur after a failed drag-end persist
    /// must still go out, or the object would stay locked at every peer.
    async fn dispatch(&mut self, actions: Vec<Action>) -> Result<(), SessionError> {
        let mut save_error = None;
        for action in actions {
            match action {
                Action::Broadcast(body) => self.send(body),
                Action::Persist => {
                    if let Err(e) = self.persist().await {
                        save_error = Some(e);
                    }
                }
                Action::RenderNeeded => {}
            }
        }
        save_error.map_or(Ok(()), Err)
    }

    /// Best-effort live emit, mirroring a raw socket send: if the channel is
    /// down the message is simply not sent.
    fn send(&self, body: Body) {
        let mut envelope = Envelope::new(body);
        envelope.stamp(self.engine.user_id());
        if let Err(e) = self.outbound.try_send(envelope) {
            debug!(error = %e, "live channel unavailable; frame not sent");
        }
    }

    async fn persist(&self) -> Result<(), SessionError> {
        match self.store.save(&self.board_id, self.engine.objects()).await {
            Ok(revision) => {
                debug!(board_id = %self.board_id, revision, "board persisted");
                Ok(())
            }
            Err(source) => {
                warn!(board_id = %self.board_id, error = %source, "board persist failed");
                Err(SessionError::SaveFailed { board_id: self.board_id.clone(), source })
            }
        }
    }
}
