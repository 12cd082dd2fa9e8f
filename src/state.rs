//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor. It
//! holds the durable store adapter, the connection registry, and the map of
//! live board replicas. A replica is hydrated from the store when the first
//! member joins its board and evicted when the last member leaves; while
//! live, it is the authority for lock state and update ordering.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::object::BoardObject;
use crate::registry::Registry;
use crate::services::store::{BoardStore, Snapshot};

// =============================================================================
// LIVE BOARD
// =============================================================================

/// Server-side replica of one board's state.
pub struct LiveBoard {
    /// Current object set; insertion order is display order.
    pub objects: Vec<BoardObject>,
    /// Monotonically increasing revision, bumped once per applied update.
    pub revision: u64,
}

impl LiveBoard {
    #[must_use]
    pub fn new() -> Self {
        Self { objects: Vec::new(), revision: 0 }
    }

    /// Build a replica from an at-rest snapshot, continuing its revision.
    #[must_use]
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        Self { objects: snapshot.objects, revision: snapshot.revision }
    }

    /// Look up an object by id.
    #[must_use]
    pub fn find(&self, object_id: &str) -> Option<&BoardObject> {
        self.objects.iter().find(|obj| obj.id == object_id)
    }

    /// Look up an object by id for mutation.
    pub fn find_mut(&mut self, object_id: &str) -> Option<&mut BoardObject> {
        self.objects.iter_mut().find(|obj| obj.id == object_id)
    }
}

impl Default for LiveBoard {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// APP STATE
// =============================================================================

/// Shared application state, injected into Axum handlers via State extractor.
/// Clone is required by Axum — all inner fields are Arc-wrapped.
#[derive(Clone)]
pub struct AppState {
    /// Durable store adapter; the server only reads it (hydration).
    pub store: Arc<dyn BoardStore>,
    /// Live connection table.
    pub registry: Arc<Registry>,
    /// Live board replicas keyed by board id.
    pub boards: Arc<RwLock<HashMap<String, LiveBoard>>>,
}

impl AppState {
    #[must_use]
    pub fn new(store: Arc<dyn BoardStore>) -> Self {
        Self {
            store,
            registry: Arc::new(Registry::new()),
            boards: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================
