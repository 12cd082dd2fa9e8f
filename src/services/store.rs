//! Durable store adapter — the authoritative at-rest copy of board state.
//!
//! DESIGN
//! ======
//! `BoardStore` is the trait seam between the synchronization core and
//! whatever holds boards at rest. The production implementation is Postgres;
//! tests and development use the in-memory implementation. Both assign a
//! monotonically increasing revision per save so consumers can tell snapshots
//! apart instead of guessing by arrival order.
//!
//! ERROR HANDLING
//! ==============
//! Both operations may fail. Callers on the interaction path treat a failed
//! save as recoverable: the live broadcast has already happened and the user
//! can retry the mutation.

#[cfg(test)]
#[path = "store_test.rs"]
mod tests;

use std::collections::HashMap;

use sqlx::PgPool;
use tokio::sync::Mutex;

use crate::object::BoardObject;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("object serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// One board at rest: its full object set and the store's revision for it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub objects: Vec<BoardObject>,
    pub revision: u64,
}

/// The contract the core consumes: load on board open, save on interaction
/// completion. Boards never saved load as empty at revision 0.
#[async_trait::async_trait]
pub trait BoardStore: Send + Sync {
    /// Load the at-rest snapshot for a board.
    ///
    /// # Errors
    ///
    /// Returns a store error if the backing read fails.
    async fn load(&self, board_id: &str) -> Result<Snapshot, StoreError>;

    /// Persist the full object set for a board, returning the new revision.
    ///
    /// # Errors
    ///
    /// Returns a store error if the backing write fails.
    async fn save(&self, board_id: &str, objects: &[BoardObject]) -> Result<u64, StoreError>;
}

// =============================================================================
// POSTGRES
// =============================================================================

/// Postgres-backed store. One row per board; objects stored as a JSONB array.
pub struct PgBoardStore {
    pool: PgPool,
}

impl PgBoardStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl BoardStore for PgBoardStore {
    async fn load(&self, board_id: &str) -> Result<Snapshot, StoreError> {
        let row = sqlx::query_as::<_, (serde_json::Value, i64)>(
            "SELECT objects, revision FROM boards WHERE id = $1",
        )
        .bind(board_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some((objects, revision)) = row else {
            return Ok(Snapshot::default());
        };

        Ok(Snapshot {
            objects: serde_json::from_value(objects)?,
            revision: u64::try_from(revision).unwrap_or(0),
        })
    }

    async fn save(&self, board_id: &str, objects: &[BoardObject]) -> Result<u64, StoreError> {
        let objects = serde_json::to_value(objects)?;
        let revision = sqlx::query_scalar::<_, i64>(
            "INSERT INTO boards (id, objects, revision, updated_at) \
             VALUES ($1, $2, 1, now()) \
             ON CONFLICT (id) DO UPDATE SET \
                 objects = EXCLUDED.objects, \
                 revision = boards.revision + 1, \
                 updated_at = now() \
             RETURNING revision",
        )
        .bind(board_id)
        .bind(objects)
        .fetch_one(&self.pool)
        .await?;

        Ok(u64::try_from(revision).unwrap_or(0))
    }
}

// =============================================================================
// IN-MEMORY
// =============================================================================

/// In-memory store for tests and single-process development.
#[derive(Default)]
pub struct MemoryBoardStore {
    boards: Mutex<HashMap<String, Snapshot>>,
}

impl MemoryBoardStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl BoardStore for MemoryBoardStore {
    async fn load(&self, board_id: &str) -> Result<Snapshot, StoreError> {
        let boards = self.boards.lock().await;
        Ok(boards.get(board_id).cloned().unwrap_or_default())
    }

    async fn save(&self, board_id: &str, objects: &[BoardObject]) -> Result<u64, StoreError> {
        let mut boards = self.boards.lock().await;
        let snapshot = boards.entry(board_id.to_owned()).or_default();
        snapshot.objects = objects.to_vec();
        snapshot.revision += 1;
        Ok(snapshot.revision)
    }
}
