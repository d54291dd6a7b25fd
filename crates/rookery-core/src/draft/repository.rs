//! Pending-draft repository trait.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::draft::model::Draft;
use crate::error::Result;

/// Durable mapping from draft id to draft.
///
/// Implementations must survive process restarts and must never leave
/// previously committed state corrupted by a failed write (write-then-
/// atomically-replace, never a partial write in place).
#[async_trait]
pub trait PendingDraftRepository: Send + Sync {
    /// Inserts or replaces a draft. A full-document rewrite is acceptable;
    /// volume stays at single-digit concurrent drafts.
    async fn put(&self, draft: Draft) -> Result<()>;

    /// Returns the draft, or `None` if it is absent or already resolved.
    async fn get(&self, id: &str) -> Result<Option<Draft>>;

    /// Removes a draft. Removing a missing id is a no-op, not an error.
    async fn remove(&self, id: &str) -> Result<()>;

    /// Loads every pending draft keyed by id. Used at startup to detect
    /// drafts orphaned by an earlier process.
    async fn load_all(&self) -> Result<HashMap<String, Draft>>;
}
