//! Publication-history repository trait.

use async_trait::async_trait;

use crate::error::Result;

/// Append-only ordered record of previously published post texts.
///
/// Entries are only ever appended; nothing in the application mutates or
/// removes them (external truncation of the backing file is tolerated).
#[async_trait]
pub trait HistoryRepository: Send + Sync {
    /// Appends a published text and persists the whole list.
    async fn append(&self, text: String) -> Result<()>;

    /// Returns the most recent `n` entries, oldest first.
    async fn recent(&self, n: usize) -> Result<Vec<String>>;

    /// Returns the whole history in publication order.
    async fn load_all(&self) -> Result<Vec<String>>;
}
