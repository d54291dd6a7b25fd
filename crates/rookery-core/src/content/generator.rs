//! Content-generation capability trait.

use async_trait::async_trait;

use crate::content::model::GeneratedPost;
use crate::error::Result;

/// Produces a candidate post from the publication history.
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    /// Generates a post, using `history` (oldest first) as context so the
    /// output does not repeat recent publications.
    ///
    /// # Errors
    ///
    /// `RookeryError::GenerationFailed` when the upstream reply is missing
    /// or malformed.
    async fn generate(&self, history: &[String]) -> Result<GeneratedPost>;
}
