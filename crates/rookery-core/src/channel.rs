//! Reviewer-facing channel trait.

use async_trait::async_trait;

use crate::draft::model::Draft;
use crate::error::Result;

/// The surface a draft is presented on for human review.
///
/// Implementations render the draft text and preview image with three
/// controls (Approve, Edit, Deny) tagged with the draft id, and route the
/// reviewer's actions back through the review desk.
#[async_trait]
pub trait ReviewChannel: Send + Sync {
    /// Renders a draft for review. Safe to call once per submission.
    ///
    /// # Errors
    ///
    /// `RookeryError::ChannelUnavailable` when the render cannot be
    /// delivered; the draft itself is not terminal in that case.
    async fn present(&self, draft: &Draft) -> Result<()>;

    /// Sends a plain informational message to the reviewer (best effort at
    /// call sites that must not fail the cycle).
    async fn notify(&self, text: &str) -> Result<()>;
}
