//! Publishing capability trait.

use std::path::Path;

use async_trait::async_trait;

use crate::content::model::PostId;
use crate::error::Result;

/// Publishes an approved post to the social platform.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Uploads the image and publishes `text` with it attached.
    ///
    /// # Errors
    ///
    /// `RookeryError::PublishFailed` when the platform rejects or fails the
    /// call.
    async fn publish(&self, text: &str, image_path: &Path) -> Result<PostId>;
}
