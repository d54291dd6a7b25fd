//! Image-synthesis capability trait.

use std::path::PathBuf;

use async_trait::async_trait;

use crate::content::model::GeneratedPost;
use crate::error::Result;

/// Renders the preview image for a generated post.
#[async_trait]
pub trait ImageSynthesizer: Send + Sync {
    /// Materializes the image locally and returns its path. The caller owns
    /// the file and removes it once the cycle is over.
    ///
    /// # Errors
    ///
    /// `RookeryError::ImageFailed` on a fetch or write error.
    async fn render(&self, post: &GeneratedPost) -> Result<PathBuf>;
}
