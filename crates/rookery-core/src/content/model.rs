//! Generated-content models.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A fully generated candidate post, before review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedPost {
    /// Proposed post body, within the platform limit.
    pub text: String,
    /// Prompt for the accompanying image.
    pub image_prompt: String,
    /// Optional caption rendered along the top of the image.
    #[serde(default)]
    pub overlay_top: Option<String>,
    /// Optional caption rendered along the bottom of the image.
    #[serde(default)]
    pub overlay_bottom: Option<String>,
}

/// Identifier of a successfully published post, as reported by the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostId(pub String);

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
