//! Draft and decision domain models.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum post length accepted by the target platform.
pub const PLATFORM_CHAR_LIMIT: usize = 280;

/// Process-local sequence disambiguating drafts created within the same second.
static DRAFT_SEQ: AtomicU64 = AtomicU64::new(0);

/// A candidate post awaiting (or having received) a reviewer decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Draft {
    /// Opaque id, monotonically derived from creation time.
    pub id: String,
    /// Proposed post body.
    pub text: String,
    /// Locally materialized preview image, owned by the caller until consumed.
    pub image_path: PathBuf,
    pub created_at: DateTime<Utc>,
}

impl Draft {
    /// Creates a draft with a fresh time-derived id.
    pub fn new(text: impl Into<String>, image_path: impl Into<PathBuf>) -> Self {
        let created_at = Utc::now();
        let seq = DRAFT_SEQ.fetch_add(1, Ordering::Relaxed);
        Self {
            id: format!("{}_{seq:04}", created_at.format("%Y%m%d_%H%M%S")),
            text: text.into(),
            image_path: image_path.into(),
            created_at,
        }
    }
}

/// Terminal outcome of a draft's review.
///
/// Exactly one decision is ever produced per draft id, and it is delivered
/// to the waiting caller at most once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Decision {
    /// Approved for publishing; `text` may differ from the draft if edited.
    Approved { text: String },
    /// Rejected; the draft is discarded.
    Denied,
    /// The approval window elapsed without a reviewer action.
    TimedOut,
}

impl Decision {
    /// The text to publish, present only for approvals.
    pub fn final_text(&self) -> Option<&str> {
        match self {
            Decision::Approved { text } => Some(text),
            _ => None,
        }
    }
}
