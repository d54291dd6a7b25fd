//! Review desk: the state machine behind the reviewer-facing channel.
//!
//! Every transition runs under one desk lock, so the presence check, the
//! decision recording, and the store removal behave as a single atomic unit
//! per draft id. The first handler to consume a draft wins; a later handler
//! observes it gone and replies "already processed". The channel adapter
//! only translates protocol events into these calls and renders the typed
//! replies.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, oneshot};

use crate::cycle::{CycleGate, TriggerOutcome};
use crate::draft::ledger::DecisionLedger;
use crate::draft::model::{Decision, Draft, PLATFORM_CHAR_LIMIT};
use crate::draft::repository::PendingDraftRepository;
use crate::error::Result;

/// Reply to render back to the reviewer after an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewReply {
    /// Draft approved as-is.
    Approved { text: String },
    /// Draft denied; a fresh one will be generated next cycle.
    Denied { text: String },
    /// Edit opened; the reviewer should send replacement text.
    EditPrompt { current_text: String },
    /// Replacement text accepted and the draft approved with it.
    EditApplied { text: String },
    /// Replacement text exceeds the platform limit; the edit stays open.
    EditTooLong { limit: usize },
    /// The draft was already resolved by an earlier action.
    AlreadyProcessed,
    /// Free text arrived outside an edit session; not a command.
    Ignored,
    /// The edit referenced a draft that no longer exists; dropped silently.
    StaleEditDropped,
    /// Manual trigger accepted; generation starts shortly.
    TriggerQueued,
    /// A cycle is already in progress; the trigger was rejected.
    TriggerBusy,
}

/// Owns the review-side state for one reviewer stream.
///
/// The edit-session map doubles as the desk lock: every transition holds it
/// for its whole duration (local file I/O included, which is fast and
/// bounded), giving read-check-remove atomicity per draft id.
pub struct ReviewDesk {
    pending: Arc<dyn PendingDraftRepository>,
    ledger: Arc<DecisionLedger>,
    gate: Arc<CycleGate>,
    /// Reviewer chat id → draft id currently being edited by that chat.
    edit_sessions: Mutex<HashMap<i64, String>>,
}

impl ReviewDesk {
    pub fn new(
        pending: Arc<dyn PendingDraftRepository>,
        ledger: Arc<DecisionLedger>,
        gate: Arc<CycleGate>,
    ) -> Self {
        Self {
            pending,
            ledger,
            gate,
            edit_sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Approves a draft as-is.
    pub async fn approve(&self, draft_id: &str) -> Result<ReviewReply> {
        let mut sessions = self.edit_sessions.lock().await;
        let Some(draft) = self.pending.get(draft_id).await? else {
            return Ok(ReviewReply::AlreadyProcessed);
        };
        if !self
            .ledger
            .resolve(draft_id, Decision::Approved { text: draft.text.clone() })
        {
            // No waiter: a draft orphaned by an earlier process. Purge it.
            tracing::warn!(draft_id, "approve on stale draft, purging");
            self.pending.remove(draft_id).await?;
            return Ok(ReviewReply::AlreadyProcessed);
        }
        self.pending.remove(draft_id).await?;
        Self::drop_sessions_for(&mut sessions, draft_id);
        tracing::info!(draft_id, "draft approved");
        Ok(ReviewReply::Approved { text: draft.text })
    }

    /// Denies a draft.
    pub async fn deny(&self, draft_id: &str) -> Result<ReviewReply> {
        let mut sessions = self.edit_sessions.lock().await;
        let Some(draft) = self.pending.get(draft_id).await? else {
            return Ok(ReviewReply::AlreadyProcessed);
        };
        if !self.ledger.resolve(draft_id, Decision::Denied) {
            tracing::warn!(draft_id, "deny on stale draft, purging");
            self.pending.remove(draft_id).await?;
            return Ok(ReviewReply::AlreadyProcessed);
        }
        self.pending.remove(draft_id).await?;
        Self::drop_sessions_for(&mut sessions, draft_id);
        tracing::info!(draft_id, "draft denied");
        Ok(ReviewReply::Denied { text: draft.text })
    }

    /// Opens (or supersedes) an edit session for `chat_id` on `draft_id`.
    /// The decision is not resolved yet; the next free-text message from the
    /// chat becomes the replacement text.
    pub async fn begin_edit(&self, chat_id: i64, draft_id: &str) -> Result<ReviewReply> {
        let mut sessions = self.edit_sessions.lock().await;
        let Some(draft) = self.pending.get(draft_id).await? else {
            return Ok(ReviewReply::AlreadyProcessed);
        };
        if !self.ledger.is_registered(draft_id) {
            tracing::warn!(draft_id, "edit on stale draft, purging");
            self.pending.remove(draft_id).await?;
            return Ok(ReviewReply::AlreadyProcessed);
        }
        sessions.insert(chat_id, draft_id.to_string());
        Ok(ReviewReply::EditPrompt {
            current_text: draft.text,
        })
    }

    /// Consumes a free-text message from `chat_id`.
    ///
    /// Outside an edit session the message is ignored (not every message is
    /// a command). Inside one, the text replaces the draft body and the
    /// draft is approved with it.
    pub async fn apply_free_text(&self, chat_id: i64, text: &str) -> Result<ReviewReply> {
        let mut sessions = self.edit_sessions.lock().await;
        let Some(draft_id) = sessions.get(&chat_id).cloned() else {
            return Ok(ReviewReply::Ignored);
        };

        let Some(mut draft) = self.pending.get(&draft_id).await? else {
            sessions.remove(&chat_id);
            tracing::debug!(draft_id, "stale edit dropped");
            return Ok(ReviewReply::StaleEditDropped);
        };

        let text = text.trim();
        if text.chars().count() > PLATFORM_CHAR_LIMIT {
            return Ok(ReviewReply::EditTooLong {
                limit: PLATFORM_CHAR_LIMIT,
            });
        }

        draft.text = text.to_string();
        self.pending.put(draft).await?;

        if !self.ledger.resolve(
            &draft_id,
            Decision::Approved {
                text: text.to_string(),
            },
        ) {
            sessions.remove(&chat_id);
            self.pending.remove(&draft_id).await?;
            tracing::debug!(draft_id, "edited draft had no waiter, dropped");
            return Ok(ReviewReply::StaleEditDropped);
        }
        self.pending.remove(&draft_id).await?;
        sessions.remove(&chat_id);
        tracing::info!(draft_id, "draft approved with edited text");
        Ok(ReviewReply::EditApplied {
            text: text.to_string(),
        })
    }

    /// Handles a manual "generate now" request from the reviewer.
    pub fn manual_trigger(&self) -> ReviewReply {
        match self.gate.try_trigger() {
            TriggerOutcome::Queued => ReviewReply::TriggerQueued,
            TriggerOutcome::Busy => ReviewReply::TriggerBusy,
        }
    }

    /// Reconciles an elapsed approval window with a possibly racing decision.
    ///
    /// Runs under the desk lock: a handler mid-decision either completed
    /// before us (its decision is waiting in `rx` and wins) or will observe
    /// the draft gone after we return. Returns the racing decision, if any;
    /// otherwise removes the draft and forgets the waiter.
    pub async fn reconcile_timeout(
        &self,
        draft_id: &str,
        rx: &mut oneshot::Receiver<Decision>,
    ) -> Result<Option<Decision>> {
        let mut sessions = self.edit_sessions.lock().await;
        match rx.try_recv() {
            Ok(decision) => Ok(Some(decision)),
            Err(_) => {
                self.ledger.forget(draft_id);
                self.pending.remove(draft_id).await?;
                Self::drop_sessions_for(&mut sessions, draft_id);
                Ok(None)
            }
        }
    }

    fn drop_sessions_for(sessions: &mut HashMap<i64, String>, draft_id: &str) {
        sessions.retain(|_, id| id.as_str() != draft_id);
    }
}
