//! Approval coordination: a synchronous-looking request/response over the
//! asynchronous review channel.
//!
//! The coordinator registers the draft, renders it on the channel, then
//! suspends on a oneshot until a decision, the timeout, or shutdown wins the
//! race. A decision arriving as the timeout fires is resolved in favor of
//! whichever side completes the consuming read first, arbitrated by the
//! review-desk lock.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use rookery_core::channel::ReviewChannel;
use rookery_core::draft::desk::ReviewDesk;
use rookery_core::draft::ledger::DecisionLedger;
use rookery_core::draft::model::{Decision, Draft};
use rookery_core::draft::repository::PendingDraftRepository;
use rookery_core::error::{Result, RookeryError};

/// Bridges the generation pipeline and the review channel.
pub struct ApprovalCoordinator {
    pending: Arc<dyn PendingDraftRepository>,
    ledger: Arc<DecisionLedger>,
    desk: Arc<ReviewDesk>,
    channel: Arc<dyn ReviewChannel>,
    timeout: Duration,
}

impl ApprovalCoordinator {
    pub fn new(
        pending: Arc<dyn PendingDraftRepository>,
        ledger: Arc<DecisionLedger>,
        desk: Arc<ReviewDesk>,
        channel: Arc<dyn ReviewChannel>,
        timeout: Duration,
    ) -> Self {
        Self {
            pending,
            ledger,
            desk,
            channel,
            timeout,
        }
    }

    /// Submits a draft for review and waits for its decision.
    ///
    /// # Errors
    ///
    /// - `ChannelUnavailable` when the draft cannot be rendered; the caller
    ///   may retry or fall back to publishing directly.
    /// - `Shutdown` when `cancel` fires before a decision arrives.
    ///
    /// The timeout is not an error: it resolves to `Decision::TimedOut`, and
    /// the draft is removed from the store unless a decision won the race.
    pub async fn request_approval(
        &self,
        text: &str,
        image_path: &Path,
        cancel: &CancellationToken,
    ) -> Result<Decision> {
        let draft = Draft::new(text, image_path);
        let draft_id = draft.id.clone();

        self.pending.put(draft.clone()).await?;
        let mut rx = self.ledger.register(&draft_id);

        if let Err(err) = self.channel.present(&draft).await {
            // The draft never reached the reviewer; unwind it completely.
            self.ledger.forget(&draft_id);
            if let Err(cleanup_err) = self.pending.remove(&draft_id).await {
                tracing::warn!(draft_id, error = %cleanup_err, "cleanup after failed present");
            }
            return Err(err);
        }
        tracing::info!(draft_id, "draft presented for review");

        tokio::select! {
            decision = &mut rx => match decision {
                Ok(decision) => Ok(decision),
                // Senders only drop on forget(); reaching this means the
                // ledger entry vanished underneath us.
                Err(_) => Err(RookeryError::internal("decision channel closed unexpectedly")),
            },
            _ = tokio::time::sleep(self.timeout) => {
                match self.desk.reconcile_timeout(&draft_id, &mut rx).await? {
                    Some(decision) => {
                        tracing::info!(draft_id, "decision arrived as the window closed");
                        Ok(decision)
                    }
                    None => {
                        tracing::info!(draft_id, "approval window elapsed");
                        if let Err(err) = self
                            .channel
                            .notify("⏰ Approval window elapsed. Skipping this draft.")
                            .await
                        {
                            tracing::debug!(error = %err, "timeout notice failed");
                        }
                        Ok(Decision::TimedOut)
                    }
                }
            },
            _ = cancel.cancelled() => {
                match self.desk.reconcile_timeout(&draft_id, &mut rx).await? {
                    // Honor a decision that already landed.
                    Some(decision) => Ok(decision),
                    None => Err(RookeryError::Shutdown),
                }
            },
        }
    }
}
