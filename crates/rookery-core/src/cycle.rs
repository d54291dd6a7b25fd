//! Cycle state shared between the scheduler loop and the review surface.

use std::sync::{Mutex, MutexGuard};

use tokio::sync::Notify;

/// Phases of one generate → review → publish cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CyclePhase {
    /// Between sleep and the start of the next cycle.
    Idle,
    /// Content and image generation in flight.
    Generating,
    /// Draft presented; waiting on the reviewer or the timeout.
    AwaitingApproval,
    /// Publishing an approved post.
    Publishing,
    /// Waiting out the inter-cycle interval.
    Sleeping,
}

impl CyclePhase {
    /// A cycle is busy from the start of generation until it sleeps again.
    pub fn is_busy(self) -> bool {
        matches!(
            self,
            CyclePhase::Generating | CyclePhase::AwaitingApproval | CyclePhase::Publishing
        )
    }
}

/// Outcome of a manual "generate now" trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    /// The wake signal was recorded; generation starts at the next wait.
    Queued,
    /// A cycle is already in progress; the trigger was rejected.
    Busy,
}

/// Gate coordinating the scheduler with the manual-trigger surface.
///
/// The current [`CyclePhase`] is the single source of truth for "a cycle is
/// in progress"; there is no separate busy flag to drift out of sync. The
/// wake signal is edge-triggered: however many triggers arrive while nobody
/// is waiting, at most one permit is stored.
pub struct CycleGate {
    phase: Mutex<CyclePhase>,
    wake: Notify,
}

impl CycleGate {
    pub fn new() -> Self {
        Self {
            phase: Mutex::new(CyclePhase::Idle),
            wake: Notify::new(),
        }
    }

    fn phase_guard(&self) -> MutexGuard<'_, CyclePhase> {
        self.phase.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Records the scheduler's transition into `phase`.
    pub fn set_phase(&self, phase: CyclePhase) {
        *self.phase_guard() = phase;
        tracing::debug!(?phase, "cycle phase changed");
    }

    pub fn phase(&self) -> CyclePhase {
        *self.phase_guard()
    }

    pub fn is_busy(&self) -> bool {
        self.phase().is_busy()
    }

    /// Requests an immediate generation cycle.
    ///
    /// Rejected while a cycle is busy; otherwise stores a single wake permit
    /// for the sleeping scheduler (repeated calls collapse into one).
    pub fn try_trigger(&self) -> TriggerOutcome {
        if self.is_busy() {
            return TriggerOutcome::Busy;
        }
        self.wake.notify_one();
        TriggerOutcome::Queued
    }

    /// Resolves when a manual trigger arrives (or already arrived).
    pub async fn triggered(&self) {
        self.wake.notified().await;
    }
}

impl Default for CycleGate {
    fn default() -> Self {
        Self::new()
    }
}
