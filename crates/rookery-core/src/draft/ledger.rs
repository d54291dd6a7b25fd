//! Decision hand-off between review handlers and the waiting coordinator.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use tokio::sync::oneshot;

use crate::draft::model::Decision;

/// In-memory map from draft id to the waiting coordinator's sender.
///
/// Each entry is consumed on resolution, so a decision is delivered at most
/// once and the map never outgrows the number of in-flight drafts. This is
/// instance state injected where it is needed, not a process-wide global.
#[derive(Default)]
pub struct DecisionLedger {
    slots: Mutex<HashMap<String, oneshot::Sender<Decision>>>,
}

impl DecisionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn slots(&self) -> MutexGuard<'_, HashMap<String, oneshot::Sender<Decision>>> {
        // Recover rather than propagate a poisoned lock; the map stays usable.
        self.slots.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Registers a draft id and returns the receiving half the coordinator
    /// waits on. Registering an id twice supersedes the earlier waiter,
    /// whose receiver then resolves as closed.
    pub fn register(&self, id: &str) -> oneshot::Receiver<Decision> {
        let (tx, rx) = oneshot::channel();
        self.slots().insert(id.to_string(), tx);
        rx
    }

    /// Delivers a decision to the registered waiter, consuming the entry.
    ///
    /// Returns `false` when no waiter is registered for `id` (a stale draft
    /// from an earlier process, or an id already resolved).
    pub fn resolve(&self, id: &str, decision: Decision) -> bool {
        match self.slots().remove(id) {
            Some(tx) => tx.send(decision).is_ok(),
            None => false,
        }
    }

    /// Drops the waiter for `id`, if any. Used when the approval window
    /// elapses without a decision.
    pub fn forget(&self, id: &str) {
        self.slots().remove(id);
    }

    /// Whether a waiter is currently registered for `id`.
    pub fn is_registered(&self, id: &str) -> bool {
        self.slots().contains_key(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resolve_delivers_to_the_registered_waiter() {
        let ledger = DecisionLedger::new();
        let rx = ledger.register("d1");
        assert!(ledger.resolve("d1", Decision::Denied));
        assert_eq!(rx.await.unwrap(), Decision::Denied);
    }

    #[tokio::test]
    async fn second_resolve_for_the_same_id_is_rejected() {
        let ledger = DecisionLedger::new();
        let _rx = ledger.register("d1");
        assert!(ledger.resolve(
            "d1",
            Decision::Approved {
                text: "a".to_string()
            }
        ));
        assert!(!ledger.resolve("d1", Decision::Denied));
    }

    #[tokio::test]
    async fn resolve_without_registration_reports_stale() {
        let ledger = DecisionLedger::new();
        assert!(!ledger.resolve("ghost", Decision::Denied));
    }

    #[tokio::test]
    async fn forget_drops_the_waiter() {
        let ledger = DecisionLedger::new();
        let rx = ledger.register("d1");
        ledger.forget("d1");
        assert!(!ledger.is_registered("d1"));
        assert!(rx.await.is_err(), "superseded waiter sees a closed channel");
    }

    #[tokio::test]
    async fn re_registration_supersedes_the_earlier_waiter() {
        let ledger = DecisionLedger::new();
        let old_rx = ledger.register("d1");
        let new_rx = ledger.register("d1");
        assert!(ledger.resolve("d1", Decision::TimedOut));
        assert!(old_rx.await.is_err());
        assert_eq!(new_rx.await.unwrap(), Decision::TimedOut);
    }
}
