//! Approval scenarios exercised over the real JSON-backed draft store.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use rookery_application::ApprovalCoordinator;
use rookery_core::channel::ReviewChannel;
use rookery_core::cycle::CycleGate;
use rookery_core::draft::desk::ReviewDesk;
use rookery_core::draft::ledger::DecisionLedger;
use rookery_core::draft::model::{Decision, Draft};
use rookery_core::draft::repository::PendingDraftRepository;
use rookery_core::error::{Result, RookeryError};
use rookery_infrastructure::JsonDraftRepository;

/// How the scripted channel reacts when a draft is presented.
#[derive(Clone, Copy)]
enum Script {
    /// Render succeeds, reviewer never acts.
    Silent,
    /// Render fails (network down).
    Unavailable,
    /// Reviewer presses Approve immediately.
    ApproveOnPresent,
    /// Reviewer opens an edit and replaces the text with "B".
    EditOnPresent,
}

struct ScriptedChannel {
    desk: Arc<ReviewDesk>,
    script: Script,
    presented: Mutex<Vec<Draft>>,
}

#[async_trait::async_trait]
impl ReviewChannel for ScriptedChannel {
    async fn present(&self, draft: &Draft) -> Result<()> {
        self.presented.lock().unwrap().push(draft.clone());
        match self.script {
            Script::Silent => Ok(()),
            Script::Unavailable => Err(RookeryError::channel("scripted outage")),
            Script::ApproveOnPresent => {
                self.desk.approve(&draft.id).await?;
                Ok(())
            }
            Script::EditOnPresent => {
                self.desk.begin_edit(7, &draft.id).await?;
                self.desk.apply_free_text(7, "B").await?;
                Ok(())
            }
        }
    }

    async fn notify(&self, _text: &str) -> Result<()> {
        Ok(())
    }
}

struct Fixture {
    _temp_dir: tempfile::TempDir,
    pending: Arc<dyn PendingDraftRepository>,
    channel: Arc<ScriptedChannel>,
    coordinator: ApprovalCoordinator,
}

fn fixture(script: Script, timeout: Duration) -> Fixture {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let pending: Arc<dyn PendingDraftRepository> = Arc::new(JsonDraftRepository::new(
        temp_dir.path().join("pending_drafts.json"),
    ));
    let ledger = Arc::new(DecisionLedger::new());
    let gate = Arc::new(CycleGate::new());
    let desk = Arc::new(ReviewDesk::new(pending.clone(), ledger.clone(), gate));
    let channel = Arc::new(ScriptedChannel {
        desk: desk.clone(),
        script,
        presented: Mutex::new(Vec::new()),
    });
    let coordinator = ApprovalCoordinator::new(
        pending.clone(),
        ledger,
        desk,
        channel.clone(),
        timeout,
    );
    Fixture {
        _temp_dir: temp_dir,
        pending,
        channel,
        coordinator,
    }
}

#[tokio::test(start_paused = true)]
async fn silent_reviewer_times_out_and_leaves_no_draft() {
    let f = fixture(Script::Silent, Duration::from_secs(5));
    let cancel = CancellationToken::new();

    let decision = f
        .coordinator
        .request_approval("hello", "/tmp/a.png".as_ref(), &cancel)
        .await
        .unwrap();

    assert_eq!(decision, Decision::TimedOut);
    assert!(f.pending.load_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn immediate_approve_resolves_with_the_draft_text() {
    let f = fixture(Script::ApproveOnPresent, Duration::from_secs(30));
    let cancel = CancellationToken::new();

    let decision = f
        .coordinator
        .request_approval("gm wagmi", "/tmp/a.png".as_ref(), &cancel)
        .await
        .unwrap();

    assert_eq!(
        decision,
        Decision::Approved {
            text: "gm wagmi".to_string()
        }
    );
    assert_eq!(f.channel.presented.lock().unwrap().len(), 1);
    assert!(f.pending.load_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn edited_draft_resolves_with_the_replacement_text() {
    let f = fixture(Script::EditOnPresent, Duration::from_secs(30));
    let cancel = CancellationToken::new();

    let decision = f
        .coordinator
        .request_approval("A", "/tmp/a.png".as_ref(), &cancel)
        .await
        .unwrap();

    // The original "A" never survives; the decision carries "B".
    assert_eq!(
        decision,
        Decision::Approved {
            text: "B".to_string()
        }
    );
    assert!(f.pending.load_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn unreachable_channel_unwinds_the_draft() {
    let f = fixture(Script::Unavailable, Duration::from_secs(30));
    let cancel = CancellationToken::new();

    let err = f
        .coordinator
        .request_approval("hello", "/tmp/a.png".as_ref(), &cancel)
        .await
        .unwrap_err();

    assert!(err.is_channel_unavailable());
    assert!(f.pending.load_all().await.unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn shutdown_aborts_a_pending_wait() {
    let f = fixture(Script::Silent, Duration::from_secs(3_600));
    let cancel = CancellationToken::new();

    let waiter = {
        let cancel = cancel.clone();
        let coordinator = f.coordinator;
        tokio::spawn(async move {
            coordinator
                .request_approval("hello", "/tmp/a.png".as_ref(), &cancel)
                .await
        })
    };

    // Let the draft get registered and presented, then pull the plug.
    tokio::time::sleep(Duration::from_millis(50)).await;
    cancel.cancel();

    let result = waiter.await.unwrap();
    assert!(matches!(result, Err(RookeryError::Shutdown)));
    assert!(f.pending.load_all().await.unwrap().is_empty());
}
