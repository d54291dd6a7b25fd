//! The outer control loop: generate → review → publish-or-skip → sleep.
//!
//! One cycle runs at a time. Failures anywhere in the pipeline put the loop
//! to sleep on a short fixed backoff instead of the normal randomized
//! interval; nothing short of cancellation terminates it. Cancellation is
//! only observed inside waits, never mid-publish.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio_util::sync::CancellationToken;

use rookery_core::channel::ReviewChannel;
use rookery_core::config::{ApprovalPolicy, PersonaConfig, ScheduleConfig, SleepRange};
use rookery_core::content::generator::ContentGenerator;
use rookery_core::content::image::ImageSynthesizer;
use rookery_core::content::model::{GeneratedPost, PostId};
use rookery_core::content::publisher::Publisher;
use rookery_core::cycle::{CycleGate, CyclePhase};
use rookery_core::draft::model::Decision;
use rookery_core::error::{Result, RookeryError};
use rookery_core::history::HistoryRepository;

use crate::approval::ApprovalCoordinator;

/// How a completed cycle ended.
#[derive(Debug)]
enum CycleOutcome {
    Published(PostId),
    Skipped(&'static str),
}

/// The generate → review → publish state machine.
pub struct CycleScheduler {
    generator: Arc<dyn ContentGenerator>,
    images: Arc<dyn ImageSynthesizer>,
    publisher: Arc<dyn Publisher>,
    history: Arc<dyn HistoryRepository>,
    /// Present when an approval channel is configured for this deployment.
    approval: Option<Arc<ApprovalCoordinator>>,
    /// Used for success notices; `None` when running without a channel.
    channel: Option<Arc<dyn ReviewChannel>>,
    gate: Arc<CycleGate>,
    policy: ApprovalPolicy,
    schedule: ScheduleConfig,
    persona: PersonaConfig,
    cancel: CancellationToken,
}

impl CycleScheduler {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        generator: Arc<dyn ContentGenerator>,
        images: Arc<dyn ImageSynthesizer>,
        publisher: Arc<dyn Publisher>,
        history: Arc<dyn HistoryRepository>,
        approval: Option<Arc<ApprovalCoordinator>>,
        channel: Option<Arc<dyn ReviewChannel>>,
        gate: Arc<CycleGate>,
        policy: ApprovalPolicy,
        schedule: ScheduleConfig,
        persona: PersonaConfig,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            generator,
            images,
            publisher,
            history,
            approval,
            channel,
            gate,
            policy,
            schedule,
            persona,
            cancel,
        }
    }

    /// Runs cycles until cancellation. The first cycle starts immediately;
    /// afterwards the loop sleeps for a randomized interval, woken early by
    /// a manual trigger.
    pub async fn run(&self) {
        tracing::info!(policy = ?self.policy, "scheduler started");
        loop {
            if self.cancel.is_cancelled() {
                break;
            }

            self.gate.set_phase(CyclePhase::Generating);
            let delay = match self.run_cycle().await {
                Ok(CycleOutcome::Published(post_id)) => {
                    tracing::info!(%post_id, "post published");
                    self.draw_sleep()
                }
                Ok(CycleOutcome::Skipped(reason)) => {
                    tracing::info!(reason, "cycle skipped");
                    self.draw_sleep()
                }
                Err(err) if err.is_shutdown() => break,
                Err(err) => {
                    tracing::warn!(error = %err, "cycle failed, backing off");
                    Duration::from_secs(self.schedule.error_backoff_secs)
                }
            };

            self.gate.set_phase(CyclePhase::Sleeping);
            tracing::info!(secs = delay.as_secs(), "sleeping until next cycle");
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
                _ = self.gate.triggered() => {
                    tracing::info!("woken by manual trigger");
                }
            }
            self.gate.set_phase(CyclePhase::Idle);
        }
        self.gate.set_phase(CyclePhase::Idle);
        tracing::info!("scheduler stopped");
    }

    async fn run_cycle(&self) -> Result<CycleOutcome> {
        let history = self.history.recent(self.persona.history_window).await?;
        let post = self.generator.generate(&history).await?;
        tracing::info!(text = %post.text, "draft generated");

        let image_path = self.images.render(&post).await?;
        tracing::info!(path = %image_path.display(), "preview image ready");

        let result = self.review_and_publish(&post, &image_path).await;

        // The preview is cycle-scoped; release it whatever happened.
        if let Err(err) = tokio::fs::remove_file(&image_path).await {
            tracing::debug!(path = %image_path.display(), error = %err, "preview cleanup failed");
        }

        result
    }

    async fn review_and_publish(
        &self,
        post: &GeneratedPost,
        image_path: &Path,
    ) -> Result<CycleOutcome> {
        let coordinator = match (self.policy, &self.approval) {
            (ApprovalPolicy::Disabled, _) => None,
            (ApprovalPolicy::OptionalIfAvailable, maybe) => maybe.as_ref(),
            (ApprovalPolicy::Mandatory, Some(coordinator)) => Some(coordinator),
            (ApprovalPolicy::Mandatory, None) => {
                // Bootstrap refuses this combination; reaching it is a bug.
                return Err(RookeryError::internal(
                    "mandatory approval with no channel configured",
                ));
            }
        };

        let Some(coordinator) = coordinator else {
            tracing::info!("no review channel in play, publishing directly");
            return self.publish_approved(&post.text, image_path, false).await;
        };

        self.gate.set_phase(CyclePhase::AwaitingApproval);
        let decision = match coordinator
            .request_approval(&post.text, image_path, &self.cancel)
            .await
        {
            Ok(decision) => decision,
            Err(err)
                if err.is_channel_unavailable()
                    && self.policy == ApprovalPolicy::OptionalIfAvailable =>
            {
                tracing::warn!(error = %err, "channel unavailable, publishing without approval");
                return self.publish_approved(&post.text, image_path, false).await;
            }
            Err(err) => return Err(err),
        };

        match decision {
            Decision::Approved { text } => self.publish_approved(&text, image_path, true).await,
            Decision::Denied => Ok(CycleOutcome::Skipped("draft denied")),
            Decision::TimedOut => Ok(CycleOutcome::Skipped("approval timed out")),
        }
    }

    async fn publish_approved(
        &self,
        text: &str,
        image_path: &Path,
        notify: bool,
    ) -> Result<CycleOutcome> {
        self.gate.set_phase(CyclePhase::Publishing);
        let post_id = self.publisher.publish(text, image_path).await?;
        self.history.append(text.to_string()).await?;

        if notify {
            if let Some(channel) = &self.channel {
                if let Err(err) = channel.notify("✅ Post published successfully!").await {
                    tracing::debug!(error = %err, "publish notice failed");
                }
            }
        }

        Ok(CycleOutcome::Published(post_id))
    }

    fn draw_sleep(&self) -> Duration {
        let range = self.active_range();
        let secs = if range.min_secs >= range.max_secs {
            range.min_secs
        } else {
            rand::thread_rng().gen_range(range.min_secs..=range.max_secs)
        };
        Duration::from_secs(secs)
    }

    /// Approval-gated and direct-post deployments keep distinct cadences.
    fn active_range(&self) -> SleepRange {
        match self.policy {
            ApprovalPolicy::Disabled => self.schedule.direct_post,
            ApprovalPolicy::Mandatory => self.schedule.approval_gated,
            ApprovalPolicy::OptionalIfAvailable => {
                if self.approval.is_some() {
                    self.schedule.approval_gated
                } else {
                    self.schedule.direct_post
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use rookery_core::content::model::GeneratedPost;

    struct StubGenerator {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait::async_trait]
    impl ContentGenerator for StubGenerator {
        async fn generate(&self, _history: &[String]) -> Result<GeneratedPost> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(RookeryError::generation("stubbed failure"));
            }
            Ok(GeneratedPost {
                text: "stub post".to_string(),
                image_prompt: "stub prompt".to_string(),
                overlay_top: None,
                overlay_bottom: None,
            })
        }
    }

    struct StubImages {
        dir: std::path::PathBuf,
    }

    #[async_trait::async_trait]
    impl ImageSynthesizer for StubImages {
        async fn render(&self, _post: &GeneratedPost) -> Result<std::path::PathBuf> {
            let path = self.dir.join(format!("preview-{}.png", uuid_like()));
            tokio::fs::write(&path, b"png").await?;
            Ok(path)
        }
    }

    fn uuid_like() -> u128 {
        use std::time::{SystemTime, UNIX_EPOCH};
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default()
    }

    #[derive(Default)]
    struct StubPublisher {
        published: Mutex<Vec<String>>,
    }

    #[async_trait::async_trait]
    impl Publisher for StubPublisher {
        async fn publish(&self, text: &str, _image_path: &Path) -> Result<PostId> {
            self.published.lock().unwrap().push(text.to_string());
            Ok(PostId("post-1".to_string()))
        }
    }

    #[derive(Default)]
    struct StubHistory {
        entries: Mutex<Vec<String>>,
    }

    #[async_trait::async_trait]
    impl HistoryRepository for StubHistory {
        async fn append(&self, text: String) -> Result<()> {
            self.entries.lock().unwrap().push(text);
            Ok(())
        }

        async fn recent(&self, n: usize) -> Result<Vec<String>> {
            let entries = self.entries.lock().unwrap();
            let start = entries.len().saturating_sub(n);
            Ok(entries[start..].to_vec())
        }

        async fn load_all(&self) -> Result<Vec<String>> {
            Ok(self.entries.lock().unwrap().clone())
        }
    }

    fn direct_scheduler(
        generator: Arc<StubGenerator>,
        publisher: Arc<StubPublisher>,
        history: Arc<StubHistory>,
        temp_dir: &tempfile::TempDir,
        schedule: ScheduleConfig,
        cancel: CancellationToken,
    ) -> CycleScheduler {
        CycleScheduler::new(
            generator,
            Arc::new(StubImages {
                dir: temp_dir.path().to_path_buf(),
            }),
            publisher,
            history,
            None,
            None,
            Arc::new(CycleGate::new()),
            ApprovalPolicy::Disabled,
            schedule,
            PersonaConfig::default(),
            cancel,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn direct_mode_publishes_and_records_history() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let generator = Arc::new(StubGenerator {
            calls: AtomicUsize::new(0),
            fail: false,
        });
        let publisher = Arc::new(StubPublisher::default());
        let history = Arc::new(StubHistory::default());
        let cancel = CancellationToken::new();

        let scheduler = direct_scheduler(
            generator.clone(),
            publisher.clone(),
            history.clone(),
            &temp_dir,
            ScheduleConfig::default(),
            cancel.clone(),
        );

        let run = tokio::spawn(async move { scheduler.run().await });
        // Give the first cycle a chance to finish, then stop the loop.
        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel.cancel();
        run.await.unwrap();

        assert!(generator.calls.load(Ordering::SeqCst) >= 1);
        let published = publisher.published.lock().unwrap();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0], "stub post");
        let entries = history.entries.lock().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0], "stub post");
    }

    #[tokio::test(start_paused = true)]
    async fn failures_back_off_and_keep_the_loop_alive() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let generator = Arc::new(StubGenerator {
            calls: AtomicUsize::new(0),
            fail: true,
        });
        let publisher = Arc::new(StubPublisher::default());
        let history = Arc::new(StubHistory::default());
        let cancel = CancellationToken::new();

        let mut schedule = ScheduleConfig::default();
        schedule.error_backoff_secs = 30;

        let scheduler = direct_scheduler(
            generator.clone(),
            publisher.clone(),
            history.clone(),
            &temp_dir,
            schedule,
            cancel.clone(),
        );

        let run = tokio::spawn(async move { scheduler.run().await });
        // Paused time auto-advances through the 30s backoffs; several failed
        // cycles should elapse without killing the loop.
        tokio::time::sleep(Duration::from_secs(100)).await;
        cancel.cancel();
        run.await.unwrap();

        assert!(
            generator.calls.load(Ordering::SeqCst) >= 3,
            "loop should retry after failures"
        );
        assert!(publisher.published.lock().unwrap().is_empty());
        assert!(history.entries.lock().unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn manual_trigger_wakes_a_sleeping_scheduler() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let generator = Arc::new(StubGenerator {
            calls: AtomicUsize::new(0),
            fail: false,
        });
        let publisher = Arc::new(StubPublisher::default());
        let history = Arc::new(StubHistory::default());
        let cancel = CancellationToken::new();
        let gate = Arc::new(CycleGate::new());

        let mut schedule = ScheduleConfig::default();
        // Long enough that only a manual trigger can end the sleep.
        schedule.direct_post = SleepRange {
            min_secs: 600,
            max_secs: 600,
        };

        let scheduler = CycleScheduler::new(
            generator.clone(),
            Arc::new(StubImages {
                dir: temp_dir.path().to_path_buf(),
            }),
            publisher.clone(),
            history.clone(),
            None,
            None,
            gate.clone(),
            ApprovalPolicy::Disabled,
            schedule,
            PersonaConfig::default(),
            cancel.clone(),
        );

        let run = tokio::spawn(async move { scheduler.run().await });

        // Wait for the first cycle to finish and the loop to go to sleep.
        let mut waited = 0;
        while gate.phase() != CyclePhase::Sleeping && waited < 100 {
            tokio::time::sleep(Duration::from_millis(20)).await;
            waited += 1;
        }
        assert_eq!(gate.phase(), CyclePhase::Sleeping, "scheduler should sleep");
        assert_eq!(generator.calls.load(Ordering::SeqCst), 1);

        gate.try_trigger();
        let mut waited = 0;
        while generator.calls.load(Ordering::SeqCst) < 2 && waited < 100 {
            tokio::time::sleep(Duration::from_millis(20)).await;
            waited += 1;
        }
        assert!(
            generator.calls.load(Ordering::SeqCst) >= 2,
            "trigger should start a new cycle well before the interval"
        );

        cancel.cancel();
        run.await.unwrap();
    }
}
