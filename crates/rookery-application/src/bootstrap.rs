//! Wires configuration, storage, agents, and the scheduler into a running bot.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use rookery_core::channel::ReviewChannel;
use rookery_core::config::{AppConfig, ApprovalPolicy, SecretConfig};
use rookery_core::cycle::CycleGate;
use rookery_core::draft::desk::ReviewDesk;
use rookery_core::draft::ledger::DecisionLedger;
use rookery_core::draft::repository::PendingDraftRepository;
use rookery_core::error::{Result, RookeryError};
use rookery_infrastructure::paths::RookeryPaths;
use rookery_infrastructure::{JsonDraftRepository, JsonHistoryRepository};
use rookery_interaction::{
    FluxApiAgent, GrokApiAgent, TelegramApi, TelegramReviewChannel, XApiPublisher,
};

use crate::approval::ApprovalCoordinator;
use crate::scheduler::CycleScheduler;

/// The assembled bot: the scheduler to drive and the channel's poll task.
pub struct BotHandles {
    pub scheduler: CycleScheduler,
    /// Running Telegram update loop, when a channel is configured.
    pub channel_loop: Option<JoinHandle<()>>,
}

/// Verifies that every credential the configured mode needs is present.
///
/// Collects all missing pieces into one actionable error instead of failing
/// on the first.
pub fn verify_credentials(config: &AppConfig, secrets: &SecretConfig) -> Result<()> {
    let mut missing = Vec::new();
    if secrets.xai.is_none() {
        missing.push("xAI API key (secret.json `xai` or XAI_API_KEY)");
    }
    if secrets.fal.is_none() {
        missing.push("fal.ai API key (secret.json `fal` or FAL_KEY)");
    }
    if secrets.x.is_none() {
        missing.push("X access token (secret.json `x` or X_ACCESS_TOKEN)");
    }
    if config.approval.policy == ApprovalPolicy::Mandatory && secrets.telegram.is_none() {
        missing.push(
            "Telegram credentials (secret.json `telegram` or TELEGRAM_BOT_TOKEN + TELEGRAM_CHAT_ID); \
             required while approval.policy = \"mandatory\"",
        );
    }

    if missing.is_empty() {
        Ok(())
    } else {
        Err(RookeryError::config(format!(
            "missing credentials:\n  - {}",
            missing.join("\n  - ")
        )))
    }
}

/// Builds the full object graph and spawns the channel loop.
///
/// Must run inside a tokio runtime. `cancel` is shared by every long-lived
/// task; cancelling it shuts the bot down cleanly.
pub async fn build(
    config: AppConfig,
    secrets: SecretConfig,
    cancel: CancellationToken,
) -> Result<BotHandles> {
    verify_credentials(&config, &secrets)?;

    let pending: Arc<dyn PendingDraftRepository> =
        Arc::new(JsonDraftRepository::new(RookeryPaths::pending_drafts_file()?));
    let history = Arc::new(JsonHistoryRepository::new(RookeryPaths::history_file()?));
    let ledger = Arc::new(DecisionLedger::new());
    let gate = Arc::new(CycleGate::new());
    let desk = Arc::new(ReviewDesk::new(pending.clone(), ledger.clone(), gate.clone()));

    let generator = Arc::new(GrokApiAgent::from_secrets(
        &secrets,
        &config.generation,
        &config.persona,
    )?);
    let images = Arc::new(FluxApiAgent::from_secrets(
        &secrets,
        RookeryPaths::previews_dir()?,
    )?);
    let publisher = Arc::new(XApiPublisher::from_secrets(&secrets)?);

    // Drafts left behind by an earlier process are never re-presented; the
    // desk answers their stale buttons with "already processed".
    let orphaned = pending.load_all().await?;
    if !orphaned.is_empty() {
        tracing::warn!(count = orphaned.len(), "found drafts orphaned by an earlier run");
    }

    let use_channel = match config.approval.policy {
        ApprovalPolicy::Disabled => false,
        ApprovalPolicy::Mandatory => true,
        ApprovalPolicy::OptionalIfAvailable => {
            let configured = secrets.telegram_configured();
            if !configured {
                tracing::info!("no Telegram credentials; running without approval");
            }
            configured
        }
    };

    let (approval, channel, channel_loop) = if use_channel {
        let telegram = secrets
            .telegram
            .as_ref()
            .ok_or_else(|| RookeryError::config("Telegram credentials missing"))?;
        let api = TelegramApi::new(telegram.bot_token.clone());
        let channel = Arc::new(TelegramReviewChannel::new(
            api,
            telegram.chat_id,
            desk.clone(),
        ));
        let channel_loop = channel.spawn_update_loop(cancel.clone());
        let channel: Arc<dyn ReviewChannel> = channel;
        let coordinator = Arc::new(ApprovalCoordinator::new(
            pending.clone(),
            ledger.clone(),
            desk.clone(),
            channel.clone(),
            Duration::from_secs(config.schedule.approval_timeout_secs),
        ));
        (Some(coordinator), Some(channel), Some(channel_loop))
    } else {
        (None, None, None)
    };

    let scheduler = CycleScheduler::new(
        generator,
        images,
        publisher,
        history,
        approval,
        channel,
        gate,
        config.approval.policy,
        config.schedule.clone(),
        config.persona.clone(),
        cancel,
    );

    Ok(BotHandles {
        scheduler,
        channel_loop,
    })
}
