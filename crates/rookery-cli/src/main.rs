use std::env;

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use rookery_application::bootstrap;
use rookery_core::config::{AppConfig, SecretConfig};
use rookery_core::content::generator::ContentGenerator;
use rookery_core::content::image::ImageSynthesizer;
use rookery_core::history::HistoryRepository;
use rookery_infrastructure::{ConfigStorage, JsonHistoryRepository, RookeryPaths, SecretStorage};
use rookery_interaction::{FluxApiAgent, GrokApiAgent, TelegramApi};

#[derive(Parser)]
#[command(name = "rookery")]
#[command(about = "Rookery - approval-gated social post automation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the posting loop (the default)
    Run,
    /// Generate one draft and print it without publishing
    Preview,
    /// Poll Telegram once and print the chat ids it has seen
    ChatId,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = ConfigStorage::new()?.load().context("loading config.toml")?;
    let secrets = SecretStorage::new()?.load().context("loading secrets")?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run(config, secrets).await,
        Commands::Preview => preview(config, secrets).await,
        Commands::ChatId => chat_id(secrets).await,
    }
}

/// The long-running loop: bootstrap the bot and drive it until interrupted.
async fn run(config: AppConfig, secrets: SecretConfig) -> Result<()> {
    let cancel = CancellationToken::new();

    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("interrupt received, shutting down");
                cancel.cancel();
            }
        });
    }

    let handles = bootstrap::build(config, secrets, cancel.clone())
        .await
        .context("starting rookery")?;

    handles.scheduler.run().await;

    if let Some(channel_loop) = handles.channel_loop {
        let _ = channel_loop.await;
    }
    tracing::info!("goodbye");
    Ok(())
}

/// One generation pass printed to stdout; nothing is posted or reviewed.
async fn preview(config: AppConfig, secrets: SecretConfig) -> Result<()> {
    let generator = GrokApiAgent::from_secrets(&secrets, &config.generation, &config.persona)?;
    let images = FluxApiAgent::from_secrets(&secrets, RookeryPaths::previews_dir()?)?;
    let history = JsonHistoryRepository::new(RookeryPaths::history_file()?);

    let recent = history.recent(config.persona.history_window).await?;
    let post = generator.generate(&recent).await?;
    println!("Post: {}", post.text);
    println!("Image prompt: {}", post.image_prompt);
    if let Some(top) = &post.overlay_top {
        println!("Overlay top: {top}");
    }
    if let Some(bottom) = &post.overlay_bottom {
        println!("Overlay bottom: {bottom}");
    }

    let image_path = images.render(&post).await?;
    println!("Preview image: {}", image_path.display());
    Ok(())
}

/// Helper for first-time setup: shows which chats have messaged the bot so
/// the operator can pick the right TELEGRAM_CHAT_ID.
async fn chat_id(secrets: SecretConfig) -> Result<()> {
    let bot_token = secrets
        .telegram
        .map(|telegram| telegram.bot_token)
        .or_else(|| env::var("TELEGRAM_BOT_TOKEN").ok())
        .ok_or_else(|| anyhow!("set TELEGRAM_BOT_TOKEN or the secret.json `telegram` section"))?;

    let api = TelegramApi::new(bot_token);
    let updates = api.get_updates(0, 5).await?;

    if updates.is_empty() {
        println!("No updates yet. Send your bot a message, then run this again.");
        return Ok(());
    }

    for update in updates {
        if let Some(message) = update.message {
            println!(
                "chat_id: {}  text: {}",
                message.chat.id,
                message.text.as_deref().unwrap_or("<non-text>")
            );
        }
    }
    Ok(())
}
