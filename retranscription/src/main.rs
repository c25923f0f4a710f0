use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use retranscription::config::AppConfig;
use retranscription::models::{default_model, inventory_from_config};
use retranscription::retranscription::AUTO_LANGUAGE;

#[derive(Parser, Debug)]
#[command(name = "retranscribe", version, about = "Re-run transcription over a recorded meeting")]
struct Cli {
    /// Settings file (defaults to the app data directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List installed models that can be used for retranscription
    Models,
    /// Retranscribe one recording through the transcription worker
    Run(RunArgs),
}

#[derive(Args, Debug)]
struct RunArgs {
    #[arg(long)]
    meeting_id: String,

    /// Folder holding the meeting recording
    #[arg(long)]
    folder: PathBuf,

    /// Language code, or "auto" to let the engine detect it
    #[arg(long, default_value = AUTO_LANGUAGE)]
    language: String,

    /// Model name; defaults to the configured transcription model
    #[arg(long)]
    model: Option<String>,

    /// "whisper" or "parakeet"
    #[arg(long)]
    provider: Option<String>,

    /// Worker socket (defaults to the app data directory)
    #[arg(long)]
    socket: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config_path = cli.config.unwrap_or_else(AppConfig::default_path);
    let config = AppConfig::load(&config_path)
        .with_context(|| format!("Failed to load settings from {}", config_path.display()))?;

    match cli.command {
        Command::Models => list_models(&config).await,
        Command::Run(args) => run::run(&config, args).await,
    }
}

async fn list_models(config: &AppConfig) -> Result<()> {
    let options = inventory_from_config(config).fetch_options().await;
    if options.is_empty() {
        println!("No transcription models installed");
        return Ok(());
    }

    let default_key = default_model(&options, Some(&config.transcript)).map(|m| m.key());
    for option in &options {
        let marker = if Some(option.key()) == default_key { "*" } else { " " };
        println!(
            "{} {:<10} {}",
            marker,
            option.provider.display_name(),
            option.display_name
        );
    }
    Ok(())
}

#[cfg(unix)]
mod run {
    use std::sync::Arc;
    use std::time::Duration;

    use anyhow::{bail, Context, Result};
    use log::{info, warn};
    use retranscription::config::AppConfig;
    use retranscription::events::{EventBus, RetranscriptionResult};
    use retranscription::ipc::SidecarClient;
    use retranscription::models::{inventory_from_config, ModelProvider};
    use retranscription::retranscription::languages;
    use retranscription::retranscription::{
        DialogView, RetranscriptionCoordinator, RetranscriptionDialog, RetranscriptionStatus,
    };

    use super::RunArgs;

    const CANCEL_TIMEOUT: Duration = Duration::from_secs(5);

    pub async fn run(config: &AppConfig, args: RunArgs) -> Result<()> {
        if !languages::is_supported(&args.language) {
            bail!("Unsupported language '{}'", args.language);
        }

        let bus = EventBus::new();
        let socket = args.socket.clone().unwrap_or_else(|| config.sidecar_socket());
        let client = Arc::new(
            SidecarClient::connect_unix(&socket, bus.clone())
                .await
                .with_context(|| {
                    format!("Failed to connect to transcription worker at {}", socket.display())
                })?,
        );

        let coordinator = RetranscriptionCoordinator::new(bus, client.clone());
        let dialog = RetranscriptionDialog::new(
            coordinator.clone(),
            inventory_from_config(config),
            Some(config.transcript.clone()),
        );
        let mut updates = coordinator.watch();

        let folder = args.folder.to_string_lossy().to_string();
        dialog
            .open(&args.meeting_id, &folder, None::<fn(&RetranscriptionResult)>)
            .await;

        let models = match dialog.view() {
            DialogView::Selecting(view) => view.models,
            _ => Vec::new(),
        };
        if let Some(name) = &args.model {
            let provider = match &args.provider {
                Some(tag) => Some(
                    ModelProvider::from_tag(tag)
                        .with_context(|| format!("Unknown provider '{}'", tag))?,
                ),
                None => None,
            };
            let option = models
                .iter()
                .find(|m| &m.name == name && provider.map_or(true, |p| p == m.provider))
                .with_context(|| format!("Model '{}' is not installed", name))?;
            dialog.select_model(&option.key());
        }

        if !dialog.select_language(&args.language) && args.language != super::AUTO_LANGUAGE {
            warn!(
                "Selected model does not support language selection, using auto detection"
            );
        }

        let model = dialog
            .selected_model()
            .context("No transcription models installed")?;
        info!("Retranscribing {} with {}", args.meeting_id, model.display_name);

        dialog.start().await.context("Failed to start retranscription")?;

        let mut liveness = tokio::time::interval(Duration::from_secs(1));
        let interrupted = tokio::signal::ctrl_c();
        tokio::pin!(interrupted);
        let outcome = loop {
            tokio::select! {
                changed = updates.changed() => {
                    if changed.is_err() {
                        break Err(anyhow::anyhow!("Retranscription state closed"));
                    }
                    let snapshot = updates.borrow_and_update().clone();
                    match snapshot.status {
                        RetranscriptionStatus::Processing => {
                            if let Some(progress) = snapshot.progress {
                                println!(
                                    "[{:>3}%] {}: {}",
                                    progress.percent(),
                                    progress.stage,
                                    progress.message
                                );
                            }
                        }
                        RetranscriptionStatus::Complete => {
                            if let Some(result) = snapshot.result {
                                println!(
                                    "Done: {} segments, {:.1}s of audio{}",
                                    result.segments_count,
                                    result.duration_seconds,
                                    result
                                        .language
                                        .map(|l| format!(", language: {}", l))
                                        .unwrap_or_default()
                                );
                            }
                            break Ok(());
                        }
                        RetranscriptionStatus::Error => {
                            break Err(anyhow::anyhow!(
                                "Retranscription failed: {}",
                                snapshot.error.unwrap_or_default()
                            ));
                        }
                        RetranscriptionStatus::Idle => {}
                    }
                }
                _ = liveness.tick() => {
                    if !client.is_connected() {
                        break Err(anyhow::anyhow!("Transcription worker disconnected"));
                    }
                }
                _ = &mut interrupted => {
                    warn!("Interrupted, cancelling retranscription");
                    if tokio::time::timeout(CANCEL_TIMEOUT, dialog.cancel()).await.is_err() {
                        warn!("Transcription worker did not answer the cancel request");
                    }
                    break Ok(());
                }
            }
        };

        client.shutdown().await;
        outcome
    }
}

#[cfg(not(unix))]
mod run {
    use anyhow::{bail, Result};
    use retranscription::config::AppConfig;

    use super::RunArgs;

    pub async fn run(_config: &AppConfig, _args: RunArgs) -> Result<()> {
        bail!("Connecting to the transcription worker needs a Unix socket")
    }
}
