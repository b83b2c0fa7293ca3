use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use job_api::{ApiConfig, JobId, JobPhase, VideoApi, VideoApiClient};
use player::{NullMediaSurface, Player, PlayerCapabilities, PlayerConfig};
use tracing::info;

#[derive(Parser)]
#[command(name = "lumen-cli")]
#[command(about = "Lumen CLI - Track and fetch AI-generated videos from the terminal")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Backend base URL; defaults to BACKEND_API_URL or localhost
    #[arg(long, global = true)]
    base_url: Option<String>,

    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit a generation job for a topic
    Generate {
        /// Topic to generate a video about
        topic: String,
    },

    /// One-shot status query for a job
    Status {
        /// Job identifier
        #[arg(long)]
        id: String,
    },

    /// Follow a job until it completes or fails
    Watch {
        /// Job identifier
        #[arg(long)]
        id: String,

        /// Topic label, used for the processing captions
        #[arg(long)]
        topic: Option<String>,
    },

    /// Download the finished video
    Download {
        /// Job identifier
        #[arg(long)]
        id: String,

        /// Output file; defaults to educational_video_<id>.mp4
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt().with_max_level(level).init();

    let config = match &cli.base_url {
        Some(url) => ApiConfig::new(url.clone()),
        None => ApiConfig::from_env(),
    };
    let api: Arc<dyn VideoApi> = Arc::new(VideoApiClient::new(config));

    match cli.command {
        Commands::Generate { topic } => generate_command(api, topic).await,
        Commands::Status { id } => status_command(api, id).await,
        Commands::Watch { id, topic } => watch_command(api, id, topic).await,
        Commands::Download { id, output } => download_command(api, id, output).await,
    }
}

async fn generate_command(api: Arc<dyn VideoApi>, topic: String) -> Result<()> {
    info!("Submitting generation job for topic: {topic}");
    let job = api.submit(&topic).await.context("submit generation job")?;
    println!("{job}");
    info!("Job accepted; follow it with: lumen-cli watch --id {job}");
    Ok(())
}

async fn status_command(api: Arc<dyn VideoApi>, id: String) -> Result<()> {
    let job = JobId(id);
    let report = api.fetch_status(&job).await.context("query job status")?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn watch_command(api: Arc<dyn VideoApi>, id: String, topic: Option<String>) -> Result<()> {
    let player_config = match &topic {
        Some(topic) => PlayerConfig::default().with_topic(topic),
        None => PlayerConfig::default(),
    };

    // Headless run: no media element, so playback never starts, but the
    // poll and probe flow is exactly the one the page runs.
    let mut player = Player::new(
        api,
        Arc::new(NullMediaSurface),
        player_config,
        PlayerCapabilities::default(),
    );
    player.watch(JobId(id));

    let phase = player.run_until_terminal().await;
    let message = player.view().message.clone();
    match phase {
        JobPhase::Completed => {
            if let Some(url) = player.download_url() {
                info!("Video ready: {url}");
                println!("{url}");
            }
            Ok(())
        }
        JobPhase::Failed => anyhow::bail!("generation failed: {message}"),
        other => anyhow::bail!("watch ended in non-terminal phase {other}"),
    }
}

async fn download_command(
    api: Arc<dyn VideoApi>,
    id: String,
    output: Option<PathBuf>,
) -> Result<()> {
    let job = JobId(id);
    let path = output.unwrap_or_else(|| PathBuf::from(format!("educational_video_{job}.mp4")));

    info!("Downloading {} to {:?}", api.media_url(&job), path);
    let bytes = api.download(&job).await.context("download video")?;
    std::fs::write(&path, &bytes).with_context(|| format!("write video to {}", path.display()))?;
    info!("Saved {} bytes", bytes.len());
    Ok(())
}
