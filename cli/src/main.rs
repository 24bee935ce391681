/// Tubegrab - Main Entry Point
///
/// Terminal front-end: fetches metadata for a YouTube URL from the backend,
/// lets the user pick a format, and saves the download to disk.
mod render;

use std::future::Future;
use std::io::IsTerminal;
use std::path::PathBuf;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tracing::{info, warn};

use tubegrab_downloader::{
    BackendClient, BodyStrategy, ClientConfig, DiskSink, UiController, UiState,
};
use tubegrab_shared::errors::ClientError;
use tubegrab_shared::models::VideoInfo;

use render::Renderer;

#[derive(Debug, Parser)]
#[command(name = "tubegrab", version, about = "Download YouTube videos through a Tubegrab backend")]
struct Cli {
    /// YouTube video URL
    url: String,

    /// Format id to download (skips the prompt)
    #[arg(short, long)]
    format: Option<String>,

    /// Print the available formats and exit
    #[arg(long)]
    list: bool,

    /// Directory to save into (overrides TUBEGRAB_DOWNLOAD_DIR)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Backend origin (overrides TUBEGRAB_BASE_URL)
    #[arg(long)]
    base_url: Option<String>,

    /// Read the whole body at once instead of streaming with progress
    #[arg(long)]
    buffered: bool,
}

#[tokio::main]
async fn main() {
    // Load .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tubegrab_cli=info,tubegrab_downloader=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        match e.downcast_ref::<ClientError>() {
            Some(client_err) => eprintln!("{}", client_err.user_message()),
            None => eprintln!("Error: {:#}", e),
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = ClientConfig::from_env()?;
    if let Some(base_url) = cli.base_url {
        config = config.with_base_url(base_url)?;
    }
    if let Some(dir) = cli.output {
        config = config.with_download_dir(dir);
    }
    if cli.buffered {
        config = config.with_body_strategy(BodyStrategy::Buffered);
    }
    info!("Backend: {} -> {}", config.base_url, config.download_dir.display());

    let sink = DiskSink::new(&config.download_dir);
    let mut controller = UiController::new(BackendClient::new(config)?, sink);
    let mut updates = controller.subscribe();
    let mut renderer = Renderer::new();

    let info = drive(controller.fetch_video_info(&cli.url), &mut updates, &mut renderer).await?;
    if cli.list {
        return Ok(());
    }

    let default_format = controller.snapshot().selected_format;
    let format_id = match cli.format {
        Some(format_id) => format_id,
        None if std::io::stdin().is_terminal() => prompt_format(&info, default_format.as_deref()).await?,
        None => default_format.unwrap_or_default(),
    };
    if !controller.select_format(&format_id) {
        warn!("Format {} is not in the listed formats; requesting it anyway", format_id);
    }

    let saved = drive(
        controller.download_video(&cli.url, &format_id),
        &mut updates,
        &mut renderer,
    )
    .await?;
    println!("Saved to {}", saved.path.display());
    Ok(())
}

/// Run one controller operation while rendering every state change it makes.
async fn drive<F, T>(op: F, updates: &mut watch::Receiver<UiState>, renderer: &mut Renderer) -> T
where
    F: Future<Output = T>,
{
    tokio::pin!(op);
    loop {
        tokio::select! {
            out = &mut op => {
                let state = updates.borrow_and_update().clone();
                renderer.emit(&state);
                return out;
            }
            changed = updates.changed() => {
                if changed.is_err() {
                    return op.await;
                }
                let state = updates.borrow_and_update().clone();
                renderer.emit(&state);
            }
        }
    }
}

/// Ask for a format id or list number; an empty answer keeps `default`.
async fn prompt_format(info: &VideoInfo, default: Option<&str>) -> anyhow::Result<String> {
    let formats = info.format_list();
    eprint!("Format [{}]: ", default.unwrap_or("none"));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let answer = lines.next_line().await?.unwrap_or_default();
    let answer = answer.trim();

    if answer.is_empty() {
        return Ok(default.unwrap_or_default().to_string());
    }
    if let Some(format) = formats.iter().find(|f| f.format_id == answer) {
        return Ok(format.format_id.clone());
    }
    if let Ok(index) = answer.parse::<usize>() {
        if let Some(format) = index.checked_sub(1).and_then(|i| formats.get(i)) {
            return Ok(format.format_id.clone());
        }
    }
    Ok(answer.to_string())
}
