use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use docchat_core::config::API_URL_ENV;
use docchat_core::{Config, DocChatClient};
use tracing_subscriber::EnvFilter;

mod app;
mod handler;
mod tui;
mod ui;

use app::App;
use tui::{EventHandler, Tui};

#[derive(Parser)]
#[command(name = "docchat", version)]
#[command(about = "Ask questions about a PDF, DOCX, or TXT document from the terminal")]
struct Cli {
    /// Base URL of the chat service (overrides DOCCHAT_API_URL and the config file)
    #[arg(long)]
    api_url: Option<String>,
    /// Remember --api-url in the config file
    #[arg(long, requires = "api_url")]
    save: bool,
    /// Log file (defaults to the user cache directory)
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // The terminal owns stderr, so logs go to a file
    let log_path = init_logging(cli.log_file.clone())?;

    let config = Config::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "could not load config, using defaults");
        Config::new()
    });
    let env_url = std::env::var(API_URL_ENV).ok();
    let api_url = config.resolve_api_url(cli.api_url.as_deref(), env_url.as_deref());

    if cli.save {
        Config::save_api_url(&api_url)?;
    }

    tracing::info!(%api_url, log = %log_path.display(), "starting docchat");

    let client = DocChatClient::new(&api_url);
    check_health(&client).await;

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let result = run(&mut terminal, App::new(client)).await;
    tui::restore()?;

    result
}

async fn run(terminal: &mut Tui, mut app: App) -> Result<()> {
    let mut events = EventHandler::new();

    while !app.should_quit {
        terminal.draw(|frame| ui::render(&mut app, frame))?;

        if let Some(event) = events.next().await {
            handler::handle_event(&mut app, event).await?;
        }

        app.poll_in_flight().await;
    }

    Ok(())
}

fn init_logging(log_file: Option<PathBuf>) -> Result<PathBuf> {
    let log_path = match log_file {
        Some(path) => path,
        None => dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("docchat")
            .join("docchat.log"),
    };

    if let Some(parent) = log_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();

    Ok(log_path)
}

/// Log whether the service is reachable. Never fatal; the first request
/// surfaces the real error in the UI.
async fn check_health(client: &DocChatClient) {
    match tokio::time::timeout(Duration::from_secs(2), client.health()).await {
        Ok(Ok(true)) => tracing::info!(url = client.base_url(), "chat service is healthy"),
        Ok(Ok(false)) => tracing::warn!(url = client.base_url(), "chat service reported unhealthy"),
        Ok(Err(e)) => tracing::warn!(url = client.base_url(), error = %e, "chat service unreachable"),
        Err(_) => tracing::warn!(url = client.base_url(), "chat service health check timed out"),
    }
}
