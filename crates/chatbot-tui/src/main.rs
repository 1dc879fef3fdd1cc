//! Chatbot - terminal chat front-end for Gemini
//!
//! Users log in (or sign up) against a local JSON user store, then chat with
//! the model using text and optional images. Transcripts can be exported as
//! plain text or PDF.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use chatbot_core::{Config, UserStore};
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

mod app;
mod handler;
mod tui;
mod ui;

use app::App;
use tui::{EventHandler, Tui};

#[derive(Parser)]
#[command(name = "chatbot")]
#[command(about = "Terminal chat with Gemini: login, image prompts, and transcript export")]
#[command(version)]
struct Cli {
    /// Gemini API key
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Gemini model name
    #[arg(long)]
    model: Option<String>,

    /// JSON file holding registered users
    #[arg(long)]
    users_file: Option<PathBuf>,

    /// Directory transcripts are exported to
    #[arg(long)]
    export_dir: Option<PathBuf>,

    /// Config file (defaults to the platform config directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log file (the terminal is owned by the UI)
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Write the effective configuration to the config file and exit
    #[arg(long)]
    save_config: bool,
}

impl Cli {
    /// Flags win over values loaded from the config file.
    fn apply_to(&self, config: &mut Config) {
        if let Some(model) = &self.model {
            config.model = model.clone();
        }
        if let Some(users_file) = &self.users_file {
            config.users_file = users_file.clone();
        }
        if let Some(export_dir) = &self.export_dir {
            config.export_dir = Some(export_dir.clone());
        }
    }

    /// The configuration `--save-config` writes: `config` plus the API key
    /// given on the command line or through `GEMINI_API_KEY`.
    fn config_to_save(&self, config: &Config) -> Config {
        let mut saved = config.clone();
        if let Some(api_key) = &self.api_key {
            saved.gemini_api_key = Some(api_key.clone());
        }
        saved
    }
}

fn default_log_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|dir| dir.join("chatbot").join("chatbot.log"))
        .unwrap_or_else(|| PathBuf::from("chatbot.log"))
}

fn init_logging(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file {}", path.display()))?;

    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(&cli.log_file.clone().unwrap_or_else(default_log_path))?;

    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => Config::get_config_path()?,
    };
    let mut config = Config::load_from(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    cli.apply_to(&mut config);

    if cli.save_config {
        cli.config_to_save(&config).save_to(&config_path)?;
        println!("Saved configuration to {}", config_path.display());
        return Ok(());
    }

    let api_key = cli.api_key.or_else(|| config.resolve_api_key());
    let users = UserStore::load(&config.users_file)
        .with_context(|| format!("Failed to load users from {}", config.users_file.display()))?;
    tracing::info!(users = users.len(), model = %config.model, "starting chatbot");

    let mut app = App::new(&config, users, api_key);

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let result = run(&mut terminal, &mut app).await;
    tui::restore()?;

    result
}

async fn run(terminal: &mut Tui, app: &mut App) -> Result<()> {
    let mut events = EventHandler::new();

    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        if let Some(event) = events.next().await {
            handler::handle_event(app, event);
        }
        app.poll_turn().await;
    }

    tracing::info!("shutting down");
    Ok(())
}
