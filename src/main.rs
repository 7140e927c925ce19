//! Balance Bot - Main Entry Point
//!
//! A Telegram bot that reports customer balances and container charges
//! from a Google spreadsheet and notifies customers when they change.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::{RwLock, mpsc};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use balance_bot::commands::CommandHandler;
use balance_bot::config::{BotConfig, BotSettings, TelegramConfig};
use balance_bot::monitor::{BalanceMonitor, MonitorMessage};
use balance_bot::session::{RoleDirectory, SessionStore};
use balance_bot::sheets::{
    GoogleSheetsWriter, HttpSnapshotFetcher, SheetsApiFetcher, SheetsRepository,
};
use balance_bot::telegram::{Messenger, TelegramBot, run_dispatcher};

/// Telegram bot for spreadsheet balances and change notifications.
#[derive(Parser, Debug)]
#[command(name = "balance_bot")]
#[command(about = "Report spreadsheet balances to Telegram customers")]
#[command(version)]
struct Args {
    /// Path to the bot JSON configuration file. Defaults to `BOT_CONFIG`
    /// or `bot_config.json`.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Path to the .env file for environment variables.
    #[arg(long, default_value = ".env")]
    env_file: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Generate an example configuration file and exit.
    #[arg(long)]
    generate_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level);

    if args.generate_config {
        return generate_example_config();
    }

    if let Err(e) = dotenvy::from_filename(&args.env_file) {
        debug!("Could not load .env file ({}): {}", args.env_file, e);
    }

    let tg_config = TelegramConfig::from_env()
        .context("Failed to load Telegram configuration from environment")?;
    let settings = BotSettings::from_env_with_defaults();
    debug!("Settings: {:?}", settings);

    let config_path = args.config.unwrap_or_else(|| settings.config_path.clone());
    let config = BotConfig::load_from_file(&config_path)
        .with_context(|| format!("Failed to load {}", config_path.display()))?;
    config
        .validate()
        .context("Bot configuration validation failed")?;

    info!(
        "Loaded configuration: {} super users, {} managers, {} investor sheets",
        config.roles.super_users.len(),
        config.roles.managers.len(),
        config.investors.len()
    );

    let fetcher = HttpSnapshotFetcher::new(settings.fetch_timeout())
        .context("Failed to build the sheet HTTP client")?;
    let mut repo = SheetsRepository::new(
        Arc::new(fetcher),
        config.balances.clone(),
        config.containers.clone(),
        config.container_threshold,
    );
    if let Some(token) = settings.sheets_access_token.as_deref() {
        let private = SheetsApiFetcher::new(token, settings.fetch_timeout())
            .context("Failed to build the Sheets API reader")?;
        repo = repo.with_private_fetcher(Arc::new(private));
        info!("Investor sheets are read through the Sheets API");
    } else {
        warn!("SHEETS_ACCESS_TOKEN is not set; investor sheets must be shared by link");
    }

    let writer = GoogleSheetsWriter::new(
        config.write_document_id.clone(),
        settings.sheets_access_token.clone(),
        settings.fetch_timeout(),
    )
    .context("Failed to build the sheet writer")?;
    if !writer.writes_enabled() {
        warn!("Charge file imports will not write rows without SHEETS_ACCESS_TOKEN");
    }

    let sessions = Arc::new(RwLock::new(SessionStore::new(RoleDirectory::from_config(
        &config.roles,
    ))));

    let telegram = TelegramBot::new(&tg_config, settings.send_interval());
    telegram
        .connect()
        .await
        .context("Failed to connect to Telegram")?;

    let (monitor_tx, monitor_rx) = mpsc::channel::<MonitorMessage>(8);

    let monitor = BalanceMonitor::new(
        repo.clone(),
        Arc::clone(&sessions),
        Arc::new(telegram.clone()) as Arc<dyn Messenger>,
    )
    .with_poll_interval(settings.poll_interval())
    .with_backoff(settings.error_backoff(), settings.max_backoff());

    let monitor_handle = tokio::spawn(async move {
        monitor.run(monitor_rx).await;
    });

    let handler = CommandHandler::new(repo, sessions, Arc::new(config), Arc::new(writer))
        .with_monitor(monitor_tx.clone());

    info!("Starting balance bot...");
    run_dispatcher(telegram, Arc::new(handler)).await;

    info!("Shutting down...");
    let _ = monitor_tx.send(MonitorMessage::Shutdown).await;
    let _ = monitor_handle.await;

    Ok(())
}

/// Initializes the logging subsystem.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Generates an example configuration file.
fn generate_example_config() -> Result<()> {
    let example = BotConfig::example();
    example.save_to_file("bot_config.example.json")?;

    println!("✓ Example configuration written to: bot_config.example.json");
    println!("\nTo use this bot:");
    println!("1. Copy bot_config.example.json to bot_config.json");
    println!("2. Fill in the spreadsheet document ids and Telegram user ids");
    println!("3. Create a .env file with BOT_TOKEN (and SHEETS_ACCESS_TOKEN for imports)");
    println!("4. Run: balance_bot");

    Ok(())
}
