//! Logging initialization and startup diagnostics
//!
//! This module provides:
//! - Logger initialization (console + file)
//! - A startup banner summarizing the loaded configuration
//! - Console clearing for the `/clear` admin command

use anyhow::Result;
use simplelog::*;
use std::fs::OpenOptions;
use std::io::Write;

use crate::core::config::Config;

/// Initialize logger for both console and file output
///
/// The log file is opened in append mode so restarts keep history.
pub fn init_logger(log_file_path: &str) -> Result<()> {
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file_path)
        .map_err(|e| anyhow::anyhow!("Failed to open log file: {}", e))?;

    let config = ConfigBuilder::new()
        .add_filter_ignore_str("sqlx")
        .add_filter_ignore_str("hyper")
        .add_filter_ignore_str("reqwest")
        .build();

    CombinedLogger::init(vec![
        TermLogger::new(LevelFilter::Info, config.clone(), TerminalMode::Mixed, ColorChoice::Auto),
        WriteLogger::new(LevelFilter::Info, config, log_file),
    ])
    .map_err(|e| anyhow::anyhow!("Failed to initialize logger: {}", e))?;

    Ok(())
}

/// Logs the effective configuration at startup. Secrets are never printed.
pub fn log_startup_configuration(config: &Config) {
    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    log::info!("📦 File store bot configuration");
    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    log::info!("Bot username:     @{}", config.bot_username());
    log::info!("Storage channel:  {}", config.storage_channel_id);
    log::info!("Admins:           {}", config.admin_ids.len());
    log::info!("Admin contact:    {}", config.admin_contact_display());
    log::info!("Caption:          {}", config.custom_caption);
    log::info!("Health port:      {}", config.port);

    for warning in config.warnings() {
        log::warn!("⚠️  {}", warning);
    }
}

/// Clears the terminal the bot is running in.
pub fn clear_console() {
    let mut stdout = std::io::stdout();
    // ANSI: erase screen, move cursor home
    let _ = stdout.write_all(b"\x1B[2J\x1B[H");
    let _ = stdout.flush();
    log::info!("Console cleared by admin command");
}
