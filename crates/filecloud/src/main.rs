use anyhow::Result;
use dotenvy::dotenv;
use std::sync::Arc;
use std::time::Duration;
use teloxide::prelude::*;
use tokio::time::sleep;

use filecloud::cli::{Cli, Commands};
use filecloud::core::config::{self, Config};
use filecloud::core::health_server::start_health_server;
use filecloud::core::init_logger;
use filecloud::core::logging::log_startup_configuration;
use filecloud::storage::{MemoryStore, PgStore, Store};
use filecloud::telegram::sessions::SessionStore;
use filecloud::telegram::{create_bot, schema, setup_bot_commands, HandlerDeps};

/// Main entry point for the Telegram bot
///
/// Parses CLI arguments and dispatches to appropriate subcommand.
///
/// # Errors
/// Returns an error if initialization fails (logging, configuration, database, bot creation).
#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse_args();

    // Set up global panic handler so panics inside the dispatcher end up in the log
    std::panic::set_hook(Box::new(|panic_info| {
        log::error!("Panic caught: {:?}", panic_info);
        if let Some(location) = panic_info.location() {
            log::error!("Panic at {}:{}:{}", location.file(), location.line(), location.column());
        }
        if let Some(msg) = panic_info.payload().downcast_ref::<&str>() {
            log::error!("Panic message: {}", msg);
        }
    }));

    // Load environment variables from .env if present
    let _ = dotenv();

    // Initialize logger (console + file)
    init_logger(&config::LOG_FILE_PATH)?;

    match cli.command {
        Some(Commands::Run { in_memory }) => {
            log::info!("Running bot (in-memory store: {})", in_memory);
            run_bot(in_memory).await
        }
        Some(Commands::InitDb) => run_init_db().await,
        Some(Commands::CheckConfig) => run_check_config(),
        Some(Commands::Stats) => run_stats().await,
        None => {
            log::info!("No command specified, running bot in default mode");
            run_bot(false).await
        }
    }
}

fn load_config() -> Result<Config> {
    Config::from_env().map_err(|e| {
        log::error!("❌ {}", e);
        anyhow::anyhow!(e)
    })
}

async fn open_store(config: &Config) -> Result<Arc<dyn Store>> {
    let store = PgStore::connect(config.database_url()?).await?;
    Ok(Arc::new(store))
}

async fn run_init_db() -> Result<()> {
    let config = load_config()?;
    let store = open_store(&config).await?;
    store.init_schema(&config.admin_ids, &config.custom_caption).await?;
    log::info!("Database initialized successfully");
    Ok(())
}

fn run_check_config() -> Result<()> {
    let config = load_config()?;
    if config.database_url.is_none() {
        log::warn!("SUPABASE_URL is not set: only `run --in-memory` will work");
    }
    log_startup_configuration(&config);
    log::info!("Configuration validated successfully!");
    Ok(())
}

async fn run_stats() -> Result<()> {
    let config = load_config()?;
    let store = open_store(&config).await?;
    let stats = store.stats().await?;
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}

/// Runs the bot until the dispatcher stops
async fn run_bot(in_memory: bool) -> Result<()> {
    let config = Arc::new(load_config()?);
    log_startup_configuration(&config);

    let store: Arc<dyn Store> = if in_memory {
        log::warn!("Using the in-memory store: all data is lost when the bot stops");
        Arc::new(MemoryStore::new())
    } else {
        open_store(&config).await?
    };

    store.init_schema(&config.admin_ids, &config.custom_caption).await.map_err(|e| {
        log::error!("Database initialization failed: {}", e);
        anyhow::anyhow!(e)
    })?;
    log::info!("Database initialized successfully");

    // Health endpoint for container platforms
    let port = config.port;
    tokio::spawn(async move {
        if let Err(e) = start_health_server(port).await {
            log::error!("Health server error: {}", e);
        }
    });

    let bot = create_bot(&config)?;

    // Retry while the Bot API is unreachable
    let bot_info = {
        let startup_max_retries = config::retry::STARTUP_MAX_RETRIES;
        let mut startup_retry = 0;
        loop {
            match bot.get_me().await {
                Ok(info) => break info,
                Err(e) => {
                    let err_str = e.to_string();
                    let is_retryable = matches!(e, teloxide::RequestError::Network(_))
                        || err_str.contains("restart")
                        || err_str.contains("timed out");

                    startup_retry += 1;
                    if startup_retry >= startup_max_retries || !is_retryable {
                        return Err(anyhow::anyhow!(
                            "Failed to connect to Bot API after {} retries: {}",
                            startup_retry,
                            e
                        ));
                    }

                    log::warn!(
                        "Bot API not ready (attempt {}/{}): {}. Retrying in 5 seconds...",
                        startup_retry,
                        startup_max_retries,
                        err_str
                    );
                    sleep(Duration::from_secs(5)).await;
                }
            }
        }
    };

    let actual_username = bot_info.username.as_deref().unwrap_or_default();
    log::info!("Bot username: @{}, Bot ID: {}", actual_username, bot_info.id);
    if !actual_username.eq_ignore_ascii_case(config.bot_username()) {
        log::warn!(
            "BOT_USERNAME is @{} but the token belongs to @{}: deep links will point to the configured name",
            config.bot_username(),
            actual_username
        );
    }

    if let Err(e) = setup_bot_commands(&bot).await {
        log::warn!("Failed to set bot commands: {}", e);
    }

    let deps = HandlerDeps::new(store, Arc::new(SessionStore::new()), Arc::clone(&config));
    let handler = schema(deps);

    log::info!("File store bot started successfully!");

    let mut retry_count = 0;
    let max_retries = config::retry::MAX_DISPATCHER_RETRIES;

    // Run the dispatcher with retry logic
    loop {
        let bot_clone = bot.clone();
        let handler_clone = handler.clone();

        // Run the dispatcher in its own task so a panic surfaces through the JoinHandle
        let handle = tokio::spawn(async move {
            use teloxide::update_listeners::Polling;

            // Create polling listener that drops pending updates on start
            let listener = Polling::builder(bot_clone.clone()).drop_pending_updates().build();

            Dispatcher::builder(bot_clone, handler_clone)
                .default_handler(|upd| async move {
                    log::debug!("Unhandled update: {:?}", upd.kind);
                })
                .error_handler(LoggingErrorHandler::with_custom_text(
                    "An error has occurred in the dispatcher",
                ))
                .enable_ctrlc_handler()
                .build()
                .dispatch_with_listener(
                    listener,
                    LoggingErrorHandler::with_custom_text("An error from the update listener"),
                )
                .await
        });

        match handle.await {
            Ok(()) => {
                log::info!("Dispatcher shutdown gracefully");
                break;
            }
            Err(join_err) => {
                if join_err.is_panic() {
                    log::error!("Dispatcher panicked: {}", join_err);

                    if retry_count < max_retries {
                        retry_count += 1;
                        log::info!(
                            "Restarting dispatcher after panic (attempt {}/{})...",
                            retry_count,
                            max_retries
                        );
                        exponential_backoff(retry_count).await;
                    } else {
                        log::error!("Max retries reached after panic. Exiting...");
                        break;
                    }
                } else {
                    log::warn!("Dispatcher task was cancelled: {}", join_err);
                    break;
                }
            }
        }

        // Add a delay between retries to avoid overwhelming the API
        if retry_count > 0 {
            sleep(config::retry::dispatcher_delay()).await;
        }
    }

    Ok(())
}

async fn exponential_backoff(retry_count: u32) {
    let delay = Duration::from_secs(config::retry::EXPONENTIAL_BACKOFF_BASE.pow(retry_count));
    sleep(delay).await;
}
