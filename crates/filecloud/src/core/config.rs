use once_cell::sync::Lazy;
use std::env;
use std::fmt;
use std::time::Duration;

use crate::core::error::{AppError, AppResult};

/// Log file path
/// Read from LOG_FILE_PATH environment variable
/// Default: bot.log
pub static LOG_FILE_PATH: Lazy<String> =
    Lazy::new(|| env::var("LOG_FILE_PATH").unwrap_or_else(|_| "bot.log".to_string()));

/// Branding line appended to captions when CUSTOM_CAPTION is not set
pub const DEFAULT_CAPTION: &str = "t.me/movieandwebserieshub";

/// Health-check port used when PORT is not set
pub const DEFAULT_PORT: u16 = 8000;

/// Upload limits
pub mod limits {
    use super::Duration;

    /// Largest file accepted for storage (10 GiB)
    pub const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024 * 1024;

    /// Pause between files while committing a bulk session
    pub const BULK_UPLOAD_DELAY: Duration = Duration::from_millis(1500);
}

/// Link delivery timings
pub mod delivery {
    use super::Duration;

    /// Delivered messages are removed from the recipient's chat after this long
    pub const AUTO_DELETE_AFTER: Duration = Duration::from_secs(600);

    /// Pacing between files when a whole group is sent
    pub const GROUP_SEND_DELAY: Duration = Duration::from_millis(100);

    /// How many failed file names a group delivery summary lists
    pub const FAILED_FILES_SHOWN: usize = 5;
}

/// Message layout limits
pub mod ui {
    /// Long texts are split into chunks of at most this many characters
    pub const MESSAGE_CHUNK_CHARS: usize = 4000;

    /// Telegram caption limit
    pub const CAPTION_MAX_CHARS: usize = 1024;

    /// `/groups` shows this many most recent groups
    pub const GROUPS_LIST_LIMIT: i64 = 20;

    /// Group details preview this many files
    pub const GROUP_PREVIEW_FILES: i64 = 10;

    /// Button labels are cut to this many characters
    pub const BUTTON_LABEL_CHARS: usize = 25;
}

/// Retry configuration
pub mod retry {
    use super::Duration;

    /// Maximum dispatcher restarts after a panic
    pub const MAX_DISPATCHER_RETRIES: u32 = 5;

    /// Attempts to reach the Bot API at startup
    pub const STARTUP_MAX_RETRIES: u32 = 12;

    /// Attempts to draw a link code that is not taken yet
    pub const LINK_CODE_ATTEMPTS: u32 = 5;

    /// Base of the exponential backoff between dispatcher restarts, in seconds
    pub const EXPONENTIAL_BACKOFF_BASE: u64 = 2;

    /// Delay between dispatcher restarts
    pub fn dispatcher_delay() -> Duration {
        Duration::from_secs(5)
    }
}

/// Network configuration
pub mod network {
    use super::Duration;

    /// HTTP client timeout for Bot API requests
    pub fn timeout() -> Duration {
        Duration::from_secs(120)
    }
}

fn parse_admin_ids(raw: &str) -> Vec<i64> {
    raw.split([',', ' ', '\n', '\t'])
        .filter_map(|part| part.trim().parse::<i64>().ok())
        .collect()
}

/// A bot token looks like `123456789:AAH...`
fn is_valid_token(token: &str) -> bool {
    match token.split_once(':') {
        Some((id, secret)) => !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit()) && !secret.is_empty(),
        None => false,
    }
}

/// Validated bot configuration.
///
/// Built once in `main` and shared with handlers behind an `Arc`.
#[derive(Clone)]
pub struct Config {
    pub bot_token: String,
    pub bot_username: String,
    pub storage_channel_id: i64,
    pub admin_ids: Vec<i64>,
    pub admin_contact: String,
    pub custom_caption: String,
    /// `SUPABASE_URL`, falling back to `DATABASE_URL`. Optional for in-memory runs.
    pub database_url: Option<String>,
    pub port: u16,
}

impl Config {
    /// Reads and validates configuration from process environment variables.
    pub fn from_env() -> AppResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Reads configuration through an arbitrary key lookup.
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let bot_token = get("BOT_TOKEN").ok_or_else(|| AppError::Config("BOT_TOKEN is not set".into()))?;
        if !is_valid_token(&bot_token) {
            return Err(AppError::Config("BOT_TOKEN has an invalid format".into()));
        }

        let bot_username = get("BOT_USERNAME").ok_or_else(|| AppError::Config("BOT_USERNAME is not set".into()))?;

        let storage_channel_id = get("STORAGE_CHANNEL_ID")
            .ok_or_else(|| AppError::Config("STORAGE_CHANNEL_ID is not set".into()))?
            .parse::<i64>()
            .map_err(|e| AppError::Config(format!("STORAGE_CHANNEL_ID is not a number: {}", e)))?;
        if storage_channel_id >= 0 {
            return Err(AppError::Config(format!(
                "STORAGE_CHANNEL_ID must be negative (channel ids look like -100...), got {}",
                storage_channel_id
            )));
        }

        let database_url = get("SUPABASE_URL").or_else(|| get("DATABASE_URL"));

        let port = match get("PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .map_err(|e| AppError::Config(format!("PORT is not a valid port: {}", e)))?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            bot_token,
            bot_username,
            storage_channel_id,
            admin_ids: get("ADMIN_IDS").map(|raw| parse_admin_ids(&raw)).unwrap_or_default(),
            admin_contact: get("ADMIN_CONTACT").unwrap_or_default(),
            custom_caption: get("CUSTOM_CAPTION").unwrap_or_else(|| DEFAULT_CAPTION.to_string()),
            database_url,
            port,
        })
    }

    /// Non-fatal configuration problems worth logging at startup.
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.admin_ids.is_empty() {
            warnings.push("ADMIN_IDS is empty: nobody can manage users".to_string());
        }
        if self.admin_contact.is_empty() {
            warnings.push("ADMIN_CONTACT is not set: denied users get no contact button".to_string());
        }
        warnings
    }

    /// Connection string for the Postgres store.
    pub fn database_url(&self) -> AppResult<&str> {
        self.database_url
            .as_deref()
            .ok_or_else(|| AppError::Config("SUPABASE_URL is not set".into()))
    }

    pub fn is_admin(&self, user_id: i64) -> bool {
        self.admin_ids.contains(&user_id)
    }

    /// Bot username without the leading `@`.
    pub fn bot_username(&self) -> &str {
        self.bot_username.trim_start_matches('@')
    }

    /// Contact shown to users, `Not configured` when unset.
    pub fn admin_contact_display(&self) -> &str {
        if self.admin_contact.is_empty() {
            "Not configured"
        } else {
            &self.admin_contact
        }
    }

    /// `https://t.me/<contact>` for the Contact Admin button.
    pub fn admin_contact_url(&self) -> Option<url::Url> {
        let handle = self.admin_contact.trim_start_matches('@');
        if handle.is_empty() {
            return None;
        }
        url::Url::parse(&format!("https://t.me/{}", handle)).ok()
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("bot_token", &"<redacted>")
            .field("bot_username", &self.bot_username)
            .field("storage_channel_id", &self.storage_channel_id)
            .field("admin_ids", &self.admin_ids)
            .field("admin_contact", &self.admin_contact)
            .field("custom_caption", &self.custom_caption)
            .field("database_url", &"<redacted>")
            .field("port", &self.port)
            .finish()
    }
}
