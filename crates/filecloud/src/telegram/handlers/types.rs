//! Handler types, dependencies, and access helpers

use std::sync::Arc;

use teloxide::prelude::*;
use teloxide::types::{Message, MessageId, User};

use crate::core::caption::CaptionSettings;
use crate::core::config::Config;
use crate::core::error::AppResult;
use crate::storage::Store;
use crate::telegram::menus::Screen;
use crate::telegram::sessions::SessionStore;

/// Error type for handlers
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type returned by every endpoint
pub type HandlerResult = Result<(), HandlerError>;

/// Dependencies required by handlers
#[derive(Clone)]
pub struct HandlerDeps {
    pub store: Arc<dyn Store>,
    pub sessions: Arc<SessionStore>,
    pub config: Arc<Config>,
}

impl HandlerDeps {
    /// Create new handler dependencies
    pub fn new(store: Arc<dyn Store>, sessions: Arc<SessionStore>, config: Arc<Config>) -> Self {
        Self {
            store,
            sessions,
            config,
        }
    }

    /// Admins are always authorized; everyone else needs an active row in the store.
    ///
    /// Store failures are logged and treated as "not authorized".
    pub async fn is_authorized(&self, user_id: i64) -> bool {
        if self.config.is_admin(user_id) {
            return true;
        }
        match self.store.is_authorized(user_id).await {
            Ok(authorized) => authorized,
            Err(e) => {
                log::error!("Authorization check failed for user {}: {}", user_id, e);
                false
            }
        }
    }

    pub fn is_admin(&self, user_id: i64) -> bool {
        self.config.is_admin(user_id)
    }

    /// Whether files uploaded by `uploader_id` go out without the branding line.
    ///
    /// Admins never have it disabled. Store failures are logged and treated as "enabled".
    pub async fn uploader_caption_disabled(&self, uploader_id: i64) -> bool {
        if self.is_admin(uploader_id) {
            return false;
        }
        self.store.is_caption_disabled(uploader_id).await.unwrap_or_else(|e| {
            log::warn!("Failed to read caption preference for user {}: {}", uploader_id, e);
            false
        })
    }

    /// Caption settings from the store, or the configured branding when they cannot be read.
    pub async fn caption_settings_or_default(&self) -> CaptionSettings {
        self.store.caption_settings().await.unwrap_or_else(|e| {
            log::warn!("Failed to load caption settings, using configured defaults: {}", e);
            CaptionSettings {
                enabled: true,
                text: self.config.custom_caption.clone(),
            }
        })
    }

    /// Flips the per-user caption switch. Returns the new `caption_disabled`
    /// value, or `None` for admins and unknown users.
    pub async fn toggle_user_caption(&self, target: i64) -> AppResult<Option<bool>> {
        if self.is_admin(target) {
            log::warn!("Refusing to toggle caption for admin {}", target);
            return Ok(None);
        }
        self.store.toggle_user_caption(target).await
    }

    /// Deep link for a link code.
    pub fn deep_link(&self, code: &str) -> String {
        crate::core::links::deep_link(self.config.bot_username(), code)
    }

    /// `Unauthorized. Contact admin: ...` reply text.
    pub fn unauthorized_text(&self) -> String {
        format!("Unauthorized. Contact admin: {} 🚫", self.config.admin_contact_display())
    }
}

/// Telegram user id as the signed integer used in the database.
pub fn user_id_of(user: &User) -> i64 {
    i64::try_from(user.id.0).unwrap_or(0)
}

/// Sender of a message; falls back to the chat id for anonymous senders.
pub fn sender_id(msg: &Message) -> i64 {
    msg.from.as_ref().map(user_id_of).unwrap_or(msg.chat.id.0)
}

pub fn sender_username(msg: &Message) -> Option<String> {
    msg.from.as_ref().and_then(|u| u.username.clone())
}

pub fn sender_first_name(msg: &Message) -> String {
    msg.from
        .as_ref()
        .map(|u| u.first_name.clone())
        .unwrap_or_else(|| "there".to_string())
}

pub async fn send_screen(bot: &Bot, chat_id: ChatId, screen: Screen) -> ResponseResult<Message> {
    bot.send_message(chat_id, screen.text)
        .reply_markup(screen.keyboard)
        .await
}

/// Replaces the text and keyboard of a message the bot sent earlier.
pub async fn edit_screen(bot: &Bot, chat_id: ChatId, message_id: MessageId, screen: Screen) -> ResponseResult<()> {
    bot.edit_message_text(chat_id, message_id, screen.text)
        .reply_markup(screen.keyboard)
        .await?;
    Ok(())
}

/// Sends `text` and logs instead of failing when Telegram rejects it.
pub async fn reply(bot: &Bot, chat_id: ChatId, text: impl Into<String>) {
    if let Err(e) = bot.send_message(chat_id, text.into()).await {
        log::error!("Failed to send message to chat {}: {}", chat_id, e);
    }
}
