//! Telegram side of the bot: commands, uploads, link delivery and menus

pub mod bot;
pub mod callback_data;
pub mod delivery;
pub mod handlers;
pub mod media;
pub mod menus;
pub mod sessions;

pub use bot::{create_bot, setup_bot_commands, Command};
pub use handlers::{schema, HandlerDeps, HandlerError};
