//! Telegram bot handler tree configuration
//!
//! This module provides the main dispatcher schema for the Telegram bot.
//! The handlers are organized in a testable way, allowing integration tests
//! to use the same handler tree as production code.

mod admin;
mod callbacks;
mod commands;
mod schema;
mod types;
mod uploads;

pub use admin::{parse_add_user_args, AddUserArgs};
pub use commands::{parse_group_and_serial, SerialArgsError};
pub use schema::schema;
pub use types::{HandlerDeps, HandlerError, HandlerResult};
