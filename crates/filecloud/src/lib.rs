//! filecloud - Telegram bot that keeps files in a private channel and shares them through deep links
//!
//! # Module Structure
//!
//! - `core`: Configuration, errors, logging, link codes, captions and the health server
//! - `storage`: The `Store` trait with Postgres and in-memory implementations
//! - `telegram`: Commands, uploads, link delivery, inline menus and the dispatcher schema

pub mod cli;
pub mod core;
pub mod storage;
pub mod telegram;

// Re-export commonly used types for convenience
pub use core::{config, AppError, AppResult};
pub use storage::{MemoryStore, PgStore, Store};
pub use telegram::{schema, HandlerDeps};
