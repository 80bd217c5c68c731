//! Configuration, errors, logging and small shared helpers

pub mod caption;
pub mod config;
pub mod error;
pub mod health_server;
pub mod links;
pub mod logging;
pub mod utils;

pub use error::{AppError, AppResult};
pub use logging::init_logger;
