//! Share link codes and bot deep links.
//!
//! A link code is 12 URL-safe base64 characters taken from a random UUID,
//! which gives 72 bits of randomness. Telegram accepts `[A-Za-z0-9_-]{1,64}`
//! as a `/start` payload, so codes can be embedded directly.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use std::future::Future;

use crate::core::config::retry::LINK_CODE_ATTEMPTS;
use crate::core::error::{AppError, AppResult};

/// Length of every generated code
pub const LINK_CODE_LEN: usize = 12;

/// Generates a fresh random link code.
pub fn generate_link_code() -> String {
    let encoded = URL_SAFE_NO_PAD.encode(uuid::Uuid::new_v4().as_bytes());
    encoded[..LINK_CODE_LEN].to_string()
}

/// True when `code` could have been produced by [`generate_link_code`]
/// or is otherwise a legal `/start` payload.
pub fn is_valid_code(code: &str) -> bool {
    !code.is_empty() && code.len() <= 64 && code.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

/// Builds `https://t.me/<bot>?start=<code>`.
///
/// # Example
///
/// ```
/// use filecloud::core::links::deep_link;
///
/// assert_eq!(deep_link("@files_bot", "abc123"), "https://t.me/files_bot?start=abc123");
/// ```
pub fn deep_link(bot_username: &str, code: &str) -> String {
    format!("https://t.me/{}?start={}", bot_username.trim_start_matches('@'), code)
}

/// Same as [`deep_link`], parsed for use in URL buttons.
pub fn deep_link_url(bot_username: &str, code: &str) -> Option<url::Url> {
    url::Url::parse(&deep_link(bot_username, code)).ok()
}

/// Runs `insert` with fresh codes until one is accepted.
///
/// `insert` returns `Ok(None)` when the code is already taken. Gives up with
/// [`AppError::LinkCodeExhausted`] after `LINK_CODE_ATTEMPTS` collisions.
pub async fn with_fresh_code<T, G, F, Fut>(mut next_code: G, mut insert: F) -> AppResult<T>
where
    G: FnMut() -> String,
    F: FnMut(String) -> Fut,
    Fut: Future<Output = AppResult<Option<T>>>,
{
    for attempt in 1..=LINK_CODE_ATTEMPTS {
        let code = next_code();
        match insert(code.clone()).await? {
            Some(value) => return Ok(value),
            None => log::warn!(
                "Link code {} already taken (attempt {}/{})",
                code,
                attempt,
                LINK_CODE_ATTEMPTS
            ),
        }
    }
    Err(AppError::LinkCodeExhausted(LINK_CODE_ATTEMPTS))
}
