//! Caption rendering for delivered files

use crate::core::config::ui::CAPTION_MAX_CHARS;
use crate::core::utils::{serial_label, truncate_chars};

/// Global caption settings stored in `bot_settings`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptionSettings {
    pub enabled: bool,
    pub text: String,
}

/// Renders the caption attached to a delivered file.
///
/// The branding line is dropped when captions are disabled globally or for the
/// uploader. Group deliveries prefix the file name with its serial number.
pub fn render_caption(
    file_name: &str,
    serial: Option<i32>,
    settings: &CaptionSettings,
    uploader_caption_disabled: bool,
) -> String {
    let title = match serial {
        Some(serial) => format!("{} {}", serial_label(serial), file_name),
        None => file_name.to_string(),
    };

    let caption = if uploader_caption_disabled || !settings.enabled || settings.text.trim().is_empty() {
        title
    } else {
        format!("{}\n\n{}", title, settings.text)
    };

    truncate_chars(&caption, CAPTION_MAX_CHARS)
}
