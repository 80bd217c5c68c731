/// Formats a byte count for display.
///
/// Uses 1024-based units with one decimal place. Values under 1 KB are shown
/// as whole bytes.
///
/// # Example
///
/// ```
/// use filecloud::core::utils::format_size;
///
/// assert_eq!(format_size(512), "512 B");
/// assert_eq!(format_size(1536), "1.5 KB");
/// assert_eq!(format_size(10 * 1024 * 1024 * 1024), "10.0 GB");
/// ```
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 3] = ["KB", "MB", "GB"];

    if bytes < 1024 {
        return format!("{} B", bytes);
    }

    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}

/// Same as [`format_size`] for sizes read from signed database columns.
pub fn format_db_size(bytes: i64) -> String {
    format_size(u64::try_from(bytes).unwrap_or(0))
}

/// Cuts a string to at most `max_chars` characters.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// Splits a long message into chunks of at most `max_chars` characters.
///
/// Prefers breaking on a newline inside the chunk so entries are not torn in half.
///
/// # Example
///
/// ```
/// use filecloud::core::utils::split_message;
///
/// assert_eq!(split_message("short", 4000), vec!["short".to_string()]);
/// assert_eq!(split_message("aaaa\nbbbb", 6), vec!["aaaa\n".to_string(), "bbbb".to_string()]);
/// ```
pub fn split_message(text: &str, max_chars: usize) -> Vec<String> {
    if max_chars == 0 {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut rest: Vec<char> = text.chars().collect();

    while rest.len() > max_chars {
        let window = &rest[..max_chars];
        let cut = window
            .iter()
            .rposition(|c| *c == '\n')
            .map(|pos| pos + 1)
            .unwrap_or(max_chars);
        chunks.push(rest[..cut].iter().collect());
        rest.drain(..cut);
    }

    if !rest.is_empty() || chunks.is_empty() {
        chunks.push(rest.into_iter().collect());
    }
    chunks
}

/// `#007`-style serial number label.
pub fn serial_label(serial: i32) -> String {
    format!("#{:03}", serial)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_format_size_thresholds() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(1023), "1023 B");
        assert_eq!(format_size(1024), "1.0 KB");
        assert_eq!(format_size(1024 * 1024 - 1), "1024.0 KB");
        assert_eq!(format_size(1024 * 1024), "1.0 MB");
        assert_eq!(format_size(5 * 1024 * 1024 + 512 * 1024), "5.5 MB");
        assert_eq!(format_size(1024 * 1024 * 1024), "1.0 GB");
        assert_eq!(format_size(3 * 1024 * 1024 * 1024 * 1024), "3072.0 GB");
    }

    #[test]
    fn test_format_db_size_negative_is_zero() {
        assert_eq!(format_db_size(-5), "0 B");
        assert_eq!(format_db_size(2048), "2.0 KB");
    }

    #[test]
    fn test_truncate_chars_is_char_aware() {
        assert_eq!(truncate_chars("привет мир", 6), "привет");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }

    #[test]
    fn test_split_message_hard_cut_without_newlines() {
        let chunks = split_message(&"x".repeat(9000), 4000);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].chars().count(), 4000);
        assert_eq!(chunks[2].chars().count(), 1000);
        assert_eq!(chunks.concat(), "x".repeat(9000));
    }

    #[test]
    fn test_split_message_keeps_everything() {
        let text = (0..500).map(|i| format!("user {}\n", i)).collect::<String>();
        let chunks = split_message(&text, 100);
        assert!(chunks.iter().all(|c| c.chars().count() <= 100));
        assert!(chunks.iter().all(|c| c.ends_with('\n')));
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn test_split_message_empty() {
        assert_eq!(split_message("", 10), vec![String::new()]);
    }

    #[test]
    fn test_serial_label_padding() {
        assert_eq!(serial_label(1), "#001");
        assert_eq!(serial_label(42), "#042");
        assert_eq!(serial_label(1234), "#1234");
    }
}
