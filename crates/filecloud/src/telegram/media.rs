//! Extracting uploadable media from messages and sending stored files back

use teloxide::prelude::*;
use teloxide::types::{FileId, InputFile, Message};

use crate::core::config::limits::MAX_FILE_SIZE;
use crate::storage::FileKind;

/// File attached to an incoming message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingFile {
    pub file_id: String,
    pub unique_id: String,
    pub kind: FileKind,
    pub file_name: String,
    pub size: u64,
}

fn short_id(unique_id: &str) -> String {
    unique_id.chars().take(8).collect()
}

fn default_name(kind: FileKind, unique_id: &str) -> String {
    let id = short_id(unique_id);
    match kind {
        FileKind::Document => "document".to_string(),
        FileKind::Photo => format!("photo_{}.jpg", id),
        FileKind::Video => format!("video_{}.mp4", id),
        FileKind::Audio => format!("audio_{}.mp3", id),
        FileKind::Voice => format!("voice_{}.ogg", id),
        FileKind::VideoNote => format!("videonote_{}.mp4", id),
    }
}

impl IncomingFile {
    fn new(kind: FileKind, file_id: &FileId, unique_id: &str, size: u32, name: Option<&str>) -> Self {
        let file_name = name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| default_name(kind, unique_id));
        Self {
            file_id: file_id.0.clone(),
            unique_id: unique_id.to_string(),
            kind,
            file_name,
            size: u64::from(size),
        }
    }

    /// Returns the media attached to `msg`, if it is one of the supported kinds.
    ///
    /// Photos resolve to their largest available size.
    pub fn from_message(msg: &Message) -> Option<Self> {
        if let Some(doc) = msg.document() {
            return Some(Self::new(
                FileKind::Document,
                &doc.file.id,
                &doc.file.unique_id.0,
                doc.file.size,
                doc.file_name.as_deref(),
            ));
        }
        if let Some(photo) = msg.photo().and_then(|sizes| sizes.iter().max_by_key(|p| p.width * p.height)) {
            return Some(Self::new(
                FileKind::Photo,
                &photo.file.id,
                &photo.file.unique_id.0,
                photo.file.size,
                None,
            ));
        }
        if let Some(video) = msg.video() {
            return Some(Self::new(
                FileKind::Video,
                &video.file.id,
                &video.file.unique_id.0,
                video.file.size,
                video.file_name.as_deref(),
            ));
        }
        if let Some(audio) = msg.audio() {
            return Some(Self::new(
                FileKind::Audio,
                &audio.file.id,
                &audio.file.unique_id.0,
                audio.file.size,
                audio.file_name.as_deref(),
            ));
        }
        if let Some(voice) = msg.voice() {
            return Some(Self::new(
                FileKind::Voice,
                &voice.file.id,
                &voice.file.unique_id.0,
                voice.file.size,
                None,
            ));
        }
        if let Some(note) = msg.video_note() {
            return Some(Self::new(
                FileKind::VideoNote,
                &note.file.id,
                &note.file.unique_id.0,
                note.file.size,
                None,
            ));
        }
        None
    }

    pub fn exceeds_limit(&self) -> bool {
        self.size > MAX_FILE_SIZE
    }
}

/// Sends a stored file by its Telegram file id using the method matching its kind.
///
/// Video notes are sent without a caption.
pub async fn send_stored_file(
    bot: &Bot,
    chat_id: ChatId,
    kind: FileKind,
    telegram_file_id: &str,
    caption: &str,
) -> ResponseResult<Message> {
    let input = InputFile::file_id(FileId(telegram_file_id.to_string()));
    match kind {
        FileKind::Photo => bot.send_photo(chat_id, input).caption(caption).await,
        FileKind::Video => bot.send_video(chat_id, input).caption(caption).await,
        FileKind::Audio => bot.send_audio(chat_id, input).caption(caption).await,
        FileKind::Voice => bot.send_voice(chat_id, input).caption(caption).await,
        FileKind::VideoNote => bot.send_video_note(chat_id, input).await,
        FileKind::Document => bot.send_document(chat_id, input).caption(caption).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_names_per_kind() {
        assert_eq!(default_name(FileKind::Photo, "AQADabcdefgh"), "photo_AQADabcd.jpg");
        assert_eq!(default_name(FileKind::Voice, "xyz"), "voice_xyz.ogg");
        assert_eq!(default_name(FileKind::VideoNote, "12345678901"), "videonote_12345678.mp4");
        assert_eq!(default_name(FileKind::Document, "AQADabcdefgh"), "document");
    }

    #[test]
    fn test_blank_names_fall_back() {
        let file = IncomingFile::new(FileKind::Video, &FileId("fid".into()), "uniq0001", 10, Some("   "));
        assert_eq!(file.file_name, "video_uniq0001.mp4");

        let file = IncomingFile::new(FileKind::Document, &FileId("fid".into()), "u", 10, Some("report.pdf"));
        assert_eq!(file.file_name, "report.pdf");
        assert_eq!(file.file_id, "fid");
    }

    #[test]
    fn test_size_limit() {
        let mut file = IncomingFile::new(FileKind::Document, &FileId("f".into()), "u", u32::MAX, None);
        assert!(!file.exceeds_limit());
        file.size = MAX_FILE_SIZE + 1;
        assert!(file.exceeds_limit());
    }
}
