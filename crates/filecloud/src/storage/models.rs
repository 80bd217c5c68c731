//! Row types shared by every `Store` implementation

use chrono::{DateTime, Utc};
use serde::Serialize;
use strum::{AsRefStr, Display, EnumString};

/// Kind of media a stored file was uploaded as. Persisted in `files.file_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    Document,
    Photo,
    Video,
    Audio,
    Voice,
    VideoNote,
}

impl FileKind {
    pub fn emoji(self) -> &'static str {
        match self {
            FileKind::Document => "📄",
            FileKind::Photo => "📸",
            FileKind::Video => "🎬",
            FileKind::Audio => "🎵",
            FileKind::Voice => "🎤",
            FileKind::VideoNote => "⭕",
        }
    }

    /// Video notes cannot carry a caption.
    pub fn supports_caption(self) -> bool {
        !matches!(self, FileKind::VideoNote)
    }
}

/// What a share link points at. Persisted in `file_links.link_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum LinkType {
    File,
    Group,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AuthorizedUser {
    pub user_id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub added_by: i64,
    pub added_at: DateTime<Utc>,
    pub is_active: bool,
    pub caption_disabled: bool,
}

/// Input for `Store::add_user`.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub user_id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub added_by: i64,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Group {
    pub id: i64,
    pub name: String,
    pub owner_id: i64,
    pub created_at: DateTime<Utc>,
    pub total_files: i32,
    pub total_size: i64,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StoredFile {
    pub id: i64,
    pub group_id: i64,
    pub serial_number: i32,
    pub unique_id: String,
    pub file_name: String,
    pub file_type: String,
    pub file_size: i64,
    pub telegram_file_id: String,
    pub uploader_id: i64,
    pub uploader_username: Option<String>,
    pub uploaded_at: DateTime<Utc>,
    pub storage_message_id: Option<i64>,
}

impl StoredFile {
    /// Unknown kinds fall back to `Document`, which Telegram accepts for any file id.
    pub fn kind(&self) -> FileKind {
        self.file_type.parse().unwrap_or(FileKind::Document)
    }
}

/// A file together with the name of its group.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FileWithGroup {
    #[sqlx(flatten)]
    pub file: StoredFile,
    pub group_name: String,
}

/// Input for `Store::add_file`. Serial number and timestamps are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewFile {
    pub unique_id: String,
    pub file_name: String,
    pub kind: FileKind,
    pub file_size: i64,
    pub telegram_file_id: String,
    pub uploader_id: i64,
    pub uploader_username: Option<String>,
    pub storage_message_id: Option<i64>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FileLink {
    pub id: i64,
    pub link_code: String,
    pub file_id: Option<i64>,
    pub group_id: Option<i64>,
    pub link_type: String,
    pub owner_id: i64,
    pub created_at: DateTime<Utc>,
    pub clicks: i64,
    pub is_active: bool,
}

impl FileLink {
    pub fn link_type(&self) -> Option<LinkType> {
        self.link_type.parse().ok()
    }
}

/// Resolved destination of an active share link.
#[derive(Debug, Clone)]
pub enum LinkTarget {
    File(StoredFile),
    Group { group: Group, files: Vec<StoredFile> },
}

/// Aggregate numbers for the admin statistics view.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BotStats {
    pub total_users: i64,
    pub active_users: i64,
    pub caption_disabled_users: i64,
    pub total_groups: i64,
    pub total_files: i64,
    pub total_size: i64,
    pub active_links: i64,
    pub total_links: i64,
    pub total_clicks: i64,
    pub files_by_type: Vec<(String, i64)>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_kind_round_trips_through_column_text() {
        assert_eq!(FileKind::VideoNote.to_string(), "video_note");
        assert_eq!("photo".parse::<FileKind>().unwrap(), FileKind::Photo);
        assert!("sticker".parse::<FileKind>().is_err());
    }

    #[test]
    fn test_unknown_stored_kind_falls_back_to_document() {
        let file = StoredFile {
            id: 1,
            group_id: 1,
            serial_number: 1,
            unique_id: "u".into(),
            file_name: "f".into(),
            file_type: "sticker".into(),
            file_size: 0,
            telegram_file_id: "t".into(),
            uploader_id: 1,
            uploader_username: None,
            uploaded_at: Utc::now(),
            storage_message_id: None,
        };
        assert_eq!(file.kind(), FileKind::Document);
    }

    #[test]
    fn test_video_note_has_no_caption() {
        assert!(!FileKind::VideoNote.supports_caption());
        assert!(FileKind::Document.supports_caption());
    }

    #[test]
    fn test_link_type_text() {
        assert_eq!(LinkType::Group.as_ref(), "group");
        assert_eq!("file".parse::<LinkType>().unwrap(), LinkType::File);
    }
}
