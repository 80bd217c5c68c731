//! Persistence for users, groups, files, share links and bot settings
//!
//! Handlers talk to the [`Store`] trait. [`PgStore`] backs it with Postgres
//! (Supabase in production); [`MemoryStore`] keeps everything in process for
//! tests and `run --in-memory`.

pub mod memory;
pub mod models;
pub mod postgres;
pub mod schema;

use async_trait::async_trait;

use crate::core::caption::CaptionSettings;
use crate::core::error::AppResult;

pub use memory::MemoryStore;
pub use models::{
    AuthorizedUser, BotStats, FileKind, FileLink, FileWithGroup, Group, LinkTarget, LinkType, NewFile, NewUser,
    StoredFile,
};
pub use postgres::PgStore;

/// Settings keys in `bot_settings`
pub mod settings_keys {
    pub const CAPTION_ENABLED: &str = "caption_enabled";
    pub const CUSTOM_CAPTION: &str = "custom_caption";
}

/// Storage operations used by the bot.
///
/// Every query that touches groups, files or links is scoped by `owner_id`:
/// users only ever see and modify what they uploaded themselves.
#[async_trait]
pub trait Store: Send + Sync {
    /// Creates missing tables and seeds default settings and admin users.
    async fn init_schema(&self, admin_ids: &[i64], default_caption: &str) -> AppResult<()>;

    // ---- users ----

    /// True when the user has an active row in `authorized_users`.
    async fn is_authorized(&self, user_id: i64) -> AppResult<bool>;

    /// Adds a user. Returns `false` when the user already exists.
    async fn add_user(&self, user: NewUser) -> AppResult<bool>;

    /// Returns `false` when there was nothing to remove.
    async fn remove_user(&self, user_id: i64) -> AppResult<bool>;

    /// All users except `exclude`, newest first.
    async fn list_users(&self, exclude: &[i64]) -> AppResult<Vec<AuthorizedUser>>;

    /// Flips the per-user caption switch. Returns the new `caption_disabled` value.
    async fn toggle_user_caption(&self, user_id: i64) -> AppResult<Option<bool>>;

    async fn is_caption_disabled(&self, user_id: i64) -> AppResult<bool>;

    // ---- settings ----

    async fn caption_settings(&self) -> AppResult<CaptionSettings>;

    async fn set_custom_caption(&self, text: &str) -> AppResult<()>;

    async fn set_caption_enabled(&self, enabled: bool) -> AppResult<()>;

    // ---- groups ----

    async fn get_or_create_group(&self, name: &str, owner_id: i64) -> AppResult<Group>;

    /// Most recently created groups first.
    async fn list_groups(&self, owner_id: i64, limit: i64) -> AppResult<Vec<Group>>;

    async fn group_by_id(&self, group_id: i64, owner_id: i64) -> AppResult<Option<Group>>;

    async fn group_by_name(&self, name: &str, owner_id: i64) -> AppResult<Option<Group>>;

    /// Deletes the group with its files and links. Returns the deleted group.
    async fn delete_group(&self, group_id: i64, owner_id: i64) -> AppResult<Option<Group>>;

    // ---- files ----

    /// Stores a file under the next serial number and updates group totals.
    async fn add_file(&self, group_id: i64, file: NewFile) -> AppResult<StoredFile>;

    /// Files ordered by serial number.
    async fn group_files(&self, group_id: i64, limit: Option<i64>) -> AppResult<Vec<StoredFile>>;

    async fn file_by_id(&self, file_id: i64, owner_id: i64) -> AppResult<Option<FileWithGroup>>;

    async fn file_by_serial(&self, group_name: &str, serial: i32, owner_id: i64) -> AppResult<Option<FileWithGroup>>;

    /// Deletes a file and its links and updates group totals. Returns the deleted file.
    async fn delete_file(&self, file_id: i64, owner_id: i64) -> AppResult<Option<FileWithGroup>>;

    // ---- links ----

    /// Active link for a file, created on first request.
    async fn file_link(&self, file_id: i64, owner_id: i64) -> AppResult<FileLink>;

    /// Active link for a group, created on first request.
    async fn group_link(&self, group_id: i64, owner_id: i64) -> AppResult<FileLink>;

    async fn active_file_link(&self, file_id: i64, owner_id: i64) -> AppResult<Option<FileLink>>;

    async fn active_group_link(&self, group_id: i64, owner_id: i64) -> AppResult<Option<FileLink>>;

    /// Looks up an active link, counts the click and returns what it points at.
    /// Revoked and unknown codes resolve to `None`.
    async fn resolve_link(&self, code: &str) -> AppResult<Option<LinkTarget>>;

    /// Deactivates a link owned by `owner_id`. Returns `false` when nothing matched.
    async fn revoke_link(&self, code: &str, owner_id: i64) -> AppResult<bool>;

    // ---- stats ----

    async fn stats(&self) -> AppResult<BotStats>;
}
