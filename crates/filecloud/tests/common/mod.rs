//! Common test utilities
//!
//! This module is shared across all integration tests

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use filecloud::core::caption::CaptionSettings;
use filecloud::core::config::Config;
use filecloud::core::error::{AppError, AppResult};
use filecloud::storage::{
    AuthorizedUser, BotStats, FileKind, FileLink, FileWithGroup, Group, LinkTarget, MemoryStore, NewFile, NewUser,
    StoredFile, Store,
};
use filecloud::telegram::sessions::SessionStore;
use filecloud::telegram::HandlerDeps;

/// Admin id configured in [`test_config`]
#[allow(dead_code)]
pub const ADMIN_ID: i64 = 900_000_001;

/// Configuration with fake credentials and one admin.
pub fn test_config() -> Config {
    let vars: HashMap<&str, &str> = HashMap::from([
        ("BOT_TOKEN", "123456:TEST-token"),
        ("BOT_USERNAME", "@filecloud_test_bot"),
        ("STORAGE_CHANNEL_ID", "-1001000000000"),
        ("ADMIN_IDS", "900000001"),
        ("ADMIN_CONTACT", "@filecloud_admin"),
        ("CUSTOM_CAPTION", "t.me/test_channel"),
    ]);
    Config::from_lookup(|key| vars.get(key).map(|v| v.to_string())).expect("test config is valid")
}

/// Handler dependencies backed by a fresh in-memory store.
#[allow(dead_code)]
pub async fn create_test_deps() -> (HandlerDeps, Arc<MemoryStore>) {
    let config = test_config();
    let store = Arc::new(MemoryStore::new());
    store
        .init_schema(&config.admin_ids, &config.custom_caption)
        .await
        .expect("memory schema");
    let deps = HandlerDeps::new(store.clone(), Arc::new(SessionStore::new()), Arc::new(config));
    (deps, store)
}

/// A document as the upload handler would record it.
#[allow(dead_code)]
pub fn new_file(name: &str, size: i64, uploader_id: i64) -> NewFile {
    NewFile {
        unique_id: format!("uid-{}", name),
        file_name: name.to_string(),
        kind: FileKind::Document,
        file_size: size,
        telegram_file_id: format!("tg-{}", name),
        uploader_id,
        uploader_username: Some("tester".to_string()),
        storage_message_id: Some(1),
    }
}

/// `MemoryStore` whose bot settings cannot be read.
#[allow(dead_code)]
pub struct SettingsUnavailableStore(pub Arc<MemoryStore>);

#[allow(dead_code)]
pub async fn create_deps_with_unreadable_settings() -> (HandlerDeps, Arc<MemoryStore>) {
    let (deps, store) = create_test_deps().await;
    let wrapped = Arc::new(SettingsUnavailableStore(store.clone()));
    (HandlerDeps::new(wrapped, deps.sessions, deps.config), store)
}

#[async_trait]
impl Store for SettingsUnavailableStore {
    async fn init_schema(&self, admin_ids: &[i64], default_caption: &str) -> AppResult<()> {
        self.0.init_schema(admin_ids, default_caption).await
    }
    async fn is_authorized(&self, user_id: i64) -> AppResult<bool> {
        self.0.is_authorized(user_id).await
    }
    async fn add_user(&self, user: NewUser) -> AppResult<bool> {
        self.0.add_user(user).await
    }
    async fn remove_user(&self, user_id: i64) -> AppResult<bool> {
        self.0.remove_user(user_id).await
    }
    async fn list_users(&self, exclude: &[i64]) -> AppResult<Vec<AuthorizedUser>> {
        self.0.list_users(exclude).await
    }
    async fn toggle_user_caption(&self, user_id: i64) -> AppResult<Option<bool>> {
        self.0.toggle_user_caption(user_id).await
    }
    async fn is_caption_disabled(&self, user_id: i64) -> AppResult<bool> {
        self.0.is_caption_disabled(user_id).await
    }
    async fn caption_settings(&self) -> AppResult<CaptionSettings> {
        Err(AppError::Validation("settings table unavailable".to_string()))
    }
    async fn set_custom_caption(&self, text: &str) -> AppResult<()> {
        self.0.set_custom_caption(text).await
    }
    async fn set_caption_enabled(&self, enabled: bool) -> AppResult<()> {
        self.0.set_caption_enabled(enabled).await
    }
    async fn get_or_create_group(&self, name: &str, owner_id: i64) -> AppResult<Group> {
        self.0.get_or_create_group(name, owner_id).await
    }
    async fn list_groups(&self, owner_id: i64, limit: i64) -> AppResult<Vec<Group>> {
        self.0.list_groups(owner_id, limit).await
    }
    async fn group_by_id(&self, group_id: i64, owner_id: i64) -> AppResult<Option<Group>> {
        self.0.group_by_id(group_id, owner_id).await
    }
    async fn group_by_name(&self, name: &str, owner_id: i64) -> AppResult<Option<Group>> {
        self.0.group_by_name(name, owner_id).await
    }
    async fn delete_group(&self, group_id: i64, owner_id: i64) -> AppResult<Option<Group>> {
        self.0.delete_group(group_id, owner_id).await
    }
    async fn add_file(&self, group_id: i64, file: NewFile) -> AppResult<StoredFile> {
        self.0.add_file(group_id, file).await
    }
    async fn group_files(&self, group_id: i64, limit: Option<i64>) -> AppResult<Vec<StoredFile>> {
        self.0.group_files(group_id, limit).await
    }
    async fn file_by_id(&self, file_id: i64, owner_id: i64) -> AppResult<Option<FileWithGroup>> {
        self.0.file_by_id(file_id, owner_id).await
    }
    async fn file_by_serial(&self, group_name: &str, serial: i32, owner_id: i64) -> AppResult<Option<FileWithGroup>> {
        self.0.file_by_serial(group_name, serial, owner_id).await
    }
    async fn delete_file(&self, file_id: i64, owner_id: i64) -> AppResult<Option<FileWithGroup>> {
        self.0.delete_file(file_id, owner_id).await
    }
    async fn file_link(&self, file_id: i64, owner_id: i64) -> AppResult<FileLink> {
        self.0.file_link(file_id, owner_id).await
    }
    async fn group_link(&self, group_id: i64, owner_id: i64) -> AppResult<FileLink> {
        self.0.group_link(group_id, owner_id).await
    }
    async fn active_file_link(&self, file_id: i64, owner_id: i64) -> AppResult<Option<FileLink>> {
        self.0.active_file_link(file_id, owner_id).await
    }
    async fn active_group_link(&self, group_id: i64, owner_id: i64) -> AppResult<Option<FileLink>> {
        self.0.active_group_link(group_id, owner_id).await
    }
    async fn resolve_link(&self, code: &str) -> AppResult<Option<LinkTarget>> {
        self.0.resolve_link(code).await
    }
    async fn revoke_link(&self, code: &str, owner_id: i64) -> AppResult<bool> {
        self.0.revoke_link(code, owner_id).await
    }
    async fn stats(&self) -> AppResult<BotStats> {
        self.0.stats().await
    }
}
