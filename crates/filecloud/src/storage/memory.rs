//! In-process [`Store`] used by tests and `run --in-memory`
//!
//! Mirrors the Postgres semantics: owner scoping, per-group serial numbers,
//! cascading deletes and get-or-create links. Nothing survives a restart.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use super::settings_keys::{CAPTION_ENABLED, CUSTOM_CAPTION};
use super::{
    AuthorizedUser, BotStats, FileLink, FileWithGroup, Group, LinkTarget, LinkType, NewFile, NewUser, Store,
    StoredFile,
};
use crate::core::caption::CaptionSettings;
use crate::core::config::DEFAULT_CAPTION;
use crate::core::error::{AppError, AppResult};
use crate::core::links::{generate_link_code, with_fresh_code};

#[derive(Default)]
struct MemoryState {
    users: BTreeMap<i64, AuthorizedUser>,
    groups: BTreeMap<i64, Group>,
    files: BTreeMap<i64, StoredFile>,
    links: BTreeMap<i64, FileLink>,
    settings: HashMap<String, String>,
    next_id: i64,
}

impl MemoryState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn owned_group(&self, group_id: i64, owner_id: i64) -> Option<&Group> {
        self.groups.get(&group_id).filter(|g| g.owner_id == owner_id)
    }

    fn owned_file(&self, file_id: i64, owner_id: i64) -> Option<FileWithGroup> {
        let file = self.files.get(&file_id)?;
        let group = self.owned_group(file.group_id, owner_id)?;
        Some(FileWithGroup {
            file: file.clone(),
            group_name: group.name.clone(),
        })
    }

    fn files_of(&self, group_id: i64) -> Vec<StoredFile> {
        let mut files: Vec<StoredFile> = self.files.values().filter(|f| f.group_id == group_id).cloned().collect();
        files.sort_by_key(|f| f.serial_number);
        files
    }

    fn active_link(&self, link_type: LinkType, target_id: i64, owner_id: i64) -> Option<FileLink> {
        self.links
            .values()
            .find(|l| {
                l.is_active
                    && l.owner_id == owner_id
                    && l.link_type() == Some(link_type)
                    && match link_type {
                        LinkType::File => l.file_id == Some(target_id),
                        LinkType::Group => l.group_id == Some(target_id),
                    }
            })
            .cloned()
    }
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn try_insert_link(
        &self,
        code: String,
        link_type: LinkType,
        target_id: i64,
        owner_id: i64,
    ) -> AppResult<Option<FileLink>> {
        let mut state = self.lock();

        if let Some(existing) = state.active_link(link_type, target_id, owner_id) {
            return Ok(Some(existing));
        }
        if state.links.values().any(|l| l.link_code == code) {
            return Ok(None);
        }

        let (file_id, group_id) = match link_type {
            LinkType::File => {
                if !state.files.contains_key(&target_id) {
                    return Err(AppError::Validation(format!("file {} does not exist", target_id)));
                }
                (Some(target_id), None)
            }
            LinkType::Group => {
                if !state.groups.contains_key(&target_id) {
                    return Err(AppError::Validation(format!("group {} does not exist", target_id)));
                }
                (None, Some(target_id))
            }
        };

        let link = FileLink {
            id: state.next_id(),
            link_code: code,
            file_id,
            group_id,
            link_type: link_type.to_string(),
            owner_id,
            created_at: Utc::now(),
            clicks: 0,
            is_active: true,
        };
        state.links.insert(link.id, link.clone());
        Ok(Some(link))
    }

    async fn get_or_create_link(&self, link_type: LinkType, target_id: i64, owner_id: i64) -> AppResult<FileLink> {
        with_fresh_code(generate_link_code, |code| {
            let inserted = self.try_insert_link(code, link_type, target_id, owner_id);
            async move { inserted }
        })
        .await
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn init_schema(&self, admin_ids: &[i64], default_caption: &str) -> AppResult<()> {
        let mut state = self.lock();
        state
            .settings
            .entry(CAPTION_ENABLED.to_string())
            .or_insert_with(|| "1".to_string());
        state
            .settings
            .entry(CUSTOM_CAPTION.to_string())
            .or_insert_with(|| default_caption.to_string());

        for &admin_id in admin_ids {
            state.users.entry(admin_id).or_insert_with(|| AuthorizedUser {
                user_id: admin_id,
                username: None,
                first_name: Some("Admin".to_string()),
                added_by: admin_id,
                added_at: Utc::now(),
                is_active: true,
                caption_disabled: false,
            });
        }
        Ok(())
    }

    async fn is_authorized(&self, user_id: i64) -> AppResult<bool> {
        Ok(self.lock().users.get(&user_id).is_some_and(|u| u.is_active))
    }

    async fn add_user(&self, user: NewUser) -> AppResult<bool> {
        let mut state = self.lock();
        if state.users.contains_key(&user.user_id) {
            return Ok(false);
        }
        state.users.insert(
            user.user_id,
            AuthorizedUser {
                user_id: user.user_id,
                username: user.username,
                first_name: user.first_name,
                added_by: user.added_by,
                added_at: Utc::now(),
                is_active: true,
                caption_disabled: false,
            },
        );
        Ok(true)
    }

    async fn remove_user(&self, user_id: i64) -> AppResult<bool> {
        Ok(self.lock().users.remove(&user_id).is_some())
    }

    async fn list_users(&self, exclude: &[i64]) -> AppResult<Vec<AuthorizedUser>> {
        let state = self.lock();
        let mut users: Vec<AuthorizedUser> = state
            .users
            .values()
            .filter(|u| !exclude.contains(&u.user_id))
            .cloned()
            .collect();
        users.sort_by(|a, b| b.added_at.cmp(&a.added_at));
        Ok(users)
    }

    async fn toggle_user_caption(&self, user_id: i64) -> AppResult<Option<bool>> {
        let mut state = self.lock();
        Ok(state.users.get_mut(&user_id).map(|u| {
            u.caption_disabled = !u.caption_disabled;
            u.caption_disabled
        }))
    }

    async fn is_caption_disabled(&self, user_id: i64) -> AppResult<bool> {
        Ok(self.lock().users.get(&user_id).is_some_and(|u| u.caption_disabled))
    }

    async fn caption_settings(&self) -> AppResult<CaptionSettings> {
        let state = self.lock();
        Ok(CaptionSettings {
            enabled: state.settings.get(CAPTION_ENABLED).map_or(true, |v| v == "1"),
            text: state
                .settings
                .get(CUSTOM_CAPTION)
                .cloned()
                .unwrap_or_else(|| DEFAULT_CAPTION.to_string()),
        })
    }

    async fn set_custom_caption(&self, text: &str) -> AppResult<()> {
        self.lock().settings.insert(CUSTOM_CAPTION.to_string(), text.to_string());
        Ok(())
    }

    async fn set_caption_enabled(&self, enabled: bool) -> AppResult<()> {
        let value = if enabled { "1" } else { "0" };
        self.lock().settings.insert(CAPTION_ENABLED.to_string(), value.to_string());
        Ok(())
    }

    async fn get_or_create_group(&self, name: &str, owner_id: i64) -> AppResult<Group> {
        let mut state = self.lock();
        if let Some(group) = state.groups.values().find(|g| g.name == name && g.owner_id == owner_id) {
            return Ok(group.clone());
        }
        let group = Group {
            id: state.next_id(),
            name: name.to_string(),
            owner_id,
            created_at: Utc::now(),
            total_files: 0,
            total_size: 0,
        };
        state.groups.insert(group.id, group.clone());
        Ok(group)
    }

    async fn list_groups(&self, owner_id: i64, limit: i64) -> AppResult<Vec<Group>> {
        let state = self.lock();
        let mut groups: Vec<Group> = state.groups.values().filter(|g| g.owner_id == owner_id).cloned().collect();
        groups.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        groups.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(groups)
    }

    async fn group_by_id(&self, group_id: i64, owner_id: i64) -> AppResult<Option<Group>> {
        Ok(self.lock().owned_group(group_id, owner_id).cloned())
    }

    async fn group_by_name(&self, name: &str, owner_id: i64) -> AppResult<Option<Group>> {
        Ok(self
            .lock()
            .groups
            .values()
            .find(|g| g.name == name && g.owner_id == owner_id)
            .cloned())
    }

    async fn delete_group(&self, group_id: i64, owner_id: i64) -> AppResult<Option<Group>> {
        let mut state = self.lock();
        if state.owned_group(group_id, owner_id).is_none() {
            return Ok(None);
        }
        let removed = state.groups.remove(&group_id);

        let file_ids: Vec<i64> = state
            .files
            .values()
            .filter(|f| f.group_id == group_id)
            .map(|f| f.id)
            .collect();
        for id in &file_ids {
            state.files.remove(id);
        }
        state.links.retain(|_, l| {
            l.group_id != Some(group_id) && !l.file_id.is_some_and(|file_id| file_ids.contains(&file_id))
        });

        Ok(removed)
    }

    async fn add_file(&self, group_id: i64, file: NewFile) -> AppResult<StoredFile> {
        let mut state = self.lock();
        if !state.groups.contains_key(&group_id) {
            return Err(AppError::Validation(format!("group {} does not exist", group_id)));
        }
        if state.files.values().any(|f| f.unique_id == file.unique_id) {
            return Err(AppError::Validation(format!("duplicate file id {}", file.unique_id)));
        }

        let serial = state
            .files
            .values()
            .filter(|f| f.group_id == group_id)
            .map(|f| f.serial_number)
            .max()
            .unwrap_or(0)
            + 1;

        let stored = StoredFile {
            id: state.next_id(),
            group_id,
            serial_number: serial,
            unique_id: file.unique_id,
            file_name: file.file_name,
            file_type: file.kind.to_string(),
            file_size: file.file_size,
            telegram_file_id: file.telegram_file_id,
            uploader_id: file.uploader_id,
            uploader_username: file.uploader_username,
            uploaded_at: Utc::now(),
            storage_message_id: file.storage_message_id,
        };
        state.files.insert(stored.id, stored.clone());

        if let Some(group) = state.groups.get_mut(&group_id) {
            group.total_files += 1;
            group.total_size += stored.file_size;
        }
        Ok(stored)
    }

    async fn group_files(&self, group_id: i64, limit: Option<i64>) -> AppResult<Vec<StoredFile>> {
        let mut files = self.lock().files_of(group_id);
        if let Some(limit) = limit {
            files.truncate(usize::try_from(limit).unwrap_or(0));
        }
        Ok(files)
    }

    async fn file_by_id(&self, file_id: i64, owner_id: i64) -> AppResult<Option<FileWithGroup>> {
        Ok(self.lock().owned_file(file_id, owner_id))
    }

    async fn file_by_serial(&self, group_name: &str, serial: i32, owner_id: i64) -> AppResult<Option<FileWithGroup>> {
        let state = self.lock();
        let Some(group) = state
            .groups
            .values()
            .find(|g| g.name == group_name && g.owner_id == owner_id)
        else {
            return Ok(None);
        };
        let file_id = state
            .files
            .values()
            .find(|f| f.group_id == group.id && f.serial_number == serial)
            .map(|f| f.id);
        Ok(file_id.and_then(|id| state.owned_file(id, owner_id)))
    }

    async fn delete_file(&self, file_id: i64, owner_id: i64) -> AppResult<Option<FileWithGroup>> {
        let mut state = self.lock();
        let Some(found) = state.owned_file(file_id, owner_id) else {
            return Ok(None);
        };

        state.files.remove(&file_id);
        state.links.retain(|_, l| l.file_id != Some(file_id));
        if let Some(group) = state.groups.get_mut(&found.file.group_id) {
            group.total_files = (group.total_files - 1).max(0);
            group.total_size = (group.total_size - found.file.file_size).max(0);
        }
        Ok(Some(found))
    }

    async fn file_link(&self, file_id: i64, owner_id: i64) -> AppResult<FileLink> {
        self.get_or_create_link(LinkType::File, file_id, owner_id).await
    }

    async fn group_link(&self, group_id: i64, owner_id: i64) -> AppResult<FileLink> {
        self.get_or_create_link(LinkType::Group, group_id, owner_id).await
    }

    async fn active_file_link(&self, file_id: i64, owner_id: i64) -> AppResult<Option<FileLink>> {
        Ok(self.lock().active_link(LinkType::File, file_id, owner_id))
    }

    async fn active_group_link(&self, group_id: i64, owner_id: i64) -> AppResult<Option<FileLink>> {
        Ok(self.lock().active_link(LinkType::Group, group_id, owner_id))
    }

    async fn resolve_link(&self, code: &str) -> AppResult<Option<LinkTarget>> {
        let mut state = self.lock();
        let Some(link) = state.links.values_mut().find(|l| l.link_code == code && l.is_active) else {
            return Ok(None);
        };
        link.clicks += 1;
        let link = link.clone();

        let target = match (link.link_type(), link.file_id, link.group_id) {
            (Some(LinkType::File), Some(file_id), _) => state.files.get(&file_id).cloned().map(LinkTarget::File),
            (Some(LinkType::Group), _, Some(group_id)) => state.groups.get(&group_id).cloned().map(|group| {
                let files = state.files_of(group.id);
                LinkTarget::Group { group, files }
            }),
            _ => None,
        };
        Ok(target)
    }

    async fn revoke_link(&self, code: &str, owner_id: i64) -> AppResult<bool> {
        let mut state = self.lock();
        match state
            .links
            .values_mut()
            .find(|l| l.link_code == code && l.owner_id == owner_id && l.is_active)
        {
            Some(link) => {
                link.is_active = false;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn stats(&self) -> AppResult<BotStats> {
        let state = self.lock();

        let mut by_type: HashMap<String, i64> = HashMap::new();
        for file in state.files.values() {
            *by_type.entry(file.file_type.clone()).or_default() += 1;
        }
        let mut files_by_type: Vec<(String, i64)> = by_type.into_iter().collect();
        files_by_type.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        let count = |n: usize| i64::try_from(n).unwrap_or(i64::MAX);

        Ok(BotStats {
            total_users: count(state.users.len()),
            active_users: count(state.users.values().filter(|u| u.is_active).count()),
            caption_disabled_users: count(state.users.values().filter(|u| u.caption_disabled).count()),
            total_groups: count(state.groups.len()),
            total_files: count(state.files.len()),
            total_size: state.files.values().map(|f| f.file_size).sum(),
            active_links: count(state.links.values().filter(|l| l.is_active).count()),
            total_links: count(state.links.len()),
            total_clicks: state.links.values().map(|l| l.clicks).sum(),
            files_by_type,
        })
    }
}
