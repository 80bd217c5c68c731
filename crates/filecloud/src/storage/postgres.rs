//! Postgres-backed [`Store`] (Supabase in production)

use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use std::str::FromStr;
use std::time::Duration;

use super::schema::{SCHEMA_STATEMENTS, SEED_ADMIN, SEED_SETTING};
use super::settings_keys::{CAPTION_ENABLED, CUSTOM_CAPTION};
use super::{
    AuthorizedUser, BotStats, FileLink, FileWithGroup, Group, LinkTarget, LinkType, NewFile, NewUser, Store,
    StoredFile,
};
use crate::core::caption::CaptionSettings;
use crate::core::config::DEFAULT_CAPTION;
use crate::core::error::{AppError, AppResult};
use crate::core::links::{generate_link_code, with_fresh_code};

/// Supabase transaction pooler port; it cannot keep named prepared statements.
const SUPABASE_POOLER_PORT: u16 = 6543;

macro_rules! user_columns {
    () => {
        "user_id, username, first_name, added_by, added_at, is_active, caption_disabled"
    };
}

macro_rules! group_columns {
    () => {
        "id, name, owner_id, created_at, total_files, total_size"
    };
}

macro_rules! file_columns {
    () => {
        "id, group_id, serial_number, unique_id, file_name, file_type, file_size, telegram_file_id, \
         uploader_id, uploader_username, uploaded_at, storage_message_id"
    };
}

macro_rules! joined_file_columns {
    () => {
        "f.id, f.group_id, f.serial_number, f.unique_id, f.file_name, f.file_type, f.file_size, \
         f.telegram_file_id, f.uploader_id, f.uploader_username, f.uploaded_at, f.storage_message_id, \
         g.name AS group_name"
    };
}

macro_rules! link_columns {
    () => {
        "id, link_code, file_id, group_id, link_type, owner_id, created_at, clicks, is_active"
    };
}

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Opens a connection pool to `database_url`.
    pub async fn connect(database_url: &str) -> AppResult<Self> {
        let mut options = PgConnectOptions::from_str(database_url)?;
        if options.get_port() == SUPABASE_POOLER_PORT {
            log::info!("Transaction pooler detected, disabling statement cache");
            options = options.statement_cache_capacity(0);
        }

        let pool = PgPoolOptions::new()
            .max_connections(10)
            .acquire_timeout(Duration::from_secs(30))
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }

    async fn active_link(&self, link_type: LinkType, target_id: i64, owner_id: i64) -> AppResult<Option<FileLink>> {
        let query = match link_type {
            LinkType::File => concat!(
                "SELECT ",
                link_columns!(),
                " FROM file_links WHERE file_id = $1 AND owner_id = $2 AND link_type = 'file' AND is_active \
                 ORDER BY id LIMIT 1"
            ),
            LinkType::Group => concat!(
                "SELECT ",
                link_columns!(),
                " FROM file_links WHERE group_id = $1 AND owner_id = $2 AND link_type = 'group' AND is_active \
                 ORDER BY id LIMIT 1"
            ),
        };

        let link = sqlx::query_as::<_, FileLink>(query)
            .bind(target_id)
            .bind(owner_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(link)
    }

    /// Inserts a link; `Ok(None)` when the code is already taken.
    async fn insert_link(
        &self,
        code: &str,
        link_type: LinkType,
        target_id: i64,
        owner_id: i64,
    ) -> AppResult<Option<FileLink>> {
        let (file_id, group_id) = match link_type {
            LinkType::File => (Some(target_id), None),
            LinkType::Group => (None, Some(target_id)),
        };

        let inserted = sqlx::query_as::<_, FileLink>(concat!(
            "INSERT INTO file_links (link_code, link_type, file_id, group_id, owner_id) \
             VALUES ($1, $2, $3, $4, $5) RETURNING ",
            link_columns!()
        ))
        .bind(code)
        .bind(link_type.as_ref())
        .bind(file_id)
        .bind(group_id)
        .bind(owner_id)
        .fetch_one(&self.pool)
        .await;

        match inserted {
            Ok(link) => Ok(Some(link)),
            Err(e) => {
                let err = AppError::from(e);
                if err.is_unique_violation() {
                    Ok(None)
                } else {
                    Err(err)
                }
            }
        }
    }

    async fn get_or_create_link(&self, link_type: LinkType, target_id: i64, owner_id: i64) -> AppResult<FileLink> {
        with_fresh_code(generate_link_code, |code| async move {
            if let Some(existing) = self.active_link(link_type, target_id, owner_id).await? {
                return Ok(Some(existing));
            }
            self.insert_link(&code, link_type, target_id, owner_id).await
        })
        .await
    }

    async fn upsert_setting(&self, key: &str, value: &str) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO bot_settings (key, value, updated_at) VALUES ($1, $2, now()) \
             ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = now()",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl Store for PgStore {
    async fn init_schema(&self, admin_ids: &[i64], default_caption: &str) -> AppResult<()> {
        for statement in SCHEMA_STATEMENTS {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| AppError::Migration(format!("{}: {}", statement.trim().lines().next().unwrap_or(""), e)))?;
        }

        sqlx::query(SEED_SETTING)
            .bind(CAPTION_ENABLED)
            .bind("1")
            .execute(&self.pool)
            .await?;
        sqlx::query(SEED_SETTING)
            .bind(CUSTOM_CAPTION)
            .bind(default_caption)
            .execute(&self.pool)
            .await?;

        for admin_id in admin_ids {
            sqlx::query(SEED_ADMIN).bind(admin_id).execute(&self.pool).await?;
        }

        log::info!("Database schema ready ({} admins seeded)", admin_ids.len());
        Ok(())
    }

    async fn is_authorized(&self, user_id: i64) -> AppResult<bool> {
        let (exists,): (bool,) =
            sqlx::query_as("SELECT EXISTS (SELECT 1 FROM authorized_users WHERE user_id = $1 AND is_active)")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn add_user(&self, user: NewUser) -> AppResult<bool> {
        let result = sqlx::query(
            "INSERT INTO authorized_users (user_id, username, first_name, added_by, is_active) \
             VALUES ($1, $2, $3, $4, TRUE) ON CONFLICT (user_id) DO NOTHING",
        )
        .bind(user.user_id)
        .bind(user.username)
        .bind(user.first_name)
        .bind(user.added_by)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn remove_user(&self, user_id: i64) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM authorized_users WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_users(&self, exclude: &[i64]) -> AppResult<Vec<AuthorizedUser>> {
        let users = sqlx::query_as::<_, AuthorizedUser>(concat!(
            "SELECT ",
            user_columns!(),
            " FROM authorized_users WHERE NOT (user_id = ANY($1)) ORDER BY added_at DESC, id DESC"
        ))
        .bind(exclude.to_vec())
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    async fn toggle_user_caption(&self, user_id: i64) -> AppResult<Option<bool>> {
        let row: Option<(bool,)> = sqlx::query_as(
            "UPDATE authorized_users SET caption_disabled = NOT caption_disabled WHERE user_id = $1 \
             RETURNING caption_disabled",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|(disabled,)| disabled))
    }

    async fn is_caption_disabled(&self, user_id: i64) -> AppResult<bool> {
        let row: Option<(bool,)> = sqlx::query_as("SELECT caption_disabled FROM authorized_users WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|(disabled,)| disabled).unwrap_or(false))
    }

    async fn caption_settings(&self) -> AppResult<CaptionSettings> {
        let rows: Vec<(String, String)> = sqlx::query_as("SELECT key, value FROM bot_settings WHERE key = ANY($1)")
            .bind(vec![CAPTION_ENABLED, CUSTOM_CAPTION])
            .fetch_all(&self.pool)
            .await?;

        let mut settings = CaptionSettings {
            enabled: true,
            text: DEFAULT_CAPTION.to_string(),
        };
        for (key, value) in rows {
            match key.as_str() {
                CAPTION_ENABLED => settings.enabled = value == "1",
                CUSTOM_CAPTION => settings.text = value,
                _ => {}
            }
        }
        Ok(settings)
    }

    async fn set_custom_caption(&self, text: &str) -> AppResult<()> {
        self.upsert_setting(CUSTOM_CAPTION, text).await
    }

    async fn set_caption_enabled(&self, enabled: bool) -> AppResult<()> {
        self.upsert_setting(CAPTION_ENABLED, if enabled { "1" } else { "0" }).await
    }

    async fn get_or_create_group(&self, name: &str, owner_id: i64) -> AppResult<Group> {
        // The no-op update makes RETURNING yield the existing row on conflict
        let group = sqlx::query_as::<_, Group>(concat!(
            "INSERT INTO groups (name, owner_id) VALUES ($1, $2) \
             ON CONFLICT (name, owner_id) DO UPDATE SET name = EXCLUDED.name RETURNING ",
            group_columns!()
        ))
        .bind(name)
        .bind(owner_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(group)
    }

    async fn list_groups(&self, owner_id: i64, limit: i64) -> AppResult<Vec<Group>> {
        let groups = sqlx::query_as::<_, Group>(concat!(
            "SELECT ",
            group_columns!(),
            " FROM groups WHERE owner_id = $1 ORDER BY created_at DESC, id DESC LIMIT $2"
        ))
        .bind(owner_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(groups)
    }

    async fn group_by_id(&self, group_id: i64, owner_id: i64) -> AppResult<Option<Group>> {
        let group = sqlx::query_as::<_, Group>(concat!(
            "SELECT ",
            group_columns!(),
            " FROM groups WHERE id = $1 AND owner_id = $2"
        ))
        .bind(group_id)
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(group)
    }

    async fn group_by_name(&self, name: &str, owner_id: i64) -> AppResult<Option<Group>> {
        let group = sqlx::query_as::<_, Group>(concat!(
            "SELECT ",
            group_columns!(),
            " FROM groups WHERE name = $1 AND owner_id = $2"
        ))
        .bind(name)
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(group)
    }

    async fn delete_group(&self, group_id: i64, owner_id: i64) -> AppResult<Option<Group>> {
        let group = sqlx::query_as::<_, Group>(concat!(
            "DELETE FROM groups WHERE id = $1 AND owner_id = $2 RETURNING ",
            group_columns!()
        ))
        .bind(group_id)
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(group)
    }

    async fn add_file(&self, group_id: i64, file: NewFile) -> AppResult<StoredFile> {
        let mut tx = self.pool.begin().await?;

        // Row lock on the group serializes serial number assignment
        let locked: Option<(i64,)> = sqlx::query_as("SELECT id FROM groups WHERE id = $1 FOR UPDATE")
            .bind(group_id)
            .fetch_optional(&mut *tx)
            .await?;
        if locked.is_none() {
            return Err(AppError::Validation(format!("group {} does not exist", group_id)));
        }

        let (serial,): (i32,) =
            sqlx::query_as("SELECT COALESCE(MAX(serial_number), 0) + 1 FROM files WHERE group_id = $1")
                .bind(group_id)
                .fetch_one(&mut *tx)
                .await?;

        let stored = sqlx::query_as::<_, StoredFile>(concat!(
            "INSERT INTO files (group_id, serial_number, unique_id, file_name, file_type, file_size, \
             telegram_file_id, uploader_id, uploader_username, storage_message_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING ",
            file_columns!()
        ))
        .bind(group_id)
        .bind(serial)
        .bind(&file.unique_id)
        .bind(&file.file_name)
        .bind(file.kind.as_ref())
        .bind(file.file_size)
        .bind(&file.telegram_file_id)
        .bind(file.uploader_id)
        .bind(&file.uploader_username)
        .bind(file.storage_message_id)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE groups SET total_files = total_files + 1, total_size = total_size + $2 WHERE id = $1")
            .bind(group_id)
            .bind(file.file_size)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(stored)
    }

    async fn group_files(&self, group_id: i64, limit: Option<i64>) -> AppResult<Vec<StoredFile>> {
        let files = sqlx::query_as::<_, StoredFile>(concat!(
            "SELECT ",
            file_columns!(),
            " FROM files WHERE group_id = $1 ORDER BY serial_number ASC LIMIT $2"
        ))
        .bind(group_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(files)
    }

    async fn file_by_id(&self, file_id: i64, owner_id: i64) -> AppResult<Option<FileWithGroup>> {
        let file = sqlx::query_as::<_, FileWithGroup>(concat!(
            "SELECT ",
            joined_file_columns!(),
            " FROM files f JOIN groups g ON g.id = f.group_id WHERE f.id = $1 AND g.owner_id = $2"
        ))
        .bind(file_id)
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(file)
    }

    async fn file_by_serial(&self, group_name: &str, serial: i32, owner_id: i64) -> AppResult<Option<FileWithGroup>> {
        let file = sqlx::query_as::<_, FileWithGroup>(concat!(
            "SELECT ",
            joined_file_columns!(),
            " FROM files f JOIN groups g ON g.id = f.group_id \
             WHERE g.name = $1 AND f.serial_number = $2 AND g.owner_id = $3"
        ))
        .bind(group_name)
        .bind(serial)
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(file)
    }

    async fn delete_file(&self, file_id: i64, owner_id: i64) -> AppResult<Option<FileWithGroup>> {
        let mut tx = self.pool.begin().await?;

        let found = sqlx::query_as::<_, FileWithGroup>(concat!(
            "SELECT ",
            joined_file_columns!(),
            " FROM files f JOIN groups g ON g.id = f.group_id WHERE f.id = $1 AND g.owner_id = $2 FOR UPDATE"
        ))
        .bind(file_id)
        .bind(owner_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(found) = found else {
            return Ok(None);
        };

        sqlx::query("DELETE FROM files WHERE id = $1")
            .bind(file_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "UPDATE groups SET total_files = GREATEST(total_files - 1, 0), \
             total_size = GREATEST(total_size - $2, 0) WHERE id = $1",
        )
        .bind(found.file.group_id)
        .bind(found.file.file_size)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(found))
    }

    async fn file_link(&self, file_id: i64, owner_id: i64) -> AppResult<FileLink> {
        self.get_or_create_link(LinkType::File, file_id, owner_id).await
    }

    async fn group_link(&self, group_id: i64, owner_id: i64) -> AppResult<FileLink> {
        self.get_or_create_link(LinkType::Group, group_id, owner_id).await
    }

    async fn active_file_link(&self, file_id: i64, owner_id: i64) -> AppResult<Option<FileLink>> {
        self.active_link(LinkType::File, file_id, owner_id).await
    }

    async fn active_group_link(&self, group_id: i64, owner_id: i64) -> AppResult<Option<FileLink>> {
        self.active_link(LinkType::Group, group_id, owner_id).await
    }

    async fn resolve_link(&self, code: &str) -> AppResult<Option<LinkTarget>> {
        let link = sqlx::query_as::<_, FileLink>(concat!(
            "UPDATE file_links SET clicks = clicks + 1 WHERE link_code = $1 AND is_active RETURNING ",
            link_columns!()
        ))
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        let Some(link) = link else {
            return Ok(None);
        };

        match (link.link_type(), link.file_id, link.group_id) {
            (Some(LinkType::File), Some(file_id), _) => {
                let file = sqlx::query_as::<_, StoredFile>(concat!(
                    "SELECT ",
                    file_columns!(),
                    " FROM files WHERE id = $1"
                ))
                .bind(file_id)
                .fetch_optional(&self.pool)
                .await?;
                Ok(file.map(LinkTarget::File))
            }
            (Some(LinkType::Group), _, Some(group_id)) => {
                let group = sqlx::query_as::<_, Group>(concat!("SELECT ", group_columns!(), " FROM groups WHERE id = $1"))
                    .bind(group_id)
                    .fetch_optional(&self.pool)
                    .await?;
                match group {
                    Some(group) => {
                        let files = self.group_files(group.id, None).await?;
                        Ok(Some(LinkTarget::Group { group, files }))
                    }
                    None => Ok(None),
                }
            }
            _ => {
                log::warn!("Link {} has an inconsistent target, ignoring", link.link_code);
                Ok(None)
            }
        }
    }

    async fn revoke_link(&self, code: &str, owner_id: i64) -> AppResult<bool> {
        let result = sqlx::query("UPDATE file_links SET is_active = FALSE WHERE link_code = $1 AND owner_id = $2 AND is_active")
            .bind(code)
            .bind(owner_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn stats(&self) -> AppResult<BotStats> {
        let row: (i64, i64, i64, i64, i64, i64, i64, i64, i64) = sqlx::query_as(
            "SELECT \
               (SELECT COUNT(*) FROM authorized_users), \
               (SELECT COUNT(*) FROM authorized_users WHERE is_active), \
               (SELECT COUNT(*) FROM authorized_users WHERE caption_disabled), \
               (SELECT COUNT(*) FROM groups), \
               (SELECT COUNT(*) FROM files), \
               (SELECT COALESCE(SUM(file_size), 0)::BIGINT FROM files), \
               (SELECT COUNT(*) FROM file_links WHERE is_active), \
               (SELECT COUNT(*) FROM file_links), \
               (SELECT COALESCE(SUM(clicks), 0)::BIGINT FROM file_links)",
        )
        .fetch_one(&self.pool)
        .await?;

        let files_by_type: Vec<(String, i64)> =
            sqlx::query_as("SELECT file_type, COUNT(*) FROM files GROUP BY file_type ORDER BY 2 DESC, 1")
                .fetch_all(&self.pool)
                .await?;

        Ok(BotStats {
            total_users: row.0,
            active_users: row.1,
            caption_disabled_users: row.2,
            total_groups: row.3,
            total_files: row.4,
            total_size: row.5,
            active_links: row.6,
            total_links: row.7,
            total_clicks: row.8,
            files_by_type,
        })
    }
}
