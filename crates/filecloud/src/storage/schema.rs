//! Table definitions created on startup
//!
//! Statements are idempotent so they can run on every boot.

/// DDL executed in order by `PgStore::init_schema`.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS authorized_users (
        id SERIAL PRIMARY KEY,
        user_id BIGINT UNIQUE NOT NULL,
        username TEXT,
        first_name TEXT,
        added_by BIGINT NOT NULL,
        added_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        is_active BOOLEAN NOT NULL DEFAULT TRUE,
        caption_disabled BOOLEAN NOT NULL DEFAULT FALSE
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS groups (
        id BIGSERIAL PRIMARY KEY,
        name TEXT NOT NULL,
        owner_id BIGINT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        total_files INTEGER NOT NULL DEFAULT 0,
        total_size BIGINT NOT NULL DEFAULT 0,
        UNIQUE (name, owner_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS files (
        id BIGSERIAL PRIMARY KEY,
        group_id BIGINT NOT NULL REFERENCES groups(id) ON DELETE CASCADE,
        serial_number INTEGER NOT NULL,
        unique_id TEXT UNIQUE NOT NULL,
        file_name TEXT NOT NULL,
        file_type TEXT NOT NULL,
        file_size BIGINT NOT NULL DEFAULT 0,
        telegram_file_id TEXT NOT NULL,
        uploader_id BIGINT NOT NULL,
        uploader_username TEXT,
        uploaded_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        storage_message_id BIGINT,
        UNIQUE (group_id, serial_number)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS file_links (
        id BIGSERIAL PRIMARY KEY,
        link_code TEXT UNIQUE NOT NULL,
        file_id BIGINT REFERENCES files(id) ON DELETE CASCADE,
        group_id BIGINT REFERENCES groups(id) ON DELETE CASCADE,
        link_type TEXT NOT NULL CHECK (link_type IN ('file', 'group')),
        owner_id BIGINT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        clicks BIGINT NOT NULL DEFAULT 0,
        is_active BOOLEAN NOT NULL DEFAULT TRUE
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS bot_settings (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_groups_owner ON groups(owner_id, created_at DESC)",
    "CREATE INDEX IF NOT EXISTS idx_files_group ON files(group_id, serial_number)",
    "CREATE INDEX IF NOT EXISTS idx_file_links_file ON file_links(file_id) WHERE file_id IS NOT NULL",
    "CREATE INDEX IF NOT EXISTS idx_file_links_group ON file_links(group_id) WHERE group_id IS NOT NULL",
    // One active link per target and owner; a losing concurrent insert hits these
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_file_links_active_file \
     ON file_links(file_id, owner_id) WHERE is_active AND link_type = 'file'",
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_file_links_active_group \
     ON file_links(group_id, owner_id) WHERE is_active AND link_type = 'group'",
];

/// Seeds a setting unless an admin already changed it.
pub const SEED_SETTING: &str = "INSERT INTO bot_settings (key, value) VALUES ($1, $2) ON CONFLICT (key) DO NOTHING";

/// Seeds a configured admin as an authorized user.
pub const SEED_ADMIN: &str = "INSERT INTO authorized_users (user_id, first_name, added_by, is_active) \
     VALUES ($1, 'Admin', $1, TRUE) ON CONFLICT (user_id) DO NOTHING";
