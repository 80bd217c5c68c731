//! Typed inline-button payloads
//!
//! Every button the bot renders carries one of these actions, encoded as a
//! short `prefix:verb[:arg]` string. Telegram caps callback data at 64 bytes.

use std::fmt;
use std::str::FromStr;

/// Telegram's limit for `callback_data`
pub const MAX_CALLBACK_DATA_LEN: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackAction {
    MainMenu,
    Groups,
    UploadHelp,
    Help,

    ViewGroup(i64),
    GroupLink(i64),
    ListFiles(i64),
    AddFiles(i64),
    DeleteGroup(i64),
    ConfirmDeleteGroup(i64),

    ViewFile(i64),
    DeleteFile(i64),
    ConfirmDeleteFile(i64),

    RevokeLink(String),

    FinishBulk,
    CancelBulk,
    CancelUpload,

    AdminPanel,
    AdminStats,
    AdminUsers,
    AdminEditCaption,
    AdminCancelCaptionEdit,
    AdminToggleCaption,
    ToggleUserCaption(i64),
}

impl fmt::Display for CallbackAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use CallbackAction::*;
        match self {
            MainMenu => write!(f, "menu:main"),
            Groups => write!(f, "menu:groups"),
            UploadHelp => write!(f, "menu:upload"),
            Help => write!(f, "menu:help"),

            ViewGroup(id) => write!(f, "grp:view:{}", id),
            GroupLink(id) => write!(f, "grp:link:{}", id),
            ListFiles(id) => write!(f, "grp:files:{}", id),
            AddFiles(id) => write!(f, "grp:add:{}", id),
            DeleteGroup(id) => write!(f, "grp:del:{}", id),
            ConfirmDeleteGroup(id) => write!(f, "grp:delok:{}", id),

            ViewFile(id) => write!(f, "file:view:{}", id),
            DeleteFile(id) => write!(f, "file:del:{}", id),
            ConfirmDeleteFile(id) => write!(f, "file:delok:{}", id),

            RevokeLink(code) => write!(f, "link:revoke:{}", code),

            FinishBulk => write!(f, "up:finish"),
            CancelBulk => write!(f, "up:cancelbulk"),
            CancelUpload => write!(f, "up:cancel"),

            AdminPanel => write!(f, "adm:panel"),
            AdminStats => write!(f, "adm:stats"),
            AdminUsers => write!(f, "adm:users"),
            AdminEditCaption => write!(f, "adm:caption"),
            AdminCancelCaptionEdit => write!(f, "adm:caption_cancel"),
            AdminToggleCaption => write!(f, "adm:caption_toggle"),
            ToggleUserCaption(user_id) => write!(f, "adm:usercap:{}", user_id),
        }
    }
}

/// Returned for payloads that no button of this bot produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCallback(pub String);

impl FromStr for CallbackAction {
    type Err = UnknownCallback;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        use CallbackAction::*;

        let unknown = || UnknownCallback(data.to_string());
        let mut parts = data.splitn(3, ':');
        let prefix = parts.next().unwrap_or_default();
        let verb = parts.next().unwrap_or_default();
        let arg = parts.next();

        let id = || arg.and_then(|a| a.parse::<i64>().ok()).ok_or_else(unknown);

        let action = match (prefix, verb) {
            ("menu", "main") => MainMenu,
            ("menu", "groups") => Groups,
            ("menu", "upload") => UploadHelp,
            ("menu", "help") => Help,

            ("grp", "view") => ViewGroup(id()?),
            ("grp", "link") => GroupLink(id()?),
            ("grp", "files") => ListFiles(id()?),
            ("grp", "add") => AddFiles(id()?),
            ("grp", "del") => DeleteGroup(id()?),
            ("grp", "delok") => ConfirmDeleteGroup(id()?),

            ("file", "view") => ViewFile(id()?),
            ("file", "del") => DeleteFile(id()?),
            ("file", "delok") => ConfirmDeleteFile(id()?),

            ("link", "revoke") => match arg {
                Some(code) if !code.is_empty() => RevokeLink(code.to_string()),
                _ => return Err(unknown()),
            },

            ("up", "finish") => FinishBulk,
            ("up", "cancelbulk") => CancelBulk,
            ("up", "cancel") => CancelUpload,

            ("adm", "panel") => AdminPanel,
            ("adm", "stats") => AdminStats,
            ("adm", "users") => AdminUsers,
            ("adm", "caption") => AdminEditCaption,
            ("adm", "caption_cancel") => AdminCancelCaptionEdit,
            ("adm", "caption_toggle") => AdminToggleCaption,
            ("adm", "usercap") => ToggleUserCaption(id()?),

            _ => return Err(unknown()),
        };
        Ok(action)
    }
}
