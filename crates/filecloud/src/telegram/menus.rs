//! Texts and inline keyboards for every screen the bot shows
//!
//! Pure functions: handlers fetch data, these render it.

use indoc::formatdoc;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

use crate::core::caption::CaptionSettings;
use crate::core::config::limits::MAX_FILE_SIZE;
use crate::core::config::ui::{BUTTON_LABEL_CHARS, GROUP_PREVIEW_FILES, MESSAGE_CHUNK_CHARS};
use crate::core::utils::{format_db_size, format_size, serial_label, split_message, truncate_chars};
use crate::storage::{AuthorizedUser, BotStats, FileWithGroup, Group, StoredFile};
use crate::telegram::callback_data::CallbackAction;

/// Telegram rejects keyboards with more buttons than this
const MAX_FILE_BUTTONS: usize = 50;

/// A rendered screen
pub struct Screen {
    pub text: String,
    pub keyboard: InlineKeyboardMarkup,
}

fn button(text: impl Into<String>, action: CallbackAction) -> InlineKeyboardButton {
    InlineKeyboardButton::callback(text.into(), action.to_string())
}

fn date(ts: &chrono::DateTime<chrono::Utc>) -> String {
    ts.format("%Y-%m-%d").to_string()
}

fn main_menu_row() -> Vec<InlineKeyboardButton> {
    vec![button("Main Menu 🏠", CallbackAction::MainMenu)]
}

fn groups_row() -> Vec<InlineKeyboardButton> {
    vec![button("My Groups 📂", CallbackAction::Groups)]
}

pub fn main_menu(first_name: &str, is_admin: bool) -> Screen {
    let text = formatdoc! {"
        Welcome, {first_name}! 👋

        Store files in the cloud and share them with permanent links.

        📤 /upload <group> - upload one file
        📦 /bulkupload <group> - upload many files
        📂 /groups - browse your groups
        ❓ /help - all commands"
    };

    let mut rows = vec![
        vec![
            button("My Groups 📂", CallbackAction::Groups),
            button("Upload ⬆️", CallbackAction::UploadHelp),
        ],
        vec![button("Help ❓", CallbackAction::Help)],
    ];
    if is_admin {
        rows.push(vec![button("Admin Panel ⚙️", CallbackAction::AdminPanel)]);
    }

    Screen {
        text,
        keyboard: InlineKeyboardMarkup::new(rows),
    }
}

pub fn help(is_admin: bool, caption: &CaptionSettings, admin_contact: &str) -> Screen {
    let mut text = formatdoc! {"
        Complete Command Reference 📚

        Upload Commands:
        /upload <group> - Upload single file ⬆️
        /bulkupload <group> - Upload multiple files 📦

        Delete Commands:
        /deletefile <group> <file_no> - Delete specific file 🗑️
        /deletegroup <group> - Delete entire group 💥

        Link Commands:
        /getlink <group> <file_no> - Get file link 🔗
        /getgrouplink <group> - Get group link 🔗
        /revokelink <link_code> - Revoke a link 🚫

        Info Commands:
        /groups - List your groups 📂
        /start - Show main menu 🏠"
    };

    if is_admin {
        text.push_str(&formatdoc! {"


            Admin Commands 👑:
            /admin - Admin panel ⚙️
            /adduser <user_id> [username] - Add user ➕
            /removeuser <user_id> - Remove user ➖
            /listusers - List users 👥
            /botstats - Bot statistics 📊
            /clear - Clear console logs ✨"
        });
    }

    let branding = if caption.enabled {
        caption.text.as_str()
    } else {
        "disabled"
    };
    text.push_str(&formatdoc! {"


        Supported Files:
        Photos 📸, Videos 🎬, Documents 📄, Audio 🎵, Voice 🎤 (up to {max})

        Branding: {branding}

        Contact Admin: {admin_contact} 👨‍💻",
        max = format_size(MAX_FILE_SIZE),
    });

    Screen {
        text,
        keyboard: InlineKeyboardMarkup::new(vec![main_menu_row()]),
    }
}

pub fn upload_help() -> Screen {
    let text = formatdoc! {"
        How to Upload ⬆️

        Single file:
        /upload <group_name>

        Several files at once:
        /bulkupload <group_name>

        Files go into the named group, which is created on first use.
        Max Size: {max}",
        max = format_size(MAX_FILE_SIZE),
    };
    Screen {
        text,
        keyboard: InlineKeyboardMarkup::new(vec![main_menu_row()]),
    }
}

pub fn access_denied(user_id: i64, admin_contact: &str, contact_url: Option<url::Url>) -> Screen {
    let text = formatdoc! {"
        Access Denied 🚫

        You need permission to use this bot.

        Contact Admin: {admin_contact}
        Your User ID: {user_id}

        Note: Anyone can access files through shared links! 🔗"
    };
    let rows = contact_url
        .map(|url| vec![vec![InlineKeyboardButton::url("Contact Admin 👨‍💻", url)]])
        .unwrap_or_default();
    Screen {
        text,
        keyboard: InlineKeyboardMarkup::new(rows),
    }
}

pub fn single_upload_prompt(group_name: &str) -> Screen {
    let text = formatdoc! {"
        Single Upload Mode ⬆️

        Group: {group_name} 📁
        Send me the file you want to upload.
        Supported: Photos 📸, Videos 🎬, Documents 📄, Audio 🎵, Voice 🎤
        Max Size: {max}",
        max = format_size(MAX_FILE_SIZE),
    };
    Screen {
        text,
        keyboard: InlineKeyboardMarkup::new(vec![vec![button("Cancel Upload ❌", CallbackAction::CancelUpload)]]),
    }
}

pub fn bulk_upload_prompt(group_name: &str, session_id: &str) -> Screen {
    let text = formatdoc! {"
        Bulk Upload Started 🚀

        Group: {group_name} 📁
        Session: {session_id}

        Send multiple files one by one.
        Click Finish Upload when done.
        Max Size per file: {max}",
        max = format_size(MAX_FILE_SIZE),
    };
    Screen {
        text,
        keyboard: bulk_keyboard(),
    }
}

pub fn bulk_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![
        button("Finish Upload ✅", CallbackAction::FinishBulk),
        button("Cancel Bulk ❌", CallbackAction::CancelBulk),
    ]])
}

pub fn groups_list(groups: &[Group]) -> Screen {
    if groups.is_empty() {
        let text = formatdoc! {"
            No Groups Found 📂

            You haven't created any groups yet.
            Upload your first file to get started! ⬆️"
        };
        return Screen {
            text,
            keyboard: InlineKeyboardMarkup::new(vec![
                vec![button("Upload First File ⬆️", CallbackAction::UploadHelp)],
                main_menu_row(),
            ]),
        };
    }

    let mut text = String::from("Your File Groups 📂\n\n");
    let mut rows = Vec::with_capacity(groups.len() + 1);
    for (i, group) in groups.iter().enumerate() {
        text.push_str(&format!(
            "{}. {}\n   {} files, {}\n   {}\n\n",
            i + 1,
            group.name,
            group.total_files,
            format_db_size(group.total_size),
            date(&group.created_at)
        ));
        rows.push(vec![
            button(
                format!("View {} ℹ️", truncate_chars(&group.name, 15)),
                CallbackAction::ViewGroup(group.id),
            ),
            button("Get Link 🔗", CallbackAction::GroupLink(group.id)),
        ]);
    }
    rows.push(main_menu_row());

    Screen {
        text: text.trim_end().to_string(),
        keyboard: InlineKeyboardMarkup::new(rows),
    }
}

/// Group overview with the first files and management buttons.
pub fn group_details(group: &Group, preview: &[StoredFile], active_link_code: Option<&str>) -> Screen {
    let mut text = formatdoc! {"
        Group Details: {name} ℹ️
        Total Files: {files} 📄
        Total Size: {size}
        Created On: {created} 🗓️

        Files in this group (first {limit}):",
        name = group.name,
        files = group.total_files,
        size = format_db_size(group.total_size),
        created = date(&group.created_at),
        limit = GROUP_PREVIEW_FILES,
    };

    if preview.is_empty() {
        text.push_str("\nNo files in this group yet. 🤷‍♂️");
    } else {
        for file in preview {
            text.push_str(&format!(
                "\n- {} {} ({})",
                serial_label(file.serial_number),
                file.file_name,
                format_db_size(file.file_size)
            ));
        }
        if i64::from(group.total_files) > GROUP_PREVIEW_FILES {
            text.push_str("\n\n... and more. Use 'List All Files' to see full list. 📜");
        }
    }

    let mut rows = vec![
        vec![button("List All Files 📜", CallbackAction::ListFiles(group.id))],
        vec![button("Add More Files ➕", CallbackAction::AddFiles(group.id))],
        vec![button("Get Group Link 🔗", CallbackAction::GroupLink(group.id))],
        vec![button("Delete Group 💥", CallbackAction::DeleteGroup(group.id))],
    ];
    if let Some(code) = active_link_code {
        rows.push(vec![button(
            "Revoke Group Link 🚫",
            CallbackAction::RevokeLink(code.to_string()),
        )]);
    }
    rows.push(groups_row());

    Screen {
        text,
        keyboard: InlineKeyboardMarkup::new(rows),
    }
}

/// Full file listing. Long groups are split over several messages; only the
/// last one carries the keyboard.
pub fn file_list(group: &Group, files: &[StoredFile]) -> (Vec<String>, InlineKeyboardMarkup) {
    let mut text = format!("All Files in '{}' 📜\n\n", group.name);
    if files.is_empty() {
        text.push_str("No files in this group yet. 🤷‍♂️");
    }
    for file in files {
        text.push_str(&format!(
            "{} {} ({})\n",
            serial_label(file.serial_number),
            file.file_name,
            format_db_size(file.file_size)
        ));
    }

    let mut rows: Vec<Vec<InlineKeyboardButton>> = files
        .iter()
        .take(MAX_FILE_BUTTONS)
        .map(|file| {
            vec![button(
                format!(
                    "{} {}",
                    serial_label(file.serial_number),
                    truncate_chars(&file.file_name, BUTTON_LABEL_CHARS)
                ),
                CallbackAction::ViewFile(file.id),
            )]
        })
        .collect();
    if files.len() > MAX_FILE_BUTTONS {
        text.push_str(&format!(
            "\nButtons shown for the first {} files. Use /getlink <group> <file_no> for the rest.",
            MAX_FILE_BUTTONS
        ));
    }
    rows.push(vec![button("Back to Group ℹ️", CallbackAction::ViewGroup(group.id))]);

    (
        split_message(text.trim_end(), MESSAGE_CHUNK_CHARS),
        InlineKeyboardMarkup::new(rows),
    )
}

pub fn file_details(entry: &FileWithGroup, link: &str, link_code: &str) -> Screen {
    let file = &entry.file;
    let kind = file.kind();
    let text = formatdoc! {"
        File Details {emoji}

        Name: {name}
        Type: {kind}
        Size: {size}
        Group: {group}
        Serial No: {serial}
        Uploaded: {uploaded}

        Link: {link}",
        emoji = kind.emoji(),
        name = file.file_name,
        size = format_db_size(file.file_size),
        group = entry.group_name,
        serial = serial_label(file.serial_number),
        uploaded = file.uploaded_at.format("%Y-%m-%d %H:%M"),
    };

    let mut rows = Vec::new();
    if let Ok(url) = url::Url::parse(link) {
        rows.push(vec![InlineKeyboardButton::url("Share File 🔗", url)]);
    }
    rows.push(vec![button(
        "Revoke Link 🚫",
        CallbackAction::RevokeLink(link_code.to_string()),
    )]);
    rows.push(vec![button("Delete File 🗑️", CallbackAction::DeleteFile(file.id))]);
    rows.push(vec![button("Back to Files 📜", CallbackAction::ListFiles(file.group_id))]);

    Screen {
        text,
        keyboard: InlineKeyboardMarkup::new(rows),
    }
}

pub fn group_link(group: &Group, link: &str) -> Screen {
    let mut rows = Vec::new();
    if let Ok(url) = url::Url::parse(link) {
        rows.push(vec![InlineKeyboardButton::url("Share Group 🔗", url)]);
    }
    rows.push(vec![button("View Group Details ℹ️", CallbackAction::ViewGroup(group.id))]);
    rows.push(groups_row());

    Screen {
        text: format!("Link for group '{}' 📁:\n\n{}", group.name, link),
        keyboard: InlineKeyboardMarkup::new(rows),
    }
}

pub fn file_link(file_name: &str, group_name: &str, link: &str) -> Screen {
    let mut rows = Vec::new();
    if let Ok(url) = url::Url::parse(link) {
        rows.push(vec![InlineKeyboardButton::url("Share Link 🔗", url)]);
    }
    rows.push(main_menu_row());

    Screen {
        text: format!(
            "Link for file '{}' in group '{}' 📄:\n\n{}",
            file_name, group_name, link
        ),
        keyboard: InlineKeyboardMarkup::new(rows),
    }
}

pub fn confirm_delete_group(group: &Group) -> Screen {
    let text = formatdoc! {"
        Delete group '{name}'? ⚠️

        This removes {files} files ({size}) and revokes every link to them.
        This cannot be undone.",
        name = group.name,
        files = group.total_files,
        size = format_db_size(group.total_size),
    };
    Screen {
        text,
        keyboard: InlineKeyboardMarkup::new(vec![vec![
            button("Yes, Delete 💥", CallbackAction::ConfirmDeleteGroup(group.id)),
            button("Cancel ❌", CallbackAction::ViewGroup(group.id)),
        ]]),
    }
}

pub fn confirm_delete_file(entry: &FileWithGroup) -> Screen {
    let file = &entry.file;
    let text = formatdoc! {"
        Delete file {serial} {name} from '{group}'? ⚠️

        Links to this file will stop working.",
        serial = serial_label(file.serial_number),
        name = file.file_name,
        group = entry.group_name,
    };
    Screen {
        text,
        keyboard: InlineKeyboardMarkup::new(vec![vec![
            button("Yes, Delete 🗑️", CallbackAction::ConfirmDeleteFile(file.id)),
            button("Cancel ❌", CallbackAction::ViewFile(file.id)),
        ]]),
    }
}

pub fn upload_complete(file: &StoredFile, group_name: &str, link: &str) -> String {
    formatdoc! {"
        File Uploaded Successfully! ✅

        Name: {name}
        Group: {group_name} 📁
        Serial No: {serial}
        Size: {size}

        Link: {link}",
        name = file.file_name,
        serial = serial_label(file.serial_number),
        size = format_db_size(file.file_size),
    }
}

pub fn bulk_summary(group_name: &str, stored: usize, failed: &[String], total_size: u64, link: Option<&str>) -> String {
    let mut text = formatdoc! {"
        Bulk Upload Complete 🎉

        Group: {group_name} 📁
        Stored: {stored} files ({size})",
        size = format_size(total_size),
    };
    if !failed.is_empty() {
        text.push_str(&format!("\nFailed: {} ❌", failed.len()));
        for name in failed.iter().take(crate::core::config::delivery::FAILED_FILES_SHOWN) {
            text.push_str(&format!("\n- {}", name));
        }
    }
    if let Some(link) = link {
        text.push_str(&format!("\n\nGroup Link: {}", link));
    }
    text
}

pub fn admin_panel(stats: &BotStats, caption: &CaptionSettings) -> Screen {
    let text = formatdoc! {"
        Admin Panel ⚙️

        Users: {users} 👥
        Groups: {groups} 📂
        Files: {files} 📄 ({size})
        Active Links: {links} 🔗

        Caption: {state}
        Caption Text: {caption_text}",
        users = stats.total_users,
        groups = stats.total_groups,
        files = stats.total_files,
        size = format_db_size(stats.total_size),
        links = stats.active_links,
        state = if caption.enabled { "Enabled ✅" } else { "Disabled 🚫" },
        caption_text = caption.text,
    };

    let toggle_label = if caption.enabled {
        "Disable Caption 🚫"
    } else {
        "Enable Caption ✅"
    };
    Screen {
        text,
        keyboard: InlineKeyboardMarkup::new(vec![
            vec![
                button("Detailed Stats 📊", CallbackAction::AdminStats),
                button("Users 👥", CallbackAction::AdminUsers),
            ],
            vec![
                button("Edit Caption ✏️", CallbackAction::AdminEditCaption),
                button(toggle_label, CallbackAction::AdminToggleCaption),
            ],
            main_menu_row(),
        ]),
    }
}

pub fn detailed_stats(stats: &BotStats) -> Screen {
    let mut text = formatdoc! {"
        Bot Statistics 📊

        Users
        Total: {total_users}
        Active: {active_users}
        Without caption: {no_caption}

        Storage
        Groups: {groups}
        Files: {files}
        Total Size: {size}

        Links
        Active: {active_links} / {total_links}
        Total Clicks: {clicks}",
        total_users = stats.total_users,
        active_users = stats.active_users,
        no_caption = stats.caption_disabled_users,
        groups = stats.total_groups,
        files = stats.total_files,
        size = format_db_size(stats.total_size),
        active_links = stats.active_links,
        total_links = stats.total_links,
        clicks = stats.total_clicks,
    };

    if !stats.files_by_type.is_empty() {
        text.push_str("\n\nFiles by Type");
        for (kind, count) in &stats.files_by_type {
            text.push_str(&format!("\n{}: {}", kind, count));
        }
    }

    Screen {
        text,
        keyboard: InlineKeyboardMarkup::new(vec![vec![button("Back ⚙️", CallbackAction::AdminPanel)]]),
    }
}

/// User listing split into chunks that fit a message.
pub fn users_list(users: &[AuthorizedUser]) -> Vec<String> {
    if users.is_empty() {
        return vec!["No regular users found 👥".to_string()];
    }

    let mut text = String::from("Authorized Users 👥\n\n");
    for user in users {
        text.push_str(&formatdoc! {"
            {name}
            ID: {id}
            @{username}
            Status: {status}
            Caption: {caption}
            Added: {added}

            ",
            name = user.first_name.as_deref().unwrap_or("Unknown"),
            id = user.user_id,
            username = user.username.as_deref().unwrap_or("None"),
            status = if user.is_active { "Active ✅" } else { "Inactive ❌" },
            caption = if user.caption_disabled { "No Caption 🚫" } else { "With Caption ✅" },
            added = date(&user.added_at),
        });
    }
    split_message(text.trim_end(), MESSAGE_CHUNK_CHARS)
}

/// Per-user caption toggles for the admin users screen.
pub fn users_keyboard(users: &[AuthorizedUser]) -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = users
        .iter()
        .take(MAX_FILE_BUTTONS)
        .map(|user| {
            let name = user
                .username
                .as_deref()
                .map(|u| format!("@{}", u))
                .or_else(|| user.first_name.clone())
                .unwrap_or_else(|| user.user_id.to_string());
            let state = if user.caption_disabled { "🚫" } else { "✅" };
            vec![button(
                format!("Caption {} {}", state, truncate_chars(&name, BUTTON_LABEL_CHARS)),
                CallbackAction::ToggleUserCaption(user.user_id),
            )]
        })
        .collect();
    rows.push(vec![button("Back ⚙️", CallbackAction::AdminPanel)]);
    InlineKeyboardMarkup::new(rows)
}

pub fn caption_edit_prompt(current: &str) -> Screen {
    let text = formatdoc! {"
        Edit Caption ✏️

        Current caption:
        {current}

        Send the new caption text as your next message."
    };
    Screen {
        text,
        keyboard: InlineKeyboardMarkup::new(vec![vec![button(
            "Cancel ❌",
            CallbackAction::AdminCancelCaptionEdit,
        )]]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn group(total_files: i32) -> Group {
        Group {
            id: 9,
            name: "Movies".to_string(),
            owner_id: 1,
            created_at: Utc::now(),
            total_files,
            total_size: 2048,
        }
    }

    fn file(serial: i32) -> StoredFile {
        StoredFile {
            id: 100 + i64::from(serial),
            group_id: 9,
            serial_number: serial,
            unique_id: format!("u{}", serial),
            file_name: format!("part{}.mkv", serial),
            file_type: "video".to_string(),
            file_size: 1024,
            telegram_file_id: "t".to_string(),
            uploader_id: 1,
            uploader_username: None,
            uploaded_at: Utc::now(),
            storage_message_id: Some(5),
        }
    }

    fn callback_data(keyboard: &InlineKeyboardMarkup) -> Vec<String> {
        use teloxide::types::InlineKeyboardButtonKind;
        keyboard
            .inline_keyboard
            .iter()
            .flatten()
            .filter_map(|b| match &b.kind {
                InlineKeyboardButtonKind::CallbackData(data) => Some(data.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_main_menu_admin_button_only_for_admins() {
        let admin = callback_data(&main_menu("Ann", true).keyboard);
        let user = callback_data(&main_menu("Bob", false).keyboard);
        assert!(admin.contains(&CallbackAction::AdminPanel.to_string()));
        assert!(!user.contains(&CallbackAction::AdminPanel.to_string()));
    }

    #[test]
    fn test_help_admin_section() {
        let caption = CaptionSettings {
            enabled: true,
            text: "t.me/brand".to_string(),
        };
        assert!(help(true, &caption, "@boss").text.contains("/adduser"));
        let user_help = help(false, &caption, "@boss").text;
        assert!(!user_help.contains("/adduser"));
        assert!(user_help.contains("Branding: t.me/brand"));
        assert!(user_help.contains("10.0 GB"));
    }

    #[test]
    fn test_empty_groups_list() {
        let screen = groups_list(&[]);
        assert!(screen.text.starts_with("No Groups Found"));
    }

    #[test]
    fn test_group_details_preview_and_revoke_button() {
        let files: Vec<StoredFile> = (1..=3).map(file).collect();
        let screen = group_details(&group(12), &files, Some("CODE123"));
        assert!(screen.text.contains("#001 part1.mkv (1.0 KB)"));
        assert!(screen.text.contains("... and more"));
        assert!(callback_data(&screen.keyboard).contains(&"link:revoke:CODE123".to_string()));

        let screen = group_details(&group(0), &[], None);
        assert!(screen.text.contains("No files in this group yet"));
        assert!(!callback_data(&screen.keyboard).iter().any(|d| d.starts_with("link:revoke")));
    }

    #[test]
    fn test_file_list_caps_buttons() {
        let files: Vec<StoredFile> = (1..=60).map(file).collect();
        let (chunks, keyboard) = file_list(&group(60), &files);
        assert!(chunks.concat().contains("#060 part60.mkv"));
        // 50 file buttons plus the back button
        assert_eq!(keyboard.inline_keyboard.len(), MAX_FILE_BUTTONS + 1);
    }

    #[test]
    fn test_users_list_chunks() {
        let users: Vec<AuthorizedUser> = (0..200)
            .map(|i| AuthorizedUser {
                user_id: i,
                username: Some(format!("user{}", i)),
                first_name: Some("Name".to_string()),
                added_by: 1,
                added_at: Utc::now(),
                is_active: true,
                caption_disabled: i % 2 == 0,
            })
            .collect();
        let chunks = users_list(&users);
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.chars().count() <= MESSAGE_CHUNK_CHARS));
        assert_eq!(users_list(&[]), vec!["No regular users found 👥".to_string()]);
    }

    #[test]
    fn test_bulk_summary_lists_failures() {
        let failed: Vec<String> = (0..8).map(|i| format!("f{}", i)).collect();
        let text = bulk_summary("G", 3, &failed, 3072, Some("https://t.me/b?start=x"));
        assert!(text.contains("Stored: 3 files (3.0 KB)"));
        assert!(text.contains("Failed: 8"));
        assert!(text.contains("- f4"));
        assert!(!text.contains("- f5"));
        assert!(text.contains("Group Link: https://t.me/b?start=x"));
    }

    #[test]
    fn test_access_denied_contact_button() {
        let url = url::Url::parse("https://t.me/boss").ok();
        let screen = access_denied(42, "@boss", url);
        assert!(screen.text.contains("Your User ID: 42"));
        assert_eq!(screen.keyboard.inline_keyboard.len(), 1);

        let screen = access_denied(42, "Not configured", None);
        assert!(screen.keyboard.inline_keyboard.is_empty());
    }
}
