//! User command handlers (/start, /help, /upload, /groups, links and deletes)

use teloxide::prelude::*;
use teloxide::types::Message;

use super::types::{reply, send_screen, sender_first_name, sender_id, HandlerDeps, HandlerResult};
use crate::core::config::ui::GROUPS_LIST_LIMIT;
use crate::core::links::generate_link_code;
use crate::telegram::delivery::handle_link_access;
use crate::telegram::menus;

/// Why a `<group> <file_no>` argument list was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SerialArgsError {
    Missing,
    NotPositive,
    NotANumber,
}

/// Splits `"<group name> <file_no>"`. The last token is the file number,
/// everything before it is the group name (which may contain spaces).
pub fn parse_group_and_serial(args: &str) -> Result<(String, i32), SerialArgsError> {
    let (group, serial) = args
        .trim()
        .rsplit_once(char::is_whitespace)
        .ok_or(SerialArgsError::Missing)?;
    let group = group.trim();
    if group.is_empty() {
        return Err(SerialArgsError::Missing);
    }
    let serial = serial.parse::<i64>().map_err(|_| SerialArgsError::NotANumber)?;
    if serial <= 0 {
        return Err(SerialArgsError::NotPositive);
    }
    let serial = i32::try_from(serial).map_err(|_| SerialArgsError::NotANumber)?;
    Ok((group.to_string(), serial))
}

fn usage(command: &str, args: &str, example: &str) -> String {
    format!(
        "Usage Error ❌\n\nCorrect usage: /{} {}\nExample: /{} {}",
        command, args, command, example
    )
}

/// Replies with the unauthorized message and returns `false` for users who may not use the bot.
async fn ensure_authorized(bot: &Bot, msg: &Message, deps: &HandlerDeps) -> bool {
    if deps.is_authorized(sender_id(msg)).await {
        return true;
    }
    reply(bot, msg.chat.id, deps.unauthorized_text()).await;
    false
}

/// Handle /start, with or without a deep link payload
pub(super) async fn handle_start(bot: &Bot, msg: &Message, deps: &HandlerDeps, payload: &str) -> HandlerResult {
    let payload = payload.trim();
    if !payload.is_empty() {
        return handle_link_access(bot, msg, deps, payload).await;
    }

    let user_id = sender_id(msg);
    if !deps.is_authorized(user_id).await {
        log::info!("Access denied for user {}", user_id);
        let screen = menus::access_denied(
            user_id,
            deps.config.admin_contact_display(),
            deps.config.admin_contact_url(),
        );
        send_screen(bot, msg.chat.id, screen).await?;
        return Ok(());
    }

    let screen = menus::main_menu(&sender_first_name(msg), deps.is_admin(user_id));
    send_screen(bot, msg.chat.id, screen).await?;
    Ok(())
}

pub(super) async fn handle_help(bot: &Bot, msg: &Message, deps: &HandlerDeps) -> HandlerResult {
    let user_id = sender_id(msg);
    if !ensure_authorized(bot, msg, deps).await {
        return Ok(());
    }
    let caption = deps.caption_settings_or_default().await;
    let screen = menus::help(deps.is_admin(user_id), &caption, deps.config.admin_contact_display());
    send_screen(bot, msg.chat.id, screen).await?;
    Ok(())
}

/// Handle /upload and /bulkupload
pub(super) async fn handle_upload(bot: &Bot, msg: &Message, deps: &HandlerDeps, args: &str, bulk: bool) -> HandlerResult {
    if !ensure_authorized(bot, msg, deps).await {
        return Ok(());
    }

    let group_name = args.trim();
    if group_name.is_empty() {
        let text = if bulk {
            usage("bulkupload", "<group_name>", "MyPhotos")
        } else {
            usage("upload", "<group_name>", "MyDocuments")
        };
        bot.send_message(msg.chat.id, text).await?;
        return Ok(());
    }

    let user_id = sender_id(msg);
    let screen = if bulk {
        let session_id = generate_link_code();
        deps.sessions.start_bulk(user_id, &session_id, group_name);
        log::info!("User {} started bulk session {} for group '{}'", user_id, session_id, group_name);
        menus::bulk_upload_prompt(group_name, &session_id)
    } else {
        deps.sessions.start_single(user_id, group_name);
        log::info!("User {} started single upload to group '{}'", user_id, group_name);
        menus::single_upload_prompt(group_name)
    };
    send_screen(bot, msg.chat.id, screen).await?;
    Ok(())
}

pub(super) async fn handle_groups(bot: &Bot, msg: &Message, deps: &HandlerDeps) -> HandlerResult {
    if !ensure_authorized(bot, msg, deps).await {
        return Ok(());
    }

    match deps.store.list_groups(sender_id(msg), GROUPS_LIST_LIMIT).await {
        Ok(groups) => {
            send_screen(bot, msg.chat.id, menus::groups_list(&groups)).await?;
        }
        Err(e) => {
            log::error!("Groups load error for user {}: {}", sender_id(msg), e);
            reply(bot, msg.chat.id, "Error loading groups. Please try again. 😔").await;
        }
    }
    Ok(())
}

fn serial_args_error_text(command: &str, err: SerialArgsError) -> String {
    match err {
        SerialArgsError::Missing => usage(command, "<group_name> <file_number>", "MyDocuments 001"),
        SerialArgsError::NotPositive => "File number must be positive. 🔢".to_string(),
        SerialArgsError::NotANumber => "Invalid file number. Please provide a positive integer. 🔢".to_string(),
    }
}

pub(super) async fn handle_get_link(bot: &Bot, msg: &Message, deps: &HandlerDeps, args: &str) -> HandlerResult {
    if !ensure_authorized(bot, msg, deps).await {
        return Ok(());
    }
    let (group_name, serial) = match parse_group_and_serial(args) {
        Ok(parsed) => parsed,
        Err(e) => {
            bot.send_message(msg.chat.id, serial_args_error_text("getlink", e)).await?;
            return Ok(());
        }
    };

    let user_id = sender_id(msg);
    let result = async {
        let Some(entry) = deps.store.file_by_serial(&group_name, serial, user_id).await? else {
            return Ok(None);
        };
        let link = deps.store.file_link(entry.file.id, user_id).await?;
        Ok::<_, crate::core::error::AppError>(Some((entry, link)))
    }
    .await;

    match result {
        Ok(Some((entry, link))) => {
            let url = deps.deep_link(&link.link_code);
            let screen = menus::file_link(&entry.file.file_name, &entry.group_name, &url);
            send_screen(bot, msg.chat.id, screen).await?;
        }
        Ok(None) => reply(bot, msg.chat.id, "File not found in the specified group. 🤷‍♂️").await,
        Err(e) => {
            log::error!("Get link error: {}", e);
            reply(bot, msg.chat.id, "Error generating link. Please try again. 😔").await;
        }
    }
    Ok(())
}

pub(super) async fn handle_get_group_link(bot: &Bot, msg: &Message, deps: &HandlerDeps, args: &str) -> HandlerResult {
    if !ensure_authorized(bot, msg, deps).await {
        return Ok(());
    }
    let group_name = args.trim();
    if group_name.is_empty() {
        bot.send_message(msg.chat.id, usage("getgrouplink", "<group_name>", "MyDocuments"))
            .await?;
        return Ok(());
    }

    let user_id = sender_id(msg);
    let result = async {
        let Some(group) = deps.store.group_by_name(group_name, user_id).await? else {
            return Ok(None);
        };
        let link = deps.store.group_link(group.id, user_id).await?;
        Ok::<_, crate::core::error::AppError>(Some((group, link)))
    }
    .await;

    match result {
        Ok(Some((group, link))) => {
            let url = deps.deep_link(&link.link_code);
            send_screen(bot, msg.chat.id, menus::group_link(&group, &url)).await?;
        }
        Ok(None) => reply(bot, msg.chat.id, "Group not found. 🤷‍♂️").await,
        Err(e) => {
            log::error!("Get group link error: {}", e);
            reply(bot, msg.chat.id, "Error generating group link. Please try again. 😔").await;
        }
    }
    Ok(())
}

pub(super) async fn handle_delete_file(bot: &Bot, msg: &Message, deps: &HandlerDeps, args: &str) -> HandlerResult {
    if !ensure_authorized(bot, msg, deps).await {
        return Ok(());
    }
    let (group_name, serial) = match parse_group_and_serial(args) {
        Ok(parsed) => parsed,
        Err(e) => {
            bot.send_message(msg.chat.id, serial_args_error_text("deletefile", e))
                .await?;
            return Ok(());
        }
    };

    let user_id = sender_id(msg);
    let result = async {
        let Some(entry) = deps.store.file_by_serial(&group_name, serial, user_id).await? else {
            return Ok(None);
        };
        deps.store.delete_file(entry.file.id, user_id).await
    }
    .await;

    match result {
        Ok(Some(deleted)) => {
            log::info!("User {} deleted file {} from group '{}'", user_id, deleted.file.id, deleted.group_name);
            reply(
                bot,
                msg.chat.id,
                format!(
                    "File '{}' deleted successfully from group '{}'! 🗑️",
                    deleted.file.file_name, deleted.group_name
                ),
            )
            .await;
        }
        Ok(None) => {
            reply(
                bot,
                msg.chat.id,
                "File not found in the specified group or you don't have permission. 🚫",
            )
            .await
        }
        Err(e) => {
            log::error!("Delete file error: {}", e);
            reply(bot, msg.chat.id, "Error deleting file. Please try again. 😔").await;
        }
    }
    Ok(())
}

pub(super) async fn handle_delete_group(bot: &Bot, msg: &Message, deps: &HandlerDeps, args: &str) -> HandlerResult {
    if !ensure_authorized(bot, msg, deps).await {
        return Ok(());
    }
    let group_name = args.trim();
    if group_name.is_empty() {
        bot.send_message(msg.chat.id, usage("deletegroup", "<group_name>", "MyDocuments"))
            .await?;
        return Ok(());
    }

    let user_id = sender_id(msg);
    let result = async {
        let Some(group) = deps.store.group_by_name(group_name, user_id).await? else {
            return Ok(None);
        };
        deps.store.delete_group(group.id, user_id).await
    }
    .await;

    match result {
        Ok(Some(group)) => {
            log::info!("User {} deleted group {} ('{}')", user_id, group.id, group.name);
            reply(
                bot,
                msg.chat.id,
                format!("Group '{}' and all its files deleted successfully! 💥", group.name),
            )
            .await;
        }
        Ok(None) => reply(bot, msg.chat.id, "Group not found or you don't have permission. 🚫").await,
        Err(e) => {
            log::error!("Delete group error: {}", e);
            reply(bot, msg.chat.id, "Error deleting group. Please try again. 😔").await;
        }
    }
    Ok(())
}

pub(super) async fn handle_revoke_link(bot: &Bot, msg: &Message, deps: &HandlerDeps, args: &str) -> HandlerResult {
    if !ensure_authorized(bot, msg, deps).await {
        return Ok(());
    }
    let code = args.trim();
    if code.is_empty() {
        bot.send_message(msg.chat.id, usage("revokelink", "<link_code>", "ABCdef123456"))
            .await?;
        return Ok(());
    }

    match deps.store.revoke_link(code, sender_id(msg)).await {
        Ok(true) => {
            reply(
                bot,
                msg.chat.id,
                format!("Link '{}' revoked successfully! 🚫\n\nNo one can access it anymore.", code),
            )
            .await
        }
        Ok(false) => {
            reply(
                bot,
                msg.chat.id,
                "Link not found or you don't have permission to revoke it. 🤷‍♂️",
            )
            .await
        }
        Err(e) => {
            log::error!("Revoke link error: {}", e);
            reply(bot, msg.chat.id, "Error revoking link. Please try again. 😔").await;
        }
    }
    Ok(())
}
