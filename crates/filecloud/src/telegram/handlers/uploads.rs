//! File uploads and other non-command messages
//!
//! Files are copied into the storage channel; the database keeps the Telegram
//! file id and channel message id so links keep working after restarts.

use teloxide::dispatching::{UpdateFilterExt, UpdateHandler};
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, Message, MessageId};

use super::types::{reply, sender_id, sender_username, HandlerDeps, HandlerError, HandlerResult};
use crate::core::config::limits::{BULK_UPLOAD_DELAY, MAX_FILE_SIZE};
use crate::core::config::ui::CAPTION_MAX_CHARS;
use crate::core::error::{AppError, AppResult};
use crate::core::links::generate_link_code;
use crate::core::utils::{format_size, truncate_chars};
use crate::storage::{Group, NewFile, StoredFile};
use crate::telegram::callback_data::CallbackAction;
use crate::telegram::media::IncomingFile;
use crate::telegram::menus;
use crate::telegram::sessions::{PendingFile, UserSession};

const INVALID_ACTION: &str = "Invalid action. Use /upload or /bulkupload to start uploading. 🚫";

/// Handler for every message that is not a known command.
pub(super) fn message_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message().endpoint(move |bot: Bot, msg: Message| {
        let deps = deps.clone();
        async move { handle_message(&bot, &msg, &deps).await }
    })
}

async fn handle_message(bot: &Bot, msg: &Message, deps: &HandlerDeps) -> HandlerResult {
    let user_id = sender_id(msg);
    let session = deps.sessions.get(user_id);
    let incoming = IncomingFile::from_message(msg);

    match (session, incoming) {
        (Some(UserSession::SingleUpload { group_name }), Some(file)) => {
            handle_single_upload(bot, msg, deps, &group_name, file).await
        }
        (Some(UserSession::BulkUpload(_)), Some(file)) => handle_bulk_file(bot, msg, deps, file).await,
        (Some(UserSession::CaptionEdit), None) if msg.text().is_some() => handle_caption_edit(bot, msg, deps).await,
        _ => {
            bot.send_message(msg.chat.id, INVALID_ACTION).await?;
            Ok(())
        }
    }
}

fn too_large_text(file: &IncomingFile) -> String {
    format!(
        "File too large! 📏\n\n{} is {}, the limit is {}.",
        file.file_name,
        format_size(file.size),
        format_size(MAX_FILE_SIZE)
    )
}

/// Copies the user's message into the storage channel and records the file.
#[allow(clippy::too_many_arguments)]
async fn store_file(
    bot: &Bot,
    deps: &HandlerDeps,
    group: &Group,
    file: &IncomingFile,
    from_chat: ChatId,
    message_id: MessageId,
    uploader_id: i64,
    uploader_username: Option<String>,
) -> AppResult<StoredFile> {
    let channel = ChatId(deps.config.storage_channel_id);
    let copied = bot.copy_message(channel, from_chat, message_id).await?;

    let new_file = NewFile {
        unique_id: generate_link_code(),
        file_name: file.file_name.clone(),
        kind: file.kind,
        file_size: i64::try_from(file.size).unwrap_or(i64::MAX),
        telegram_file_id: file.file_id.clone(),
        uploader_id,
        uploader_username,
        storage_message_id: Some(i64::from(copied.0)),
    };
    deps.store.add_file(group.id, new_file).await
}

async fn handle_single_upload(
    bot: &Bot,
    msg: &Message,
    deps: &HandlerDeps,
    group_name: &str,
    file: IncomingFile,
) -> HandlerResult {
    let user_id = sender_id(msg);
    if !deps.is_authorized(user_id).await {
        deps.sessions.clear(user_id);
        reply(bot, msg.chat.id, deps.unauthorized_text()).await;
        return Ok(());
    }
    if file.exceeds_limit() {
        bot.send_message(msg.chat.id, too_large_text(&file)).await?;
        return Ok(());
    }

    let result = async {
        let group = deps.store.get_or_create_group(group_name, user_id).await?;
        let stored = store_file(
            bot,
            deps,
            &group,
            &file,
            msg.chat.id,
            msg.id,
            user_id,
            sender_username(msg),
        )
        .await?;
        let link = deps.store.file_link(stored.id, user_id).await?;
        Ok::<_, AppError>((group, stored, link))
    }
    .await;

    match result {
        Ok((group, stored, link)) => {
            deps.sessions.end_single(user_id);
            log::info!(
                "User {} uploaded '{}' to group '{}' as {}",
                user_id,
                stored.file_name,
                group.name,
                stored.serial_number
            );
            let text = menus::upload_complete(&stored, &group.name, &deps.deep_link(&link.link_code));
            bot.send_message(msg.chat.id, text).await?;
        }
        Err(e) => {
            log::error!("Upload error for user {}: {}", user_id, e);
            reply(bot, msg.chat.id, "Error uploading file. Please try again. 😔").await;
        }
    }
    Ok(())
}

async fn handle_bulk_file(bot: &Bot, msg: &Message, deps: &HandlerDeps, file: IncomingFile) -> HandlerResult {
    let user_id = sender_id(msg);
    if file.exceeds_limit() {
        bot.send_message(msg.chat.id, too_large_text(&file)).await?;
        return Ok(());
    }

    let name = file.file_name.clone();
    let size = file.size;
    let pending = PendingFile {
        file,
        chat_id: msg.chat.id.0,
        message_id: msg.id.0,
    };

    match deps.sessions.push_bulk_file(user_id, pending) {
        Some(count) => {
            bot.send_message(
                msg.chat.id,
                format!(
                    "File queued: {} ({}) ✅\nFiles in session: {} 📦",
                    name,
                    format_size(size),
                    count
                ),
            )
            .reply_markup(menus::bulk_keyboard())
            .await?;
        }
        None => {
            bot.send_message(msg.chat.id, INVALID_ACTION).await?;
        }
    }
    Ok(())
}

/// Stores every queued file of the user's bulk session, in the order received.
pub(super) async fn finish_bulk(
    bot: &Bot,
    chat_id: ChatId,
    deps: &HandlerDeps,
    user_id: i64,
    username: Option<String>,
) -> HandlerResult {
    let Some(session) = deps.sessions.take_bulk(user_id) else {
        bot.send_message(chat_id, "No active bulk upload session 🤷‍♂️").await?;
        return Ok(());
    };

    if session.files.is_empty() {
        bot.send_message(chat_id, "No files were uploaded in this session. 🤷‍♂️")
            .await?;
        return Ok(());
    }
    if !deps.is_authorized(user_id).await {
        reply(bot, chat_id, deps.unauthorized_text()).await;
        return Ok(());
    }

    let group = match deps.store.get_or_create_group(&session.group_name, user_id).await {
        Ok(group) => group,
        Err(e) => {
            log::error!("Bulk upload group error for user {}: {}", user_id, e);
            reply(bot, chat_id, "Error uploading files. Please try again. 😔").await;
            return Ok(());
        }
    };

    bot.send_message(
        chat_id,
        format!(
            "Processing {} files for '{}'... ⏳",
            session.files.len(),
            group.name
        ),
    )
    .await?;

    let mut stored = 0usize;
    let mut stored_size = 0u64;
    let mut failed = Vec::new();
    let total = session.files.len();

    for (i, pending) in session.files.iter().enumerate() {
        let result = store_file(
            bot,
            deps,
            &group,
            &pending.file,
            ChatId(pending.chat_id),
            MessageId(pending.message_id),
            user_id,
            username.clone(),
        )
        .await;

        match result {
            Ok(file) => {
                stored += 1;
                stored_size += pending.file.size;
                log::info!(
                    "Bulk session {}: stored '{}' as {}",
                    session.session_id,
                    file.file_name,
                    file.serial_number
                );
            }
            Err(e) => {
                log::error!(
                    "Bulk session {}: failed to store '{}': {}",
                    session.session_id,
                    pending.file.file_name,
                    e
                );
                failed.push(pending.file.file_name.clone());
            }
        }

        if i + 1 < total {
            tokio::time::sleep(BULK_UPLOAD_DELAY).await;
        }
    }

    let link = if stored > 0 {
        match deps.store.group_link(group.id, user_id).await {
            Ok(link) => Some(deps.deep_link(&link.link_code)),
            Err(e) => {
                log::error!("Bulk upload link error for group {}: {}", group.id, e);
                None
            }
        }
    } else {
        None
    };

    let summary = menus::bulk_summary(&group.name, stored, &failed, stored_size, link.as_deref());
    bot.send_message(chat_id, summary).await?;
    Ok(())
}

/// Drops the queued files of the user's bulk session.
pub(super) fn cancel_bulk(deps: &HandlerDeps, user_id: i64) -> Option<usize> {
    deps.sessions.take_bulk(user_id).map(|session| {
        log::info!(
            "User {} cancelled bulk session {} with {} queued files",
            user_id,
            session.session_id,
            session.files.len()
        );
        session.files.len()
    })
}

async fn handle_caption_edit(bot: &Bot, msg: &Message, deps: &HandlerDeps) -> HandlerResult {
    let user_id = sender_id(msg);
    if !deps.is_admin(user_id) {
        deps.sessions.end_caption_edit(user_id);
        bot.send_message(msg.chat.id, "Unauthorized: Admin access required 🚫")
            .await?;
        return Ok(());
    }

    let text = msg.text().map(str::trim).unwrap_or_default();
    if text.is_empty() {
        bot.send_message(msg.chat.id, "Caption cannot be empty. Send the new caption text. ✏️")
            .await?;
        return Ok(());
    }
    let caption = truncate_chars(text, CAPTION_MAX_CHARS);

    match deps.store.set_custom_caption(&caption).await {
        Ok(()) => {
            deps.sessions.end_caption_edit(user_id);
            log::info!("Admin {} updated the branding caption", user_id);
            bot.send_message(msg.chat.id, format!("Caption Updated ✅\n\nNew caption:\n{}", caption))
                .reply_markup(InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback(
                    "Admin Panel ⚙️",
                    CallbackAction::AdminPanel.to_string(),
                )]]))
                .await?;
        }
        Err(e) => {
            log::error!("Caption update error: {}", e);
            reply(bot, msg.chat.id, "Error updating caption 😔").await;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::FileKind;

    #[test]
    fn test_too_large_text_mentions_limit() {
        let file = IncomingFile {
            file_id: "f".to_string(),
            unique_id: "u".to_string(),
            kind: FileKind::Video,
            file_name: "big.mkv".to_string(),
            size: MAX_FILE_SIZE + 1,
        };
        let text = too_large_text(&file);
        assert!(text.contains("big.mkv"));
        assert!(text.contains("10.0 GB"));
    }
}
