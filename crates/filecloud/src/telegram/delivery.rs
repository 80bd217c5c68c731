//! Delivering shared files to whoever opens a deep link
//!
//! Anyone may open a link; authorization is not checked here. Everything the
//! bot sends in response, plus the user's own `/start` message, is deleted
//! after [`AUTO_DELETE_AFTER`].

use std::collections::HashMap;
use std::time::Duration;

use teloxide::prelude::*;
use teloxide::types::{Message, MessageId};

use crate::core::caption::{render_caption, CaptionSettings};
use crate::core::config::delivery::{AUTO_DELETE_AFTER, FAILED_FILES_SHOWN, GROUP_SEND_DELAY};
use crate::core::links::is_valid_code;
use crate::storage::{Group, LinkTarget, StoredFile};
use crate::telegram::handlers::{HandlerDeps, HandlerResult};
use crate::telegram::media::send_stored_file;

/// Entry point for `/start <code>`.
pub async fn handle_link_access(bot: &Bot, msg: &Message, deps: &HandlerDeps, code: &str) -> HandlerResult {
    let chat_id = msg.chat.id;

    let target = if is_valid_code(code) {
        match deps.store.resolve_link(code).await {
            Ok(target) => target,
            Err(e) => {
                log::error!("Link access error for link code {}: {}", code, e);
                bot.send_message(chat_id, "Error accessing file. Please try again. 😔")
                    .await?;
                return Ok(());
            }
        }
    } else {
        None
    };

    let Some(target) = target else {
        log::info!("Chat {} opened invalid or revoked link {:?}", chat_id, code);
        bot.send_message(chat_id, "Invalid or Expired Link 🚫").await?;
        return Ok(());
    };

    let caption = match deps.store.caption_settings().await {
        Ok(settings) => settings,
        Err(e) => {
            log::warn!("Failed to load caption settings, sending without branding: {}", e);
            CaptionSettings {
                enabled: false,
                text: String::new(),
            }
        }
    };

    let mut sent = vec![msg.id];
    let delivered = match target {
        LinkTarget::File(file) => deliver_file(bot, chat_id, deps, &caption, &file, &mut sent).await,
        LinkTarget::Group { group, files } => {
            deliver_group(bot, chat_id, deps, &caption, &group, &files, &mut sent).await
        }
    };

    // Whatever made it into the chat is cleaned up, even after a failed send
    schedule_auto_delete(bot.clone(), chat_id, sent, AUTO_DELETE_AFTER);
    delivered
}

async fn deliver_file(
    bot: &Bot,
    chat_id: ChatId,
    deps: &HandlerDeps,
    caption: &CaptionSettings,
    file: &StoredFile,
    sent: &mut Vec<MessageId>,
) -> HandlerResult {
    log::info!("Delivering file {} to chat {}", file.id, chat_id);
    let uploader_disabled = deps.uploader_caption_disabled(file.uploader_id).await;
    let text = render_caption(&file.file_name, None, caption, uploader_disabled);
    match send_stored_file(bot, chat_id, file.kind(), &file.telegram_file_id, &text).await {
        Ok(message) => sent.push(message.id),
        Err(e) => {
            log::error!("Error forwarding file {} to chat {}: {}", file.id, chat_id, e);
            bot.send_message(chat_id, "Error forwarding file. 😔").await?;
        }
    }
    Ok(())
}

/// Sends a status message of a group delivery. Failures are logged only so
/// the files around it still go out and get cleaned up.
async fn send_status(bot: &Bot, chat_id: ChatId, text: String, sent: &mut Vec<MessageId>) {
    match bot.send_message(chat_id, text).await {
        Ok(message) => sent.push(message.id),
        Err(e) => log::warn!("Failed to send delivery status to chat {}: {}", chat_id, e),
    }
}

async fn deliver_group(
    bot: &Bot,
    chat_id: ChatId,
    deps: &HandlerDeps,
    caption: &CaptionSettings,
    group: &Group,
    files: &[StoredFile],
    sent: &mut Vec<MessageId>,
) -> HandlerResult {
    if files.is_empty() {
        bot.send_message(
            chat_id,
            format!("Group '{}' is empty or files are unavailable. 🤷‍♂️", group.name),
        )
        .await?;
        return Ok(());
    }

    log::info!("Delivering {} files of group {} to chat {}", files.len(), group.id, chat_id);
    let header = format!(
        "Forwarding {} files from '{}' 📦\n\nAuto-delete in 10 minutes... ⏳",
        files.len(),
        group.name
    );
    send_status(bot, chat_id, header, sent).await;

    // Files in one group usually share an uploader
    let mut disabled_by_uploader: HashMap<i64, bool> = HashMap::new();
    let mut failed = Vec::new();
    let mut delivered = 0usize;

    for file in files {
        let uploader_disabled = match disabled_by_uploader.get(&file.uploader_id) {
            Some(disabled) => *disabled,
            None => {
                let disabled = deps.uploader_caption_disabled(file.uploader_id).await;
                disabled_by_uploader.insert(file.uploader_id, disabled);
                disabled
            }
        };
        let text = render_caption(&file.file_name, Some(file.serial_number), caption, uploader_disabled);

        match send_stored_file(bot, chat_id, file.kind(), &file.telegram_file_id, &text).await {
            Ok(message) => {
                sent.push(message.id);
                delivered += 1;
                tokio::time::sleep(GROUP_SEND_DELAY).await;
            }
            Err(e) => {
                log::error!(
                    "Error forwarding file '{}' (id {}) in group '{}': {}",
                    file.file_name,
                    file.id,
                    group.name,
                    e
                );
                failed.push(file.file_name.clone());
            }
        }
    }

    send_status(bot, chat_id, group_summary(&group.name, delivered, &failed), sent).await;
    Ok(())
}

/// Final message after a group delivery.
///
/// Failed file names are listed whenever there are any.
pub fn group_summary(group_name: &str, delivered: usize, failed: &[String]) -> String {
    if failed.is_empty() {
        if delivered == 0 {
            return format!(
                "No files could be forwarded from group '{}'. They might be unavailable or the bot lacks permissions. 😔",
                group_name
            );
        }
        return format!(
            "All {} files from group '{}' forwarded successfully! ✅",
            delivered, group_name
        );
    }

    let mut text = format!(
        "Completed forwarding for group '{}', but encountered errors with some files: ❌\n",
        group_name
    );
    let shown: Vec<String> = failed
        .iter()
        .take(FAILED_FILES_SHOWN)
        .map(|name| format!("- {}", name))
        .collect();
    text.push_str(&shown.join("\n"));
    if failed.len() > FAILED_FILES_SHOWN {
        text.push_str(&format!("\n...and {} more.", failed.len() - FAILED_FILES_SHOWN));
    }
    text
}

/// Deletes `message_ids` from the chat after `delay`.
///
/// Runs in a spawned task. Messages the user already removed make
/// `delete_message` fail; those errors are ignored.
pub fn schedule_auto_delete(bot: Bot, chat_id: ChatId, message_ids: Vec<MessageId>, delay: Duration) {
    if message_ids.is_empty() {
        return;
    }
    log::debug!(
        "Scheduling auto-delete of {} messages in chat {} in {:?}",
        message_ids.len(),
        chat_id,
        delay
    );
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        for id in message_ids {
            if let Err(e) = bot.delete_message(chat_id, id).await {
                log::debug!("Auto-delete of message {} in chat {} skipped: {}", id.0, chat_id, e);
            }
        }
    });
}
