//! Inline button handlers
//!
//! Every action is scoped to the user who pressed the button: group, file and
//! link lookups pass the caller's id as owner.

use teloxide::prelude::*;
use teloxide::types::{CallbackQuery, InlineKeyboardButton, InlineKeyboardMarkup, MessageId};

use super::types::{edit_screen, user_id_of, HandlerDeps, HandlerResult};
use super::uploads::{cancel_bulk, finish_bulk};
use crate::core::config::ui::{GROUPS_LIST_LIMIT, GROUP_PREVIEW_FILES};
use crate::core::links::generate_link_code;
use crate::telegram::callback_data::CallbackAction;
use crate::telegram::menus::{self, Screen};

/// Chat and message the pressed button belongs to.
#[derive(Clone, Copy)]
struct Origin {
    chat_id: ChatId,
    message_id: MessageId,
}

fn back_to_groups(text: impl Into<String>) -> Screen {
    Screen {
        text: text.into(),
        keyboard: InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback(
            "My Groups 📂",
            CallbackAction::Groups.to_string(),
        )]]),
    }
}

fn is_admin_action(action: &CallbackAction) -> bool {
    matches!(
        action,
        CallbackAction::AdminPanel
            | CallbackAction::AdminStats
            | CallbackAction::AdminUsers
            | CallbackAction::AdminEditCaption
            | CallbackAction::AdminCancelCaptionEdit
            | CallbackAction::AdminToggleCaption
            | CallbackAction::ToggleUserCaption(_)
    )
}

pub(super) async fn handle_callback(bot: &Bot, q: &CallbackQuery, deps: &HandlerDeps) -> HandlerResult {
    let user_id = user_id_of(&q.from);
    let data = q.data.as_deref().unwrap_or_default();

    let action = match data.parse::<CallbackAction>() {
        Ok(action) => action,
        Err(e) => {
            log::warn!("Ignoring unknown callback data {:?} from user {}", e.0, user_id);
            bot.answer_callback_query(q.id.clone()).await?;
            return Ok(());
        }
    };

    let allowed = if is_admin_action(&action) {
        deps.is_admin(user_id)
    } else {
        deps.is_authorized(user_id).await
    };
    if !allowed {
        let text = if is_admin_action(&action) {
            "Unauthorized: Admin access required 🚫".to_string()
        } else {
            deps.unauthorized_text()
        };
        bot.answer_callback_query(q.id.clone())
            .text(text)
            .show_alert(true)
            .await?;
        return Ok(());
    }

    bot.answer_callback_query(q.id.clone()).await?;

    let Some(origin) = q.message.as_ref().map(|m| Origin {
        chat_id: m.chat().id,
        message_id: m.id(),
    }) else {
        log::warn!("Callback {} from user {} has no message attached", data, user_id);
        return Ok(());
    };

    log::info!("Callback {} from user {}", data, user_id);

    let result = dispatch(bot, q, deps, user_id, origin, action).await;
    if let Err(e) = result {
        log::error!("Callback {} failed for user {}: {}", data, user_id, e);
        if let Err(e) = bot
            .send_message(origin.chat_id, "Something went wrong. Please try again. 😔")
            .await
        {
            log::warn!("Failed to send callback error reply to chat {}: {}", origin.chat_id, e);
        }
    }
    Ok(())
}

async fn dispatch(
    bot: &Bot,
    q: &CallbackQuery,
    deps: &HandlerDeps,
    user_id: i64,
    origin: Origin,
    action: CallbackAction,
) -> HandlerResult {
    let edit = |screen: Screen| edit_screen(bot, origin.chat_id, origin.message_id, screen);

    match action {
        CallbackAction::MainMenu => {
            edit(menus::main_menu(&q.from.first_name, deps.is_admin(user_id))).await?;
        }
        CallbackAction::Groups => {
            let groups = deps.store.list_groups(user_id, GROUPS_LIST_LIMIT).await?;
            edit(menus::groups_list(&groups)).await?;
        }
        CallbackAction::UploadHelp => {
            edit(menus::upload_help()).await?;
        }
        CallbackAction::Help => {
            let caption = deps.store.caption_settings().await?;
            let screen = menus::help(deps.is_admin(user_id), &caption, deps.config.admin_contact_display());
            edit(screen).await?;
        }

        CallbackAction::ViewGroup(group_id) => {
            let Some(group) = deps.store.group_by_id(group_id, user_id).await? else {
                edit(back_to_groups("Group not found or you don't have access. 🚫")).await?;
                return Ok(());
            };
            let preview = deps.store.group_files(group.id, Some(GROUP_PREVIEW_FILES)).await?;
            let link = deps.store.active_group_link(group.id, user_id).await?;
            let screen = menus::group_details(&group, &preview, link.as_ref().map(|l| l.link_code.as_str()));
            edit(screen).await?;
        }
        CallbackAction::GroupLink(group_id) => {
            let Some(group) = deps.store.group_by_id(group_id, user_id).await? else {
                edit(back_to_groups("Group not found or you don't have access. 🚫")).await?;
                return Ok(());
            };
            let link = deps.store.group_link(group.id, user_id).await?;
            edit(menus::group_link(&group, &deps.deep_link(&link.link_code))).await?;
        }
        CallbackAction::ListFiles(group_id) => {
            let Some(group) = deps.store.group_by_id(group_id, user_id).await? else {
                edit(back_to_groups("Group not found or you don't have access. 🚫")).await?;
                return Ok(());
            };
            let files = deps.store.group_files(group.id, None).await?;
            let (chunks, keyboard) = menus::file_list(&group, &files);
            edit_chunks(bot, origin, chunks, keyboard).await?;
        }
        CallbackAction::AddFiles(group_id) => {
            let Some(group) = deps.store.group_by_id(group_id, user_id).await? else {
                edit(back_to_groups("Group not found or you don't have access. 🚫")).await?;
                return Ok(());
            };
            let session_id = generate_link_code();
            deps.sessions.start_bulk(user_id, &session_id, &group.name);
            log::info!("User {} adding files to group {} (session {})", user_id, group.id, session_id);
            edit(menus::bulk_upload_prompt(&group.name, &session_id)).await?;
        }
        CallbackAction::DeleteGroup(group_id) => {
            let Some(group) = deps.store.group_by_id(group_id, user_id).await? else {
                edit(back_to_groups("Group not found or you don't have access. 🚫")).await?;
                return Ok(());
            };
            edit(menus::confirm_delete_group(&group)).await?;
        }
        CallbackAction::ConfirmDeleteGroup(group_id) => {
            let screen = match deps.store.delete_group(group_id, user_id).await? {
                Some(group) => {
                    log::info!("User {} deleted group {} ('{}')", user_id, group.id, group.name);
                    back_to_groups(format!(
                        "Group '{}' and all its contents deleted successfully! ✅",
                        group.name
                    ))
                }
                None => back_to_groups("Group not found or you don't have permission. 🚫"),
            };
            edit(screen).await?;
        }

        CallbackAction::ViewFile(file_id) => {
            let Some(entry) = deps.store.file_by_id(file_id, user_id).await? else {
                edit(back_to_groups("File not found or you don't have access. 🚫")).await?;
                return Ok(());
            };
            let link = deps.store.file_link(entry.file.id, user_id).await?;
            let screen = menus::file_details(&entry, &deps.deep_link(&link.link_code), &link.link_code);
            edit(screen).await?;
        }
        CallbackAction::DeleteFile(file_id) => {
            let Some(entry) = deps.store.file_by_id(file_id, user_id).await? else {
                edit(back_to_groups("File not found or you don't have access. 🚫")).await?;
                return Ok(());
            };
            edit(menus::confirm_delete_file(&entry)).await?;
        }
        CallbackAction::ConfirmDeleteFile(file_id) => {
            let screen = match deps.store.delete_file(file_id, user_id).await? {
                Some(deleted) => {
                    log::info!("User {} deleted file {}", user_id, deleted.file.id);
                    Screen {
                        text: format!("File '{}' deleted successfully! ✅", deleted.file.file_name),
                        keyboard: InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback(
                            "Back to Group ℹ️",
                            CallbackAction::ViewGroup(deleted.file.group_id).to_string(),
                        )]]),
                    }
                }
                None => back_to_groups("File not found or you don't have permission. 🚫"),
            };
            edit(screen).await?;
        }

        CallbackAction::RevokeLink(code) => {
            let text = if deps.store.revoke_link(&code, user_id).await? {
                log::info!("User {} revoked link {}", user_id, code);
                format!("Link '{}' revoked successfully! 🚫", code)
            } else {
                "Link not found or you don't have permission. 🤷‍♂️".to_string()
            };
            edit(back_to_groups(text)).await?;
        }

        CallbackAction::FinishBulk => {
            if let Err(e) = bot.edit_message_reply_markup(origin.chat_id, origin.message_id).await {
                log::debug!("Could not clear bulk keyboard: {}", e);
            }
            finish_bulk(bot, origin.chat_id, deps, user_id, q.from.username.clone()).await?;
        }
        CallbackAction::CancelBulk => {
            let text = match cancel_bulk(deps, user_id) {
                Some(count) => format!("Bulk Upload Cancelled ❌\n\n{} queued files discarded.", count),
                None => "No active bulk upload session 🤷‍♂️".to_string(),
            };
            edit(back_to_groups(text)).await?;
        }
        CallbackAction::CancelUpload => {
            let text = if deps.sessions.end_single(user_id) {
                "Upload Cancelled ❌"
            } else {
                "No active upload to cancel 🤷‍♂️"
            };
            edit(back_to_groups(text)).await?;
        }

        CallbackAction::AdminPanel => {
            let stats = deps.store.stats().await?;
            let caption = deps.store.caption_settings().await?;
            edit(menus::admin_panel(&stats, &caption)).await?;
        }
        CallbackAction::AdminStats => {
            let stats = deps.store.stats().await?;
            edit(menus::detailed_stats(&stats)).await?;
        }
        CallbackAction::AdminUsers => {
            let users = deps.store.list_users(&deps.config.admin_ids).await?;
            edit_chunks(bot, origin, menus::users_list(&users), menus::users_keyboard(&users)).await?;
        }
        CallbackAction::AdminEditCaption => {
            let caption = deps.store.caption_settings().await?;
            deps.sessions.start_caption_edit(user_id);
            edit(menus::caption_edit_prompt(&caption.text)).await?;
        }
        CallbackAction::AdminCancelCaptionEdit => {
            deps.sessions.end_caption_edit(user_id);
            let stats = deps.store.stats().await?;
            let caption = deps.store.caption_settings().await?;
            edit(menus::admin_panel(&stats, &caption)).await?;
        }
        CallbackAction::AdminToggleCaption => {
            let current = deps.store.caption_settings().await?;
            deps.store.set_caption_enabled(!current.enabled).await?;
            log::info!(
                "Admin {} turned captions {}",
                user_id,
                if current.enabled { "off" } else { "on" }
            );
            let stats = deps.store.stats().await?;
            let caption = deps.store.caption_settings().await?;
            edit(menus::admin_panel(&stats, &caption)).await?;
        }
        CallbackAction::ToggleUserCaption(target) => {
            match deps.toggle_user_caption(target).await? {
                Some(disabled) => log::info!(
                    "Admin {} set caption_disabled={} for user {}",
                    user_id,
                    disabled,
                    target
                ),
                None => log::warn!("Caption toggle skipped for user {}", target),
            }
            let users = deps.store.list_users(&deps.config.admin_ids).await?;
            bot.edit_message_reply_markup(origin.chat_id, origin.message_id)
                .reply_markup(menus::users_keyboard(&users))
                .await?;
        }
    }
    Ok(())
}

/// Shows a multi-part listing: the pressed message becomes the first part,
/// the rest are sent as new messages. The keyboard goes on the last part.
async fn edit_chunks(
    bot: &Bot,
    origin: Origin,
    chunks: Vec<String>,
    keyboard: InlineKeyboardMarkup,
) -> HandlerResult {
    let mut chunks = chunks.into_iter();
    let first = chunks.next().unwrap_or_default();
    let rest: Vec<String> = chunks.collect();

    if rest.is_empty() {
        edit_screen(bot, origin.chat_id, origin.message_id, Screen { text: first, keyboard }).await?;
        return Ok(());
    }

    bot.edit_message_text(origin.chat_id, origin.message_id, first).await?;
    let last = rest.len() - 1;
    for (i, chunk) in rest.into_iter().enumerate() {
        if i == last {
            bot.send_message(origin.chat_id, chunk)
                .reply_markup(keyboard.clone())
                .await?;
        } else {
            bot.send_message(origin.chat_id, chunk).await?;
        }
    }
    Ok(())
}
