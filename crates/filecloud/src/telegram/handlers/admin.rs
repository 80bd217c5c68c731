//! Admin command handlers

use std::num::ParseIntError;

use teloxide::prelude::*;
use teloxide::types::Message;

use super::types::{reply, send_screen, sender_first_name, sender_id, HandlerDeps, HandlerResult};
use crate::core::logging::clear_console;
use crate::storage::NewUser;
use crate::telegram::menus;

const ADMIN_ONLY: &str = "Unauthorized: Admin access required 🚫";

/// Replies with the admin-only message and returns `false` for non-admins.
async fn ensure_admin(bot: &Bot, msg: &Message, deps: &HandlerDeps) -> bool {
    let user_id = sender_id(msg);
    if deps.is_admin(user_id) {
        return true;
    }
    log::warn!("User {} tried an admin command", user_id);
    reply(bot, msg.chat.id, ADMIN_ONLY).await;
    false
}

/// Parsed `/adduser <user_id> [username]` arguments.
#[derive(Debug, PartialEq, Eq)]
pub struct AddUserArgs {
    pub user_id: i64,
    pub username: Option<String>,
}

/// Returns `None` for an empty argument list.
pub fn parse_add_user_args(args: &str) -> Option<Result<AddUserArgs, ParseIntError>> {
    let mut parts = args.split_whitespace();
    let raw_id = parts.next()?;
    Some(raw_id.parse::<i64>().map(|user_id| AddUserArgs {
        user_id,
        username: parts.next().map(|u| u.trim_start_matches('@').to_string()),
    }))
}

pub(super) async fn handle_clear(bot: &Bot, msg: &Message, deps: &HandlerDeps) -> HandlerResult {
    if !ensure_admin(bot, msg, deps).await {
        return Ok(());
    }
    clear_console();
    log::info!("Console cleared by user command");
    bot.send_message(msg.chat.id, "Console Cleared ✅\n\nAll console logs have been cleared.")
        .await?;
    Ok(())
}

pub(super) async fn handle_admin_panel(bot: &Bot, msg: &Message, deps: &HandlerDeps) -> HandlerResult {
    if !ensure_admin(bot, msg, deps).await {
        return Ok(());
    }
    let loaded = async {
        let stats = deps.store.stats().await?;
        let caption = deps.store.caption_settings().await?;
        Ok::<_, crate::core::error::AppError>((stats, caption))
    }
    .await;

    match loaded {
        Ok((stats, caption)) => {
            send_screen(bot, msg.chat.id, menus::admin_panel(&stats, &caption)).await?;
        }
        Err(e) => {
            log::error!("Admin panel error: {}", e);
            reply(bot, msg.chat.id, "Error loading admin panel 😔").await;
        }
    }
    Ok(())
}

pub(super) async fn handle_add_user(bot: &Bot, msg: &Message, deps: &HandlerDeps, args: &str) -> HandlerResult {
    if !ensure_admin(bot, msg, deps).await {
        return Ok(());
    }

    let parsed = match parse_add_user_args(args) {
        None => {
            bot.send_message(
                msg.chat.id,
                "Usage: /adduser <user_id> [username]\nExample: /adduser 123456789 newuser",
            )
            .await?;
            return Ok(());
        }
        Some(Err(_)) => {
            bot.send_message(msg.chat.id, "Invalid user ID format 🔢").await?;
            return Ok(());
        }
        Some(Ok(parsed)) => parsed,
    };

    let new_user = NewUser {
        user_id: parsed.user_id,
        username: parsed.username.clone(),
        first_name: None,
        added_by: sender_id(msg),
    };

    match deps.store.add_user(new_user).await {
        Ok(true) => {
            log::info!("Admin {} authorized user {}", sender_id(msg), parsed.user_id);
            reply(
                bot,
                msg.chat.id,
                format!(
                    "User Added Successfully! ✅\n\nUser ID: {}\nUsername: @{}\nAdded by: {}",
                    parsed.user_id,
                    parsed.username.as_deref().unwrap_or("Unknown"),
                    sender_first_name(msg)
                ),
            )
            .await;
        }
        Ok(false) => {
            reply(
                bot,
                msg.chat.id,
                format!("User {} is already authorized! 👥", parsed.user_id),
            )
            .await
        }
        Err(e) => {
            log::error!("Add user error: {}", e);
            reply(bot, msg.chat.id, "Error adding user 😔").await;
        }
    }
    Ok(())
}

pub(super) async fn handle_remove_user(bot: &Bot, msg: &Message, deps: &HandlerDeps, args: &str) -> HandlerResult {
    if !ensure_admin(bot, msg, deps).await {
        return Ok(());
    }

    let Some(raw_id) = args.split_whitespace().next() else {
        bot.send_message(msg.chat.id, "Usage: /removeuser <user_id>").await?;
        return Ok(());
    };
    let Ok(user_id) = raw_id.parse::<i64>() else {
        bot.send_message(msg.chat.id, "Invalid user ID format 🔢").await?;
        return Ok(());
    };
    if deps.is_admin(user_id) {
        bot.send_message(msg.chat.id, "Cannot remove admin users! 👑").await?;
        return Ok(());
    }

    match deps.store.remove_user(user_id).await {
        Ok(true) => {
            log::info!("Admin {} removed user {}", sender_id(msg), user_id);
            deps.sessions.clear(user_id);
            reply(bot, msg.chat.id, format!("User {} removed successfully! ➖", user_id)).await;
        }
        Ok(false) => reply(bot, msg.chat.id, format!("User {} not found 🤷‍♂️", user_id)).await,
        Err(e) => {
            log::error!("Remove user error: {}", e);
            reply(bot, msg.chat.id, "Error removing user 😔").await;
        }
    }
    Ok(())
}

pub(super) async fn handle_list_users(bot: &Bot, msg: &Message, deps: &HandlerDeps) -> HandlerResult {
    if !ensure_admin(bot, msg, deps).await {
        return Ok(());
    }

    let users = match deps.store.list_users(&deps.config.admin_ids).await {
        Ok(users) => users,
        Err(e) => {
            log::error!("List users error: {}", e);
            reply(bot, msg.chat.id, "Error loading users 😔").await;
            return Ok(());
        }
    };

    let chunks = menus::users_list(&users);
    let last = chunks.len().saturating_sub(1);
    for (i, chunk) in chunks.into_iter().enumerate() {
        if i == last && !users.is_empty() {
            bot.send_message(msg.chat.id, chunk)
                .reply_markup(menus::users_keyboard(&users))
                .await?;
        } else {
            bot.send_message(msg.chat.id, chunk).await?;
        }
    }
    Ok(())
}

pub(super) async fn handle_bot_stats(bot: &Bot, msg: &Message, deps: &HandlerDeps) -> HandlerResult {
    if !ensure_admin(bot, msg, deps).await {
        return Ok(());
    }
    match deps.store.stats().await {
        Ok(stats) => {
            send_screen(bot, msg.chat.id, menus::detailed_stats(&stats)).await?;
        }
        Err(e) => {
            log::error!("Bot stats error: {}", e);
            reply(bot, msg.chat.id, "Error loading statistics 😔").await;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_add_user_args() {
        assert_eq!(parse_add_user_args(""), None);
        assert_eq!(parse_add_user_args("   "), None);
        assert!(matches!(parse_add_user_args("abc"), Some(Err(_))));
        assert_eq!(
            parse_add_user_args("123456789 @newuser"),
            Some(Ok(AddUserArgs {
                user_id: 123456789,
                username: Some("newuser".to_string()),
            }))
        );
        assert_eq!(
            parse_add_user_args("42"),
            Some(Ok(AddUserArgs {
                user_id: 42,
                username: None,
            }))
        );
    }
}
