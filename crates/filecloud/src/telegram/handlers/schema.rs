//! Dispatcher schema and handler chain builders

use teloxide::dispatching::{UpdateFilterExt, UpdateHandler};
use teloxide::prelude::*;
use teloxide::types::{CallbackQuery, Message};

use super::admin;
use super::callbacks::handle_callback;
use super::commands;
use super::types::{HandlerDeps, HandlerError};
use super::uploads::message_handler;
use crate::telegram::bot::Command;

/// Creates the main dispatcher schema for the Telegram bot.
///
/// The same tree is used in production and by the `MockBot` integration tests.
///
/// # Arguments
/// * `deps` - Handler dependencies (store, sessions, configuration)
///
/// # Returns
/// The complete handler tree for the bot
pub fn schema(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    let deps_commands = deps.clone();
    let deps_messages = deps.clone();
    let deps_callback = deps;

    dptree::entry()
        // Commands first, so `/upload` during an upload session is still a command
        .branch(command_handler(deps_commands))
        // Files, caption edits and everything else
        .branch(message_handler(deps_messages))
        .branch(callback_handler(deps_callback))
}

fn command_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message().branch(dptree::entry().filter_command::<Command>().endpoint(
        move |bot: Bot, msg: Message, cmd: Command| {
            let deps = deps.clone();
            async move {
                log::info!("🎯 Received command: {:?} from chat {}", cmd, msg.chat.id);

                match cmd {
                    Command::Start(payload) => commands::handle_start(&bot, &msg, &deps, &payload).await,
                    Command::Help => commands::handle_help(&bot, &msg, &deps).await,
                    Command::Clear => admin::handle_clear(&bot, &msg, &deps).await,
                    Command::Upload(args) => commands::handle_upload(&bot, &msg, &deps, &args, false).await,
                    Command::BulkUpload(args) => commands::handle_upload(&bot, &msg, &deps, &args, true).await,
                    Command::Groups => commands::handle_groups(&bot, &msg, &deps).await,
                    Command::GetLink(args) => commands::handle_get_link(&bot, &msg, &deps, &args).await,
                    Command::GetGroupLink(args) => commands::handle_get_group_link(&bot, &msg, &deps, &args).await,
                    Command::DeleteFile(args) => commands::handle_delete_file(&bot, &msg, &deps, &args).await,
                    Command::DeleteGroup(args) => commands::handle_delete_group(&bot, &msg, &deps, &args).await,
                    Command::RevokeLink(args) => commands::handle_revoke_link(&bot, &msg, &deps, &args).await,
                    Command::Admin => admin::handle_admin_panel(&bot, &msg, &deps).await,
                    Command::AddUser(args) => admin::handle_add_user(&bot, &msg, &deps, &args).await,
                    Command::RemoveUser(args) => admin::handle_remove_user(&bot, &msg, &deps, &args).await,
                    Command::ListUsers => admin::handle_list_users(&bot, &msg, &deps).await,
                    Command::BotStats => admin::handle_bot_stats(&bot, &msg, &deps).await,
                }
            }
        },
    ))
}

fn callback_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_callback_query().endpoint(move |bot: Bot, q: CallbackQuery| {
        let deps = deps.clone();
        async move { handle_callback(&bot, &q, &deps).await }
    })
}
