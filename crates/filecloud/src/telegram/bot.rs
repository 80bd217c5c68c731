use reqwest::ClientBuilder;
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;

use crate::core::config::{self, Config};

/// Bot commands enum with descriptions
///
/// Commands taking arguments receive the rest of the message text, which is
/// empty when the user typed the bare command.
#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Available commands:")]
pub enum Command {
    #[command(description = "show the main menu or open a shared link")]
    Start(String),
    #[command(description = "command reference")]
    Help,
    #[command(description = "clear console logs (admin)")]
    Clear,
    #[command(description = "upload a single file: /upload <group>")]
    Upload(String),
    #[command(description = "upload several files: /bulkupload <group>")]
    BulkUpload(String),
    #[command(description = "list your groups")]
    Groups,
    #[command(description = "file link: /getlink <group> <file_no>")]
    GetLink(String),
    #[command(description = "group link: /getgrouplink <group>")]
    GetGroupLink(String),
    #[command(description = "delete a file: /deletefile <group> <file_no>")]
    DeleteFile(String),
    #[command(description = "delete a group: /deletegroup <group>")]
    DeleteGroup(String),
    #[command(description = "revoke a link: /revokelink <code>")]
    RevokeLink(String),
    #[command(description = "admin panel (admin)")]
    Admin,
    #[command(description = "authorize a user: /adduser <id> [username] (admin)")]
    AddUser(String),
    #[command(description = "remove a user: /removeuser <id> (admin)")]
    RemoveUser(String),
    #[command(description = "list authorized users (admin)")]
    ListUsers,
    #[command(description = "bot statistics (admin)")]
    BotStats,
}

/// Creates a Bot instance with custom or default API URL
///
/// # Returns
/// * `Ok(Bot)` - Successfully created bot instance
/// * `Err(anyhow::Error)` - Failed to create bot (invalid URL, network issues, etc.)
pub fn create_bot(config: &Config) -> anyhow::Result<Bot> {
    let client = ClientBuilder::new().timeout(config::network::timeout()).build()?;
    let bot = Bot::with_client(&config.bot_token, client);

    // Check if local Bot API server is configured
    let bot = match std::env::var("BOT_API_URL") {
        Ok(bot_api_url) if !bot_api_url.trim().is_empty() => {
            log::info!("Using custom Bot API URL: {}", bot_api_url);
            let url = url::Url::parse(&bot_api_url).map_err(|e| anyhow::anyhow!("Invalid BOT_API_URL: {}", e))?;
            bot.set_api_url(url)
        }
        _ => bot,
    };

    Ok(bot)
}

/// Registers the command list shown in the Telegram UI.
///
/// Admin-only commands are left out.
pub async fn setup_bot_commands(bot: &Bot) -> Result<(), teloxide::RequestError> {
    use teloxide::types::BotCommand;

    bot.set_my_commands(vec![
        BotCommand::new("start", "Start the bot 🚀"),
        BotCommand::new("help", "Get help and commands 📚"),
        BotCommand::new("upload", "Upload single file ⬆️"),
        BotCommand::new("bulkupload", "Upload multiple files 📦"),
        BotCommand::new("groups", "View your groups 📂"),
        BotCommand::new("getlink", "Get file link 🔗"),
        BotCommand::new("getgrouplink", "Get group link 🔗"),
        BotCommand::new("deletefile", "Delete a file 🗑️"),
        BotCommand::new("deletegroup", "Delete a group 💥"),
        BotCommand::new("revokelink", "Revoke a link 🚫"),
    ])
    .await?;

    Ok(())
}
