//! Integration tests for Telegram handlers using teloxide_tests
//!
//! These tests run the production handler tree against a mocked Bot API and
//! an in-memory store.
//! Run with: cargo test --test handlers_integration_test

mod common;

use common::{create_deps_with_unreadable_settings, create_test_deps, new_file, ADMIN_ID};
use filecloud::storage::{MemoryStore, NewUser, Store};
use filecloud::telegram::schema;
use serial_test::serial;
use teloxide::types::Message;
use teloxide_tests::{MockBot, MockCallbackQuery, MockMessageText};

/// Texts of the sent messages.
fn texts_of(messages: &[Message]) -> Vec<String> {
    messages.iter().filter_map(|m| m.text().map(str::to_string)).collect()
}

fn any_contains(texts: &[String], needle: &str) -> bool {
    texts.iter().any(|t| t.contains(needle))
}

/// Reads the sender id the mock user was given from the access denied screen.
fn user_id_from_access_denied(texts: &[String]) -> i64 {
    texts
        .iter()
        .find_map(|t| {
            t.lines()
                .find_map(|line| line.strip_prefix("Your User ID: "))
                .and_then(|id| id.trim().parse().ok())
        })
        .expect("access denied screen shows the user id")
}

async fn authorize(store: &MemoryStore, user_id: i64) {
    store
        .add_user(NewUser {
            user_id,
            username: Some("tester".to_string()),
            first_name: Some("Tester".to_string()),
            added_by: ADMIN_ID,
        })
        .await
        .expect("add user");
}

#[tokio::test]
#[serial]
async fn test_start_for_unknown_user_shows_access_denied() {
    let (deps, _store) = create_test_deps().await;
    let mut bot = MockBot::new(MockMessageText::new().text("/start"), schema(deps));

    bot.dispatch().await;

    let texts = texts_of(&bot.get_responses().sent_messages);
    assert_eq!(texts.len(), 1, "Should send exactly one message");
    assert!(texts[0].contains("Access Denied"));
    assert!(texts[0].contains("@filecloud_admin"));
    assert!(texts[0].contains("Your User ID:"));
}

#[tokio::test]
#[serial]
async fn test_commands_are_refused_for_unknown_user() {
    let (deps, _store) = create_test_deps().await;
    let mut bot = MockBot::new(MockMessageText::new().text("/upload Docs"), schema(deps));

    bot.dispatch().await;

    let texts = texts_of(&bot.get_responses().sent_messages);
    assert_eq!(texts, vec!["Unauthorized. Contact admin: @filecloud_admin 🚫".to_string()]);
}

#[tokio::test]
#[serial]
async fn test_authorized_user_gets_main_menu_and_upload_mode() {
    let (deps, store) = create_test_deps().await;
    let mut bot = MockBot::new(MockMessageText::new().text("/start"), schema(deps));

    bot.dispatch().await;
    let user_id = user_id_from_access_denied(&texts_of(&bot.get_responses().sent_messages));
    authorize(&store, user_id).await;

    bot.update(MockMessageText::new().text("/start"));
    bot.dispatch().await;
    let responses = bot.get_responses();
    let menu = responses.sent_messages.last().expect("main menu sent");
    assert!(menu.text().unwrap_or_default().contains("Welcome"));
    assert!(menu.reply_markup().is_some(), "Main menu should have inline keyboard");

    bot.update(MockMessageText::new().text("/upload"));
    bot.dispatch().await;
    assert!(any_contains(&texts_of(&bot.get_responses().sent_messages), "Correct usage: /upload <group_name>"));

    bot.update(MockMessageText::new().text("/upload Docs"));
    bot.dispatch().await;
    let texts = texts_of(&bot.get_responses().sent_messages);
    assert!(any_contains(&texts, "Single Upload Mode"));
    assert!(any_contains(&texts, "Group: Docs"));

    // Text is not a file, so the upload session does not accept it
    bot.update(MockMessageText::new().text("just some words"));
    bot.dispatch().await;
    assert!(any_contains(&texts_of(&bot.get_responses().sent_messages), "Invalid action"));
}

#[tokio::test]
#[serial]
async fn test_invalid_deep_link_is_rejected() {
    let (deps, _store) = create_test_deps().await;
    let mut bot = MockBot::new(MockMessageText::new().text("/start not-a-code!"), schema(deps));

    bot.dispatch().await;

    let texts = texts_of(&bot.get_responses().sent_messages);
    assert!(any_contains(&texts, "Invalid or Expired Link 🚫"));
}

#[tokio::test]
#[serial]
async fn test_unknown_but_wellformed_deep_link_is_rejected() {
    let (deps, _store) = create_test_deps().await;
    let mut bot = MockBot::new(MockMessageText::new().text("/start abcdefghijkl"), schema(deps));

    bot.dispatch().await;

    assert!(any_contains(&texts_of(&bot.get_responses().sent_messages), "Invalid or Expired Link 🚫"));
}

#[tokio::test]
#[serial]
async fn test_help_lists_commands_for_authorized_user() {
    let (deps, store) = create_test_deps().await;
    let mut bot = MockBot::new(MockMessageText::new().text("/start"), schema(deps));
    bot.dispatch().await;
    let user_id = user_id_from_access_denied(&texts_of(&bot.get_responses().sent_messages));
    authorize(&store, user_id).await;

    bot.update(MockMessageText::new().text("/help"));
    bot.dispatch().await;

    let texts = texts_of(&bot.get_responses().sent_messages);
    assert!(any_contains(&texts, "Complete Command Reference"));
    assert!(any_contains(&texts, "/getlink <group> <file_no>"));
    assert!(!any_contains(&texts, "Admin Commands"), "regular users do not see admin commands");
}

#[tokio::test]
#[serial]
async fn test_groups_and_links_for_stored_files() {
    let (deps, store) = create_test_deps().await;
    let mut bot = MockBot::new(MockMessageText::new().text("/start"), schema(deps));
    bot.dispatch().await;
    let user_id = user_id_from_access_denied(&texts_of(&bot.get_responses().sent_messages));
    authorize(&store, user_id).await;

    let group = store.get_or_create_group("Reports", user_id).await.unwrap();
    let file = store.add_file(group.id, new_file("q1.pdf", 2048, user_id)).await.unwrap();

    bot.update(MockMessageText::new().text("/groups"));
    bot.dispatch().await;
    let texts = texts_of(&bot.get_responses().sent_messages);
    assert!(any_contains(&texts, "Your File Groups"));
    assert!(any_contains(&texts, "Reports"));

    bot.update(MockMessageText::new().text("/getlink Reports 1"));
    bot.dispatch().await;
    let texts = texts_of(&bot.get_responses().sent_messages);
    assert!(any_contains(&texts, "Link for file 'q1.pdf' in group 'Reports'"));
    assert!(any_contains(&texts, "https://t.me/filecloud_test_bot?start="));

    bot.update(MockMessageText::new().text("/getlink Reports 7"));
    bot.dispatch().await;
    assert!(any_contains(&texts_of(&bot.get_responses().sent_messages), "File not found in the specified group"));

    bot.update(MockMessageText::new().text("/getlink Reports zero"));
    bot.dispatch().await;
    assert!(any_contains(&texts_of(&bot.get_responses().sent_messages), "Invalid file number"));

    let link = store
        .active_file_link(file.id, user_id)
        .await
        .unwrap()
        .expect("link created by /getlink");
    bot.update(MockMessageText::new().text(format!("/revokelink {}", link.link_code)));
    bot.dispatch().await;
    assert!(store.resolve_link(&link.link_code).await.unwrap().is_none());
}

#[tokio::test]
#[serial]
async fn test_admin_commands_are_refused_for_regular_users() {
    let (deps, store) = create_test_deps().await;
    let mut bot = MockBot::new(MockMessageText::new().text("/start"), schema(deps));
    bot.dispatch().await;
    let user_id = user_id_from_access_denied(&texts_of(&bot.get_responses().sent_messages));
    authorize(&store, user_id).await;

    bot.update(MockMessageText::new().text("/adduser 42"));
    bot.dispatch().await;

    assert!(any_contains(&texts_of(&bot.get_responses().sent_messages), "Admin access required"));
    assert!(!store.is_authorized(42).await.unwrap());
}

#[tokio::test]
#[serial]
async fn test_unknown_callback_is_answered() {
    let (deps, _store) = create_test_deps().await;
    let mut bot = MockBot::new(MockCallbackQuery::new().data("something:unexpected"), schema(deps));

    bot.dispatch().await;

    let responses = bot.get_responses();
    assert!(
        !responses.answered_callback_queries.is_empty(),
        "Unknown buttons should still be answered"
    );
    assert!(responses.sent_messages.is_empty());
}

#[tokio::test]
#[serial]
async fn test_callback_from_unknown_user_is_refused() {
    let (deps, _store) = create_test_deps().await;
    let mut bot = MockBot::new(MockCallbackQuery::new().data("menu:groups"), schema(deps));

    bot.dispatch().await;

    let responses = bot.get_responses();
    assert_eq!(responses.answered_callback_queries.len(), 1);
    assert!(responses.sent_messages.is_empty());
}

#[tokio::test]
#[serial]
async fn test_group_link_delivers_header_files_and_summary() {
    let (deps, store) = create_test_deps().await;
    let owner = 77;
    let group = store.get_or_create_group("Album", owner).await.unwrap();
    store.add_file(group.id, new_file("one.pdf", 10, owner)).await.unwrap();
    store.add_file(group.id, new_file("two.pdf", 20, owner)).await.unwrap();
    let link = store.group_link(group.id, owner).await.unwrap();

    let mut bot = MockBot::new(
        MockMessageText::new().text(format!("/start {}", link.link_code)),
        schema(deps),
    );
    bot.dispatch().await;

    let responses = bot.get_responses();
    let texts = texts_of(&responses.sent_messages);
    assert!(any_contains(&texts, "Forwarding 2 files from 'Album' 📦"));
    assert!(any_contains(&texts, "All 2 files from group 'Album' forwarded successfully! ✅"));
    assert_eq!(responses.sent_messages.len(), 4, "header, two files and the summary");
}

#[tokio::test]
#[serial]
async fn test_empty_group_link_says_so() {
    let (deps, store) = create_test_deps().await;
    let group = store.get_or_create_group("Nothing", 77).await.unwrap();
    let link = store.group_link(group.id, 77).await.unwrap();

    let mut bot = MockBot::new(
        MockMessageText::new().text(format!("/start {}", link.link_code)),
        schema(deps),
    );
    bot.dispatch().await;

    let texts = texts_of(&bot.get_responses().sent_messages);
    assert!(any_contains(&texts, "Group 'Nothing' is empty or files are unavailable."));
}

#[tokio::test]
async fn test_admin_uploads_always_carry_branding() {
    let (deps, store) = create_test_deps().await;

    // A flag set on the admin row directly is ignored
    assert_eq!(store.toggle_user_caption(ADMIN_ID).await.unwrap(), Some(true));
    assert!(!deps.uploader_caption_disabled(ADMIN_ID).await);

    // The admin panel toggle refuses admin targets
    assert_eq!(deps.toggle_user_caption(ADMIN_ID).await.unwrap(), None);
    assert!(store.is_caption_disabled(ADMIN_ID).await.unwrap(), "admin row left untouched");

    authorize(&store, 4242).await;
    assert_eq!(deps.toggle_user_caption(4242).await.unwrap(), Some(true));
    assert!(deps.uploader_caption_disabled(4242).await);
}

#[tokio::test]
#[serial]
async fn test_help_survives_unreadable_settings() {
    let (deps, store) = create_deps_with_unreadable_settings().await;
    let mut bot = MockBot::new(MockMessageText::new().text("/start"), schema(deps));
    bot.dispatch().await;
    let user_id = user_id_from_access_denied(&texts_of(&bot.get_responses().sent_messages));
    authorize(&store, user_id).await;

    bot.update(MockMessageText::new().text("/help"));
    bot.dispatch().await;

    let texts = texts_of(&bot.get_responses().sent_messages);
    assert!(any_contains(&texts, "Complete Command Reference"));
}
