//! Behaviour tests for the storage layer
//!
//! The same suite runs against `MemoryStore` and, when `TEST_DATABASE_URL`
//! points at a disposable Postgres database, against `PgStore`:
//!
//! TEST_DATABASE_URL=postgres://... cargo test --test store_test -- --ignored

mod common;

use common::{new_file, ADMIN_ID};
use filecloud::storage::{LinkTarget, MemoryStore, NewUser, PgStore, Store};
use pretty_assertions::assert_eq;

/// Owner ids that do not clash with rows left over from earlier runs.
fn fresh_owner() -> i64 {
    chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default().abs() % 1_000_000_000_000 + 1_000_000_000
}

async fn seeded_memory_store() -> MemoryStore {
    let store = MemoryStore::new();
    store
        .init_schema(&[ADMIN_ID], "t.me/test_channel")
        .await
        .expect("init schema");
    store
}

// ============================================================================
// Shared suite
// ============================================================================

async fn serials_and_totals(store: &dyn Store) {
    let owner = fresh_owner();
    let group = store.get_or_create_group("Docs", owner).await.unwrap();
    assert_eq!(group.total_files, 0);

    let tag = owner.to_string();
    let a = store.add_file(group.id, new_file(&format!("a-{tag}"), 100, owner)).await.unwrap();
    let b = store.add_file(group.id, new_file(&format!("b-{tag}"), 250, owner)).await.unwrap();
    assert_eq!((a.serial_number, b.serial_number), (1, 2));

    let group = store.group_by_id(group.id, owner).await.unwrap().unwrap();
    assert_eq!(group.total_files, 2);
    assert_eq!(group.total_size, 350);

    // Same name, same owner: the existing group comes back
    let again = store.get_or_create_group("Docs", owner).await.unwrap();
    assert_eq!(again.id, group.id);

    // Serials keep counting after a delete and are never reused
    store.delete_file(a.id, owner).await.unwrap().unwrap();
    let c = store.add_file(group.id, new_file(&format!("c-{tag}"), 50, owner)).await.unwrap();
    assert_eq!(c.serial_number, 3);

    let group = store.group_by_id(group.id, owner).await.unwrap().unwrap();
    assert_eq!(group.total_files, 2);
    assert_eq!(group.total_size, 300);

    let files = store.group_files(group.id, None).await.unwrap();
    let serials: Vec<i32> = files.iter().map(|f| f.serial_number).collect();
    assert_eq!(serials, vec![2, 3]);

    let found = store.file_by_serial("Docs", 3, owner).await.unwrap().unwrap();
    assert_eq!(found.file.id, c.id);
    assert_eq!(found.group_name, "Docs");
    assert!(store.file_by_serial("Docs", 1, owner).await.unwrap().is_none());
}

async fn owner_scoping(store: &dyn Store) {
    let alice = fresh_owner();
    let bob = alice + 1;

    let alice_group = store.get_or_create_group("Shared", alice).await.unwrap();
    let bob_group = store.get_or_create_group("Shared", bob).await.unwrap();
    assert_ne!(alice_group.id, bob_group.id, "group names are unique per owner only");

    let file = store
        .add_file(alice_group.id, new_file(&format!("private-{alice}"), 10, alice))
        .await
        .unwrap();

    assert!(store.group_by_id(alice_group.id, bob).await.unwrap().is_none());
    assert!(store.file_by_id(file.id, bob).await.unwrap().is_none());
    assert!(store.file_by_serial("Shared", 1, bob).await.unwrap().is_none());
    assert!(store.delete_file(file.id, bob).await.unwrap().is_none());
    assert!(store.delete_group(alice_group.id, bob).await.unwrap().is_none());

    let bob_groups = store.list_groups(bob, 20).await.unwrap();
    assert!(bob_groups.iter().all(|g| g.owner_id == bob));

    // Alice's data is untouched
    assert!(store.file_by_id(file.id, alice).await.unwrap().is_some());
}

async fn links_are_reused_revoked_and_counted(store: &dyn Store) {
    let owner = fresh_owner();
    let group = store.get_or_create_group("Links", owner).await.unwrap();
    let file = store
        .add_file(group.id, new_file(&format!("linked-{owner}"), 42, owner))
        .await
        .unwrap();

    let first = store.file_link(file.id, owner).await.unwrap();
    let second = store.file_link(file.id, owner).await.unwrap();
    assert_eq!(first.link_code, second.link_code, "an active link is reused");
    assert_eq!(first.link_code.len(), 12);

    match store.resolve_link(&first.link_code).await.unwrap() {
        Some(LinkTarget::File(resolved)) => assert_eq!(resolved.id, file.id),
        other => panic!("expected a file target, got {:?}", other),
    }
    store.resolve_link(&first.link_code).await.unwrap();
    let active = store.active_file_link(file.id, owner).await.unwrap().unwrap();
    assert_eq!(active.clicks, 2);

    // Someone else cannot revoke it
    assert!(!store.revoke_link(&first.link_code, owner + 1).await.unwrap());
    assert!(store.revoke_link(&first.link_code, owner).await.unwrap());
    assert!(!store.revoke_link(&first.link_code, owner).await.unwrap(), "already revoked");

    assert!(store.resolve_link(&first.link_code).await.unwrap().is_none());
    assert!(store.active_file_link(file.id, owner).await.unwrap().is_none());

    let replacement = store.file_link(file.id, owner).await.unwrap();
    assert_ne!(replacement.link_code, first.link_code);
}

async fn concurrent_link_requests_share_one_link(store: &dyn Store) {
    let owner = fresh_owner();
    let group = store.get_or_create_group("Raced", owner).await.unwrap();
    let file = store
        .add_file(group.id, new_file(&format!("raced-{owner}"), 7, owner))
        .await
        .unwrap();

    let (a, b) = tokio::join!(store.file_link(file.id, owner), store.file_link(file.id, owner));
    let (a, b) = (a.unwrap(), b.unwrap());
    assert_eq!(a.link_code, b.link_code, "both requests get the same file link");

    let (c, d) = tokio::join!(store.group_link(group.id, owner), store.group_link(group.id, owner));
    let (c, d) = (c.unwrap(), d.unwrap());
    assert_eq!(c.link_code, d.link_code, "both requests get the same group link");

    // No second active row hides behind the first
    assert!(store.revoke_link(&a.link_code, owner).await.unwrap());
    assert!(store.active_file_link(file.id, owner).await.unwrap().is_none());
    assert!(store.revoke_link(&c.link_code, owner).await.unwrap());
    assert!(store.active_group_link(group.id, owner).await.unwrap().is_none());
}

async fn group_links_resolve_to_ordered_files(store: &dyn Store) {
    let owner = fresh_owner();
    let group = store.get_or_create_group("Album", owner).await.unwrap();
    for name in ["one", "two", "three"] {
        store
            .add_file(group.id, new_file(&format!("{name}-{owner}"), 1, owner))
            .await
            .unwrap();
    }

    let link = store.group_link(group.id, owner).await.unwrap();
    assert_eq!(store.active_group_link(group.id, owner).await.unwrap().unwrap().id, link.id);

    match store.resolve_link(&link.link_code).await.unwrap() {
        Some(LinkTarget::Group { group: resolved, files }) => {
            assert_eq!(resolved.id, group.id);
            let serials: Vec<i32> = files.iter().map(|f| f.serial_number).collect();
            assert_eq!(serials, vec![1, 2, 3]);
        }
        other => panic!("expected a group target, got {:?}", other),
    }
}

async fn deleting_a_group_cascades(store: &dyn Store) {
    let owner = fresh_owner();
    let group = store.get_or_create_group("Temp", owner).await.unwrap();
    let file = store
        .add_file(group.id, new_file(&format!("temp-{owner}"), 5, owner))
        .await
        .unwrap();
    let file_link = store.file_link(file.id, owner).await.unwrap();
    let group_link = store.group_link(group.id, owner).await.unwrap();

    let deleted = store.delete_group(group.id, owner).await.unwrap().unwrap();
    assert_eq!(deleted.name, "Temp");

    assert!(store.group_by_name("Temp", owner).await.unwrap().is_none());
    assert!(store.file_by_id(file.id, owner).await.unwrap().is_none());
    assert!(store.resolve_link(&file_link.link_code).await.unwrap().is_none());
    assert!(store.resolve_link(&group_link.link_code).await.unwrap().is_none());
}

async fn deleting_a_file_drops_its_links(store: &dyn Store) {
    let owner = fresh_owner();
    let group = store.get_or_create_group("Single", owner).await.unwrap();
    let file = store
        .add_file(group.id, new_file(&format!("gone-{owner}"), 7, owner))
        .await
        .unwrap();
    let link = store.file_link(file.id, owner).await.unwrap();

    let deleted = store.delete_file(file.id, owner).await.unwrap().unwrap();
    assert_eq!(deleted.group_name, "Single");
    assert!(store.resolve_link(&link.link_code).await.unwrap().is_none());
}

async fn users_and_caption_preferences(store: &dyn Store) {
    let user_id = fresh_owner();
    assert!(!store.is_authorized(user_id).await.unwrap());

    let added = store
        .add_user(NewUser {
            user_id,
            username: Some("newbie".to_string()),
            first_name: None,
            added_by: ADMIN_ID,
        })
        .await
        .unwrap();
    assert!(added);
    assert!(store.is_authorized(user_id).await.unwrap());

    let duplicate = store
        .add_user(NewUser {
            user_id,
            username: None,
            first_name: None,
            added_by: ADMIN_ID,
        })
        .await
        .unwrap();
    assert!(!duplicate, "adding twice is reported, not an error");

    assert!(!store.is_caption_disabled(user_id).await.unwrap());
    assert_eq!(store.toggle_user_caption(user_id).await.unwrap(), Some(true));
    assert!(store.is_caption_disabled(user_id).await.unwrap());
    assert_eq!(store.toggle_user_caption(user_id).await.unwrap(), Some(false));
    assert_eq!(store.toggle_user_caption(user_id + 1).await.unwrap(), None);

    let listed = store.list_users(&[ADMIN_ID]).await.unwrap();
    assert!(listed.iter().any(|u| u.user_id == user_id));
    assert!(listed.iter().all(|u| u.user_id != ADMIN_ID));

    assert!(store.remove_user(user_id).await.unwrap());
    assert!(!store.remove_user(user_id).await.unwrap());
    assert!(!store.is_authorized(user_id).await.unwrap());
}

async fn run_suite(store: &dyn Store) {
    serials_and_totals(store).await;
    owner_scoping(store).await;
    links_are_reused_revoked_and_counted(store).await;
    concurrent_link_requests_share_one_link(store).await;
    group_links_resolve_to_ordered_files(store).await;
    deleting_a_group_cascades(store).await;
    deleting_a_file_drops_its_links(store).await;
    users_and_caption_preferences(store).await;
}

#[tokio::test]
async fn test_memory_store_suite() {
    let store = seeded_memory_store().await;
    run_suite(&store).await;
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL pointing at a disposable Postgres database"]
async fn test_postgres_store_suite() {
    let Ok(url) = std::env::var("TEST_DATABASE_URL") else {
        eprintln!("TEST_DATABASE_URL not set, skipping");
        return;
    };
    let store = PgStore::connect(&url).await.expect("connect to test database");
    store
        .init_schema(&[ADMIN_ID], "t.me/test_channel")
        .await
        .expect("init schema");
    run_suite(&store).await;
}

// ============================================================================
// MemoryStore specifics
// ============================================================================

#[tokio::test]
async fn test_init_schema_seeds_admins_and_caption_once() {
    let store = seeded_memory_store().await;
    assert!(store.is_authorized(ADMIN_ID).await.unwrap());

    store.set_custom_caption("t.me/changed").await.unwrap();
    store.set_caption_enabled(false).await.unwrap();

    // A restart must not overwrite what the admin configured
    store.init_schema(&[ADMIN_ID], "t.me/test_channel").await.unwrap();
    let caption = store.caption_settings().await.unwrap();
    assert_eq!(caption.text, "t.me/changed");
    assert!(!caption.enabled);
}

#[tokio::test]
async fn test_list_groups_is_newest_first_and_limited() {
    let store = seeded_memory_store().await;
    for name in ["first", "second", "third"] {
        store.get_or_create_group(name, 7).await.unwrap();
    }

    let groups = store.list_groups(7, 2).await.unwrap();
    let names: Vec<&str> = groups.iter().map(|g| g.name.as_str()).collect();
    assert_eq!(names, vec!["third", "second"]);
}

#[tokio::test]
async fn test_group_files_limit() {
    let store = seeded_memory_store().await;
    let group = store.get_or_create_group("Many", 7).await.unwrap();
    for i in 0..5 {
        store.add_file(group.id, new_file(&format!("f{i}"), 1, 7)).await.unwrap();
    }
    assert_eq!(store.group_files(group.id, Some(3)).await.unwrap().len(), 3);
    assert_eq!(store.group_files(group.id, None).await.unwrap().len(), 5);
}

#[tokio::test]
async fn test_add_file_rejects_missing_group_and_duplicates() {
    let store = seeded_memory_store().await;
    assert!(store.add_file(999, new_file("orphan", 1, 7)).await.is_err());

    let group = store.get_or_create_group("Dup", 7).await.unwrap();
    store.add_file(group.id, new_file("same", 1, 7)).await.unwrap();
    assert!(store.add_file(group.id, new_file("same", 1, 7)).await.is_err());
}

#[tokio::test]
async fn test_links_to_missing_targets_fail() {
    let store = seeded_memory_store().await;
    assert!(store.file_link(12345, 7).await.is_err());
    assert!(store.group_link(12345, 7).await.is_err());
    assert!(store.resolve_link("doesnotexist").await.unwrap().is_none());
}

#[tokio::test]
async fn test_stats_counts_everything() {
    let store = seeded_memory_store().await;
    store
        .add_user(NewUser {
            user_id: 7,
            username: None,
            first_name: Some("Seven".to_string()),
            added_by: ADMIN_ID,
        })
        .await
        .unwrap();
    store.toggle_user_caption(7).await.unwrap();

    let group = store.get_or_create_group("Stats", 7).await.unwrap();
    let doc = store.add_file(group.id, new_file("doc", 1000, 7)).await.unwrap();
    store.add_file(group.id, new_file("doc2", 24, 7)).await.unwrap();

    let link = store.file_link(doc.id, 7).await.unwrap();
    store.resolve_link(&link.link_code).await.unwrap();
    store.group_link(group.id, 7).await.unwrap();
    store.revoke_link(&link.link_code, 7).await.unwrap();

    let stats = store.stats().await.unwrap();
    assert_eq!(stats.total_users, 2);
    assert_eq!(stats.active_users, 2);
    assert_eq!(stats.caption_disabled_users, 1);
    assert_eq!(stats.total_groups, 1);
    assert_eq!(stats.total_files, 2);
    assert_eq!(stats.total_size, 1024);
    assert_eq!(stats.total_links, 2);
    assert_eq!(stats.active_links, 1);
    assert_eq!(stats.total_clicks, 1);
    assert_eq!(stats.files_by_type, vec![("document".to_string(), 2)]);
}
