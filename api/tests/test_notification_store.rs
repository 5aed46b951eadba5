mod helpers;

use chrono::{TimeZone, Utc};
use pretty_assertions::assert_eq;
use rstest::rstest;

use ghn::query;
use ghn_api::repository::{Database, NewNotification, NotificationRepository, RepoRepository, TagRepository};

use helpers::{db_connection, test_repo};

fn new_notification(github_id: &str, repo_id: ghn::ids::RepoId, updated_at: chrono::DateTime<Utc>) -> NewNotification {
    NewNotification {
        github_id: github_id.to_string(),
        repository_id: repo_id,
        pull_request_id: None,
        subject_type: "Issue".to_string(),
        subject_title: "Something broke".to_string(),
        subject_url: None,
        subject_number: Some(7),
        subject_state: Some("open".to_string()),
        subject_merged: None,
        subject_state_reason: None,
        author_login: Some("octocat".to_string()),
        author_id: None,
        reason: "mention".to_string(),
        github_unread: true,
        github_updated_at: Some(updated_at),
        github_last_read_at: None,
        subject_raw: None,
    }
}

/// §3's re-ingest rule: `muted`/`filtered`/`snoozed_until` survive a
/// re-ingest untouched even though `github_updated_at` moved forward.
#[rstest]
#[tokio::test]
async fn reingest_preserves_muted_filtered_and_snoozed_until(#[future] db_connection: Database) {
    let database = db_connection.await;
    let mut tx = database.begin().await.unwrap();

    let repo = database.upsert_repo(&mut tx, &test_repo("octo/widgets")).await.unwrap();

    let t0 = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
    let (mut notification, created) = database
        .upsert_notification(&mut tx, new_notification("gh-1", repo.id, t0))
        .await
        .unwrap();
    assert!(created);

    notification.mute();
    notification.mark_filtered();
    let snoozed_until = t0 + chrono::Duration::days(3);
    notification.snooze(snoozed_until, t0);
    database.save_notification(&mut tx, &notification).await.unwrap();

    let t1 = t0 + chrono::Duration::hours(6);
    let (reingested, created) = database
        .upsert_notification(&mut tx, new_notification("gh-1", repo.id, t1))
        .await
        .unwrap();

    assert!(!created);
    assert!(reingested.muted);
    assert!(reingested.filtered);
    assert_eq!(reingested.snoozed_until, Some(snoozed_until));
    // muted notifications never have is_read/archived reset even though
    // github_updated_at moved.
    assert_eq!(reingested.github_updated_at, Some(t1));

    tx.commit().await.unwrap();
}

/// §4.8 "Bulk transitions by query": a query with no `in:` term picks up
/// the inbox defaults (`archived:false muted:false snoozed:false
/// filtered:false`), so only the one matching notification is archived.
#[rstest]
#[tokio::test]
async fn bulk_archive_by_query_applies_inbox_defaults(#[future] db_connection: Database) {
    let database = db_connection.await;
    let mut tx = database.begin().await.unwrap();

    let repo = database.upsert_repo(&mut tx, &test_repo("octo/widgets")).await.unwrap();
    let now = Utc::now();

    let (_inbox_notification, _) = database
        .upsert_notification(&mut tx, new_notification("gh-inbox", repo.id, now))
        .await
        .unwrap();

    let (mut already_muted, _) = database
        .upsert_notification(&mut tx, new_notification("gh-muted", repo.id, now))
        .await
        .unwrap();
    already_muted.mute();
    database.save_notification(&mut tx, &already_muted).await.unwrap();

    let ast = query::parse_and_validate("repo:octo/widgets").unwrap();
    let mut built = query::build(&ast, 1, 0, 0, false);
    if !ghn::query::sql_builder::query_has_in_term(&ast) {
        ghn::query::sql_builder::apply_inbox_defaults(&mut built);
    }

    let count = database
        .bulk_static_update_by_query(
            &mut tx,
            &built,
            ghn_api::repository::notification::static_transitions::ARCHIVE,
        )
        .await
        .unwrap();

    assert_eq!(count, 1);

    let inbox = database.get_notification_by_external_id(&mut tx, "gh-inbox").await.unwrap().unwrap();
    assert!(inbox.archived);
    let muted = database.get_notification_by_external_id(&mut tx, "gh-muted").await.unwrap().unwrap();
    assert!(!muted.archived, "muted notifications are excluded from the inbox default view");

    tx.commit().await.unwrap();
}

/// §3: `tag_ids` is always the distinct union of `tag_assignments` rows,
/// rebuilt on every assign/remove.
#[rstest]
#[tokio::test]
async fn tag_assignment_rebuilds_the_denormalized_cache(#[future] db_connection: Database) {
    let database = db_connection.await;
    let mut tx = database.begin().await.unwrap();

    let repo = database.upsert_repo(&mut tx, &test_repo("octo/widgets")).await.unwrap();
    let (notification, _) = database
        .upsert_notification(&mut tx, new_notification("gh-1", repo.id, Utc::now()))
        .await
        .unwrap();

    let tag_a = database.create_tag(&mut tx, "Urgent", "urgent", 0).await.unwrap();
    let tag_b = database.create_tag(&mut tx, "Billing", "billing", 1).await.unwrap();

    database.assign_tag(&mut tx, tag_a.id, notification.id).await.unwrap();
    database.assign_tag(&mut tx, tag_b.id, notification.id).await.unwrap();
    // Re-assigning is idempotent (§3).
    database.assign_tag(&mut tx, tag_a.id, notification.id).await.unwrap();
    let cache = database.rebuild_tag_ids_cache(&mut tx, notification.id).await.unwrap();

    assert_eq!(cache.len(), 2);
    let stored = database.get_notification_by_id(&mut tx, notification.id).await.unwrap().unwrap();
    assert_eq!(stored.tag_ids, cache);

    database.remove_tag(&mut tx, tag_a.id, notification.id).await.unwrap();
    let cache = database.rebuild_tag_ids_cache(&mut tx, notification.id).await.unwrap();
    assert_eq!(cache.len(), 1);
    assert!(cache.contains(&tag_b.id));
    let stored = database.get_notification_by_id(&mut tx, notification.id).await.unwrap().unwrap();
    assert_eq!(stored.tag_ids, cache);

    tx.commit().await.unwrap();
}
