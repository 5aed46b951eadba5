mod helpers;

use chrono::Utc;
use rstest::rstest;

use ghn::notification::action::RuleAction;
use ghn_api::{
    repository::{Database, NewNotification, NotificationRepository, RepoRepository, RuleRepository, TagRepository},
    rule_engine::apply_rules,
};

use helpers::{db_connection, test_repo};

fn incoming_notification(github_id: &str, repo_id: ghn::ids::RepoId) -> NewNotification {
    NewNotification {
        github_id: github_id.to_string(),
        repository_id: repo_id,
        pull_request_id: None,
        subject_type: "PullRequest".to_string(),
        subject_title: "Bump dependency".to_string(),
        subject_url: None,
        subject_number: Some(3),
        subject_state: Some("open".to_string()),
        subject_merged: Some(false),
        subject_state_reason: None,
        author_login: Some("dependabot".to_string()),
        author_id: None,
        reason: "subscribed".to_string(),
        github_unread: true,
        github_updated_at: Some(Utc::now()),
        github_last_read_at: None,
        subject_raw: None,
    }
}

/// Two enabled rules at display_order 10 and 20: rule 10 tags the
/// notification, rule 20 archives it and tags it a second time. Both
/// rules match and apply, in order — the rule engine is not first-match
/// (§4.9).
#[rstest]
#[tokio::test]
async fn every_matching_rule_applies_its_actions_in_display_order(#[future] db_connection: Database) {
    let database = db_connection.await;
    let mut tx = database.begin().await.unwrap();

    let repo = database.upsert_repo(&mut tx, &test_repo("octo/widgets")).await.unwrap();
    let (notification, created) = database
        .upsert_notification(&mut tx, incoming_notification("gh-1", repo.id))
        .await
        .unwrap();
    assert!(created);

    let dependency_tag = database.create_tag(&mut tx, "Dependencies", "dependencies", 0).await.unwrap();
    let stale_tag = database.create_tag(&mut tx, "Stale", "stale", 1).await.unwrap();

    database
        .create_rule(
            &mut tx,
            "Tag dependency bumps",
            Some("author:dependabot"),
            None,
            10,
            &[RuleAction::AssignTag { tag_id: dependency_tag.id }],
        )
        .await
        .unwrap();

    database
        .create_rule(
            &mut tx,
            "Archive and mark stale",
            Some("author:dependabot"),
            None,
            20,
            &[RuleAction::Archive, RuleAction::AssignTag { tag_id: stale_tag.id }],
        )
        .await
        .unwrap();

    apply_rules(&database, &mut tx, notification.id, Utc::now()).await.unwrap();

    let result = database.get_notification_by_id(&mut tx, notification.id).await.unwrap().unwrap();
    assert!(result.archived);
    assert!(result.tag_ids.contains(&dependency_tag.id));
    assert!(result.tag_ids.contains(&stale_tag.id));

    tx.commit().await.unwrap();
}

/// A rule whose query doesn't match the notification contributes nothing;
/// only the matching rule's actions are applied.
#[rstest]
#[tokio::test]
async fn non_matching_rules_are_skipped(#[future] db_connection: Database) {
    let database = db_connection.await;
    let mut tx = database.begin().await.unwrap();

    let repo = database.upsert_repo(&mut tx, &test_repo("octo/widgets")).await.unwrap();
    let (notification, _) = database
        .upsert_notification(&mut tx, incoming_notification("gh-1", repo.id))
        .await
        .unwrap();

    database
        .create_rule(&mut tx, "Archive renovate", Some("author:renovate"), None, 10, &[RuleAction::Archive])
        .await
        .unwrap();

    apply_rules(&database, &mut tx, notification.id, Utc::now()).await.unwrap();

    let result = database.get_notification_by_id(&mut tx, notification.id).await.unwrap().unwrap();
    assert!(!result.archived);

    tx.commit().await.unwrap();
}

/// A disabled rule is never evaluated even if its query would match.
#[rstest]
#[tokio::test]
async fn disabled_rules_are_never_evaluated(#[future] db_connection: Database) {
    let database = db_connection.await;
    let mut tx = database.begin().await.unwrap();

    let repo = database.upsert_repo(&mut tx, &test_repo("octo/widgets")).await.unwrap();
    let (notification, _) = database
        .upsert_notification(&mut tx, incoming_notification("gh-1", repo.id))
        .await
        .unwrap();

    let rule = database
        .create_rule(&mut tx, "Archive dependabot", Some("author:dependabot"), None, 10, &[RuleAction::Archive])
        .await
        .unwrap();
    database
        .update_rule(
            &mut tx,
            rule.id,
            &ghn_api::repository::rule::RulePatch { enabled: Some(false), ..Default::default() },
        )
        .await
        .unwrap();

    apply_rules(&database, &mut tx, notification.id, Utc::now()).await.unwrap();

    let result = database.get_notification_by_id(&mut tx, notification.id).await.unwrap().unwrap();
    assert!(!result.archived);

    tx.commit().await.unwrap();
}
