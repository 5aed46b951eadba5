use chrono::{DateTime, Utc};
use sqlx::{Postgres, Transaction};

use ghn::{
    ids::NotificationId,
    notification::action::RuleAction,
    query::{Evaluator, MatchContext},
    rule::Rule,
};

use crate::{
    error::GhnApiError,
    repository::{
        Database, NotificationRepository, RepoRepository, RuleRepository, TagRepository,
        ViewRepository,
    },
    GhnApiResult,
};

/// §4.9: load enabled rules ascending `(display_order, id)`, evaluate every
/// one against the notification (not first-match), and apply every
/// matching rule's actions in its own list order, rules in turn applied in
/// display_order order. Each action is best-effort: a failing action is
/// logged and skipped without aborting the notification's remaining
/// actions or the remaining rules.
#[tracing::instrument(level = "debug", skip(db, executor), err)]
pub async fn apply_rules(
    db: &Database,
    executor: &mut Transaction<'_, Postgres>,
    notification_id: NotificationId,
    now: DateTime<Utc>,
) -> GhnApiResult<()> {
    let mut notification = db
        .get_notification_by_id(executor, notification_id)
        .await?
        .ok_or_else(|| GhnApiError::NotFound(format!("notification {notification_id}")))?;

    let repo = db
        .get_repo_by_id(executor, notification.repository_id)
        .await?
        .ok_or_else(|| GhnApiError::NotFound(format!("repository {}", notification.repository_id)))?;

    let tags = db.list_tags(executor).await?;
    let rules = db.list_enabled_rules_ordered(executor).await?;

    for rule in &rules {
        let query = match rule_query(db, executor, rule).await {
            Ok(Some(query)) => query,
            Ok(None) => continue,
            Err(err) => {
                tracing::warn!(rule_id = %rule.id, error = %err, "Skipping rule: failed to resolve its view");
                continue;
            }
        };

        let evaluator = match Evaluator::new(&query) {
            Ok(evaluator) => evaluator,
            Err(err) => {
                tracing::warn!(rule_id = %rule.id, error = %err, "Skipping rule: its query no longer parses");
                continue;
            }
        };

        let matches = evaluator.matches(&MatchContext {
            notification: &notification,
            repo: &repo,
            now,
            tags: &tags,
        });
        if !matches {
            continue;
        }

        for action in &rule.actions {
            if let Err(err) =
                apply_action(db, executor, &mut notification, action, now).await
            {
                tracing::warn!(
                    rule_id = %rule.id,
                    notification_id = %notification_id,
                    error = %err,
                    "Rule action failed, continuing with the next action"
                );
            }
        }
    }

    db.save_notification(executor, &notification).await?;
    Ok(())
}

/// `None` means the rule has no usable query right now (e.g. its view was
/// deleted); the caller skips it rather than erroring the whole pass.
async fn rule_query(
    db: &Database,
    executor: &mut Transaction<'_, Postgres>,
    rule: &Rule,
) -> GhnApiResult<Option<String>> {
    if let Some(query) = &rule.query {
        return Ok(Some(query.clone()));
    }
    let Some(view_id) = rule.view_id else {
        return Ok(None);
    };
    Ok(db.get_view_by_id(executor, view_id).await?.map(|v| v.query))
}

async fn apply_action(
    db: &Database,
    executor: &mut Transaction<'_, Postgres>,
    notification: &mut ghn::notification::Notification,
    action: &RuleAction,
    now: DateTime<Utc>,
) -> GhnApiResult<()> {
    match action {
        RuleAction::Archive => notification.archive(),
        RuleAction::MarkRead => notification.mark_read(),
        RuleAction::Mute => notification.mute(),
        RuleAction::Star => notification.star(),
        RuleAction::Filter => notification.mark_filtered(),
        RuleAction::Snooze { duration } => notification.snooze(now + *duration, now),
        RuleAction::AssignTag { tag_id } => {
            db.assign_tag(executor, *tag_id, notification.id).await?;
            let tag_ids = db.rebuild_tag_ids_cache(executor, notification.id).await?;
            notification.tag_ids = tag_ids;
        }
    }
    Ok(())
}
