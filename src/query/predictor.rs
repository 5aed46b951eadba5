use chrono::{DateTime, Duration, Utc};

use crate::notification::action::{ActionKind, PREDICTOR_CANDIDATES};
use crate::notification::Notification;

use super::evaluator::{Evaluator, MatchContext};

/// For each notification and the active query, test each mutative action
/// by cloning, mutating, and re-evaluating: report which actions would
/// remove the row from the current view (§4.6).
///
/// Built from a single `Evaluator` so a page of notifications can share
/// one parsed query instead of re-parsing per row.
pub struct ActionHintPredictor<'a> {
    evaluator: Option<&'a Evaluator>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ActionHints {
    pub dismissed_on: Vec<ActionKind>,
}

impl<'a> ActionHintPredictor<'a> {
    /// `evaluator` is `None` when the active query failed to parse; the
    /// predictor then conservatively reports no hints.
    pub fn new(evaluator: Option<&'a Evaluator>) -> Self {
        ActionHintPredictor { evaluator }
    }

    pub fn hints(&self, ctx: &MatchContext) -> ActionHints {
        let Some(evaluator) = self.evaluator else {
            return ActionHints::default();
        };

        if !evaluator.matches(ctx) {
            // Already outside the view; no action can "dismiss" it further.
            return ActionHints::default();
        }

        let mut dismissed_on = Vec::new();
        for candidate in PREDICTOR_CANDIDATES {
            if !is_applicable(*candidate, ctx.notification, ctx.now) {
                continue;
            }
            let mut clone = ctx.notification.clone();
            apply(*candidate, &mut clone, ctx.now);
            let clone_ctx = MatchContext {
                notification: &clone,
                repo: ctx.repo,
                now: ctx.now,
                tags: ctx.tags,
            };
            if !evaluator.matches(&clone_ctx) {
                dismissed_on.push(*candidate);
            }
        }
        ActionHints { dismissed_on }
    }
}

/// Only the reciprocal action matching the row's current flag state is
/// meaningful (e.g. `snooze` is only tested if not already snoozed).
fn is_applicable(action: ActionKind, n: &Notification, now: DateTime<Utc>) -> bool {
    match action {
        ActionKind::Archive => !n.archived,
        ActionKind::Unarchive => n.archived,
        ActionKind::Mute => !n.muted,
        ActionKind::Unmute => n.muted,
        ActionKind::Snooze => !n.is_currently_snoozed(now),
        ActionKind::Unsnooze => n.is_currently_snoozed(now),
        ActionKind::Filter => !n.filtered,
        ActionKind::Unfilter => n.filtered,
        ActionKind::MarkRead | ActionKind::Star | ActionKind::AssignTag => false,
    }
}

fn apply(action: ActionKind, n: &mut Notification, now: DateTime<Utc>) {
    match action {
        ActionKind::Archive => n.archive(),
        ActionKind::Unarchive => n.unarchive(),
        ActionKind::Mute => n.mute(),
        ActionKind::Unmute => n.unmute(),
        ActionKind::Snooze => n.snooze(now + Duration::hours(24), now),
        ActionKind::Unsnooze => n.unsnooze(),
        ActionKind::Filter => n.mark_filtered(),
        ActionKind::Unfilter => n.unfilter(),
        ActionKind::MarkRead | ActionKind::Star | ActionKind::AssignTag => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{NotificationId, RepoId};
    use chrono::TimeZone;
    use std::collections::BTreeSet;
    use uuid::Uuid;

    fn repo() -> crate::repo::Repo {
        crate::repo::Repo {
            id: RepoId::from(Uuid::new_v4()),
            full_name: "cli/cli".into(),
            github_id: "1".into(),
            github_node_id: "n1".into(),
            description: None,
            private: false,
            default_branch: Some("main".into()),
            pushed_at: None,
            github_updated_at: None,
            raw: None,
        }
    }

    fn notification(now: DateTime<Utc>) -> Notification {
        Notification {
            id: NotificationId::from(Uuid::new_v4()),
            github_id: "t1".into(),
            repository_id: RepoId::from(Uuid::new_v4()),
            pull_request_id: None,
            subject_type: "PullRequest".into(),
            subject_title: "Fix the flaky test".into(),
            subject_url: None,
            subject_number: Some(42),
            subject_state: Some("open".into()),
            subject_merged: Some(false),
            subject_state_reason: None,
            author_login: Some("octocat".into()),
            author_id: None,
            reason: "review_requested".into(),
            github_unread: true,
            github_updated_at: Some(now),
            github_last_read_at: None,
            is_read: false,
            archived: false,
            muted: false,
            starred: false,
            filtered: false,
            snoozed_until: None,
            snoozed_at: None,
            tag_ids: BTreeSet::new(),
            imported_at: now,
            effective_sort_date: now,
            subject_raw: None,
        }
    }

    #[test]
    fn in_inbox_hints_include_mutative_actions_but_not_read_or_star() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let n = notification(now);
        let r = repo();
        let eval = Evaluator::new("in:inbox").unwrap();
        let predictor = ActionHintPredictor::new(Some(&eval));

        let hints = predictor.hints(&MatchContext {
            notification: &n,
            repo: &r,
            now,
            tags: &[],
        });

        for expected in [
            ActionKind::Archive,
            ActionKind::Mute,
            ActionKind::Snooze,
            ActionKind::Filter,
        ] {
            assert!(
                hints.dismissed_on.contains(&expected),
                "expected {expected:?} in {:?}",
                hints.dismissed_on
            );
        }
        assert!(!hints.dismissed_on.contains(&ActionKind::MarkRead));
        assert!(!hints.dismissed_on.contains(&ActionKind::Star));
    }

    #[test]
    fn applying_hinted_action_removes_row_from_query() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let n = notification(now);
        let r = repo();
        let eval = Evaluator::new("in:inbox").unwrap();
        let predictor = ActionHintPredictor::new(Some(&eval));
        let hints = predictor.hints(&MatchContext {
            notification: &n,
            repo: &r,
            now,
            tags: &[],
        });

        for action in hints.dismissed_on {
            let mut mutated = n.clone();
            apply(action, &mut mutated, now);
            assert!(!eval.matches(&MatchContext {
                notification: &mutated,
                repo: &r,
                now,
                tags: &[],
            }));
        }
    }

    #[test]
    fn unparseable_query_yields_no_hints() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let n = notification(now);
        let r = repo();
        let predictor = ActionHintPredictor::new(None);
        let hints = predictor.hints(&MatchContext {
            notification: &n,
            repo: &r,
            now,
            tags: &[],
        });
        assert!(hints.dismissed_on.is_empty());
    }
}
