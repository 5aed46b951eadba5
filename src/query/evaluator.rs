use chrono::{DateTime, Utc};

use crate::error::GhnResult;
use crate::notification::Notification;
use crate::repo::Repo;
use crate::tag::Tag;

use super::ast::{Ast, Expr};
use super::parser::parse;
use super::validator::{parse_bool, validate};

/// Everything the evaluator needs besides the AST to judge a single row.
/// `now` is supplied by the caller (never read from the wall clock)
/// so evaluation is deterministic in tests (§4.5).
pub struct MatchContext<'a> {
    pub notification: &'a Notification,
    pub repo: &'a Repo,
    pub now: DateTime<Utc>,
    pub tags: &'a [Tag],
}

/// Constructed from a query string; offers `matches` against a single
/// in-memory notification/repository pair using the same field semantics
/// as the SQL builder. An empty query matches everything.
pub struct Evaluator {
    ast: Ast,
}

impl Evaluator {
    pub fn new(query: &str) -> GhnResult<Self> {
        let ast = parse(query)?;
        validate(&ast)?;
        Ok(Evaluator { ast })
    }

    pub fn matches(&self, ctx: &MatchContext) -> bool {
        match &self.ast {
            None => true,
            Some(expr) => eval(expr, ctx),
        }
    }
}

fn eval(expr: &Expr, ctx: &MatchContext) -> bool {
    match expr {
        Expr::And(l, r) => eval(l, ctx) && eval(r, ctx),
        Expr::Or(l, r) => eval(l, ctx) || eval(r, ctx),
        Expr::Not(inner) => !eval(inner, ctx),
        Expr::FreeText(text) => eval_free_text(text, ctx),
        Expr::Field { name, values } => eval_field(name, values, ctx),
    }
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_ascii_lowercase().contains(&needle.to_ascii_lowercase())
}

fn eval_free_text(text: &str, ctx: &MatchContext) -> bool {
    let n = ctx.notification;
    contains_ci(&n.subject_title, text)
        || contains_ci(&n.subject_type, text)
        || contains_ci(&ctx.repo.full_name, text)
        || n.author_login
            .as_deref()
            .map(|v| contains_ci(v, text))
            .unwrap_or(false)
        || n.subject_state
            .as_deref()
            .map(|v| contains_ci(v, text))
            .unwrap_or(false)
        || n.subject_number
            .map(|num| contains_ci(&num.to_string(), text))
            .unwrap_or(false)
}

fn eval_field(name: &str, values: &[String], ctx: &MatchContext) -> bool {
    let lower = name.to_ascii_lowercase();
    // A comma list is a flat OR over the same field.
    values.iter().any(|value| eval_single(&lower, value, ctx))
}

fn eval_single(field: &str, value: &str, ctx: &MatchContext) -> bool {
    let n = ctx.notification;
    match field {
        "repo" | "repository" => contains_ci(&ctx.repo.full_name, value),
        "org" => ctx
            .repo
            .full_name
            .to_ascii_lowercase()
            .starts_with(&format!("{}/", value.to_ascii_lowercase())),
        "reason" => contains_ci(&n.reason, value),
        "type" | "subject_type" => contains_ci(&n.subject_type, value),
        "author" => n.author_login.as_deref().map(|v| contains_ci(v, value)).unwrap_or(false),
        "state_reason" => n
            .subject_state_reason
            .as_deref()
            .map(|v| contains_ci(v, value))
            .unwrap_or(false),
        "state" => n.subject_state.as_deref() == Some(value),
        "merged" => match value.to_ascii_lowercase().as_str() {
            "merged" => n.subject_merged == Some(true),
            "unmerged" => n.subject_merged == Some(false),
            v => n.subject_merged == Some(parse_bool(v)),
        },
        "read" => n.is_read == parse_bool(value),
        "archived" => n.archived == parse_bool(value),
        "muted" => n.muted == parse_bool(value),
        "filtered" => n.filtered == parse_bool(value),
        "snoozed" => n.is_currently_snoozed(ctx.now) == parse_bool(value),
        "is" => eval_is(value, ctx),
        "in" => eval_in(value, ctx),
        "tags" => ctx.tags.iter().any(|tag| {
            n.tag_ids.contains(&tag.id) && contains_ci(&tag.slug, value)
        }),
        _ => false,
    }
}

fn eval_is(value: &str, ctx: &MatchContext) -> bool {
    let n = ctx.notification;
    match value.to_ascii_lowercase().as_str() {
        "unread" => !n.is_read,
        "read" => n.is_read,
        "archived" => n.archived,
        "muted" => n.muted,
        "snoozed" => n.is_currently_snoozed(ctx.now),
        "starred" => n.starred,
        "filtered" => n.filtered,
        _ => false,
    }
}

fn eval_in(value: &str, ctx: &MatchContext) -> bool {
    let n = ctx.notification;
    match value.to_ascii_lowercase().as_str() {
        "inbox" => !n.archived && !n.is_currently_snoozed(ctx.now) && !n.muted && !n.filtered,
        "archive" => n.archived && !n.muted,
        "snoozed" => n.is_currently_snoozed(ctx.now) && !n.archived && !n.muted,
        "filtered" => n.filtered,
        "anywhere" => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{NotificationId, RepoId, TagId};
    use chrono::TimeZone;
    use std::collections::BTreeSet;
    use uuid::Uuid;

    fn repo(full_name: &str) -> Repo {
        Repo {
            id: RepoId::from(Uuid::new_v4()),
            full_name: full_name.into(),
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
    fn empty_query_matches_everything() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let n = notification(now);
        let r = repo("cli/cli");
        let eval = Evaluator::new("").unwrap();
        assert!(eval.matches(&MatchContext {
            notification: &n,
            repo: &r,
            now,
            tags: &[],
        }));
    }

    #[test]
    fn in_inbox_excludes_archived() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let mut archived = notification(now);
        archived.archive();
        let unarchived = notification(now);
        let r = repo("cli/cli");
        let eval = Evaluator::new("in:inbox").unwrap();

        assert!(eval.matches(&MatchContext {
            notification: &unarchived,
            repo: &r,
            now,
            tags: &[],
        }));
        assert!(!eval.matches(&MatchContext {
            notification: &archived,
            repo: &r,
            now,
            tags: &[],
        }));
    }

    #[test]
    fn in_anywhere_and_muted_true_returns_muted_rows() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let mut muted = notification(now);
        muted.mute();
        let r = repo("cli/cli");
        let eval = Evaluator::new("in:anywhere AND muted:true").unwrap();

        assert!(eval.matches(&MatchContext {
            notification: &muted,
            repo: &r,
            now,
            tags: &[],
        }));
    }

    #[test]
    fn comma_list_is_or_over_repo() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let n = notification(now);
        let r = repo("cli/cli");
        let eval = Evaluator::new("repo:cli,go").unwrap();
        assert!(eval.matches(&MatchContext {
            notification: &n,
            repo: &r,
            now,
            tags: &[],
        }));
    }

    #[test]
    fn org_matches_prefix_only() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let n = notification(now);
        let r = repo("cli/cli");
        let eval = Evaluator::new("org:cli").unwrap();
        assert!(eval.matches(&MatchContext {
            notification: &n,
            repo: &r,
            now,
            tags: &[],
        }));

        let r2 = repo("notcli/cli");
        assert!(!eval.matches(&MatchContext {
            notification: &n,
            repo: &r2,
            now,
            tags: &[],
        }));
    }

    #[test]
    fn snoozed_uses_supplied_now() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let mut n = notification(now);
        n.snooze(now + chrono::Duration::hours(1), now);
        let r = repo("cli/cli");
        let eval = Evaluator::new("snoozed:true").unwrap();

        assert!(eval.matches(&MatchContext {
            notification: &n,
            repo: &r,
            now,
            tags: &[],
        }));
        assert!(!eval.matches(&MatchContext {
            notification: &n,
            repo: &r,
            now: now + chrono::Duration::hours(2),
            tags: &[],
        }));
    }

    #[test]
    fn tags_matches_by_slug_substring_on_assigned_tags_only() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let mut n = notification(now);
        let bug_tag = Tag {
            id: TagId::from(Uuid::new_v4()),
            name: "Bug".into(),
            slug: "bug".into(),
            display_order: 0,
        };
        let other_tag = Tag {
            id: TagId::from(Uuid::new_v4()),
            name: "Feature".into(),
            slug: "feature".into(),
            display_order: 1,
        };
        n.tag_ids.insert(bug_tag.id);
        let r = repo("cli/cli");
        let eval = Evaluator::new("tags:bug").unwrap();
        let catalog = [bug_tag, other_tag];

        assert!(eval.matches(&MatchContext {
            notification: &n,
            repo: &r,
            now,
            tags: &catalog,
        }));

        let eval2 = Evaluator::new("tags:feature").unwrap();
        assert!(!eval2.matches(&MatchContext {
            notification: &n,
            repo: &r,
            now,
            tags: &catalog,
        }));
    }
}
