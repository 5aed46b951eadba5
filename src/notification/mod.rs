use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

use crate::ids::{NotificationId, PullRequestId, RepoId, TagId};

pub mod action;

/// A single ingested GitHub notification thread, denormalized with the
/// subject metadata the sync pipeline enriched it with.
///
/// See the invariants documented on each mutator below; they are the
/// authoritative description of what it means for a `Notification` to be
/// "at rest" (i.e. the state a reader of the store should always observe).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Notification {
    pub id: NotificationId,
    /// External GitHub thread id, unique.
    pub github_id: String,
    pub repository_id: RepoId,
    pub pull_request_id: Option<PullRequestId>,

    pub subject_type: String,
    pub subject_title: String,
    pub subject_url: Option<String>,
    pub subject_number: Option<i64>,
    pub subject_state: Option<String>,
    pub subject_merged: Option<bool>,
    pub subject_state_reason: Option<String>,
    pub author_login: Option<String>,
    pub author_id: Option<String>,
    pub reason: String,

    pub github_unread: bool,
    pub github_updated_at: Option<DateTime<Utc>>,
    pub github_last_read_at: Option<DateTime<Utc>>,

    pub is_read: bool,
    pub archived: bool,
    pub muted: bool,
    pub starred: bool,
    pub filtered: bool,
    pub snoozed_until: Option<DateTime<Utc>>,
    pub snoozed_at: Option<DateTime<Utc>>,

    pub tag_ids: BTreeSet<TagId>,

    pub imported_at: DateTime<Utc>,
    pub effective_sort_date: DateTime<Utc>,

    /// Raw enrichment payload, only populated / serialized when a caller
    /// asked for it (§4.4 "Result shape").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_raw: Option<Value>,
}

impl Notification {
    /// §3 invariant: `effective_sort_date = snoozed_until` when snoozed,
    /// else `COALESCE(github_updated_at, imported_at)`.
    pub fn recompute_sort_date(&mut self) {
        self.effective_sort_date = self
            .snoozed_until
            .unwrap_or_else(|| self.github_updated_at.unwrap_or(self.imported_at));
    }

    pub fn is_currently_snoozed(&self, now: DateTime<Utc>) -> bool {
        self.snoozed_until.map(|until| until > now).unwrap_or(false)
    }

    pub fn mark_read(&mut self) {
        self.is_read = true;
    }

    pub fn mark_unread(&mut self) {
        self.is_read = false;
    }

    /// Archiving clears snooze and recomputes the sort date.
    pub fn archive(&mut self) {
        self.archived = true;
        self.snoozed_until = None;
        self.snoozed_at = None;
        self.recompute_sort_date();
    }

    pub fn unarchive(&mut self) {
        self.archived = false;
    }

    /// Muting clears snooze and recomputes the sort date.
    pub fn mute(&mut self) {
        self.muted = true;
        self.snoozed_until = None;
        self.snoozed_at = None;
        self.recompute_sort_date();
    }

    pub fn unmute(&mut self) {
        self.muted = false;
    }

    pub fn star(&mut self) {
        self.starred = true;
    }

    pub fn unstar(&mut self) {
        self.starred = false;
    }

    pub fn mark_filtered(&mut self) {
        self.filtered = true;
    }

    pub fn unfilter(&mut self) {
        self.filtered = false;
    }

    pub fn snooze(&mut self, until: DateTime<Utc>, now: DateTime<Utc>) {
        self.snoozed_until = Some(until);
        self.snoozed_at = Some(now);
        self.recompute_sort_date();
    }

    /// Unsnoozing clears both snooze fields and recomputes the sort date.
    pub fn unsnooze(&mut self) {
        self.snoozed_until = None;
        self.snoozed_at = None;
        self.recompute_sort_date();
    }

    /// §3 re-ingest rule: `muted`, `filtered` and `snoozed_until` survive a
    /// re-ingest untouched; `is_read`/`archived` reset to `false` only if
    /// `github_updated_at` changed and the notification is not muted.
    pub fn apply_reingest(&mut self, incoming: &Notification) {
        let updated_changed = self.github_updated_at != incoming.github_updated_at;

        self.subject_type = incoming.subject_type.clone();
        self.subject_title = incoming.subject_title.clone();
        self.subject_url = incoming.subject_url.clone();
        self.subject_number = incoming.subject_number.or(self.subject_number);
        self.subject_state = incoming.subject_state.clone().or(self.subject_state.take());
        self.subject_merged = incoming.subject_merged.or(self.subject_merged);
        self.subject_state_reason = incoming
            .subject_state_reason
            .clone()
            .or(self.subject_state_reason.take());
        self.author_login = incoming.author_login.clone().or(self.author_login.take());
        self.author_id = incoming.author_id.clone().or(self.author_id.take());
        self.reason = incoming.reason.clone();
        self.github_unread = incoming.github_unread;
        self.github_updated_at = incoming.github_updated_at;
        self.github_last_read_at = incoming.github_last_read_at;
        self.pull_request_id = incoming.pull_request_id.or(self.pull_request_id);
        if let Some(raw) = &incoming.subject_raw {
            self.subject_raw = Some(raw.clone());
        }

        // muted, filtered, snoozed_until intentionally untouched.
        if updated_changed && !self.muted {
            self.is_read = false;
            self.archived = false;
        }

        self.recompute_sort_date();
    }

    /// §3: `tag_ids` is always the distinct union of assignment rows.
    pub fn rebuild_tag_ids(&mut self, assigned: impl IntoIterator<Item = TagId>) {
        self.tag_ids = assigned.into_iter().collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use uuid::Uuid;

    fn base(now: DateTime<Utc>) -> Notification {
        Notification {
            id: NotificationId::from(Uuid::new_v4()),
            github_id: "1".into(),
            repository_id: RepoId::from(Uuid::new_v4()),
            pull_request_id: None,
            subject_type: "PullRequest".into(),
            subject_title: "Fix thing".into(),
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
    fn archiving_clears_snooze_and_recomputes_sort_date() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let mut n = base(now);
        n.snoozed_until = Some(now + chrono::Duration::hours(1));
        n.snoozed_at = Some(now);
        n.recompute_sort_date();

        n.archive();

        assert!(n.archived);
        assert_eq!(n.snoozed_until, None);
        assert_eq!(n.snoozed_at, None);
        assert_eq!(n.effective_sort_date, now);
    }

    #[test]
    fn muting_clears_snooze() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let mut n = base(now);
        n.snooze(now + chrono::Duration::hours(1), now);

        n.mute();

        assert!(n.muted);
        assert_eq!(n.snoozed_until, None);
    }

    #[test]
    fn reingest_preserves_muted_filtered_and_snooze() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let mut existing = base(now);
        existing.muted = true;
        existing.filtered = true;
        existing.is_read = true;
        existing.archived = true;
        existing.snoozed_until = Some(now + chrono::Duration::days(1));

        let mut incoming = base(now + chrono::Duration::hours(2));
        incoming.github_updated_at = Some(now + chrono::Duration::hours(2));

        existing.apply_reingest(&incoming);

        assert!(existing.muted);
        assert!(existing.filtered);
        assert_eq!(existing.snoozed_until, Some(now + chrono::Duration::days(1)));
        // muted notifications never have is_read/archived reset even if
        // github_updated_at changed.
        assert!(existing.is_read);
        assert!(existing.archived);
    }

    #[test]
    fn reingest_resets_read_and_archived_when_updated_at_changes_and_not_muted() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let mut existing = base(now);
        existing.is_read = true;
        existing.archived = true;

        let mut incoming = base(now + chrono::Duration::hours(2));
        incoming.github_updated_at = Some(now + chrono::Duration::hours(2));

        existing.apply_reingest(&incoming);

        assert!(!existing.is_read);
        assert!(!existing.archived);
    }

    #[test]
    fn reingest_keeps_flags_when_updated_at_unchanged() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let mut existing = base(now);
        existing.is_read = true;
        existing.archived = true;

        let incoming = base(now);
        existing.apply_reingest(&incoming);

        assert!(existing.is_read);
        assert!(existing.archived);
    }
}
