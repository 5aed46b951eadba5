use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{
    postgres::{PgArguments, PgRow},
    FromRow, Postgres, Query, Row, Transaction,
};

use ghn::{
    ids::{NotificationId, PullRequestId, RepoId},
    notification::Notification,
    query::{BuiltQuery, SqlArg},
};

use crate::{error::GhnApiError, repository::database::Database, GhnApiResult};

/// The raw fields the sync pipeline's Process job (§4.10 step 4) has
/// gathered about one thread by the time it upserts a `Notification`. Kept
/// separate from [`Notification`] itself because the store, not the
/// caller, owns lifecycle flag defaults and the re-ingest invariants.
#[derive(Debug, Clone)]
pub struct NewNotification {
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
    pub subject_raw: Option<serde_json::Value>,
}

/// §4.8 Notification Store: the only component that executes built
/// queries and performs state transitions. Single-row transitions fetch,
/// mutate with the already-tested [`Notification`] domain methods, and
/// write the full row back — this reuses the invariants in §3 instead of
/// re-deriving them in SQL. Bulk transitions render SQL directly (§4.4
/// "Rules for composition") since they must operate on rows the caller
/// never materializes.
#[async_trait]
pub trait NotificationRepository {
    async fn list_notifications(
        &self,
        executor: &mut Transaction<'_, Postgres>,
        built: &BuiltQuery,
    ) -> GhnApiResult<Vec<Notification>>;

    async fn count_notifications(
        &self,
        executor: &mut Transaction<'_, Postgres>,
        built: &BuiltQuery,
    ) -> GhnApiResult<i64>;

    async fn get_notification_by_id(
        &self,
        executor: &mut Transaction<'_, Postgres>,
        id: NotificationId,
    ) -> GhnApiResult<Option<Notification>>;

    async fn get_notification_by_external_id(
        &self,
        executor: &mut Transaction<'_, Postgres>,
        github_id: &str,
    ) -> GhnApiResult<Option<Notification>>;

    /// Returns the upserted row plus whether it was newly created (§4.10
    /// step 4: only a newly created row enqueues an Apply-Rules job).
    async fn upsert_notification(
        &self,
        executor: &mut Transaction<'_, Postgres>,
        incoming: NewNotification,
    ) -> GhnApiResult<(Notification, bool)>;

    async fn save_notification(
        &self,
        executor: &mut Transaction<'_, Postgres>,
        notification: &Notification,
    ) -> GhnApiResult<()>;

    async fn mark_read(
        &self,
        executor: &mut Transaction<'_, Postgres>,
        github_id: &str,
    ) -> GhnApiResult<Notification>;
    async fn mark_unread(
        &self,
        executor: &mut Transaction<'_, Postgres>,
        github_id: &str,
    ) -> GhnApiResult<Notification>;
    async fn archive(
        &self,
        executor: &mut Transaction<'_, Postgres>,
        github_id: &str,
    ) -> GhnApiResult<Notification>;
    async fn unarchive(
        &self,
        executor: &mut Transaction<'_, Postgres>,
        github_id: &str,
    ) -> GhnApiResult<Notification>;
    async fn mute(
        &self,
        executor: &mut Transaction<'_, Postgres>,
        github_id: &str,
    ) -> GhnApiResult<Notification>;
    async fn unmute(
        &self,
        executor: &mut Transaction<'_, Postgres>,
        github_id: &str,
    ) -> GhnApiResult<Notification>;
    async fn star(
        &self,
        executor: &mut Transaction<'_, Postgres>,
        github_id: &str,
    ) -> GhnApiResult<Notification>;
    async fn unstar(
        &self,
        executor: &mut Transaction<'_, Postgres>,
        github_id: &str,
    ) -> GhnApiResult<Notification>;
    async fn snooze(
        &self,
        executor: &mut Transaction<'_, Postgres>,
        github_id: &str,
        until: DateTime<Utc>,
    ) -> GhnApiResult<Notification>;
    async fn unsnooze(
        &self,
        executor: &mut Transaction<'_, Postgres>,
        github_id: &str,
    ) -> GhnApiResult<Notification>;
    async fn mark_filtered(
        &self,
        executor: &mut Transaction<'_, Postgres>,
        github_id: &str,
    ) -> GhnApiResult<Notification>;
    async fn unfilter(
        &self,
        executor: &mut Transaction<'_, Postgres>,
        github_id: &str,
    ) -> GhnApiResult<Notification>;

    /// Vectorized single-row transitions over an explicit id set (§4.8
    /// "Bulk transitions by id-set"). `set_clause` is one of the static
    /// fragments in [`STATIC_TRANSITIONS`].
    async fn bulk_static_update_by_ids(
        &self,
        executor: &mut Transaction<'_, Postgres>,
        github_ids: &[String],
        set_clause: &str,
    ) -> GhnApiResult<u64>;

    async fn bulk_snooze_by_ids(
        &self,
        executor: &mut Transaction<'_, Postgres>,
        github_ids: &[String],
        until: DateTime<Utc>,
    ) -> GhnApiResult<u64>;

    /// §4.8 "Bulk transitions by query": renders
    /// `UPDATE ... WHERE github_id IN (SELECT ...)` over the compiled
    /// query, reusing its joins/WHERE/args verbatim (no new placeholder
    /// needed — every static transition is a literal SET clause).
    async fn bulk_static_update_by_query(
        &self,
        executor: &mut Transaction<'_, Postgres>,
        built: &BuiltQuery,
        set_clause: &str,
    ) -> GhnApiResult<u64>;

    /// Snooze is the one bulk-by-query transition that binds a caller
    /// value: it reserves `$1` for `until` and re-numbers the embedded
    /// SELECT's placeholders with [`BuiltQuery::renumbered_where`] (§4.4).
    async fn bulk_snooze_by_query(
        &self,
        executor: &mut Transaction<'_, Postgres>,
        built: &BuiltQuery,
        until: DateTime<Utc>,
    ) -> GhnApiResult<u64>;

    /// Returns every matching `github_id`, used by tag bulk-assign/-remove
    /// which must recompute the `tag_ids` cache per row (§4.8 "Tag
    /// operations").
    async fn external_ids_matching_query(
        &self,
        executor: &mut Transaction<'_, Postgres>,
        built: &BuiltQuery,
    ) -> GhnApiResult<Vec<String>>;
}

/// Static SET clauses for the single-row/bulk transitions that need no
/// caller-supplied value (every transition except snooze). Archiving and
/// muting clear snooze and recompute the sort date in the same statement
/// (§3 invariants); unsnoozing does the same without the flag flip.
pub mod static_transitions {
    pub const MARK_READ: &str = "is_read = TRUE";
    pub const MARK_UNREAD: &str = "is_read = FALSE";
    pub const ARCHIVE: &str = "archived = TRUE, snoozed_until = NULL, snoozed_at = NULL, effective_sort_date = COALESCE(github_updated_at, imported_at)";
    pub const UNARCHIVE: &str = "archived = FALSE";
    pub const MUTE: &str = "muted = TRUE, snoozed_until = NULL, snoozed_at = NULL, effective_sort_date = COALESCE(github_updated_at, imported_at)";
    pub const UNMUTE: &str = "muted = FALSE";
    pub const STAR: &str = "starred = TRUE";
    pub const UNSTAR: &str = "starred = FALSE";
    pub const UNSNOOZE: &str = "snoozed_until = NULL, snoozed_at = NULL, effective_sort_date = COALESCE(github_updated_at, imported_at)";
    pub const MARK_FILTERED: &str = "filtered = TRUE";
    pub const UNFILTER: &str = "filtered = FALSE";
}

#[derive(FromRow)]
struct NotificationRow {
    id: uuid::Uuid,
    github_id: String,
    repository_id: uuid::Uuid,
    pull_request_id: Option<uuid::Uuid>,
    subject_type: String,
    subject_title: String,
    subject_url: Option<String>,
    subject_number: Option<i64>,
    subject_state: Option<String>,
    subject_merged: Option<bool>,
    subject_state_reason: Option<String>,
    author_login: Option<String>,
    author_id: Option<String>,
    reason: String,
    github_unread: bool,
    github_updated_at: Option<DateTime<Utc>>,
    github_last_read_at: Option<DateTime<Utc>>,
    is_read: bool,
    archived: bool,
    muted: bool,
    starred: bool,
    filtered: bool,
    snoozed_until: Option<DateTime<Utc>>,
    snoozed_at: Option<DateTime<Utc>>,
    tag_ids: Vec<uuid::Uuid>,
    imported_at: DateTime<Utc>,
    effective_sort_date: DateTime<Utc>,
    subject_raw: Option<serde_json::Value>,
}

const FULL_COLUMNS: &str = "id, github_id, repository_id, pull_request_id, subject_type, \
    subject_title, subject_url, subject_number, subject_state, subject_merged, \
    subject_state_reason, author_login, author_id, reason, github_unread, github_updated_at, \
    github_last_read_at, is_read, archived, muted, starred, filtered, snoozed_until, \
    snoozed_at, tag_ids, imported_at, effective_sort_date, subject_raw";

impl From<NotificationRow> for Notification {
    fn from(row: NotificationRow) -> Self {
        Notification {
            id: NotificationId::from(row.id),
            github_id: row.github_id,
            repository_id: RepoId::from(row.repository_id),
            pull_request_id: row.pull_request_id.map(PullRequestId::from),
            subject_type: row.subject_type,
            subject_title: row.subject_title,
            subject_url: row.subject_url,
            subject_number: row.subject_number,
            subject_state: row.subject_state,
            subject_merged: row.subject_merged,
            subject_state_reason: row.subject_state_reason,
            author_login: row.author_login,
            author_id: row.author_id,
            reason: row.reason,
            github_unread: row.github_unread,
            github_updated_at: row.github_updated_at,
            github_last_read_at: row.github_last_read_at,
            is_read: row.is_read,
            archived: row.archived,
            muted: row.muted,
            starred: row.starred,
            filtered: row.filtered,
            snoozed_until: row.snoozed_until,
            snoozed_at: row.snoozed_at,
            tag_ids: row.tag_ids.into_iter().map(ghn::ids::TagId::from).collect(),
            imported_at: row.imported_at,
            effective_sort_date: row.effective_sort_date,
            subject_raw: row.subject_raw,
        }
    }
}

/// Binds a dynamically-typed [`SqlArg`] onto a `sqlx::query` built from a
/// [`BuiltQuery`]; the match arms share a return type so this folds over
/// `built.args` regardless of each argument's concrete type.
fn bind_arg<'q>(
    query: Query<'q, Postgres, PgArguments>,
    arg: &'q SqlArg,
) -> Query<'q, Postgres, PgArguments> {
    match arg {
        SqlArg::Text(s) => query.bind(s),
        SqlArg::Bool(b) => query.bind(b),
    }
}

fn row_to_notification(row: &PgRow, include_subject_raw: bool) -> GhnApiResult<Notification> {
    let tag_ids: Vec<uuid::Uuid> = row
        .try_get("tag_ids")
        .map_err(|err| GhnApiError::from_sqlx("Failed to read tag_ids", err))?;
    let subject_raw: Option<serde_json::Value> = if include_subject_raw {
        row.try_get("subject_raw")
            .map_err(|err| GhnApiError::from_sqlx("Failed to read subject_raw", err))?
    } else {
        None
    };

    macro_rules! col {
        ($name:literal) => {
            row.try_get($name)
                .map_err(|err| GhnApiError::from_sqlx(concat!("Failed to read ", $name), err))?
        };
    }

    Ok(Notification {
        id: NotificationId::from(col!("id")),
        github_id: col!("github_id"),
        repository_id: RepoId::from(col!("repository_id")),
        pull_request_id: col!("pull_request_id"),
        subject_type: col!("subject_type"),
        subject_title: col!("subject_title"),
        subject_url: col!("subject_url"),
        subject_number: col!("subject_number"),
        subject_state: col!("subject_state"),
        subject_merged: col!("subject_merged"),
        subject_state_reason: col!("subject_state_reason"),
        author_login: col!("author_login"),
        author_id: col!("author_id"),
        reason: col!("reason"),
        github_unread: col!("github_unread"),
        github_updated_at: col!("github_updated_at"),
        github_last_read_at: col!("github_last_read_at"),
        is_read: col!("is_read"),
        archived: col!("archived"),
        muted: col!("muted"),
        starred: col!("starred"),
        filtered: col!("filtered"),
        snoozed_until: col!("snoozed_until"),
        snoozed_at: col!("snoozed_at"),
        tag_ids: tag_ids.into_iter().map(ghn::ids::TagId::from).collect(),
        imported_at: col!("imported_at"),
        effective_sort_date: col!("effective_sort_date"),
        subject_raw,
    })
}

fn tag_ids_array(notification: &Notification) -> Vec<uuid::Uuid> {
    notification
        .tag_ids
        .iter()
        .map(|id| uuid::Uuid::from(*id))
        .collect()
}

#[async_trait]
impl NotificationRepository for Database {
    #[tracing::instrument(level = "debug", skip_all, err)]
    async fn list_notifications(
        &self,
        executor: &mut Transaction<'_, Postgres>,
        built: &BuiltQuery,
    ) -> GhnApiResult<Vec<Notification>> {
        let sql = built.list_sql();
        let mut query = sqlx::query(&sql);
        for arg in &built.args {
            query = bind_arg(query, arg);
        }
        let rows = query
            .fetch_all(&mut **executor)
            .await
            .map_err(|err| GhnApiError::from_sqlx("Failed to list notifications", err))?;

        rows.iter()
            .map(|row| row_to_notification(row, built.include_subject_raw))
            .collect()
    }

    #[tracing::instrument(level = "debug", skip_all, err)]
    async fn count_notifications(
        &self,
        executor: &mut Transaction<'_, Postgres>,
        built: &BuiltQuery,
    ) -> GhnApiResult<i64> {
        let sql = built.count_sql();
        let mut query = sqlx::query_scalar(&sql);
        for arg in &built.args {
            query = match arg {
                SqlArg::Text(s) => query.bind(s),
                SqlArg::Bool(b) => query.bind(b),
            };
        }
        query
            .fetch_one(&mut **executor)
            .await
            .map_err(|err| GhnApiError::from_sqlx("Failed to count notifications", err))
    }

    #[tracing::instrument(level = "debug", skip(self, executor), err)]
    async fn get_notification_by_id(
        &self,
        executor: &mut Transaction<'_, Postgres>,
        id: NotificationId,
    ) -> GhnApiResult<Option<Notification>> {
        let row: Option<NotificationRow> = sqlx::query_as(&format!(
            "SELECT {FULL_COLUMNS} FROM notifications WHERE id = $1"
        ))
        .bind(uuid::Uuid::from(id))
        .fetch_optional(&mut **executor)
        .await
        .map_err(|err| GhnApiError::from_sqlx(format!("Failed to fetch notification {id}"), err))?;

        Ok(row.map(Notification::from))
    }

    #[tracing::instrument(level = "debug", skip(self, executor), err)]
    async fn get_notification_by_external_id(
        &self,
        executor: &mut Transaction<'_, Postgres>,
        github_id: &str,
    ) -> GhnApiResult<Option<Notification>> {
        let row: Option<NotificationRow> = sqlx::query_as(&format!(
            "SELECT {FULL_COLUMNS} FROM notifications WHERE github_id = $1"
        ))
        .bind(github_id)
        .fetch_optional(&mut **executor)
        .await
        .map_err(|err| {
            GhnApiError::from_sqlx(format!("Failed to fetch notification {github_id}"), err)
        })?;

        Ok(row.map(Notification::from))
    }

    #[tracing::instrument(level = "debug", skip(self, executor, incoming), fields(github_id = %incoming.github_id), err)]
    async fn upsert_notification(
        &self,
        executor: &mut Transaction<'_, Postgres>,
        incoming: NewNotification,
    ) -> GhnApiResult<(Notification, bool)> {
        let existing = self
            .get_notification_by_external_id(executor, &incoming.github_id)
            .await?;

        let now = Utc::now();
        match existing {
            Some(mut notification) => {
                let staged = Notification {
                    id: notification.id,
                    github_id: incoming.github_id,
                    repository_id: incoming.repository_id,
                    pull_request_id: incoming.pull_request_id,
                    subject_type: incoming.subject_type,
                    subject_title: incoming.subject_title,
                    subject_url: incoming.subject_url,
                    subject_number: incoming.subject_number,
                    subject_state: incoming.subject_state,
                    subject_merged: incoming.subject_merged,
                    subject_state_reason: incoming.subject_state_reason,
                    author_login: incoming.author_login,
                    author_id: incoming.author_id,
                    reason: incoming.reason,
                    github_unread: incoming.github_unread,
                    github_updated_at: incoming.github_updated_at,
                    github_last_read_at: incoming.github_last_read_at,
                    // Fields below are irrelevant to `apply_reingest`, which
                    // only reads the incoming struct's subject/github_*
                    // fields and writes into `self`.
                    is_read: notification.is_read,
                    archived: notification.archived,
                    muted: notification.muted,
                    starred: notification.starred,
                    filtered: notification.filtered,
                    snoozed_until: notification.snoozed_until,
                    snoozed_at: notification.snoozed_at,
                    tag_ids: notification.tag_ids.clone(),
                    imported_at: notification.imported_at,
                    effective_sort_date: notification.effective_sort_date,
                    subject_raw: incoming.subject_raw,
                };
                notification.apply_reingest(&staged);
                self.save_notification(executor, &notification).await?;
                Ok((notification, false))
            }
            None => {
                let mut notification = Notification {
                    id: NotificationId::from(uuid::Uuid::new_v4()),
                    github_id: incoming.github_id,
                    repository_id: incoming.repository_id,
                    pull_request_id: incoming.pull_request_id,
                    subject_type: incoming.subject_type,
                    subject_title: incoming.subject_title,
                    subject_url: incoming.subject_url,
                    subject_number: incoming.subject_number,
                    subject_state: incoming.subject_state,
                    subject_merged: incoming.subject_merged,
                    subject_state_reason: incoming.subject_state_reason,
                    author_login: incoming.author_login,
                    author_id: incoming.author_id,
                    reason: incoming.reason,
                    github_unread: incoming.github_unread,
                    github_updated_at: incoming.github_updated_at,
                    github_last_read_at: incoming.github_last_read_at,
                    is_read: false,
                    archived: false,
                    muted: false,
                    starred: false,
                    filtered: false,
                    snoozed_until: None,
                    snoozed_at: None,
                    tag_ids: Default::default(),
                    imported_at: now,
                    effective_sort_date: now,
                    subject_raw: incoming.subject_raw,
                };
                notification.recompute_sort_date();

                sqlx::query(&format!(
                    "INSERT INTO notifications ({FULL_COLUMNS}) VALUES \
                     ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, \
                      $18, $19, $20, $21, $22, $23, $24, $25, $26, $27, $28)"
                ))
                .bind(uuid::Uuid::from(notification.id))
                .bind(&notification.github_id)
                .bind(uuid::Uuid::from(notification.repository_id))
                .bind(notification.pull_request_id.map(uuid::Uuid::from))
                .bind(&notification.subject_type)
                .bind(&notification.subject_title)
                .bind(&notification.subject_url)
                .bind(notification.subject_number)
                .bind(&notification.subject_state)
                .bind(notification.subject_merged)
                .bind(&notification.subject_state_reason)
                .bind(&notification.author_login)
                .bind(&notification.author_id)
                .bind(&notification.reason)
                .bind(notification.github_unread)
                .bind(notification.github_updated_at)
                .bind(notification.github_last_read_at)
                .bind(notification.is_read)
                .bind(notification.archived)
                .bind(notification.muted)
                .bind(notification.starred)
                .bind(notification.filtered)
                .bind(notification.snoozed_until)
                .bind(notification.snoozed_at)
                .bind(tag_ids_array(&notification))
                .bind(notification.imported_at)
                .bind(notification.effective_sort_date)
                .bind(&notification.subject_raw)
                .execute(&mut **executor)
                .await
                .map_err(|err| {
                    GhnApiError::from_sqlx(
                        format!("Failed to insert notification {}", notification.github_id),
                        err,
                    )
                })?;

                Ok((notification, true))
            }
        }
    }

    #[tracing::instrument(level = "debug", skip(self, executor, notification), fields(notification_id = %notification.id), err)]
    async fn save_notification(
        &self,
        executor: &mut Transaction<'_, Postgres>,
        notification: &Notification,
    ) -> GhnApiResult<()> {
        sqlx::query(
            r#"UPDATE notifications SET
                 github_id = $2, repository_id = $3, pull_request_id = $4, subject_type = $5,
                 subject_title = $6, subject_url = $7, subject_number = $8, subject_state = $9,
                 subject_merged = $10, subject_state_reason = $11, author_login = $12,
                 author_id = $13, reason = $14, github_unread = $15, github_updated_at = $16,
                 github_last_read_at = $17, is_read = $18, archived = $19, muted = $20,
                 starred = $21, filtered = $22, snoozed_until = $23, snoozed_at = $24,
                 tag_ids = $25, effective_sort_date = $26, subject_raw = $27
               WHERE id = $1"#,
        )
        .bind(uuid::Uuid::from(notification.id))
        .bind(&notification.github_id)
        .bind(uuid::Uuid::from(notification.repository_id))
        .bind(notification.pull_request_id.map(uuid::Uuid::from))
        .bind(&notification.subject_type)
        .bind(&notification.subject_title)
        .bind(&notification.subject_url)
        .bind(notification.subject_number)
        .bind(&notification.subject_state)
        .bind(notification.subject_merged)
        .bind(&notification.subject_state_reason)
        .bind(&notification.author_login)
        .bind(&notification.author_id)
        .bind(&notification.reason)
        .bind(notification.github_unread)
        .bind(notification.github_updated_at)
        .bind(notification.github_last_read_at)
        .bind(notification.is_read)
        .bind(notification.archived)
        .bind(notification.muted)
        .bind(notification.starred)
        .bind(notification.filtered)
        .bind(notification.snoozed_until)
        .bind(notification.snoozed_at)
        .bind(tag_ids_array(notification))
        .bind(notification.effective_sort_date)
        .bind(&notification.subject_raw)
        .execute(&mut **executor)
        .await
        .map_err(|err| {
            GhnApiError::from_sqlx(format!("Failed to save notification {}", notification.id), err)
        })?;

        Ok(())
    }

    async fn mark_read(
        &self,
        executor: &mut Transaction<'_, Postgres>,
        github_id: &str,
    ) -> GhnApiResult<Notification> {
        apply_domain_transition(self, executor, github_id, Notification::mark_read).await
    }

    async fn mark_unread(
        &self,
        executor: &mut Transaction<'_, Postgres>,
        github_id: &str,
    ) -> GhnApiResult<Notification> {
        apply_domain_transition(self, executor, github_id, Notification::mark_unread).await
    }

    async fn archive(
        &self,
        executor: &mut Transaction<'_, Postgres>,
        github_id: &str,
    ) -> GhnApiResult<Notification> {
        apply_domain_transition(self, executor, github_id, Notification::archive).await
    }

    async fn unarchive(
        &self,
        executor: &mut Transaction<'_, Postgres>,
        github_id: &str,
    ) -> GhnApiResult<Notification> {
        apply_domain_transition(self, executor, github_id, Notification::unarchive).await
    }

    async fn mute(
        &self,
        executor: &mut Transaction<'_, Postgres>,
        github_id: &str,
    ) -> GhnApiResult<Notification> {
        apply_domain_transition(self, executor, github_id, Notification::mute).await
    }

    async fn unmute(
        &self,
        executor: &mut Transaction<'_, Postgres>,
        github_id: &str,
    ) -> GhnApiResult<Notification> {
        apply_domain_transition(self, executor, github_id, Notification::unmute).await
    }

    async fn star(
        &self,
        executor: &mut Transaction<'_, Postgres>,
        github_id: &str,
    ) -> GhnApiResult<Notification> {
        apply_domain_transition(self, executor, github_id, Notification::star).await
    }

    async fn unstar(
        &self,
        executor: &mut Transaction<'_, Postgres>,
        github_id: &str,
    ) -> GhnApiResult<Notification> {
        apply_domain_transition(self, executor, github_id, Notification::unstar).await
    }

    async fn snooze(
        &self,
        executor: &mut Transaction<'_, Postgres>,
        github_id: &str,
        until: DateTime<Utc>,
    ) -> GhnApiResult<Notification> {
        let mut notification = self
            .get_notification_by_external_id(executor, github_id)
            .await?
            .ok_or_else(|| GhnApiError::NotFound(format!("notification {github_id}")))?;
        notification.snooze(until, Utc::now());
        self.save_notification(executor, &notification).await?;
        Ok(notification)
    }

    async fn unsnooze(
        &self,
        executor: &mut Transaction<'_, Postgres>,
        github_id: &str,
    ) -> GhnApiResult<Notification> {
        apply_domain_transition(self, executor, github_id, Notification::unsnooze).await
    }

    async fn mark_filtered(
        &self,
        executor: &mut Transaction<'_, Postgres>,
        github_id: &str,
    ) -> GhnApiResult<Notification> {
        apply_domain_transition(self, executor, github_id, Notification::mark_filtered).await
    }

    async fn unfilter(
        &self,
        executor: &mut Transaction<'_, Postgres>,
        github_id: &str,
    ) -> GhnApiResult<Notification> {
        apply_domain_transition(self, executor, github_id, Notification::unfilter).await
    }

    #[tracing::instrument(level = "debug", skip(self, executor), err)]
    async fn bulk_static_update_by_ids(
        &self,
        executor: &mut Transaction<'_, Postgres>,
        github_ids: &[String],
        set_clause: &str,
    ) -> GhnApiResult<u64> {
        let sql = format!("UPDATE notifications SET {set_clause} WHERE github_id = ANY($1)");
        let result = sqlx::query(&sql)
            .bind(github_ids)
            .execute(&mut **executor)
            .await
            .map_err(|err| GhnApiError::from_sqlx("Failed to bulk-update notifications", err))?;
        Ok(result.rows_affected())
    }

    #[tracing::instrument(level = "debug", skip(self, executor), err)]
    async fn bulk_snooze_by_ids(
        &self,
        executor: &mut Transaction<'_, Postgres>,
        github_ids: &[String],
        until: DateTime<Utc>,
    ) -> GhnApiResult<u64> {
        let result = sqlx::query(
            "UPDATE notifications SET snoozed_until = $1, snoozed_at = NOW(), \
             effective_sort_date = $1 WHERE github_id = ANY($2)",
        )
        .bind(until)
        .bind(github_ids)
        .execute(&mut **executor)
        .await
        .map_err(|err| GhnApiError::from_sqlx("Failed to bulk-snooze notifications", err))?;
        Ok(result.rows_affected())
    }

    #[tracing::instrument(level = "debug", skip_all, err)]
    async fn bulk_static_update_by_query(
        &self,
        executor: &mut Transaction<'_, Postgres>,
        built: &BuiltQuery,
        set_clause: &str,
    ) -> GhnApiResult<u64> {
        let sql = format!(
            "UPDATE notifications SET {set_clause} WHERE github_id IN ({})",
            matching_ids_subquery(built)
        );
        let mut query = sqlx::query(&sql);
        for arg in &built.args {
            query = bind_arg(query, arg);
        }
        let result = query
            .execute(&mut **executor)
            .await
            .map_err(|err| GhnApiError::from_sqlx("Failed to bulk-update notifications", err))?;
        Ok(result.rows_affected())
    }

    #[tracing::instrument(level = "debug", skip_all, err)]
    async fn bulk_snooze_by_query(
        &self,
        executor: &mut Transaction<'_, Postgres>,
        built: &BuiltQuery,
        until: DateTime<Utc>,
    ) -> GhnApiResult<u64> {
        // `until` reserves $1; the embedded SELECT's own placeholders are
        // shifted by one (§4.4 "A helper must re-number...").
        let where_sql = built
            .renumbered_where(1)
            .map(|w| format!(" WHERE {w}"))
            .unwrap_or_default();
        let sql = format!(
            "UPDATE notifications SET snoozed_until = $1, snoozed_at = NOW(), \
             effective_sort_date = $1 WHERE github_id IN (SELECT n.github_id FROM notifications n{}{})",
            joins_sql(built),
            where_sql
        );
        let mut query = sqlx::query(&sql).bind(until);
        for arg in &built.args {
            query = bind_arg(query, arg);
        }
        let result = query
            .execute(&mut **executor)
            .await
            .map_err(|err| GhnApiError::from_sqlx("Failed to bulk-snooze notifications", err))?;
        Ok(result.rows_affected())
    }

    #[tracing::instrument(level = "debug", skip_all, err)]
    async fn external_ids_matching_query(
        &self,
        executor: &mut Transaction<'_, Postgres>,
        built: &BuiltQuery,
    ) -> GhnApiResult<Vec<String>> {
        let sql = format!(
            "SELECT n.github_id FROM notifications n{}",
            {
                let mut s = joins_sql(built);
                if let Some(w) = &built.where_sql {
                    s.push_str(" WHERE ");
                    s.push_str(w);
                }
                s
            }
        );
        let mut query = sqlx::query_scalar(&sql);
        for arg in &built.args {
            query = match arg {
                SqlArg::Text(s) => query.bind(s),
                SqlArg::Bool(b) => query.bind(b),
            };
        }
        query
            .fetch_all(&mut **executor)
            .await
            .map_err(|err| GhnApiError::from_sqlx("Failed to list matching notification ids", err))
    }
}

fn joins_sql(built: &BuiltQuery) -> String {
    built.joins.iter().fold(String::new(), |mut acc, join| {
        acc.push(' ');
        acc.push_str(join);
        acc
    })
}

fn matching_ids_subquery(built: &BuiltQuery) -> String {
    let mut sql = format!("SELECT n.github_id FROM notifications n{}", joins_sql(built));
    if let Some(w) = &built.where_sql {
        sql.push_str(" WHERE ");
        sql.push_str(w);
    }
    sql
}

async fn apply_domain_transition(
    db: &Database,
    executor: &mut Transaction<'_, Postgres>,
    github_id: &str,
    mutate: fn(&mut Notification),
) -> GhnApiResult<Notification> {
    let mut notification = db
        .get_notification_by_external_id(executor, github_id)
        .await?
        .ok_or_else(|| GhnApiError::NotFound(format!("notification {github_id}")))?;
    mutate(&mut notification);
    db.save_notification(executor, &notification).await?;
    Ok(notification)
}
