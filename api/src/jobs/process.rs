use std::sync::Arc;

use apalis::prelude::Data;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use ghn::{
    pull_request::PullRequestPatch,
    repo::Repo,
    thread::Thread,
};

use crate::{
    error::GhnApiError,
    integrations::Provider,
    repository::{Database, NewNotification, NotificationRepository, PullRequestRepository, RepoRepository},
    GhnApiResult,
};

use super::JobContext;

/// §4.10 step 4: one ingested thread, upserted into the store. Carries the
/// raw [`Thread`] rather than re-flattening it, so the handler can perform
/// every upsert (repository, pull request, notification) from one payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessNotificationJob {
    pub thread: Thread,
}

pub async fn handle_process_notification(
    job: ProcessNotificationJob,
    ctx: Data<JobContext>,
    queue: Data<Arc<super::sync::JobQueues>>,
) -> GhnApiResult<()> {
    let thread = job.thread;
    let mut tx = ctx.database.begin().await?;

    let repo = ctx
        .database
        .upsert_repo(&mut tx, &repo_from_thread(&thread))
        .await?;

    let (pull_request_id, patch) = if thread.subject.kind == "PullRequest" {
        let patch = fetch_pull_request_patch(&ctx.provider, &thread).await;
        let pull_request = ctx
            .database
            .upsert_pull_request(
                &mut tx,
                repo.id,
                subject_number(&thread).unwrap_or_default(),
                &patch,
            )
            .await?;
        (Some(pull_request.id), patch)
    } else {
        (None, PullRequestPatch::default())
    };

    let (notification, created) = ctx
        .database
        .upsert_notification(&mut tx, new_notification(&thread, repo.id, pull_request_id, &patch))
        .await?;

    tx.commit()
        .await
        .map_err(|err| GhnApiError::from_sqlx("Failed to commit notification ingest", err))?;

    if created {
        queue
            .enqueue_apply_rule(notification.id)
            .await
            .map_err(GhnApiError::Unexpected)?;
    }

    Ok(())
}

/// Best-effort enrichment: a failed subject fetch or an unparseable payload
/// just yields an empty patch, leaving whatever the store already has.
async fn fetch_pull_request_patch(provider: &Arc<dyn Provider>, thread: &Thread) -> PullRequestPatch {
    let Some(url) = &thread.subject.url else {
        return PullRequestPatch::default();
    };

    let body = match provider.get_subject(url).await {
        Ok(body) => body,
        Err(err) => {
            tracing::warn!(url = %url, error = %err, "Failed to fetch pull request subject, skipping enrichment");
            return PullRequestPatch::default();
        }
    };

    match serde_json::from_slice::<GithubPullRequestDto>(&body) {
        Ok(dto) => dto.into_patch(),
        Err(err) => {
            tracing::warn!(url = %url, error = %err, "Failed to parse pull request subject, skipping enrichment");
            PullRequestPatch::default()
        }
    }
}

fn repo_from_thread(thread: &Thread) -> Repo {
    use ghn::ids::RepoId;
    Repo {
        id: RepoId::from(uuid::Uuid::new_v4()),
        full_name: thread.repository.full_name.clone(),
        github_id: thread.repository.github_id.clone(),
        github_node_id: thread.repository.github_node_id.clone(),
        description: thread.repository.description.clone(),
        private: thread.repository.private,
        default_branch: thread.repository.default_branch.clone(),
        pushed_at: thread.repository.pushed_at,
        github_updated_at: thread.repository.updated_at,
        raw: Some(thread.repository.raw.clone()),
    }
}

/// §4.10 step 4: folds the pull-request enrichment patch (already fetched
/// for the `PullRequest` upsert) into the notification's own subject
/// columns, so `state`/`merged` query fields (§4.4) match real data instead
/// of staying `NULL` forever.
fn new_notification(
    thread: &Thread,
    repository_id: ghn::ids::RepoId,
    pull_request_id: Option<ghn::ids::PullRequestId>,
    patch: &PullRequestPatch,
) -> NewNotification {
    let subject_state_reason = match (&patch.state, patch.merged) {
        (Some(state), Some(true)) if state == "closed" => Some("merged".to_string()),
        (Some(state), _) => Some(state.clone()),
        (None, _) => None,
    };

    NewNotification {
        github_id: thread.external_id.clone(),
        repository_id,
        pull_request_id,
        subject_type: thread.subject.kind.clone(),
        subject_title: thread.subject.title.clone(),
        subject_url: thread.subject.url.clone(),
        subject_number: subject_number(thread),
        subject_state: patch.state.clone(),
        subject_merged: patch.merged,
        subject_state_reason,
        author_login: patch.author_login.clone(),
        author_id: None,
        reason: thread.reason.clone(),
        github_unread: thread.unread,
        github_updated_at: Some(thread.updated_at),
        github_last_read_at: thread.last_read_at,
        subject_raw: Some(thread.raw.clone()),
    }
}

/// GitHub subject URLs end in `/pulls/123` or `/issues/123`; the number is
/// the final path segment.
fn subject_number(thread: &Thread) -> Option<i64> {
    thread
        .subject
        .url
        .as_ref()
        .and_then(|url| url.rsplit('/').next())
        .and_then(|segment| segment.parse().ok())
}

#[derive(Debug, Deserialize)]
struct GithubPullRequestDto {
    state: Option<String>,
    draft: Option<bool>,
    merged: Option<bool>,
    merged_at: Option<DateTime<Utc>>,
    closed_at: Option<DateTime<Utc>>,
    user: Option<GithubUserDto>,
}

#[derive(Debug, Deserialize)]
struct GithubUserDto {
    login: String,
}

impl GithubPullRequestDto {
    fn into_patch(self) -> PullRequestPatch {
        PullRequestPatch {
            state: self.state,
            draft: self.draft,
            merged: self.merged,
            merged_at: self.merged_at,
            closed_at: self.closed_at,
            author_login: self.user.map(|u| u.login),
        }
    }
}
