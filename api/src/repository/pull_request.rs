use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, Postgres, Transaction};

use ghn::{
    ids::{PullRequestId, RepoId},
    pull_request::{PullRequest, PullRequestPatch},
};

use crate::{error::GhnApiError, repository::database::Database, GhnApiResult};

/// Upserted by `(repository_id, number)`; `None` fields in the incoming
/// patch never overwrite a stored value (§3 "COALESCE semantics").
#[async_trait]
pub trait PullRequestRepository {
    async fn upsert_pull_request(
        &self,
        executor: &mut Transaction<'_, Postgres>,
        repository_id: RepoId,
        number: i64,
        patch: &PullRequestPatch,
    ) -> GhnApiResult<PullRequest>;
}

#[derive(FromRow)]
struct PullRequestRow {
    id: uuid::Uuid,
    repository_id: uuid::Uuid,
    number: i64,
    state: Option<String>,
    draft: Option<bool>,
    merged: Option<bool>,
    merged_at: Option<DateTime<Utc>>,
    closed_at: Option<DateTime<Utc>>,
    author_login: Option<String>,
}

impl From<PullRequestRow> for PullRequest {
    fn from(row: PullRequestRow) -> Self {
        PullRequest {
            id: PullRequestId::from(row.id),
            repository_id: RepoId::from(row.repository_id),
            number: row.number,
            state: row.state,
            draft: row.draft,
            merged: row.merged,
            merged_at: row.merged_at,
            closed_at: row.closed_at,
            author_login: row.author_login,
        }
    }
}

#[async_trait]
impl PullRequestRepository for Database {
    #[tracing::instrument(level = "debug", skip(self, executor, patch), err)]
    async fn upsert_pull_request(
        &self,
        executor: &mut Transaction<'_, Postgres>,
        repository_id: RepoId,
        number: i64,
        patch: &PullRequestPatch,
    ) -> GhnApiResult<PullRequest> {
        let row: PullRequestRow = sqlx::query_as(
            r#"
            INSERT INTO pull_requests
              (id, repository_id, number, state, draft, merged, merged_at, closed_at, author_login)
            VALUES (gen_random_uuid(), $1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (repository_id, number) DO UPDATE SET
              state = COALESCE(EXCLUDED.state, pull_requests.state),
              draft = COALESCE(EXCLUDED.draft, pull_requests.draft),
              merged = COALESCE(EXCLUDED.merged, pull_requests.merged),
              merged_at = COALESCE(EXCLUDED.merged_at, pull_requests.merged_at),
              closed_at = COALESCE(EXCLUDED.closed_at, pull_requests.closed_at),
              author_login = COALESCE(EXCLUDED.author_login, pull_requests.author_login)
            RETURNING id, repository_id, number, state, draft, merged, merged_at, closed_at, author_login
            "#,
        )
        .bind(uuid::Uuid::from(repository_id))
        .bind(number)
        .bind(&patch.state)
        .bind(patch.draft)
        .bind(patch.merged)
        .bind(patch.merged_at)
        .bind(patch.closed_at)
        .bind(&patch.author_login)
        .fetch_one(&mut **executor)
        .await
        .map_err(|err| {
            GhnApiError::from_sqlx(
                format!("Failed to upsert pull request {repository_id}#{number}"),
                err,
            )
        })?;

        Ok(row.into())
    }
}
