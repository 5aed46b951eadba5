use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, Postgres, Transaction};

use ghn::{ids::RepoId, repo::Repo};

use crate::{error::GhnApiError, repository::database::Database, GhnApiResult};

/// Upserted by `full_name` (§3); never deleted by the core.
#[async_trait]
pub trait RepoRepository {
    async fn upsert_repo(
        &self,
        executor: &mut Transaction<'_, Postgres>,
        repo: &Repo,
    ) -> GhnApiResult<Repo>;

    async fn get_repo_by_id(
        &self,
        executor: &mut Transaction<'_, Postgres>,
        id: RepoId,
    ) -> GhnApiResult<Option<Repo>>;
}

#[derive(FromRow)]
struct RepoRow {
    id: uuid::Uuid,
    full_name: String,
    github_id: String,
    github_node_id: String,
    description: Option<String>,
    private: bool,
    default_branch: Option<String>,
    pushed_at: Option<DateTime<Utc>>,
    github_updated_at: Option<DateTime<Utc>>,
    raw: Option<serde_json::Value>,
}

impl From<RepoRow> for Repo {
    fn from(row: RepoRow) -> Self {
        Repo {
            id: RepoId::from(row.id),
            full_name: row.full_name,
            github_id: row.github_id,
            github_node_id: row.github_node_id,
            description: row.description,
            private: row.private,
            default_branch: row.default_branch,
            pushed_at: row.pushed_at,
            github_updated_at: row.github_updated_at,
            raw: row.raw,
        }
    }
}

#[async_trait]
impl RepoRepository for Database {
    #[tracing::instrument(level = "debug", skip_all, fields(full_name = %repo.full_name), err)]
    async fn upsert_repo(
        &self,
        executor: &mut Transaction<'_, Postgres>,
        repo: &Repo,
    ) -> GhnApiResult<Repo> {
        let row: RepoRow = sqlx::query_as(
            r#"
            INSERT INTO repositories
              (id, full_name, github_id, github_node_id, description, private,
               default_branch, pushed_at, github_updated_at, raw)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (full_name) DO UPDATE SET
              github_id = EXCLUDED.github_id,
              github_node_id = EXCLUDED.github_node_id,
              description = EXCLUDED.description,
              private = EXCLUDED.private,
              default_branch = EXCLUDED.default_branch,
              pushed_at = EXCLUDED.pushed_at,
              github_updated_at = EXCLUDED.github_updated_at,
              raw = EXCLUDED.raw
            RETURNING id, full_name, github_id, github_node_id, description, private,
                      default_branch, pushed_at, github_updated_at, raw
            "#,
        )
        .bind(uuid::Uuid::from(repo.id))
        .bind(&repo.full_name)
        .bind(&repo.github_id)
        .bind(&repo.github_node_id)
        .bind(&repo.description)
        .bind(repo.private)
        .bind(&repo.default_branch)
        .bind(repo.pushed_at)
        .bind(repo.github_updated_at)
        .bind(&repo.raw)
        .fetch_one(&mut **executor)
        .await
        .map_err(|err| {
            GhnApiError::from_sqlx(format!("Failed to upsert repository {}", repo.full_name), err)
        })?;

        Ok(row.into())
    }

    #[tracing::instrument(level = "debug", skip(self, executor), err)]
    async fn get_repo_by_id(
        &self,
        executor: &mut Transaction<'_, Postgres>,
        id: RepoId,
    ) -> GhnApiResult<Option<Repo>> {
        let row: Option<RepoRow> = sqlx::query_as(
            r#"SELECT id, full_name, github_id, github_node_id, description, private,
                      default_branch, pushed_at, github_updated_at, raw
               FROM repositories WHERE id = $1"#,
        )
        .bind(uuid::Uuid::from(id))
        .fetch_optional(&mut **executor)
        .await
        .map_err(|err| GhnApiError::from_sqlx(format!("Failed to fetch repository {id}"), err))?;

        Ok(row.map(Repo::from))
    }
}
