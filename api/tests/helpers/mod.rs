use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rstest::fixture;
use sqlx::{Connection, Executor, PgConnection, PgPool};
use uuid::Uuid;

use ghn::{ids::RepoId, repo::Repo, thread::Thread};
use ghn_api::{configuration::Settings, repository::Database, GhnApiError};

/// A per-test throwaway Postgres database, mirroring the teacher's own
/// `db_connection` fixture (`tests/api/helpers.rs`): a fresh database name
/// per test run, migrated from scratch, so tests never share state or
/// ordering.
#[fixture]
pub async fn db_connection(mut settings: Settings) -> Database {
    settings.database.database_name = format!("ghn_test_{}", Uuid::new_v4().simple());

    let mut server_connection = PgConnection::connect(&settings.database.connection_string_without_db())
        .await
        .expect("Failed to connect to Postgres");
    server_connection
        .execute(&*format!(r#"CREATE DATABASE "{}";"#, settings.database.database_name))
        .await
        .expect("Failed to create test database");

    let pool = PgPool::connect(&settings.database.connection_string())
        .await
        .expect("Failed to connect to the test database");

    sqlx::migrate!("../migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate the test database");

    Database::new(Arc::new(pool))
}

#[fixture]
pub fn settings() -> Settings {
    Settings::new_from_file(Some("config/test".to_string())).expect("Cannot load test configuration")
}

/// Stands in for [`ghn_api::integrations::Provider`] so the sync pipeline
/// and rule engine can be exercised without a network call (§6: the
/// provider is a two-operation trait chosen precisely so it is easy to
/// fake in tests).
pub struct FakeProvider {
    pub threads: Vec<Thread>,
}

#[async_trait]
impl ghn_api::integrations::Provider for FakeProvider {
    async fn list_since(&self, _since: Option<DateTime<Utc>>) -> Result<Vec<Thread>, GhnApiError> {
        Ok(self.threads.clone())
    }

    async fn get_subject(&self, _url: &str) -> Result<Vec<u8>, GhnApiError> {
        Ok(Vec::new())
    }
}

pub fn test_repo(full_name: &str) -> Repo {
    Repo {
        id: RepoId::from(Uuid::new_v4()),
        full_name: full_name.to_string(),
        github_id: Uuid::new_v4().simple().to_string(),
        github_node_id: "node".to_string(),
        description: None,
        private: false,
        default_branch: Some("main".to_string()),
        pushed_at: None,
        github_updated_at: None,
        raw: None,
    }
}
