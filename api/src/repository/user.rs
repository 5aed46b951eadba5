use async_trait::async_trait;
use sqlx::{types::Json, FromRow, Postgres, Transaction};

use ghn::user::{SyncSettings, User};

use crate::{error::GhnApiError, repository::database::Database, GhnApiResult};

/// The single-user row guarded by `users_singleton_idx` (§3). Created once
/// at setup time; read by the sync pipeline for `sync_settings` (§4.10
/// Initial Sync).
#[async_trait]
pub trait UserRepository {
    async fn get_user(&self, executor: &mut Transaction<'_, Postgres>) -> GhnApiResult<Option<User>>;

    async fn create_user(
        &self,
        executor: &mut Transaction<'_, Postgres>,
        username: &str,
        password_hash: &str,
    ) -> GhnApiResult<User>;

    async fn update_sync_settings(
        &self,
        executor: &mut Transaction<'_, Postgres>,
        sync_settings: &SyncSettings,
    ) -> GhnApiResult<User>;
}

#[derive(FromRow)]
struct UserRow {
    id: uuid::Uuid,
    username: String,
    password_hash: String,
    sync_settings: Json<SyncSettings>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            username: row.username,
            password_hash: row.password_hash,
            sync_settings: row.sync_settings.0,
        }
    }
}

const USER_COLUMNS: &str = "id, username, password_hash, sync_settings";

#[async_trait]
impl UserRepository for Database {
    #[tracing::instrument(level = "debug", skip(self, executor), err)]
    async fn get_user(&self, executor: &mut Transaction<'_, Postgres>) -> GhnApiResult<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE singleton = TRUE"
        ))
        .fetch_optional(&mut **executor)
        .await
        .map_err(|err| GhnApiError::from_sqlx("Failed to fetch user", err))?;

        Ok(row.map(User::from))
    }

    #[tracing::instrument(level = "debug", skip(self, executor, password_hash), err)]
    async fn create_user(
        &self,
        executor: &mut Transaction<'_, Postgres>,
        username: &str,
        password_hash: &str,
    ) -> GhnApiResult<User> {
        let row: UserRow = sqlx::query_as(&format!(
            r#"INSERT INTO users (id, username, password_hash, sync_settings, singleton)
               VALUES (gen_random_uuid(), $1, $2, $3, TRUE)
               RETURNING {USER_COLUMNS}"#
        ))
        .bind(username)
        .bind(password_hash)
        .bind(Json(SyncSettings::default()))
        .fetch_one(&mut **executor)
        .await
        .map_err(|err| GhnApiError::from_sqlx("Failed to create user", err))?;

        Ok(row.into())
    }

    #[tracing::instrument(level = "debug", skip(self, executor, sync_settings), err)]
    async fn update_sync_settings(
        &self,
        executor: &mut Transaction<'_, Postgres>,
        sync_settings: &SyncSettings,
    ) -> GhnApiResult<User> {
        let row: UserRow = sqlx::query_as(&format!(
            r#"UPDATE users SET sync_settings = $1
               WHERE singleton = TRUE
               RETURNING {USER_COLUMNS}"#
        ))
        .bind(Json(sync_settings))
        .fetch_one(&mut **executor)
        .await
        .map_err(|err| GhnApiError::from_sqlx("Failed to update sync settings", err))?;

        Ok(row.into())
    }
}
