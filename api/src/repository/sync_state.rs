use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, Postgres, Transaction};

use ghn::sync_state::SyncState;

use crate::{error::GhnApiError, repository::database::Database, GhnApiResult};

/// The §4.10 singleton cursor row (`id = 1`, seeded by the migration).
#[async_trait]
pub trait SyncStateRepository {
    async fn get_sync_state(&self, executor: &mut Transaction<'_, Postgres>) -> GhnApiResult<SyncState>;

    async fn record_successful_poll(
        &self,
        executor: &mut Transaction<'_, Postgres>,
        polled_at: DateTime<Utc>,
        latest_notification_at: Option<DateTime<Utc>>,
    ) -> GhnApiResult<SyncState>;

    /// §4.10 Fetch-Older: only ever moves the watermark further into the
    /// past.
    async fn record_oldest_synced(
        &self,
        executor: &mut Transaction<'_, Postgres>,
        oldest: DateTime<Utc>,
    ) -> GhnApiResult<SyncState>;

    async fn record_initial_sync_completed(
        &self,
        executor: &mut Transaction<'_, Postgres>,
        completed_at: DateTime<Utc>,
    ) -> GhnApiResult<SyncState>;
}

#[derive(FromRow)]
struct SyncStateRow {
    last_successful_poll: Option<DateTime<Utc>>,
    latest_notification_at: Option<DateTime<Utc>>,
    oldest_notification_synced_at: Option<DateTime<Utc>>,
    initial_sync_completed_at: Option<DateTime<Utc>>,
}

impl From<SyncStateRow> for SyncState {
    fn from(row: SyncStateRow) -> Self {
        SyncState {
            last_successful_poll: row.last_successful_poll,
            latest_notification_at: row.latest_notification_at,
            oldest_notification_synced_at: row.oldest_notification_synced_at,
            initial_sync_completed_at: row.initial_sync_completed_at,
        }
    }
}

const SYNC_STATE_COLUMNS: &str = "last_successful_poll, latest_notification_at, \
    oldest_notification_synced_at, initial_sync_completed_at";

#[async_trait]
impl SyncStateRepository for Database {
    #[tracing::instrument(level = "debug", skip(self, executor), err)]
    async fn get_sync_state(&self, executor: &mut Transaction<'_, Postgres>) -> GhnApiResult<SyncState> {
        let row: SyncStateRow =
            sqlx::query_as(&format!("SELECT {SYNC_STATE_COLUMNS} FROM sync_state WHERE id = 1"))
                .fetch_one(&mut **executor)
                .await
                .map_err(|err| GhnApiError::from_sqlx("Failed to fetch sync state", err))?;

        Ok(row.into())
    }

    #[tracing::instrument(level = "debug", skip(self, executor), err)]
    async fn record_successful_poll(
        &self,
        executor: &mut Transaction<'_, Postgres>,
        polled_at: DateTime<Utc>,
        latest_notification_at: Option<DateTime<Utc>>,
    ) -> GhnApiResult<SyncState> {
        let row: SyncStateRow = sqlx::query_as(&format!(
            r#"UPDATE sync_state SET
                 last_successful_poll = $1,
                 latest_notification_at = COALESCE($2, latest_notification_at)
               WHERE id = 1
               RETURNING {SYNC_STATE_COLUMNS}"#
        ))
        .bind(polled_at)
        .bind(latest_notification_at)
        .fetch_one(&mut **executor)
        .await
        .map_err(|err| GhnApiError::from_sqlx("Failed to record successful poll", err))?;

        Ok(row.into())
    }

    #[tracing::instrument(level = "debug", skip(self, executor), err)]
    async fn record_oldest_synced(
        &self,
        executor: &mut Transaction<'_, Postgres>,
        oldest: DateTime<Utc>,
    ) -> GhnApiResult<SyncState> {
        let row: SyncStateRow = sqlx::query_as(&format!(
            r#"UPDATE sync_state SET
                 oldest_notification_synced_at = LEAST(
                   COALESCE(oldest_notification_synced_at, $1), $1
                 )
               WHERE id = 1
               RETURNING {SYNC_STATE_COLUMNS}"#
        ))
        .bind(oldest)
        .fetch_one(&mut **executor)
        .await
        .map_err(|err| GhnApiError::from_sqlx("Failed to record oldest synced notification", err))?;

        Ok(row.into())
    }

    #[tracing::instrument(level = "debug", skip(self, executor), err)]
    async fn record_initial_sync_completed(
        &self,
        executor: &mut Transaction<'_, Postgres>,
        completed_at: DateTime<Utc>,
    ) -> GhnApiResult<SyncState> {
        let row: SyncStateRow = sqlx::query_as(&format!(
            r#"UPDATE sync_state SET initial_sync_completed_at = $1
               WHERE id = 1
               RETURNING {SYNC_STATE_COLUMNS}"#
        ))
        .bind(completed_at)
        .fetch_one(&mut **executor)
        .await
        .map_err(|err| GhnApiError::from_sqlx("Failed to record initial sync completion", err))?;

        Ok(row.into())
    }
}
