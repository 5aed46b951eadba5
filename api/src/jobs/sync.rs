use apalis::prelude::{Data, Storage};
use apalis_redis::RedisStorage;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use ghn::thread::Thread;

use crate::{
    integrations::Provider,
    repository::{Database, SyncStateRepository, UserRepository},
    GhnApiResult,
};

use super::{process::ProcessNotificationJob, JobContext};

/// §4.10: both fetch paths share one queue (`sync_notifications`), matching
/// the spec's "`sync_older_notifications` shares the `sync_notifications`
/// queue" — a single job type backed by a single `RedisStorage` is the only
/// way apalis lets two job shapes share one worker/queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SyncJob {
    FetchNew,
    FetchOlder {
        days: i64,
        until: DateTime<Utc>,
        max_count: Option<u32>,
        unread_only: bool,
    },
}

/// The three durable queues the sync pipeline drives (§5 "Queue
/// configuration"). Bundled together, rather than injected as three
/// separate `Data<RedisStorage<T>>` extractors, so route handlers and job
/// handlers that need to enqueue a follow-up job only take one parameter.
#[derive(Clone)]
pub struct JobQueues {
    pub sync_notifications: RedisStorage<SyncJob>,
    pub process_notification: RedisStorage<ProcessNotificationJob>,
    pub apply_rule: RedisStorage<super::apply_rule::ApplyRuleJob>,
}

impl JobQueues {
    pub async fn enqueue_fetch_new(&self) -> anyhow::Result<()> {
        self.sync_notifications.clone().push(SyncJob::FetchNew).await?;
        Ok(())
    }

    pub async fn enqueue_fetch_older(
        &self,
        days: i64,
        until: DateTime<Utc>,
        max_count: Option<u32>,
        unread_only: bool,
    ) -> anyhow::Result<()> {
        self.sync_notifications
            .clone()
            .push(SyncJob::FetchOlder { days, until, max_count, unread_only })
            .await?;
        Ok(())
    }

    pub async fn enqueue_process(&self, thread: Thread) -> anyhow::Result<()> {
        self.process_notification
            .clone()
            .push(ProcessNotificationJob { thread })
            .await?;
        Ok(())
    }

    pub async fn enqueue_apply_rule(&self, notification_id: ghn::ids::NotificationId) -> anyhow::Result<()> {
        self.apply_rule
            .clone()
            .push(super::apply_rule::ApplyRuleJob { notification_id })
            .await?;
        Ok(())
    }
}

/// Drives the periodic side of §4.10 Fetch-New: ticks every
/// `interval_secs` and pushes a `FetchNew` job onto the single-worker
/// queue. The queue's own concurrency(1) is what actually prevents two
/// Fetch-New runs from overlapping (§5 "unique-job constraint"); this
/// loop just supplies the cadence.
pub fn spawn_scheduler(queues: std::sync::Arc<JobQueues>, interval_secs: u64) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(std::time::Duration::from_secs(interval_secs));
        loop {
            ticker.tick().await;
            if let Err(err) = queues.enqueue_fetch_new().await {
                tracing::error!(error = %err, "Failed to enqueue scheduled Fetch-New job");
            }
        }
    })
}

pub async fn handle_sync_job(
    job: SyncJob,
    ctx: Data<JobContext>,
    queue: Data<std::sync::Arc<JobQueues>>,
) -> GhnApiResult<()> {
    match job {
        SyncJob::FetchNew => handle_fetch_new(&ctx, &queue).await,
        SyncJob::FetchOlder { days, until, max_count, unread_only } => {
            let since = until - Duration::days(days);
            fetch_older(&ctx, &queue, since, until, max_count, unread_only).await
        }
    }
}

/// §4.10 Fetch-New: periodic delta fetch driven by the singleton cursor.
/// Runs as the sole job on the single-worker `sync_notifications` queue, so
/// concurrent Fetch-New runs cannot race each other or their own cursor
/// write (§5 "Ordering guarantees").
async fn handle_fetch_new(ctx: &JobContext, queue: &JobQueues) -> GhnApiResult<()> {
    let mut tx = ctx.database.begin().await?;
    let sync_state = ctx.database.get_sync_state(&mut tx).await?;
    tx.commit()
        .await
        .map_err(|err| crate::error::GhnApiError::from_sqlx("Failed to read sync state", err))?;

    let since = sync_state.fetch_new_since();
    let threads = ctx.provider.list_since(since).await?;

    let mut max_updated_at = since;
    for thread in &threads {
        max_updated_at = Some(max_updated_at.map_or(thread.updated_at, |max| max.max(thread.updated_at)));
        queue
            .enqueue_process(thread.clone())
            .await
            .map_err(crate::error::GhnApiError::Unexpected)?;
    }

    let latest_notification_at = if threads.is_empty() { None } else { max_updated_at };
    let mut tx = ctx.database.begin().await?;
    ctx.database
        .record_successful_poll(&mut tx, Utc::now(), latest_notification_at)
        .await?;
    tx.commit()
        .await
        .map_err(|err| crate::error::GhnApiError::from_sqlx("Failed to record successful poll", err))?;

    if sync_state.needs_initial_sync() {
        run_initial_sync(ctx, queue).await?;
    }

    Ok(())
}

/// §4.10 Initial Sync: a one-time historical backfill, parameterized by the
/// singleton user's `sync_settings` rather than caller-supplied arguments.
/// Runs inline, under the same single-worker serialization as Fetch-New,
/// rather than as a separately queued job, so there is no window where a
/// second Fetch-New could observe `initial_sync_completed_at IS NULL` and
/// kick off a concurrent backfill.
async fn run_initial_sync(ctx: &JobContext, queue: &JobQueues) -> GhnApiResult<()> {
    let mut tx = ctx.database.begin().await?;
    let user = ctx.database.get_user(&mut tx).await?;
    tx.commit()
        .await
        .map_err(|err| crate::error::GhnApiError::from_sqlx("Failed to read user settings", err))?;

    let Some(user) = user else {
        tracing::warn!("Skipping initial sync: no user configured yet");
        return Ok(());
    };

    let settings = &user.sync_settings;
    let until = Utc::now();
    let since = until - Duration::days(settings.initial_sync_days);
    fetch_older(
        ctx,
        queue,
        since,
        until,
        settings.initial_sync_max_count,
        settings.initial_sync_unread_only,
    )
    .await?;

    let mut tx = ctx.database.begin().await?;
    ctx.database.record_initial_sync_completed(&mut tx, Utc::now()).await?;
    tx.commit().await.map_err(|err| {
        crate::error::GhnApiError::from_sqlx("Failed to record initial sync completion", err)
    })?;

    Ok(())
}

/// §4.10 Fetch-Older: bounded backfill over `[since, until)`, shared by the
/// on-demand `FetchOlder` job and by Initial Sync.
async fn fetch_older(
    ctx: &JobContext,
    queue: &JobQueues,
    since: DateTime<Utc>,
    until: DateTime<Utc>,
    max_count: Option<u32>,
    unread_only: bool,
) -> GhnApiResult<()> {
    let threads = ctx.provider.list_since(Some(since)).await?;

    let mut min_observed: Option<DateTime<Utc>> = None;
    let mut enqueued = 0u32;
    for thread in threads {
        if thread.updated_at >= until {
            continue;
        }
        if unread_only && !thread.unread {
            continue;
        }
        if let Some(max_count) = max_count {
            if enqueued >= max_count {
                break;
            }
        }

        min_observed = Some(min_observed.map_or(thread.updated_at, |min| min.min(thread.updated_at)));
        queue
            .enqueue_process(thread)
            .await
            .map_err(crate::error::GhnApiError::Unexpected)?;
        enqueued += 1;
    }

    if let Some(min_observed) = min_observed {
        let mut tx = ctx.database.begin().await?;
        ctx.database.record_oldest_synced(&mut tx, min_observed).await?;
        tx.commit().await.map_err(|err| {
            crate::error::GhnApiError::from_sqlx("Failed to record oldest synced notification", err)
        })?;
    }

    Ok(())
}
