use chrono::{DateTime, Utc};
use tracing::info;

use crate::JobQueues;

/// `sync new` — enqueues one Fetch-New job (§4.10) without waiting for the
/// scheduler's next tick. Useful for a manual re-sync or a cron-driven
/// deployment that doesn't run a long-lived scheduler at all.
pub async fn enqueue_fetch_new(queues: &JobQueues) -> anyhow::Result<()> {
    queues.enqueue_fetch_new().await?;
    info!("Enqueued a Fetch-New job");
    Ok(())
}

/// `sync older` — enqueues one Fetch-Older job over `[until - days, until)`
/// (§4.10).
pub async fn enqueue_fetch_older(
    queues: &JobQueues,
    days: i64,
    until: DateTime<Utc>,
    max_count: Option<u32>,
    unread_only: bool,
) -> anyhow::Result<()> {
    queues.enqueue_fetch_older(days, until, max_count, unread_only).await?;
    info!(days, %until, "Enqueued a Fetch-Older job");
    Ok(())
}
