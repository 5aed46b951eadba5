use apalis::prelude::Data;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use ghn::ids::NotificationId;

use crate::{repository::Database, rule_engine, GhnApiResult};

use super::JobContext;

/// §4.9/§4.10 step 4: runs once per newly-created notification, retryable
/// on its own (a failed rule action is logged and skipped by
/// [`rule_engine::apply_rules`] itself; this job only fails on something
/// that prevents loading the notification at all).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplyRuleJob {
    pub notification_id: NotificationId,
}

pub async fn handle_apply_rule(job: ApplyRuleJob, ctx: Data<JobContext>) -> GhnApiResult<()> {
    let database: &Database = &ctx.database;
    let mut tx = database.begin().await?;
    rule_engine::apply_rules(database, &mut tx, job.notification_id, Utc::now()).await?;
    tx.commit()
        .await
        .map_err(|err| crate::error::GhnApiError::from_sqlx("Failed to commit rule application", err))?;
    Ok(())
}
