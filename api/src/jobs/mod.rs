use std::sync::Arc;

use crate::{integrations::Provider, repository::Database};

pub mod apply_rule;
pub mod process;
pub mod sync;

/// Shared handles every job handler needs, injected via `apalis`'s
/// `Data<T>` extractor (mirrors the teacher's per-service `Data<Arc<...>>`
/// wiring in `jobs/mod.rs`, collapsed to one bundle since our pipeline has
/// a single provider instead of one service per integration).
#[derive(Clone)]
pub struct JobContext {
    pub database: Arc<Database>,
    pub provider: Arc<dyn Provider>,
}

/// Queue names, used both when building each `RedisStorage` namespace and
/// in the worker registration (§4.10, §11 "apalis-based 4-queue wiring").
pub const QUEUE_SYNC_NOTIFICATIONS: &str = "ghn:sync_notifications";
pub const QUEUE_PROCESS_NOTIFICATION: &str = "ghn:process_notification";
pub const QUEUE_APPLY_RULE: &str = "ghn:apply_rule";
