use async_trait::async_trait;
use chrono::{DateTime, Utc};

use ghn::thread::Thread;

use crate::GhnApiError;

pub mod github;

pub static APP_USER_AGENT: &str = concat!("ghn/", env!("CARGO_PKG_VERSION"));

/// The only inbound dependency the core needs (§6): two operations, kept
/// deliberately small so the sync pipeline can be tested against a fake
/// without a network.
#[async_trait]
pub trait Provider: Send + Sync {
    async fn list_since(&self, since: Option<DateTime<Utc>>) -> Result<Vec<Thread>, GhnApiError>;
    async fn get_subject(&self, url: &str) -> Result<Vec<u8>, GhnApiError>;
}
