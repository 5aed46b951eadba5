use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Singleton row guarded by a constant-expression unique index in the
/// store (§3 "constant-expression unique index enforces single-user").
/// Password hashing and session/JWT concerns are an authentication
/// collaborator out of the core's scope (§1); this type only carries the
/// sync-relevant settings the core reads.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub sync_settings: SyncSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SyncSettings {
    /// How many days of history the initial backfill should cover.
    pub initial_sync_days: i64,
    pub initial_sync_max_count: Option<u32>,
    pub initial_sync_unread_only: bool,
    pub setup_completed: bool,
}

impl Default for SyncSettings {
    fn default() -> Self {
        SyncSettings {
            initial_sync_days: 30,
            initial_sync_max_count: Some(500),
            initial_sync_unread_only: false,
            setup_completed: false,
        }
    }
}
