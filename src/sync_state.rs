use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Singleton cursor row (id = 1). All fields nullable; `None` means "has
/// never happened yet". See §4.10 for the three fetch paths that read and
/// write this record.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SyncState {
    pub last_successful_poll: Option<DateTime<Utc>>,
    pub latest_notification_at: Option<DateTime<Utc>>,
    pub oldest_notification_synced_at: Option<DateTime<Utc>>,
    pub initial_sync_completed_at: Option<DateTime<Utc>>,
}

impl SyncState {
    /// §4.10 Fetch-New: `since := latest_notification_at` if set, else
    /// `last_successful_poll`, else `None` (first ever poll).
    pub fn fetch_new_since(&self) -> Option<DateTime<Utc>> {
        self.latest_notification_at.or(self.last_successful_poll)
    }

    pub fn needs_initial_sync(&self) -> bool {
        self.initial_sync_completed_at.is_none()
    }
}
