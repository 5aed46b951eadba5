use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A provider-side notification aggregate describing one subscription
/// (§6, GLOSSARY "Thread"). This is the shape `Provider::list_since`
/// returns; the sync pipeline upserts a `Repo`/`Notification` pair from
/// each one.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Thread {
    pub external_id: String,
    pub repository: ThreadRepository,
    pub subject: ThreadSubject,
    pub reason: String,
    pub unread: bool,
    pub updated_at: DateTime<Utc>,
    pub last_read_at: Option<DateTime<Utc>>,
    pub subscription_url: Option<String>,
    pub raw: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ThreadRepository {
    pub full_name: String,
    pub github_id: String,
    pub github_node_id: String,
    pub description: Option<String>,
    pub private: bool,
    pub default_branch: Option<String>,
    pub pushed_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub raw: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ThreadSubject {
    /// e.g. "PullRequest", "Issue", "Release", "Discussion", "CheckSuite".
    pub kind: String,
    pub title: String,
    pub url: Option<String>,
    pub latest_comment_url: Option<String>,
}
