use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{PullRequestId, RepoId};

/// Cached subject metadata for a pull request, upserted by
/// `(repository_id, number)` with COALESCE semantics: a `None` field on the
/// incoming value never overwrites a stored value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PullRequest {
    pub id: PullRequestId,
    pub repository_id: RepoId,
    pub number: i64,
    pub state: Option<String>,
    pub draft: Option<bool>,
    pub merged: Option<bool>,
    pub merged_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    pub author_login: Option<String>,
}

/// Fields pulled from the subject payload that can be `COALESCE`d into an
/// existing row. `None` means "the enrichment call didn't return this
/// field", not "clear the stored value".
#[derive(Debug, Clone, Default)]
pub struct PullRequestPatch {
    pub state: Option<String>,
    pub draft: Option<bool>,
    pub merged: Option<bool>,
    pub merged_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    pub author_login: Option<String>,
}
