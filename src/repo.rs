use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ids::RepoId;

/// A GitHub repository, upserted by `full_name`. Never deleted by the core.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Repo {
    pub id: RepoId,
    /// `owner/name`, unique.
    pub full_name: String,
    pub github_id: String,
    pub github_node_id: String,
    pub description: Option<String>,
    pub private: bool,
    pub default_branch: Option<String>,
    pub pushed_at: Option<DateTime<Utc>>,
    pub github_updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<Value>,
}

impl Repo {
    pub fn owner(&self) -> &str {
        self.full_name.split('/').next().unwrap_or(&self.full_name)
    }
}
