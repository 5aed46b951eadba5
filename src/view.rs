use serde::{Deserialize, Serialize};

use crate::ids::ViewId;

/// A named, persisted query. System views (e.g. "inbox") are seeded at
/// migration time and cannot be renamed or reordered; `ViewService`
/// enforces this at the service boundary (see DESIGN.md).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct View {
    pub id: ViewId,
    pub name: String,
    pub slug: String,
    pub is_default: bool,
    pub is_system: bool,
    pub icon: Option<String>,
    pub description: Option<String>,
    pub query: String,
    pub display_order: i32,
}

pub const SYSTEM_VIEW_INBOX_SLUG: &str = "inbox";
