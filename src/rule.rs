use serde::{Deserialize, Serialize};

use crate::{
    ids::{RuleId, ViewId},
    notification::action::RuleAction,
};

/// An automation rule. Exactly one of `query`/`view_id` is set — enforced
/// by a table-level check constraint in the store and re-checked at the
/// service boundary (§9 "Exactly-one-of constraints").
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Rule {
    pub id: RuleId,
    pub name: String,
    pub query: Option<String>,
    pub view_id: Option<ViewId>,
    pub enabled: bool,
    pub display_order: i32,
    pub actions: Vec<RuleAction>,
}

impl Rule {
    pub fn has_exactly_one_condition_source(&self) -> bool {
        self.query.is_some() != self.view_id.is_some()
    }
}
