use sqlx::{Postgres, Transaction};

use ghn::{
    error::GhnError,
    ids::{RuleId, ViewId},
    notification::action::RuleAction,
    rule::Rule,
};

use crate::{
    repository::{rule::RulePatch, Database, RuleRepository},
    GhnApiError, GhnApiResult,
};

/// Wraps [`RuleRepository`] with the "exactly one of `query`/`view_id`"
/// check (§3 Rule, §9 "Exactly-one-of constraints"): the database enforces
/// it with a check constraint, but a service-boundary check turns the
/// violation into a typed [`GhnError::InvalidParameters`] instead of a raw
/// `sqlx` constraint-violation error.
pub struct RuleService<'a> {
    database: &'a Database,
}

impl<'a> RuleService<'a> {
    pub fn new(database: &'a Database) -> Self {
        RuleService { database }
    }

    pub async fn create_rule(
        &self,
        executor: &mut Transaction<'_, Postgres>,
        name: &str,
        query: Option<&str>,
        view_id: Option<ViewId>,
        display_order: i32,
        actions: &[RuleAction],
    ) -> GhnApiResult<Rule> {
        if query.is_some() == view_id.is_some() {
            return Err(exactly_one_condition_error());
        }
        self.database.create_rule(executor, name, query, view_id, display_order, actions).await
    }

    pub async fn list_rules(&self, executor: &mut Transaction<'_, Postgres>) -> GhnApiResult<Vec<Rule>> {
        self.database.list_rules(executor).await
    }

    pub async fn update_rule(
        &self,
        executor: &mut Transaction<'_, Postgres>,
        id: RuleId,
        patch: &RulePatch,
    ) -> GhnApiResult<Rule> {
        let existing = self
            .database
            .get_rule_by_id(executor, id)
            .await?
            .ok_or_else(|| GhnApiError::NotFound(format!("rule {id}")))?;

        let query = patch.query.clone().unwrap_or(existing.query);
        let view_id = patch.view_id.unwrap_or(existing.view_id);
        if query.is_some() == view_id.is_some() {
            return Err(exactly_one_condition_error());
        }

        self.database.update_rule(executor, id, patch).await
    }

    pub async fn delete_rule(&self, executor: &mut Transaction<'_, Postgres>, id: RuleId) -> GhnApiResult<()> {
        self.database.delete_rule(executor, id).await
    }
}

fn exactly_one_condition_error() -> GhnApiError {
    GhnApiError::Core(GhnError::InvalidParameters(
        "exactly one of query or view_id is required".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn rule(query: Option<&str>, view_id: Option<ViewId>) -> Rule {
        Rule {
            id: RuleId::from(Uuid::new_v4()),
            name: "r".into(),
            query: query.map(str::to_string),
            view_id,
            enabled: true,
            display_order: 0,
            actions: vec![],
        }
    }

    #[test]
    fn rule_with_only_query_has_exactly_one_condition_source() {
        let r = rule(Some("in:inbox"), None);
        assert!(r.has_exactly_one_condition_source());
    }

    #[test]
    fn rule_with_both_query_and_view_violates_the_invariant() {
        let r = rule(Some("in:inbox"), Some(ViewId::from(Uuid::new_v4())));
        assert!(!r.has_exactly_one_condition_source());
    }

    #[test]
    fn rule_with_neither_violates_the_invariant() {
        let r = rule(None, None);
        assert!(!r.has_exactly_one_condition_source());
    }
}
