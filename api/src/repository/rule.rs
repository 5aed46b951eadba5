use async_trait::async_trait;
use sqlx::{types::Json, FromRow, Postgres, Transaction};

use ghn::{
    ids::{RuleId, ViewId},
    notification::action::RuleAction,
    rule::Rule,
};

use crate::{error::GhnApiError, repository::database::Database, GhnApiResult};

/// `None` fields are left unchanged; to clear `query`/`view_id` a caller
/// passes the other one (the exactly-one-of check constraint means
/// setting one implicitly requires clearing the other, so the service
/// layer always supplies both when switching condition source).
#[derive(Debug, Clone, Default)]
pub struct RulePatch {
    pub name: Option<String>,
    pub query: Option<Option<String>>,
    pub view_id: Option<Option<ViewId>>,
    pub enabled: Option<bool>,
    pub display_order: Option<i32>,
    pub actions: Option<Vec<RuleAction>>,
}

#[async_trait]
pub trait RuleRepository {
    async fn create_rule(
        &self,
        executor: &mut Transaction<'_, Postgres>,
        name: &str,
        query: Option<&str>,
        view_id: Option<ViewId>,
        display_order: i32,
        actions: &[RuleAction],
    ) -> GhnApiResult<Rule>;

    async fn list_rules(&self, executor: &mut Transaction<'_, Postgres>) -> GhnApiResult<Vec<Rule>>;

    /// Ascending `(display_order, id)` — the order the rule engine (§4.9)
    /// evaluates and applies rules in.
    async fn list_enabled_rules_ordered(
        &self,
        executor: &mut Transaction<'_, Postgres>,
    ) -> GhnApiResult<Vec<Rule>>;

    async fn get_rule_by_id(
        &self,
        executor: &mut Transaction<'_, Postgres>,
        id: RuleId,
    ) -> GhnApiResult<Option<Rule>>;

    async fn update_rule(
        &self,
        executor: &mut Transaction<'_, Postgres>,
        id: RuleId,
        patch: &RulePatch,
    ) -> GhnApiResult<Rule>;

    async fn delete_rule(&self, executor: &mut Transaction<'_, Postgres>, id: RuleId) -> GhnApiResult<()>;
}

#[derive(FromRow)]
struct RuleRow {
    id: uuid::Uuid,
    name: String,
    query: Option<String>,
    view_id: Option<uuid::Uuid>,
    enabled: bool,
    display_order: i32,
    actions: Json<Vec<RuleAction>>,
}

impl From<RuleRow> for Rule {
    fn from(row: RuleRow) -> Self {
        Rule {
            id: RuleId::from(row.id),
            name: row.name,
            query: row.query,
            view_id: row.view_id.map(ViewId::from),
            enabled: row.enabled,
            display_order: row.display_order,
            actions: row.actions.0,
        }
    }
}

const RULE_COLUMNS: &str = "id, name, query, view_id, enabled, display_order, actions";

#[async_trait]
impl RuleRepository for Database {
    #[tracing::instrument(level = "debug", skip(self, executor, actions), err)]
    async fn create_rule(
        &self,
        executor: &mut Transaction<'_, Postgres>,
        name: &str,
        query: Option<&str>,
        view_id: Option<ViewId>,
        display_order: i32,
        actions: &[RuleAction],
    ) -> GhnApiResult<Rule> {
        let row: RuleRow = sqlx::query_as(&format!(
            r#"INSERT INTO rules (id, name, query, view_id, enabled, display_order, actions)
               VALUES (gen_random_uuid(), $1, $2, $3, TRUE, $4, $5)
               RETURNING {RULE_COLUMNS}"#
        ))
        .bind(name)
        .bind(query)
        .bind(view_id.map(uuid::Uuid::from))
        .bind(display_order)
        .bind(Json(actions))
        .fetch_one(&mut **executor)
        .await
        .map_err(|err| GhnApiError::from_sqlx(format!("Failed to create rule {name}"), err))?;

        Ok(row.into())
    }

    #[tracing::instrument(level = "debug", skip(self, executor), err)]
    async fn list_rules(&self, executor: &mut Transaction<'_, Postgres>) -> GhnApiResult<Vec<Rule>> {
        let rows: Vec<RuleRow> = sqlx::query_as(&format!(
            "SELECT {RULE_COLUMNS} FROM rules ORDER BY display_order ASC, id ASC"
        ))
        .fetch_all(&mut **executor)
        .await
        .map_err(|err| GhnApiError::from_sqlx("Failed to list rules", err))?;

        Ok(rows.into_iter().map(Rule::from).collect())
    }

    #[tracing::instrument(level = "debug", skip(self, executor), err)]
    async fn list_enabled_rules_ordered(
        &self,
        executor: &mut Transaction<'_, Postgres>,
    ) -> GhnApiResult<Vec<Rule>> {
        let rows: Vec<RuleRow> = sqlx::query_as(&format!(
            "SELECT {RULE_COLUMNS} FROM rules WHERE enabled = TRUE ORDER BY display_order ASC, id ASC"
        ))
        .fetch_all(&mut **executor)
        .await
        .map_err(|err| GhnApiError::from_sqlx("Failed to list enabled rules", err))?;

        Ok(rows.into_iter().map(Rule::from).collect())
    }

    #[tracing::instrument(level = "debug", skip(self, executor), err)]
    async fn get_rule_by_id(
        &self,
        executor: &mut Transaction<'_, Postgres>,
        id: RuleId,
    ) -> GhnApiResult<Option<Rule>> {
        let row: Option<RuleRow> =
            sqlx::query_as(&format!("SELECT {RULE_COLUMNS} FROM rules WHERE id = $1"))
                .bind(uuid::Uuid::from(id))
                .fetch_optional(&mut **executor)
                .await
                .map_err(|err| GhnApiError::from_sqlx(format!("Failed to fetch rule {id}"), err))?;

        Ok(row.map(Rule::from))
    }

    #[tracing::instrument(level = "debug", skip(self, executor, patch), err)]
    async fn update_rule(
        &self,
        executor: &mut Transaction<'_, Postgres>,
        id: RuleId,
        patch: &RulePatch,
    ) -> GhnApiResult<Rule> {
        let existing = self
            .get_rule_by_id(executor, id)
            .await?
            .ok_or_else(|| GhnApiError::NotFound(format!("rule {id}")))?;

        let name = patch.name.clone().unwrap_or(existing.name);
        let query = patch.query.clone().unwrap_or(existing.query);
        let view_id = patch.view_id.unwrap_or(existing.view_id);
        let enabled = patch.enabled.unwrap_or(existing.enabled);
        let display_order = patch.display_order.unwrap_or(existing.display_order);
        let actions = patch.actions.clone().unwrap_or(existing.actions);

        let row: RuleRow = sqlx::query_as(&format!(
            r#"UPDATE rules SET name = $2, query = $3, view_id = $4, enabled = $5,
                 display_order = $6, actions = $7
               WHERE id = $1
               RETURNING {RULE_COLUMNS}"#
        ))
        .bind(uuid::Uuid::from(id))
        .bind(&name)
        .bind(&query)
        .bind(view_id.map(uuid::Uuid::from))
        .bind(enabled)
        .bind(display_order)
        .bind(Json(&actions))
        .fetch_one(&mut **executor)
        .await
        .map_err(|err| GhnApiError::from_sqlx(format!("Failed to update rule {id}"), err))?;

        Ok(row.into())
    }

    #[tracing::instrument(level = "debug", skip(self, executor), err)]
    async fn delete_rule(&self, executor: &mut Transaction<'_, Postgres>, id: RuleId) -> GhnApiResult<()> {
        sqlx::query("DELETE FROM rules WHERE id = $1")
            .bind(uuid::Uuid::from(id))
            .execute(&mut **executor)
            .await
            .map_err(|err| GhnApiError::from_sqlx(format!("Failed to delete rule {id}"), err))?;
        Ok(())
    }
}
