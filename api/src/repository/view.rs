use async_trait::async_trait;
use sqlx::{FromRow, Postgres, Transaction};

use ghn::{ids::ViewId, view::View};

use crate::{error::GhnApiError, repository::database::Database, GhnApiResult};

/// Fields a caller may change on a view. `name`/`display_order` are
/// rejected for system views at the service boundary, not here — the
/// repository applies whatever it is given (§11 "View CRUD").
#[derive(Debug, Clone, Default)]
pub struct ViewPatch {
    pub name: Option<String>,
    pub icon: Option<String>,
    pub description: Option<String>,
    pub query: Option<String>,
    pub display_order: Option<i32>,
    pub is_default: Option<bool>,
}

#[async_trait]
pub trait ViewRepository {
    async fn create_view(
        &self,
        executor: &mut Transaction<'_, Postgres>,
        name: &str,
        slug: &str,
        query: &str,
        display_order: i32,
    ) -> GhnApiResult<View>;

    async fn list_views(&self, executor: &mut Transaction<'_, Postgres>) -> GhnApiResult<Vec<View>>;

    async fn get_view_by_id(
        &self,
        executor: &mut Transaction<'_, Postgres>,
        id: ViewId,
    ) -> GhnApiResult<Option<View>>;

    async fn update_view(
        &self,
        executor: &mut Transaction<'_, Postgres>,
        id: ViewId,
        patch: &ViewPatch,
    ) -> GhnApiResult<View>;

    async fn delete_view(&self, executor: &mut Transaction<'_, Postgres>, id: ViewId) -> GhnApiResult<()>;
}

#[derive(FromRow)]
struct ViewRow {
    id: uuid::Uuid,
    name: String,
    slug: String,
    is_default: bool,
    is_system: bool,
    icon: Option<String>,
    description: Option<String>,
    query: String,
    display_order: i32,
}

impl From<ViewRow> for View {
    fn from(row: ViewRow) -> Self {
        View {
            id: ViewId::from(row.id),
            name: row.name,
            slug: row.slug,
            is_default: row.is_default,
            is_system: row.is_system,
            icon: row.icon,
            description: row.description,
            query: row.query,
            display_order: row.display_order,
        }
    }
}

const VIEW_COLUMNS: &str =
    "id, name, slug, is_default, is_system, icon, description, query, display_order";

#[async_trait]
impl ViewRepository for Database {
    #[tracing::instrument(level = "debug", skip(self, executor), err)]
    async fn create_view(
        &self,
        executor: &mut Transaction<'_, Postgres>,
        name: &str,
        slug: &str,
        query: &str,
        display_order: i32,
    ) -> GhnApiResult<View> {
        let row: ViewRow = sqlx::query_as(&format!(
            r#"INSERT INTO views (id, name, slug, is_default, is_system, query, display_order)
               VALUES (gen_random_uuid(), $1, $2, FALSE, FALSE, $3, $4)
               RETURNING {VIEW_COLUMNS}"#
        ))
        .bind(name)
        .bind(slug)
        .bind(query)
        .bind(display_order)
        .fetch_one(&mut **executor)
        .await
        .map_err(|err| GhnApiError::from_sqlx(format!("Failed to create view {name}"), err))?;

        Ok(row.into())
    }

    #[tracing::instrument(level = "debug", skip(self, executor), err)]
    async fn list_views(&self, executor: &mut Transaction<'_, Postgres>) -> GhnApiResult<Vec<View>> {
        let rows: Vec<ViewRow> = sqlx::query_as(&format!(
            "SELECT {VIEW_COLUMNS} FROM views ORDER BY display_order ASC, name ASC"
        ))
        .fetch_all(&mut **executor)
        .await
        .map_err(|err| GhnApiError::from_sqlx("Failed to list views", err))?;

        Ok(rows.into_iter().map(View::from).collect())
    }

    #[tracing::instrument(level = "debug", skip(self, executor), err)]
    async fn get_view_by_id(
        &self,
        executor: &mut Transaction<'_, Postgres>,
        id: ViewId,
    ) -> GhnApiResult<Option<View>> {
        let row: Option<ViewRow> =
            sqlx::query_as(&format!("SELECT {VIEW_COLUMNS} FROM views WHERE id = $1"))
                .bind(uuid::Uuid::from(id))
                .fetch_optional(&mut **executor)
                .await
                .map_err(|err| GhnApiError::from_sqlx(format!("Failed to fetch view {id}"), err))?;

        Ok(row.map(View::from))
    }

    #[tracing::instrument(level = "debug", skip(self, executor, patch), err)]
    async fn update_view(
        &self,
        executor: &mut Transaction<'_, Postgres>,
        id: ViewId,
        patch: &ViewPatch,
    ) -> GhnApiResult<View> {
        let row: ViewRow = sqlx::query_as(&format!(
            r#"UPDATE views SET
                 name = COALESCE($2, name),
                 icon = COALESCE($3, icon),
                 description = COALESCE($4, description),
                 query = COALESCE($5, query),
                 display_order = COALESCE($6, display_order),
                 is_default = COALESCE($7, is_default)
               WHERE id = $1
               RETURNING {VIEW_COLUMNS}"#
        ))
        .bind(uuid::Uuid::from(id))
        .bind(&patch.name)
        .bind(&patch.icon)
        .bind(&patch.description)
        .bind(&patch.query)
        .bind(patch.display_order)
        .bind(patch.is_default)
        .fetch_one(&mut **executor)
        .await
        .map_err(|err| GhnApiError::from_sqlx(format!("Failed to update view {id}"), err))?;

        Ok(row.into())
    }

    #[tracing::instrument(level = "debug", skip(self, executor), err)]
    async fn delete_view(&self, executor: &mut Transaction<'_, Postgres>, id: ViewId) -> GhnApiResult<()> {
        sqlx::query("DELETE FROM views WHERE id = $1")
            .bind(uuid::Uuid::from(id))
            .execute(&mut **executor)
            .await
            .map_err(|err| GhnApiError::from_sqlx(format!("Failed to delete view {id}"), err))?;
        Ok(())
    }
}
