use std::collections::BTreeSet;

use async_trait::async_trait;
use sqlx::{FromRow, Postgres, Transaction};

use ghn::{
    ids::{NotificationId, TagId},
    tag::{Tag, NOTIFICATION_ENTITY_TYPE},
};

use crate::{error::GhnApiError, repository::database::Database, GhnApiResult};

/// Tag CRUD plus the join-table assignment operations that back
/// `Notification::tag_ids` (§3, §9 "Arena + index vs. ownership graph").
#[async_trait]
pub trait TagRepository {
    async fn create_tag(
        &self,
        executor: &mut Transaction<'_, Postgres>,
        name: &str,
        slug: &str,
        display_order: i32,
    ) -> GhnApiResult<Tag>;

    async fn list_tags(&self, executor: &mut Transaction<'_, Postgres>) -> GhnApiResult<Vec<Tag>>;

    async fn get_tag_by_id(
        &self,
        executor: &mut Transaction<'_, Postgres>,
        id: TagId,
    ) -> GhnApiResult<Option<Tag>>;

    async fn delete_tag(&self, executor: &mut Transaction<'_, Postgres>, id: TagId) -> GhnApiResult<()>;

    /// Idempotent on re-assign (§3).
    async fn assign_tag(
        &self,
        executor: &mut Transaction<'_, Postgres>,
        tag_id: TagId,
        notification_id: NotificationId,
    ) -> GhnApiResult<()>;

    async fn remove_tag(
        &self,
        executor: &mut Transaction<'_, Postgres>,
        tag_id: TagId,
        notification_id: NotificationId,
    ) -> GhnApiResult<()>;

    /// §3: `tag_ids` is always the distinct union of assignment rows for
    /// this notification. Called after every assign/remove so the
    /// denormalized cache on `notifications` never drifts from the join
    /// table (§9's invariant the tests enforce).
    async fn rebuild_tag_ids_cache(
        &self,
        executor: &mut Transaction<'_, Postgres>,
        notification_id: NotificationId,
    ) -> GhnApiResult<BTreeSet<TagId>>;
}

#[derive(FromRow)]
struct TagRow {
    id: uuid::Uuid,
    name: String,
    slug: String,
    display_order: i32,
}

impl From<TagRow> for Tag {
    fn from(row: TagRow) -> Self {
        Tag {
            id: TagId::from(row.id),
            name: row.name,
            slug: row.slug,
            display_order: row.display_order,
        }
    }
}

#[async_trait]
impl TagRepository for Database {
    #[tracing::instrument(level = "debug", skip(self, executor), err)]
    async fn create_tag(
        &self,
        executor: &mut Transaction<'_, Postgres>,
        name: &str,
        slug: &str,
        display_order: i32,
    ) -> GhnApiResult<Tag> {
        let row: TagRow = sqlx::query_as(
            r#"INSERT INTO tags (id, name, slug, display_order)
               VALUES (gen_random_uuid(), $1, $2, $3)
               RETURNING id, name, slug, display_order"#,
        )
        .bind(name)
        .bind(slug)
        .bind(display_order)
        .fetch_one(&mut **executor)
        .await
        .map_err(|err| GhnApiError::from_sqlx(format!("Failed to create tag {name}"), err))?;

        Ok(row.into())
    }

    #[tracing::instrument(level = "debug", skip(self, executor), err)]
    async fn list_tags(&self, executor: &mut Transaction<'_, Postgres>) -> GhnApiResult<Vec<Tag>> {
        let rows: Vec<TagRow> = sqlx::query_as(
            "SELECT id, name, slug, display_order FROM tags ORDER BY display_order ASC, name ASC",
        )
        .fetch_all(&mut **executor)
        .await
        .map_err(|err| GhnApiError::from_sqlx("Failed to list tags", err))?;

        Ok(rows.into_iter().map(Tag::from).collect())
    }

    #[tracing::instrument(level = "debug", skip(self, executor), err)]
    async fn get_tag_by_id(
        &self,
        executor: &mut Transaction<'_, Postgres>,
        id: TagId,
    ) -> GhnApiResult<Option<Tag>> {
        let row: Option<TagRow> =
            sqlx::query_as("SELECT id, name, slug, display_order FROM tags WHERE id = $1")
                .bind(uuid::Uuid::from(id))
                .fetch_optional(&mut **executor)
                .await
                .map_err(|err| GhnApiError::from_sqlx(format!("Failed to fetch tag {id}"), err))?;

        Ok(row.map(Tag::from))
    }

    #[tracing::instrument(level = "debug", skip(self, executor), err)]
    async fn delete_tag(&self, executor: &mut Transaction<'_, Postgres>, id: TagId) -> GhnApiResult<()> {
        sqlx::query("DELETE FROM tags WHERE id = $1")
            .bind(uuid::Uuid::from(id))
            .execute(&mut **executor)
            .await
            .map_err(|err| GhnApiError::from_sqlx(format!("Failed to delete tag {id}"), err))?;
        Ok(())
    }

    #[tracing::instrument(level = "debug", skip(self, executor), err)]
    async fn assign_tag(
        &self,
        executor: &mut Transaction<'_, Postgres>,
        tag_id: TagId,
        notification_id: NotificationId,
    ) -> GhnApiResult<()> {
        sqlx::query(
            r#"INSERT INTO tag_assignments (tag_id, entity_type, entity_id)
               VALUES ($1, $2, $3)
               ON CONFLICT (tag_id, entity_type, entity_id) DO NOTHING"#,
        )
        .bind(uuid::Uuid::from(tag_id))
        .bind(NOTIFICATION_ENTITY_TYPE)
        .bind(uuid::Uuid::from(notification_id))
        .execute(&mut **executor)
        .await
        .map_err(|err| {
            GhnApiError::from_sqlx(format!("Failed to assign tag {tag_id} to {notification_id}"), err)
        })?;

        Ok(())
    }

    #[tracing::instrument(level = "debug", skip(self, executor), err)]
    async fn remove_tag(
        &self,
        executor: &mut Transaction<'_, Postgres>,
        tag_id: TagId,
        notification_id: NotificationId,
    ) -> GhnApiResult<()> {
        sqlx::query(
            "DELETE FROM tag_assignments WHERE tag_id = $1 AND entity_type = $2 AND entity_id = $3",
        )
        .bind(uuid::Uuid::from(tag_id))
        .bind(NOTIFICATION_ENTITY_TYPE)
        .bind(uuid::Uuid::from(notification_id))
        .execute(&mut **executor)
        .await
        .map_err(|err| {
            GhnApiError::from_sqlx(
                format!("Failed to remove tag {tag_id} from {notification_id}"),
                err,
            )
        })?;

        Ok(())
    }

    #[tracing::instrument(level = "debug", skip(self, executor), err)]
    async fn rebuild_tag_ids_cache(
        &self,
        executor: &mut Transaction<'_, Postgres>,
        notification_id: NotificationId,
    ) -> GhnApiResult<BTreeSet<TagId>> {
        let ids: Vec<uuid::Uuid> = sqlx::query_scalar(
            "SELECT DISTINCT tag_id FROM tag_assignments WHERE entity_type = $1 AND entity_id = $2",
        )
        .bind(NOTIFICATION_ENTITY_TYPE)
        .bind(uuid::Uuid::from(notification_id))
        .fetch_all(&mut **executor)
        .await
        .map_err(|err| {
            GhnApiError::from_sqlx(format!("Failed to list tag assignments for {notification_id}"), err)
        })?;

        let tag_ids: BTreeSet<TagId> = ids.into_iter().map(TagId::from).collect();

        sqlx::query("UPDATE notifications SET tag_ids = $1 WHERE id = $2")
            .bind(ids_as_uuid_array(&tag_ids))
            .bind(uuid::Uuid::from(notification_id))
            .execute(&mut **executor)
            .await
            .map_err(|err| {
                GhnApiError::from_sqlx(format!("Failed to rebuild tag_ids cache for {notification_id}"), err)
            })?;

        Ok(tag_ids)
    }
}

fn ids_as_uuid_array(ids: &BTreeSet<TagId>) -> Vec<uuid::Uuid> {
    ids.iter().map(|id| uuid::Uuid::from(*id)).collect()
}
