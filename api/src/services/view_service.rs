use sqlx::{Postgres, Transaction};

use ghn::{error::GhnError, ids::ViewId, view::View};

use crate::{
    repository::{view::ViewPatch, Database, ViewRepository},
    GhnApiError, GhnApiResult,
};

/// Wraps [`ViewRepository`] with the invariant §3 describes for a `View`
/// but leaves to the caller: "system views ... cannot be reordered or
/// renamed" (§11 "View CRUD + system-view protection"). The repository
/// itself applies whatever patch it is given; this is the boundary that
/// turns an attempt to rename/reorder a system view into a typed error
/// instead of a silent write.
pub struct ViewService<'a> {
    database: &'a Database,
}

impl<'a> ViewService<'a> {
    pub fn new(database: &'a Database) -> Self {
        ViewService { database }
    }

    pub async fn create_view(
        &self,
        executor: &mut Transaction<'_, Postgres>,
        name: &str,
        slug: &str,
        query: &str,
        display_order: i32,
    ) -> GhnApiResult<View> {
        self.database.create_view(executor, name, slug, query, display_order).await
    }

    pub async fn list_views(&self, executor: &mut Transaction<'_, Postgres>) -> GhnApiResult<Vec<View>> {
        self.database.list_views(executor).await
    }

    /// Rejects a `name` or `display_order` change on a system view before
    /// it ever reaches the repository.
    pub async fn update_view(
        &self,
        executor: &mut Transaction<'_, Postgres>,
        id: ViewId,
        patch: &ViewPatch,
    ) -> GhnApiResult<View> {
        let existing = self
            .database
            .get_view_by_id(executor, id)
            .await?
            .ok_or_else(|| GhnApiError::NotFound(format!("view {id}")))?;

        if rejects_system_view_patch(&existing, patch) {
            return Err(GhnApiError::Core(GhnError::InvalidParameters(format!(
                "system view {id} cannot be renamed or reordered"
            ))));
        }

        self.database.update_view(executor, id, patch).await
    }

    /// Deleting a view cascades to its rules (§3); system views cannot be
    /// deleted at all.
    pub async fn delete_view(&self, executor: &mut Transaction<'_, Postgres>, id: ViewId) -> GhnApiResult<()> {
        let existing = self
            .database
            .get_view_by_id(executor, id)
            .await?
            .ok_or_else(|| GhnApiError::NotFound(format!("view {id}")))?;

        if existing.is_system {
            return Err(GhnApiError::Core(GhnError::InvalidParameters(format!(
                "system view {id} cannot be deleted"
            ))));
        }

        self.database.delete_view(executor, id).await
    }
}

/// A system view patch is rejected when it would rename or reorder it;
/// changing its `query`/`icon`/`description`/`is_default` is still allowed
/// (§3: "cannot be reordered or renamed", silent on other fields).
fn rejects_system_view_patch(existing: &View, patch: &ViewPatch) -> bool {
    if !existing.is_system {
        return false;
    }
    let renames = patch.name.as_ref().is_some_and(|name| name != &existing.name);
    let reorders = patch.display_order.is_some_and(|order| order != existing.display_order);
    renames || reorders
}

#[cfg(test)]
mod tests {
    use super::*;

    fn system_view() -> View {
        View {
            id: ViewId::from(uuid::Uuid::new_v4()),
            name: "Inbox".into(),
            slug: "inbox".into(),
            is_default: true,
            is_system: true,
            icon: Some("inbox".into()),
            description: None,
            query: "".into(),
            display_order: 0,
        }
    }

    #[test]
    fn rename_is_rejected() {
        let view = system_view();
        let patch = ViewPatch { name: Some("My Inbox".into()), ..Default::default() };
        assert!(rejects_system_view_patch(&view, &patch));
    }

    #[test]
    fn reorder_is_rejected() {
        let view = system_view();
        let patch = ViewPatch { display_order: Some(5), ..Default::default() };
        assert!(rejects_system_view_patch(&view, &patch));
    }

    #[test]
    fn same_name_patch_is_not_a_rename() {
        let view = system_view();
        let patch = ViewPatch { name: Some(view.name.clone()), ..Default::default() };
        assert!(!rejects_system_view_patch(&view, &patch));
    }

    #[test]
    fn query_change_on_system_view_is_allowed() {
        let view = system_view();
        let patch = ViewPatch { query: Some("is:unread".into()), ..Default::default() };
        assert!(!rejects_system_view_patch(&view, &patch));
    }

    #[test]
    fn non_system_view_accepts_any_patch() {
        let mut view = system_view();
        view.is_system = false;
        let patch = ViewPatch { name: Some("Renamed".into()), display_order: Some(9), ..Default::default() };
        assert!(!rejects_system_view_patch(&view, &patch));
    }
}
