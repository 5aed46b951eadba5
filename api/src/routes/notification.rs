use std::collections::{HashMap, HashSet};

use actix_web::{web, HttpResponse, Scope};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::{Postgres, Transaction};

use ghn::{
    error::GhnError,
    ids::{RepoId, TagId},
    notification::{action::ActionKind, Notification},
    query::{self, sql_builder, ActionHintPredictor, ActionHints, BuiltQuery, Evaluator, MatchContext},
};

use crate::{
    error::GhnApiError,
    repository::{Database, NotificationRepository, RepoRepository, TagRepository},
    GhnApiResult,
};

/// §6 "List API" and "Bulk API" — the only inbound HTTP surface the core
/// needs (no auth/session layer, out of scope per §1).
pub fn scope() -> Scope {
    web::scope("/notifications")
        .service(web::resource("").route(web::get().to(list_notifications)))
        .service(web::resource("/bulk/{op}").route(web::post().to(bulk_update)))
}

#[derive(Debug, Deserialize)]
pub struct ListNotificationsQuery {
    #[serde(default)]
    query: String,
    #[serde(default)]
    page: i64,
    #[serde(default, rename = "pageSize")]
    page_size: i64,
    #[serde(default, rename = "includeSubject")]
    include_subject: bool,
}

#[derive(Debug, Serialize)]
struct ActionHintsResponse {
    #[serde(rename = "dismissedOn")]
    dismissed_on: Vec<ActionKind>,
}

impl From<ActionHints> for ActionHintsResponse {
    fn from(hints: ActionHints) -> Self {
        ActionHintsResponse { dismissed_on: hints.dismissed_on }
    }
}

#[derive(Debug, Serialize)]
struct NotificationResponse {
    #[serde(flatten)]
    notification: Notification,
    #[serde(rename = "actionHints")]
    action_hints: ActionHintsResponse,
}

#[derive(Debug, Serialize)]
struct ListNotificationsResponse {
    notifications: Vec<NotificationResponse>,
    total: i64,
    page: i64,
    #[serde(rename = "pageSize")]
    page_size: i64,
}

/// §6 "List API": builds the query once, shares one [`Evaluator`]/
/// [`ActionHintPredictor`] across the page (§4.6 "reuses one evaluator
/// across a page of notifications"), and applies inbox defaults exactly
/// when the parsed query carries no `in:` term (§4.7).
pub async fn list_notifications(
    params: web::Query<ListNotificationsQuery>,
    database: web::Data<Database>,
) -> GhnApiResult<HttpResponse> {
    let params = params.into_inner();
    let (page, page_size) = ghn::normalize_paging(params.page, params.page_size);
    let offset = ghn::offset_for(page, page_size);

    let ast = query::parse_and_validate(&params.query)?;
    let mut built = query::build(&ast, 1, page_size, offset, params.include_subject);
    if !sql_builder::query_has_in_term(&ast) {
        sql_builder::apply_inbox_defaults(&mut built);
    }

    let mut tx = database.begin().await?;
    let notifications = database.list_notifications(&mut tx, &built).await?;
    let total = database.count_notifications(&mut tx, &built).await?;

    let tags = database.list_tags(&mut tx).await?;
    let repo_cache = load_repos(&database, &mut tx, &notifications).await?;

    let evaluator = Evaluator::new(&params.query).ok();
    let predictor = ActionHintPredictor::new(evaluator.as_ref());
    let now = Utc::now();

    let mut responses = Vec::with_capacity(notifications.len());
    for notification in notifications {
        let repo = repo_cache.get(&notification.repository_id).ok_or_else(|| {
            GhnApiError::NotFound(format!("repository {}", notification.repository_id))
        })?;
        let ctx = MatchContext { notification: &notification, repo, now, tags: &tags };
        let hints = predictor.hints(&ctx);
        responses.push(NotificationResponse { notification, action_hints: hints.into() });
    }

    tx.commit()
        .await
        .map_err(|err| GhnApiError::from_sqlx("Failed to commit notification list", err))?;

    Ok(HttpResponse::Ok().json(ListNotificationsResponse {
        notifications: responses,
        total,
        page,
        page_size,
    }))
}

async fn load_repos(
    database: &Database,
    tx: &mut Transaction<'_, Postgres>,
    notifications: &[Notification],
) -> GhnApiResult<HashMap<RepoId, ghn::repo::Repo>> {
    let repo_ids: HashSet<RepoId> = notifications.iter().map(|n| n.repository_id).collect();
    let mut cache = HashMap::with_capacity(repo_ids.len());
    for repo_id in repo_ids {
        if let Some(repo) = database.get_repo_by_id(tx, repo_id).await? {
            cache.insert(repo_id, repo);
        }
    }
    Ok(cache)
}

#[derive(Debug, Deserialize)]
struct BulkRequest {
    #[serde(rename = "githubIds")]
    github_ids: Option<Vec<String>>,
    query: Option<String>,
    #[serde(rename = "tagId")]
    tag_id: Option<TagId>,
}

enum ResolvedOp {
    Static(&'static str),
    Snooze,
    AssignTag,
    RemoveTag,
}

fn resolve_op(op: &str) -> Option<ResolvedOp> {
    use crate::repository::notification::static_transitions as st;
    Some(match op {
        "mark-read" => ResolvedOp::Static(st::MARK_READ),
        "mark-unread" => ResolvedOp::Static(st::MARK_UNREAD),
        "archive" => ResolvedOp::Static(st::ARCHIVE),
        "unarchive" => ResolvedOp::Static(st::UNARCHIVE),
        "mute" => ResolvedOp::Static(st::MUTE),
        "unmute" => ResolvedOp::Static(st::UNMUTE),
        "star" => ResolvedOp::Static(st::STAR),
        "unstar" => ResolvedOp::Static(st::UNSTAR),
        "unfilter" => ResolvedOp::Static(st::UNFILTER),
        "snooze" => ResolvedOp::Snooze,
        "unsnooze" => ResolvedOp::Static(st::UNSNOOZE),
        "assign-tag" => ResolvedOp::AssignTag,
        "remove-tag" => ResolvedOp::RemoveTag,
        _ => return None,
    })
}

/// §6 "Bulk API". Exactly one of `githubIds`/`query` is required; an empty
/// `query` is valid and, like the list endpoint, picks up inbox defaults.
pub async fn bulk_update(
    path: web::Path<String>,
    body: web::Json<BulkRequest>,
    database: web::Data<Database>,
) -> GhnApiResult<HttpResponse> {
    let op = path.into_inner();
    let body = body.into_inner();

    if body.github_ids.is_some() == body.query.is_some() {
        return Err(GhnApiError::Core(GhnError::InvalidParameters(
            "exactly one of githubIds or query is required".to_string(),
        )));
    }

    let Some(resolved) = resolve_op(&op) else {
        return Err(GhnApiError::Core(GhnError::InvalidParameters(format!(
            "unknown bulk operation {op}"
        ))));
    };

    let mut tx = database.begin().await?;

    let count = match resolved {
        ResolvedOp::Static(set_clause) => apply_static(&database, &mut tx, &body, set_clause).await?,
        ResolvedOp::Snooze => apply_snooze(&database, &mut tx, &body).await?,
        ResolvedOp::AssignTag | ResolvedOp::RemoveTag => {
            let Some(tag_id) = body.tag_id else {
                return Err(GhnApiError::Core(GhnError::InvalidParameters(
                    "tagId is required".to_string(),
                )));
            };
            database
                .get_tag_by_id(&mut tx, tag_id)
                .await?
                .ok_or_else(|| GhnApiError::NotFound(format!("tag {tag_id}")))?;
            apply_tag_op(&database, &mut tx, &body, tag_id, matches!(resolved, ResolvedOp::AssignTag)).await?
        }
    };

    tx.commit()
        .await
        .map_err(|err| GhnApiError::from_sqlx("Failed to commit bulk update", err))?;

    Ok(HttpResponse::Ok().json(json!({ "count": count })))
}

fn build_bulk_query(query: &str) -> GhnApiResult<BuiltQuery> {
    let ast = query::parse_and_validate(query)?;
    let mut built = query::build(&ast, 1, 0, 0, false);
    if !sql_builder::query_has_in_term(&ast) {
        sql_builder::apply_inbox_defaults(&mut built);
    }
    Ok(built)
}

async fn apply_static(
    database: &Database,
    tx: &mut Transaction<'_, Postgres>,
    body: &BulkRequest,
    set_clause: &str,
) -> GhnApiResult<u64> {
    if let Some(ids) = &body.github_ids {
        database.bulk_static_update_by_ids(tx, ids, set_clause).await
    } else {
        let built = build_bulk_query(body.query.as_deref().unwrap_or(""))?;
        database.bulk_static_update_by_query(tx, &built, set_clause).await
    }
}

async fn apply_snooze(
    database: &Database,
    tx: &mut Transaction<'_, Postgres>,
    body: &BulkRequest,
) -> GhnApiResult<u64> {
    // §4.6 defines the predictor's snooze mutation as `now + 24h`; the bulk
    // endpoint reuses the same fixed duration since no `until` field is in
    // the bulk request shape (§6).
    let until = Utc::now() + chrono::Duration::hours(24);
    if let Some(ids) = &body.github_ids {
        database.bulk_snooze_by_ids(tx, ids, until).await
    } else {
        let built = build_bulk_query(body.query.as_deref().unwrap_or(""))?;
        database.bulk_snooze_by_query(tx, &built, until).await
    }
}

async fn apply_tag_op(
    database: &Database,
    tx: &mut Transaction<'_, Postgres>,
    body: &BulkRequest,
    tag_id: TagId,
    assign: bool,
) -> GhnApiResult<u64> {
    let github_ids = resolve_target_ids(database, tx, body).await?;
    let mut count = 0u64;
    for github_id in github_ids {
        match apply_tag_to_one(database, tx, tag_id, &github_id, assign).await {
            Ok(()) => count += 1,
            Err(err) => {
                tracing::warn!(github_id = %github_id, error = %err, "Skipping tag bulk update for one notification");
            }
        }
    }
    Ok(count)
}

async fn resolve_target_ids(
    database: &Database,
    tx: &mut Transaction<'_, Postgres>,
    body: &BulkRequest,
) -> GhnApiResult<Vec<String>> {
    if let Some(ids) = &body.github_ids {
        return Ok(ids.clone());
    }
    let built = build_bulk_query(body.query.as_deref().unwrap_or(""))?;
    database.external_ids_matching_query(tx, &built).await
}

async fn apply_tag_to_one(
    database: &Database,
    tx: &mut Transaction<'_, Postgres>,
    tag_id: TagId,
    github_id: &str,
    assign: bool,
) -> GhnApiResult<()> {
    let notification = database
        .get_notification_by_external_id(tx, github_id)
        .await?
        .ok_or_else(|| GhnApiError::NotFound(format!("notification {github_id}")))?;

    if assign {
        database.assign_tag(tx, tag_id, notification.id).await?;
    } else {
        database.remove_tag(tx, tag_id, notification.id).await?;
    }
    database.rebuild_tag_ids_cache(tx, notification.id).await?;
    Ok(())
}
