use actix_web::{web, HttpResponse};
use anyhow::Context;
use redis::AsyncCommands;
use serde_json::json;

use crate::repository::Database;

/// Pings Postgres and Redis independently so an operator can tell which
/// dependency is down; a single failure still returns 500 for the whole
/// endpoint.
pub async fn ping(database: web::Data<Database>, redis: web::Data<redis::Client>) -> HttpResponse {
    let cache_result: Result<String, anyhow::Error> = async {
        let mut conn = redis.get_multiplexed_async_connection().await.context("Failed to connect to Redis")?;
        conn.ping().await.context("Failed to ping Redis")
    }
    .await;

    let db_result: Result<(), anyhow::Error> = async {
        let mut tx = database.begin().await.context("Failed to begin transaction")?;
        sqlx::query("SELECT 1").execute(&mut *tx).await.context("Failed to ping database")?;
        Ok(())
    }
    .await;

    let mut response = if cache_result.is_err() || db_result.is_err() {
        HttpResponse::InternalServerError()
    } else {
        HttpResponse::Ok()
    };

    response.content_type("application/json").body(
        json!({
            "cache": if cache_result.is_ok() { "healthy" } else { "unhealthy" },
            "database": if db_result.is_ok() { "healthy" } else { "unhealthy" },
        })
        .to_string(),
    )
}
