use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use ghn::error::GhnError;
use serde_json::json;

/// The api crate's error sentinel: every internal error joins this type so
/// handlers can classify without string matching (§7). Wraps the core
/// [`GhnError`] (parse/validation/not-found/conflict) and the IO failures
/// the core has no dependency on (`sqlx`, the provider's HTTP client).
#[derive(Debug, thiserror::Error)]
pub enum GhnApiError {
    #[error(transparent)]
    Core(#[from] GhnError),

    #[error("Database error: {message}")]
    Database {
        #[source]
        source: sqlx::Error,
        message: String,
    },

    #[error("{0} not found")]
    NotFound(String),

    #[error("{kind} already exists: {name}")]
    AlreadyExists { kind: &'static str, name: String },

    #[error("Provider request failed")]
    Provider(#[source] anyhow::Error),

    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl GhnApiError {
    pub fn from_sqlx(message: impl Into<String>, source: sqlx::Error) -> Self {
        match &source {
            // Fallback conflict detection by Postgres SQLSTATE, in addition
            // to typed sentinels raised higher up the call stack (§7).
            sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23505") => {
                GhnApiError::AlreadyExists {
                    kind: "row",
                    name: message.into(),
                }
            }
            sqlx::Error::RowNotFound => GhnApiError::NotFound(message.into()),
            _ => GhnApiError::Database {
                source,
                message: message.into(),
            },
        }
    }
}

impl ResponseError for GhnApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            GhnApiError::Core(err) if err.is_bad_request() => StatusCode::BAD_REQUEST,
            GhnApiError::Core(err) if err.is_not_found() => StatusCode::NOT_FOUND,
            GhnApiError::Core(err) if err.is_conflict() => StatusCode::CONFLICT,
            GhnApiError::Core(_) => StatusCode::INTERNAL_SERVER_ERROR,
            GhnApiError::NotFound(_) => StatusCode::NOT_FOUND,
            GhnApiError::AlreadyExists { .. } => StatusCode::CONFLICT,
            GhnApiError::Database { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            GhnApiError::Provider(_) => StatusCode::INTERNAL_SERVER_ERROR,
            GhnApiError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if self.status_code() == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("Internal error: {self:?}");
            return HttpResponse::build(self.status_code())
                .content_type("application/json")
                .body(json!({ "message": "Internal server error" }).to_string());
        }

        HttpResponse::build(self.status_code())
            .content_type("application/json")
            .body(json!({ "message": self.to_string() }).to_string())
    }
}

pub type GhnApiResult<T> = Result<T, GhnApiError>;
