use thiserror::Error;

/// Typed sentinel for every failure the core can produce. HTTP handlers map
/// variants to status codes; job handlers let `anyhow`-sourced variants
/// bubble up to the queue's retry policy.
#[derive(Debug, Error)]
pub enum GhnError {
    #[error("Unterminated string literal in query")]
    UnterminatedString,

    #[error("Syntax error in query: {0}")]
    Syntax(String),

    #[error("Unknown field: {0}")]
    UnknownField(String),

    #[error("Invalid value for operator: {0}")]
    InvalidOperatorValue(String),

    #[error("`tags:` requires at least one value")]
    TagsRequiresValue,

    #[error("{0} not found")]
    NotFound(String),

    #[error("{kind} already exists: {name}")]
    AlreadyExists { kind: &'static str, name: String },

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Database error: {message}")]
    Database {
        #[source]
        source: sqlx_error::SqlxError,
        message: String,
    },

    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl GhnError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, GhnError::NotFound(_))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, GhnError::AlreadyExists { .. })
    }

    pub fn is_bad_request(&self) -> bool {
        matches!(
            self,
            GhnError::UnterminatedString
                | GhnError::Syntax(_)
                | GhnError::UnknownField(_)
                | GhnError::InvalidOperatorValue(_)
                | GhnError::TagsRequiresValue
                | GhnError::InvalidParameters(_)
        )
    }
}

/// `sqlx::Error` does not implement `Clone`/`PartialEq`, which the query
/// engine's unit tests want for its own errors. The root crate has no
/// dependency on `sqlx` (that lives in the `ghn-api` crate, which talks to
/// Postgres), so database errors are carried here only as a formatted
/// message behind a minimal placeholder type the api crate constructs from
/// a real `sqlx::Error`.
pub mod sqlx_error {
    use std::fmt;

    #[derive(Debug)]
    pub struct SqlxError(pub String);

    impl fmt::Display for SqlxError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{}", self.0)
        }
    }

    impl std::error::Error for SqlxError {}
}

pub type GhnResult<T> = Result<T, GhnError>;
