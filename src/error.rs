use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::models::MovieId;

/// Application-level errors
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("Not authenticated: no session token stored")]
    NotAuthenticated,

    #[error("Request failed with status {status}: {payload}")]
    Transport {
        status: u16,
        payload: serde_json::Value,
    },

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Cache error: {0}")]
    Cache(#[from] redis::RedisError),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Movie {id} rejected: {reason}")]
    ContentValidation { id: MovieId, reason: String },

    #[error("Listing page {page} failed: {source}")]
    PageFetch {
        page: u32,
        #[source]
        source: Box<AppError>,
    },

    #[error("No candidate movies match the current filters")]
    EmptyPool,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("External API error: {0}")]
    ExternalApi(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Whether the caller can retry the operation that produced this error.
    ///
    /// Only failures on the initial listing pages are surfaced as retryable; later
    /// pages are logged and dropped by the paginator.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::PageFetch { .. })
    }
}

/// Ways a login attempt can end without a login status.
///
/// Provider refusals are not errors: they resolve as a `not_authorized` status.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("User cancelled login process")]
    UserCancelled,

    #[error("Login attempt superseded by a newer login")]
    Superseded,

    #[error("Login attempt abandoned before completion")]
    Abandoned,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Auth(_) | AppError::NotAuthenticated => {
                (StatusCode::UNAUTHORIZED, self.to_string())
            }
            AppError::Transport { .. }
            | AppError::HttpClient(_)
            | AppError::ExternalApi(_)
            | AppError::PageFetch { .. } => (StatusCode::BAD_GATEWAY, self.to_string()),
            AppError::Configuration(_)
            | AppError::Cache(_)
            | AppError::Storage(_)
            | AppError::Serialization(_)
            | AppError::ContentValidation { .. }
            | AppError::EmptyPool
            | AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
