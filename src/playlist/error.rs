use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Failures of playlist operations. Everything except `Store` is the caller's
/// to fix.
#[derive(Debug, Error)]
pub enum CuratorError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    LimitExceeded(String),

    #[error("{0}")]
    InvalidInput(String),

    #[error("Store error: {0}")]
    Store(#[from] anyhow::Error),
}

impl CuratorError {
    /// Short label used in metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            CuratorError::NotFound(_) => "not_found",
            CuratorError::LimitExceeded(_) => "limit_exceeded",
            CuratorError::InvalidInput(_) => "invalid_input",
            CuratorError::Store(_) => "store",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            CuratorError::NotFound(_) => StatusCode::NOT_FOUND,
            CuratorError::LimitExceeded(_) | CuratorError::InvalidInput(_) => {
                StatusCode::BAD_REQUEST
            }
            CuratorError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for CuratorError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            CuratorError::Store(err) => {
                error!("Playlist operation failed: {:#}", err);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}
