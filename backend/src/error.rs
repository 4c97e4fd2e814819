use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Error shared by the repository, service and handler layers.
///
/// Errors are never retried or recovered; each layer passes them up unchanged
/// and the handler renders them as `{"error": <message>}`.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    #[error("invalid task ID: {0}")]
    InvalidId(String),

    #[error("{0}")]
    InvalidBody(String),

    #[error("task {0} not found")]
    NotFound(u64),

    #[error(transparent)]
    Storage(#[from] sqlx::Error),
}

impl TaskError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidId(_) | Self::InvalidBody(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<JsonRejection> for TaskError {
    fn from(rejection: JsonRejection) -> Self {
        Self::InvalidBody(rejection.body_text())
    }
}

impl IntoResponse for TaskError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "request rejected");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
