use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use tripline_core::error::WorkflowError;

#[derive(Debug)]
pub struct AppError(pub WorkflowError);

impl From<WorkflowError> for AppError {
    fn from(err: WorkflowError) -> Self {
        Self(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self.0 {
            WorkflowError::Unauthorized => (StatusCode::UNAUTHORIZED, self.0.to_string()),
            WorkflowError::Forbidden(_) | WorkflowError::TokenInvalidated(_) => {
                (StatusCode::FORBIDDEN, self.0.to_string())
            }
            WorkflowError::NotFound(_) => (StatusCode::NOT_FOUND, self.0.to_string()),
            WorkflowError::InvalidTransition { .. }
            | WorkflowError::InvalidState(_)
            | WorkflowError::Conflict(_)
            | WorkflowError::TokenUsed => (StatusCode::CONFLICT, self.0.to_string()),
            WorkflowError::TokenExpired => (StatusCode::GONE, self.0.to_string()),
            WorkflowError::Validation(_) => (StatusCode::BAD_REQUEST, self.0.to_string()),
            WorkflowError::Notify(_) => (StatusCode::BAD_GATEWAY, self.0.to_string()),
            WorkflowError::Store(err) => {
                tracing::error!("Internal Server Error: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}
