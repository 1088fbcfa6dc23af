use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::callback::InvalidCallbackUrl;
use crate::db::StoreError;
use crate::domain::TransitionError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Invalid transition: {0}")]
    InvalidTransition(#[from] TransitionError),
    #[error("Invalid callback URL: {0}")]
    InvalidCallback(#[from] InvalidCallbackUrl),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Database(e) => AppError::Database(e.to_string()),
            dup @ StoreError::DuplicateInputAddress(_) => AppError::Conflict(dup.to_string()),
            StoreError::NotFound(id) => {
                AppError::NotFound(format!("forwarding address {} not found", id))
            }
            lost @ StoreError::Conflict { .. } => AppError::Conflict(lost.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::Database(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::InvalidTransition(err) => (StatusCode::CONFLICT, err.to_string()),
            AppError::InvalidCallback(err) => (StatusCode::UNPROCESSABLE_ENTITY, err.to_string()),
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}
