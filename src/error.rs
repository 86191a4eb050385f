use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::geo::validate::ValidationError;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("order {0} is already taken")]
    AlreadyTaken(i64),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("outcome unknown: {0}")]
    OutcomeUnknown(String),

    #[error("storage error: {0}")]
    Storage(#[from] StoreError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Validation(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::AlreadyTaken(_) | AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::OutcomeUnknown(_) => StatusCode::GATEWAY_TIMEOUT,
            AppError::Storage(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let message = match &self {
            AppError::Storage(_) => "failed to access order store".to_string(),
            other => other.to_string(),
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}
