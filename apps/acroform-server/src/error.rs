//! Error types for the AcroForm server

use acroform_core::FormError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Session not found: {0}")]
    SessionNotFound(Uuid),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Form(#[from] FormError),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    error: String,
    code: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ApiError::SessionNotFound(_) => (StatusCode::NOT_FOUND, "SESSION_NOT_FOUND"),
            ApiError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "INVALID_REQUEST"),
            ApiError::Form(err) => match err {
                FormError::DocumentUnreadable(_) => {
                    (StatusCode::BAD_REQUEST, "DOCUMENT_UNREADABLE")
                }
                FormError::NoSourceDocument => (StatusCode::NOT_FOUND, "NO_SOURCE_DOCUMENT"),
                FormError::EmptyTemplate => (StatusCode::UNPROCESSABLE_ENTITY, "EMPTY_TEMPLATE"),
                FormError::InvalidTemplate(_) => {
                    (StatusCode::UNPROCESSABLE_ENTITY, "INVALID_TEMPLATE")
                }
                FormError::FieldNameConflict(_) => {
                    (StatusCode::UNPROCESSABLE_ENTITY, "FIELD_NAME_CONFLICT")
                }
                FormError::OperationError(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "OPERATION_ERROR")
                }
            },
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        if status.is_server_error() {
            tracing::error!("{}", self);
        } else {
            tracing::debug!("Request rejected: {}", self);
        }

        let body = ErrorResponse {
            success: false,
            error: self.to_string(),
            code: code.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        ApiError::Internal(format!("PDF task failed: {}", err))
    }
}
