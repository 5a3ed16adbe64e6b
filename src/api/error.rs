//! API error type and its HTTP response mapping.

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::store::StoreError;
use crate::validation::FieldErrors;

/// JSON error body: `{"error": "...", "fields": {"name": ["..."]}}`
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "FieldErrors::is_empty")]
    pub fields: FieldErrors,
}

#[derive(Debug, Error)]
pub enum ApiError {
    /// 404 Not Found
    #[error("{0}")]
    NotFound(String),

    /// 400 Bad Request with per-field messages
    #[error("validation failed: {0}")]
    Validation(FieldErrors),

    /// 400 Bad Request for bodies or queries that could not be parsed
    #[error("{0}")]
    BadRequest(String),

    /// 500 Internal Server Error; the detail is logged, not returned
    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { .. } => ApiError::NotFound(err.to_string()),
            StoreError::Validation(errors) => ApiError::Validation(errors),
            other => ApiError::Store(other),
        }
    }
}

impl From<FieldErrors> for ApiError {
    fn from(errors: FieldErrors) -> Self {
        ApiError::Validation(errors)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Validation(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            ApiError::NotFound(msg) => ErrorResponse {
                error: msg,
                fields: FieldErrors::new(),
            },
            ApiError::Validation(fields) => ErrorResponse {
                error: "Validation failed".to_string(),
                fields,
            },
            ApiError::BadRequest(msg) => ErrorResponse {
                error: msg,
                fields: FieldErrors::new(),
            },
            ApiError::Store(err) => {
                tracing::error!("Store operation failed: {}", err);
                ErrorResponse {
                    error: "Internal server error".to_string(),
                    fields: FieldErrors::new(),
                }
            }
        };

        (status, Json(body)).into_response()
    }
}
