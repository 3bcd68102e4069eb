//! Error types for the HTTP API.
//!
//! Every failure renders as `{ "error": "..." }`.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use database::DatabaseError;
use operations::OperationsError;
use thiserror::Error;

/// Errors returned by handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Operations(#[from] OperationsError),

    #[error(transparent)]
    Database(#[from] DatabaseError),

    /// Request body or parameters failed validation.
    #[error("{0}")]
    Validation(String),

    /// Malformed request body.
    #[error("{0}")]
    BadRequest(String),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Database(err) => database_status(err),
            ApiError::Operations(err) => match err {
                OperationsError::Database(err) => database_status(err),
                OperationsError::NoBrandHead { .. } => StatusCode::CONFLICT,
                OperationsError::Transition(_)
                | OperationsError::InvalidLeadState { .. }
                | OperationsError::NoBusinessDeveloperMapping { .. }
                | OperationsError::UnknownPackage(_)
                | OperationsError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
                OperationsError::Status(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

fn database_status(err: &DatabaseError) -> StatusCode {
    match err {
        DatabaseError::NotFound { .. } => StatusCode::NOT_FOUND,
        DatabaseError::AlreadyExists { .. } => StatusCode::CONFLICT,
        DatabaseError::InvalidValue { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        DatabaseError::Sqlx(_) | DatabaseError::Migration(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let message = if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
            "internal server error".to_string()
        } else {
            tracing::debug!("Request rejected ({}): {}", status, self);
            self.to_string()
        };

        let body = serde_json::json!({
            "error": message
        });

        (status, Json(body)).into_response()
    }
}

/// Result type for handlers.
pub type Result<T> = std::result::Result<T, ApiError>;
