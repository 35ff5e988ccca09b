use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::ledger::LedgerError;

/// Error returned by every HTTP handler, rendered as `{ "message": ... }`.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("Storage unavailable: {0}")]
    StoreUnavailable(anyhow::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn store(e: anyhow::Error) -> Self {
        ApiError::StoreUnavailable(e)
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Ledger(e) => match e {
                LedgerError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
                LedgerError::NotFound(_) => StatusCode::NOT_FOUND,
                LedgerError::InsufficientBalance { .. } => StatusCode::BAD_REQUEST,
                LedgerError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            },
            ApiError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ApiError::StoreUnavailable(e) | ApiError::Ledger(LedgerError::StoreUnavailable(e)) => {
                error!(error = %e, "store unavailable");
                "Service temporarily unavailable".to_string()
            }
            ApiError::Internal(e) => {
                error!(error = %e, "internal error");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        (status, Json(json!({ "message": message }))).into_response()
    }
}
