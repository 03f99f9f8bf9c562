//! HTTP boundary error type
//!
//! Feature errors convert into [`AppError`], which owns the mapping from
//! failure taxonomy to status code and response body.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::api::response::ErrorResponse;

pub type AppResult<T> = std::result::Result<T, AppError>;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    /// Malformed request, missing file or bad metadata
    #[error("{0}")]
    Validation(String),

    /// GPX could not be turned into a track
    #[error("{0}")]
    UnprocessableGpx(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    PaymentRequired(String),

    #[error("{0}")]
    NotFound(String),

    /// Blob store or record store failure
    #[error("{message}")]
    Dependency {
        message: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn dependency(message: impl Into<String>, source: anyhow::Error) -> Self {
        Self::Dependency {
            message: message.into(),
            source,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::UnprocessableGpx(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::PaymentRequired(_) => StatusCode::PAYMENT_REQUIRED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Dependency { .. } => StatusCode::BAD_GATEWAY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::UnprocessableGpx(_) => "INVALID_GPX",
            AppError::Unauthorized(_) => "UNAUTHORIZED",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::PaymentRequired(_) => "PLAN_LIMIT_REACHED",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Dependency { .. } => "DEPENDENCY_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let message = match &self {
            AppError::Dependency { message, source } => {
                tracing::error!(error = ?source, "{}", message);
                message.clone()
            },
            AppError::Internal(message) => {
                tracing::error!("Internal error: {}", message);
                "An internal error occurred".to_string()
            },
            other => other.to_string(),
        };

        (status, Json(ErrorResponse::new(self.code(), message))).into_response()
    }
}
