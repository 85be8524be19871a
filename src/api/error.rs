//! API error type and its JSON envelope.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};

use super::auth::{AuthError, SecurityRule};
use super::types::{ErrorBody, ErrorDetail};
use crate::task::{FieldError, ServiceError};
use crate::task_store::StoreError;

/// Everything a handler can fail with.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request body or parameters do not match the operation's schema.
    #[error("{message}")]
    SchemaValidation {
        message: String,
        path: Option<String>,
    },

    /// A business rule rejected the request; `code` is the reason code.
    #[error("{message}")]
    BusinessRule { code: &'static str, message: String },

    #[error(transparent)]
    Unauthenticated(#[from] AuthError),

    #[error("Missing permission {}", .0.to_grant())]
    Forbidden(SecurityRule),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Constraint(String),

    /// Anything else. The detail is logged, never sent to the client.
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn schema(message: impl Into<String>) -> Self {
        ApiError::SchemaValidation {
            message: message.into(),
            path: None,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::SchemaValidation { .. }
            | ApiError::BusinessRule { .. }
            | ApiError::Constraint(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::SchemaValidation { .. } => "VALIDATION_ERROR",
            ApiError::BusinessRule { code, .. } => *code,
            ApiError::Unauthenticated(_) => "UNAUTHORIZED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Constraint(_) => "CONSTRAINT_VIOLATION",
            ApiError::Internal(_) => "INTERNAL_SERVER_ERROR",
        }
    }
}

impl From<FieldError> for ApiError {
    fn from(e: FieldError) -> Self {
        ApiError::SchemaValidation {
            message: e.to_string(),
            path: Some(e.path().to_string()),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Constraint(detail) => ApiError::Constraint(detail),
            StoreError::Backend(detail) => ApiError::Internal(detail),
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::InvalidField(field) => field.into(),
            ServiceError::BusinessRule(violation) => ApiError::BusinessRule {
                code: violation.code(),
                message: violation.to_string(),
            },
            ServiceError::NotFound(id) => ApiError::NotFound(format!("Task {} not found", id)),
            ServiceError::Store(store) => store.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ApiError::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
                "Internal Server Error".to_string()
            }
            other => other.to_string(),
        };
        let path = match &self {
            ApiError::SchemaValidation { path, .. } => path.clone(),
            _ => None,
        };

        let body = ErrorBody::new(ErrorDetail {
            code: self.code().to_string(),
            message,
            path,
            method: None,
        });
        (status, Json(body)).into_response()
    }
}
