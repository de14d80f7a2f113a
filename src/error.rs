use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

type Cause = Box<dyn std::error::Error + Send + Sync>;

/// Every failure a single user action can end in.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{message}")]
    AuthRequired { message: String },

    #[error("{message}")]
    PermissionDenied { message: String },

    #[error("{message}")]
    Validation { message: String },

    #[error("{message}")]
    NotFound { message: String },

    #[error("{message}")]
    Storage {
        message: String,
        #[source]
        cause: Option<Cause>,
    },

    #[error("{message}")]
    RemoteData {
        message: String,
        #[source]
        cause: Option<Cause>,
    },
}

impl AppError {
    pub fn auth_required() -> Self {
        Self::AuthRequired {
            message: "You must be logged in to perform this action".into(),
        }
    }

    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::PermissionDenied {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn storage(message: impl Into<String>, cause: impl Into<Cause>) -> Self {
        Self::Storage {
            message: message.into(),
            cause: Some(cause.into()),
        }
    }

    pub fn remote(message: impl Into<String>, cause: impl Into<Cause>) -> Self {
        Self::RemoteData {
            message: message.into(),
            cause: Some(cause.into()),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::AuthRequired { .. } => "AUTH_REQUIRED",
            AppError::PermissionDenied { .. } => "PERMISSION_DENIED",
            AppError::Validation { .. } => "VALIDATION_ERROR",
            AppError::NotFound { .. } => "NOT_FOUND",
            AppError::Storage { .. } => "STORAGE_ERROR",
            AppError::RemoteData { .. } => "REMOTE_DATA_ERROR",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::AuthRequired { .. } => StatusCode::UNAUTHORIZED,
            AppError::PermissionDenied { .. } => StatusCode::FORBIDDEN,
            AppError::Validation { .. } => StatusCode::BAD_REQUEST,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::Storage { .. } => StatusCode::BAD_GATEWAY,
            AppError::RemoteData { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::remote("database operation failed", e)
    }
}

/// Wraps a failed database call with what was being attempted.
pub trait RemoteContext<T> {
    fn remote_ctx(self, message: &str) -> Result<T, AppError>;
}

impl<T> RemoteContext<T> for Result<T, sqlx::Error> {
    fn remote_ctx(self, message: &str) -> Result<T, AppError> {
        self.map_err(|e| AppError::remote(message, e))
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            AppError::Storage { cause, .. } | AppError::RemoteData { cause, .. } => {
                let cause = cause.as_ref().map(|c| c.to_string()).unwrap_or_default();
                error!(error = %self, %cause, code = self.code(), "request failed");
            }
            _ => {}
        }
        let body = ErrorBody {
            code: self.code(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
