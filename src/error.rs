use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;

use crate::auth::password::PasswordError;
use crate::users::store::{RepoError, UniqueField};

/// Error returned by every handler; renders as `{"error": .., "details"?: [..]}`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{message}")]
    Validation {
        message: String,
        details: Vec<String>,
    },
    #[error("{0}")]
    Conflict(String),
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Account is deactivated")]
    Deactivated,
    #[error("{0}")]
    Unauthorized(String),
    #[error("User not found")]
    NotFound,
    #[error("corrupt stored credential: {0}")]
    CorruptCredential(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    details: Vec<String>,
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            details: Vec::new(),
        }
    }

    pub fn validation_with(message: impl Into<String>, details: Vec<String>) -> Self {
        Self::Validation {
            message: message.into(),
            details,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation { .. } | ApiError::Conflict(_) => StatusCode::BAD_REQUEST,
            ApiError::InvalidCredentials
            | ApiError::Deactivated
            | ApiError::Unauthorized(_)
            | ApiError::CorruptCredential(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<RepoError> for ApiError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::Duplicate(UniqueField::Email) => {
                ApiError::Conflict("Email already registered".into())
            }
            RepoError::Duplicate(UniqueField::Username) => {
                ApiError::Conflict("Username already taken".into())
            }
            RepoError::Password(e) => e.into(),
            RepoError::Database(e) => ApiError::Internal(anyhow::Error::new(e)),
        }
    }
}

impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        match err {
            PasswordError::CorruptHash(msg) => ApiError::CorruptCredential(msg),
            e @ PasswordError::Hash(_) => ApiError::Internal(anyhow::Error::new(e)),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::validation_with("Invalid request body", vec![rejection.body_text()])
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            ApiError::Validation { message, details } => ErrorBody {
                error: message,
                details,
            },
            // logged with the user id where the hash was read
            ApiError::CorruptCredential(_) => ErrorBody {
                error: ApiError::InvalidCredentials.to_string(),
                details: Vec::new(),
            },
            ApiError::Internal(e) => {
                error!(error = %e, "internal error");
                ErrorBody {
                    error: "Internal server error".into(),
                    details: Vec::new(),
                }
            }
            other => ErrorBody {
                error: other.to_string(),
                details: Vec::new(),
            },
        };
        (status, Json(body)).into_response()
    }
}
