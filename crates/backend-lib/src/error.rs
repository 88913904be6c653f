// crates/backend-lib/src/error.rs

//! Central error type + Axum integration.
use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::auth::AuthError;
use crate::storage::StorageError;
use crate::validation::ValidationError;

/// Application error types with error codes
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Auth(e) => match e {
                AuthError::InvalidCredentials | AuthError::InvalidToken => StatusCode::UNAUTHORIZED,
                AuthError::Forbidden => StatusCode::FORBIDDEN,
                AuthError::DuplicateUsername(_) | AuthError::WeakPassword(_) => {
                    StatusCode::BAD_REQUEST
                },
                AuthError::NoAdminsConfigured | AuthError::Storage(_) | AuthError::Internal(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                },
            },
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Storage(StorageError::DuplicateUsername(_)) => StatusCode::BAD_REQUEST,
            AppError::Storage(StorageError::DuplicateRegistration(_)) => StatusCode::CONFLICT,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
            AppError::Storage(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Auth(e) => match e {
                AuthError::InvalidCredentials => "AUTH_001",
                AuthError::InvalidToken => "AUTH_002",
                AuthError::Forbidden => "AUTH_003",
                AuthError::DuplicateUsername(_) => "AUTH_004",
                AuthError::WeakPassword(_) => "AUTH_005",
                AuthError::NoAdminsConfigured => "AUTH_006",
                AuthError::Storage(_) => "STORE_001",
                AuthError::Internal(_) => "INT_001",
            },
            AppError::Validation(_) => "VAL_001",
            AppError::Storage(StorageError::DuplicateUsername(_)) => "AUTH_004",
            AppError::Storage(StorageError::DuplicateRegistration(_)) => "STORE_002",
            AppError::Storage(_) => "STORE_001",
            AppError::NotFound(_) => "NF_001",
            AppError::RateLimitExceeded => "RATE_001",
            AppError::Internal(_) => "INT_001",
        }
    }

    /// Whether this is a server-side failure whose details stay out of
    /// release responses
    fn is_internal(&self) -> bool {
        self.status_code().is_server_error()
            && !matches!(self, AppError::Auth(AuthError::NoAdminsConfigured))
    }

    /// Get a sanitized message suitable for production use
    pub fn sanitized_message(&self) -> String {
        match self {
            AppError::Auth(e) => match e {
                AuthError::InvalidCredentials => "Invalid username or password".to_string(),
                AuthError::InvalidToken => "Invalid or expired token".to_string(),
                AuthError::Forbidden => "Access denied".to_string(),
                AuthError::DuplicateUsername(_) => "Username already exists".to_string(),
                AuthError::WeakPassword(requirements) => requirements.clone(),
                AuthError::NoAdminsConfigured => "No admin accounts configured".to_string(),
                AuthError::Storage(_) | AuthError::Internal(_) => {
                    "An internal server error occurred".to_string()
                },
            },
            AppError::Validation(e) => e.to_string(),
            AppError::Storage(StorageError::DuplicateUsername(_)) => {
                "Username already exists".to_string()
            },
            AppError::Storage(StorageError::DuplicateRegistration(_)) => {
                "Registration already exists".to_string()
            },
            AppError::Storage(_) | AppError::Internal(_) => {
                "An internal server error occurred".to_string()
            },
            AppError::NotFound(what) => format!("{what} not found"),
            AppError::RateLimitExceeded => {
                "Too many requests, please try again later".to_string()
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_code = self.error_code();

        if self.is_internal() {
            tracing::error!(code = error_code, error = %self, "Request failed");
        }

        // Internal details only reach clients in development builds
        let message = if cfg!(debug_assertions) && self.is_internal() {
            self.to_string()
        } else {
            self.sanitized_message()
        };

        let body = serde_json::json!({
            "error": message,
            "code": error_code,
        });

        (status, axum::Json(body)).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(ValidationError::MalformedBody(rejection.body_text()))
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::Validation(ValidationError::InvalidQuery(rejection.body_text()))
    }
}

impl From<String> for AppError {
    fn from(msg: String) -> Self {
        AppError::Internal(msg)
    }
}

impl From<&str> for AppError {
    fn from(msg: &str) -> Self {
        AppError::Internal(msg.to_string())
    }
}
