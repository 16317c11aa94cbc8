//! Error types for Bookrent server

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Stable numeric error codes carried in every error body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    Failure = 1,
    NotAuthorized = 2,
    DbFailure = 3,
    NoSuchBook = 4,
    NoSuchData = 5,
    BadValue = 6,
    Forbidden = 7,
    DuplicateEmail = 8,
    DuplicateIsbn = 9,
    InvalidLibrarianCode = 10,
    InvalidCredentials = 11,
    InvalidReturn = 12,
    BookUnavailable = 13,
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("User already exists")]
    DuplicateEmail,

    #[error("Invalid librarian code")]
    InvalidLibrarianCode,

    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Same message for every failed check so callers learn nothing more
    #[error("Invalid or missing token")]
    Authentication,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Book not found")]
    BookNotFound,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Book already in library")]
    DuplicateIsbn,

    #[error("Invalid ISBN or return code")]
    InvalidReturn,

    #[error("Book is currently rented")]
    BookUnavailable,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_)
            | AppError::InvalidLibrarianCode
            | AppError::InvalidCredentials
            | AppError::InvalidReturn => StatusCode::BAD_REQUEST,
            AppError::Authentication => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::BookNotFound | AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::DuplicateEmail | AppError::DuplicateIsbn | AppError::BookUnavailable => {
                StatusCode::CONFLICT
            }
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation(_) => ErrorCode::BadValue,
            AppError::DuplicateEmail => ErrorCode::DuplicateEmail,
            AppError::InvalidLibrarianCode => ErrorCode::InvalidLibrarianCode,
            AppError::InvalidCredentials => ErrorCode::InvalidCredentials,
            AppError::Authentication => ErrorCode::NotAuthorized,
            AppError::Forbidden(_) => ErrorCode::Forbidden,
            AppError::BookNotFound => ErrorCode::NoSuchBook,
            AppError::NotFound(_) => ErrorCode::NoSuchData,
            AppError::DuplicateIsbn => ErrorCode::DuplicateIsbn,
            AppError::InvalidReturn => ErrorCode::InvalidReturn,
            AppError::BookUnavailable => ErrorCode::BookUnavailable,
            AppError::Database(_) => ErrorCode::DbFailure,
            AppError::Internal(_) => ErrorCode::Failure,
        }
    }
}

/// Error response body
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub code: u32,
    pub error: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();

        let message = match &self {
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                "Database error".to_string()
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                "Internal server error".to_string()
            }
            AppError::Validation(msg)
            | AppError::Forbidden(msg)
            | AppError::NotFound(msg) => msg.clone(),
            other => other.to_string(),
        };

        let body = Json(ErrorResponse {
            code: code as u32,
            error: format!("{:?}", code),
            message,
        });

        (status, body).into_response()
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(errors.to_string())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
