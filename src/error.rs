//! Error types for Libris server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;

use crate::models::enums::{RenewalStatus, RequestStatus};

/// Stable numeric error codes returned to clients
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    Success = 0,
    Failure = 1,
    NotAuthorized = 2,
    DbFailure = 3,
    NoSuchBook = 5,
    BookNotAvailable = 7,
    Duplicate = 8,
    MaxBorrowsReached = 11,
    BookBorrowed = 13,
    BadValue = 18,
    NoSuchData = 20,
    UserHasActiveBorrow = 21,
    RoleMismatch = 22,
    InvalidTransition = 23,
    RenewalOutOfRange = 24,
    EmptyCart = 25,
    ServiceUnavailable = 26,
}

/// Borrow-rule violations, reported to the user as-is
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BorrowRule {
    #[error("Cart is full: at most {max} books per checkout")]
    CapacityExceeded { max: u32 },

    #[error("Book {book_id} is already in the cart")]
    Duplicate { book_id: i32 },

    #[error("Book {book_id} has already been borrowed")]
    BookBorrowed { book_id: i32 },

    #[error("Book {book_id} is reserved by another reader")]
    BookUnavailable { book_id: i32 },

    #[error("User already has an active borrow; return it before borrowing again")]
    AlreadyBorrowed,

    #[error("Role does not match the borrower on record")]
    RoleMismatch,

    #[error("Renewal date {proposed} must be between {earliest} and {latest}")]
    RenewalOutOfRange {
        proposed: NaiveDate,
        earliest: NaiveDate,
        latest: NaiveDate,
    },

    #[error("Cannot {action} a request in status {status} (renewal: {renewal})")]
    InvalidTransition {
        action: &'static str,
        status: RequestStatus,
        renewal: RenewalStatus,
    },

    #[error("Cart is empty")]
    EmptyCart,
}

impl BorrowRule {
    fn code(&self) -> ErrorCode {
        match self {
            BorrowRule::CapacityExceeded { .. } => ErrorCode::MaxBorrowsReached,
            BorrowRule::Duplicate { .. } => ErrorCode::Duplicate,
            BorrowRule::BookBorrowed { .. } => ErrorCode::BookBorrowed,
            BorrowRule::BookUnavailable { .. } => ErrorCode::BookNotAvailable,
            BorrowRule::AlreadyBorrowed => ErrorCode::UserHasActiveBorrow,
            BorrowRule::RoleMismatch => ErrorCode::RoleMismatch,
            BorrowRule::RenewalOutOfRange { .. } => ErrorCode::RenewalOutOfRange,
            BorrowRule::InvalidTransition { .. } => ErrorCode::InvalidTransition,
            BorrowRule::EmptyCart => ErrorCode::EmptyCart,
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            // Eligibility changed between cart and checkout
            BorrowRule::AlreadyBorrowed => StatusCode::CONFLICT,
            _ => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Authorization failed: {0}")]
    Authorization(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Rule(#[from] BorrowRule),

    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// Whether the failure comes from a backing service rather than the request itself
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AppError::Database(_) | AppError::Redis(_) | AppError::Unavailable(_)
        )
    }
}

impl From<sqlx::Error> for AppError {
    /// A unique index firing means a concurrent write won the race
    fn from(error: sqlx::Error) -> Self {
        match &error {
            sqlx::Error::Database(db) if db.is_unique_violation() => AppError::Conflict(format!(
                "Conflicting write on {}",
                db.constraint().unwrap_or("a unique index")
            )),
            _ => AppError::Database(error),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(errors.to_string())
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
        let (status, code, message) = match &self {
            AppError::Authentication(msg) => {
                (StatusCode::UNAUTHORIZED, ErrorCode::NotAuthorized, msg.clone())
            }
            AppError::Authorization(msg) => {
                (StatusCode::FORBIDDEN, ErrorCode::NotAuthorized, msg.clone())
            }
            AppError::NotFound(msg) => {
                (StatusCode::NOT_FOUND, ErrorCode::NoSuchData, msg.clone())
            }
            AppError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, ErrorCode::BadValue, msg.clone())
            }
            AppError::Rule(rule) => (rule.status(), rule.code(), rule.to_string()),
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::DbFailure,
                    "Database error".to_string(),
                )
            }
            AppError::Redis(e) => {
                tracing::error!("Redis error: {:?}", e);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    ErrorCode::ServiceUnavailable,
                    "Session store unavailable".to_string(),
                )
            }
            AppError::Conflict(msg) => {
                (StatusCode::CONFLICT, ErrorCode::Duplicate, msg.clone())
            }
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, ErrorCode::BadValue, msg.clone())
            }
            AppError::Unavailable(msg) => {
                tracing::warn!("Service unavailable: {}", msg);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    ErrorCode::ServiceUnavailable,
                    msg.clone(),
                )
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::Failure,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(ErrorResponse {
            code: code as u32,
            error: format!("{:?}", code),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
