//! Error handling for the Condominium Management Platform
//!
//! Every failure surfaces as `{"error": {"code", "message", "field?"}}`

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use shared::{AccessDenied, BallotError};
use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Authentication errors
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    // Authorization errors
    #[error("Not a member of this condominium")]
    NotAMember,

    #[error("Insufficient permissions")]
    InsufficientPermissions,

    // Validation errors
    #[error("Validation error: {message}")]
    Validation { field: String, message: String },

    #[error("Duplicate entry: {0}")]
    DuplicateEntry(String),

    #[error("Conflict: {message}")]
    Conflict { resource: String, message: String },

    #[error("Resource not found: {0}")]
    NotFound(String),

    // Business rule errors
    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(String),

    #[error("Ballot is not accepting votes")]
    BallotClosed,

    #[error("Already voted on this ballot")]
    AlreadyVoted,

    #[error("Condominium must keep at least one administrator")]
    LastAdmin,

    // External service errors
    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    // Database errors
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    // Internal errors
    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Internal server error")]
    InternalError(#[from] anyhow::Error),
}

/// Error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl ErrorDetail {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            field: None,
        }
    }

    fn with_field(mut self, field: &str) -> Self {
        self.field = Some(field.to_string());
        self
    }
}

impl AppError {
    /// Shorthand for a field-level validation failure
    pub fn invalid(field: &str, message: impl Into<String>) -> Self {
        AppError::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }

    /// HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidCredentials
            | AppError::TokenExpired
            | AppError::InvalidToken
            | AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotAMember | AppError::InsufficientPermissions => StatusCode::FORBIDDEN,
            AppError::Validation { .. } => StatusCode::BAD_REQUEST,
            AppError::DuplicateEntry(_) | AppError::Conflict { .. } | AppError::AlreadyVoted => {
                StatusCode::CONFLICT
            }
            AppError::NotFound(_) | AppError::DatabaseError(sqlx::Error::RowNotFound) => {
                StatusCode::NOT_FOUND
            }
            AppError::InvalidStateTransition(_) | AppError::BallotClosed | AppError::LastAdmin => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AppError::StorageError(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::DatabaseError(e) if is_unique_violation(e) => StatusCode::CONFLICT,
            AppError::Configuration(_)
            | AppError::DatabaseError(_)
            | AppError::Internal(_)
            | AppError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn detail(&self) -> ErrorDetail {
        match self {
            AppError::InvalidCredentials => {
                ErrorDetail::new("INVALID_CREDENTIALS", "Invalid email or password")
            }
            AppError::TokenExpired => ErrorDetail::new("TOKEN_EXPIRED", "Token has expired"),
            AppError::InvalidToken => ErrorDetail::new("INVALID_TOKEN", "Invalid token"),
            AppError::Unauthorized(message) => ErrorDetail::new("UNAUTHORIZED", message.clone()),
            AppError::NotAMember => ErrorDetail::new(
                "NOT_A_MEMBER",
                "You are not a member of this condominium",
            ),
            AppError::InsufficientPermissions => ErrorDetail::new(
                "INSUFFICIENT_PERMISSIONS",
                "You do not have permission to perform this action",
            ),
            AppError::Validation { field, message } => {
                ErrorDetail::new("VALIDATION_ERROR", message.clone()).with_field(field)
            }
            AppError::DuplicateEntry(field) => ErrorDetail::new(
                "DUPLICATE_ENTRY",
                format!("A record with this {} already exists", field),
            )
            .with_field(field),
            AppError::Conflict { resource, message } => {
                ErrorDetail::new("CONFLICT", message.clone()).with_field(resource)
            }
            AppError::NotFound(resource) => {
                ErrorDetail::new("NOT_FOUND", format!("{} not found", resource))
            }
            AppError::InvalidStateTransition(msg) => {
                ErrorDetail::new("INVALID_STATE_TRANSITION", msg.clone())
            }
            AppError::BallotClosed => {
                ErrorDetail::new("BALLOT_CLOSED", "This ballot is not accepting votes")
            }
            AppError::AlreadyVoted => {
                ErrorDetail::new("ALREADY_VOTED", "You have already voted on this ballot")
            }
            AppError::LastAdmin => ErrorDetail::new(
                "LAST_ADMIN",
                "The condominium must keep at least one administrator",
            ),
            AppError::StorageError(msg) => {
                ErrorDetail::new("STORAGE_ERROR", format!("Storage error: {}", msg))
            }
            AppError::Configuration(_) => {
                ErrorDetail::new("CONFIGURATION_ERROR", "The server is misconfigured")
            }
            AppError::DatabaseError(e) if is_unique_violation(e) => {
                ErrorDetail::new("DUPLICATE_ENTRY", "A record with these values already exists")
            }
            AppError::DatabaseError(sqlx::Error::RowNotFound) => {
                ErrorDetail::new("NOT_FOUND", "Resource not found")
            }
            AppError::DatabaseError(_) => {
                ErrorDetail::new("DATABASE_ERROR", "A database error occurred")
            }
            AppError::Internal(_) | AppError::InternalError(_) => {
                ErrorDetail::new("INTERNAL_ERROR", "An internal server error occurred")
            }
        }
    }
}

/// Postgres unique_violation
fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.code().as_deref() == Some("23505"))
}

impl From<AccessDenied> for AppError {
    fn from(denied: AccessDenied) -> Self {
        match denied {
            AccessDenied::NotAMember => AppError::NotAMember,
            AccessDenied::AdminRequired => AppError::InsufficientPermissions,
        }
    }
}

impl From<BallotError> for AppError {
    fn from(err: BallotError) -> Self {
        let field = match err {
            BallotError::TooFewOptions
            | BallotError::EmptyOption
            | BallotError::DuplicateOption => "options",
            BallotError::InvalidMaxSelections => "max_selections",
            _ => "option_ids",
        };
        AppError::invalid(field, err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let field = errors
            .field_errors()
            .keys()
            .next()
            .map(|k| k.to_string())
            .unwrap_or_default();
        AppError::Validation {
            field,
            message: errors.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!(error = ?self, "request failed");
        } else {
            tracing::debug!(error = %self, "request rejected");
        }

        (status, Json(ErrorResponse { error: self.detail() })).into_response()
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;
