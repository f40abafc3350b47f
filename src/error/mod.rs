//! Application error types and their HTTP rendering.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Why a session token was rejected.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,

    #[error("token expired")]
    Expired,

    #[error("unsupported token algorithm")]
    UnsupportedAlgorithm,

    #[error("invalid token signature")]
    SignatureInvalid,
}

/// Application-level errors.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Email already exists")]
    DuplicateEmail,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("User account already confirmed")]
    AlreadyConfirmed,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Account not found")]
    AccountNotFound,

    #[error("New password must be different from current password")]
    PasswordReuse,

    #[error("Reset token has expired. Please request a new password reset.")]
    ResetTokenExpired,

    #[error("Session token rejected: {0}")]
    Token(#[from] TokenError),

    #[error("Current password is incorrect")]
    CurrentPasswordIncorrect,

    #[error("Authentication required")]
    Unauthorized,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Db(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Stable machine-readable code sent to clients.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::DuplicateEmail => "DUPLICATE_EMAIL",
            AppError::InvalidToken => "INVALID_TOKEN",
            AppError::AlreadyConfirmed => "ALREADY_CONFIRMED",
            AppError::InvalidCredentials | AppError::CurrentPasswordIncorrect => {
                "INVALID_CREDENTIALS"
            }
            AppError::AccountNotFound => "ACCOUNT_NOT_FOUND",
            AppError::PasswordReuse => "PASSWORD_REUSE",
            AppError::ResetTokenExpired => "RESET_TOKEN_EXPIRED",
            AppError::Token(TokenError::Malformed) => "TOKEN_MALFORMED",
            AppError::Token(TokenError::Expired) => "TOKEN_EXPIRED",
            AppError::Token(TokenError::UnsupportedAlgorithm) => "TOKEN_UNSUPPORTED_ALGORITHM",
            AppError::Token(TokenError::SignatureInvalid) => "TOKEN_SIGNATURE_INVALID",
            AppError::Unauthorized => "UNAUTHORIZED",
            AppError::Validation(_) => "VALIDATION_FAILED",
            AppError::Db(_) | AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::DuplicateEmail
            | AppError::InvalidToken
            | AppError::AlreadyConfirmed
            | AppError::PasswordReuse
            | AppError::ResetTokenExpired
            | AppError::CurrentPasswordIncorrect
            | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidCredentials | AppError::Token(_) | AppError::Unauthorized => {
                StatusCode::UNAUTHORIZED
            }
            AppError::AccountNotFound => StatusCode::NOT_FOUND,
            AppError::Db(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// True for store/notifier failures whose details must stay server-side.
    pub fn is_infrastructure(&self) -> bool {
        matches!(self, AppError::Db(_) | AppError::Internal(_))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if self.is_infrastructure() {
            error!(error = %self, "request failed");
            "An unexpected error occurred".to_string()
        } else {
            self.to_string()
        };

        let body = Json(json!({
            "error": self.code(),
            "message": message,
            "timestamp": Utc::now().to_rfc3339(),
        }));
        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
