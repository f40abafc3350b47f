//! Auth HTTP handlers: login, forgot-password, reset-password.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::error::AppError;
use crate::handlers::http::{AppState, MessageResponse};

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 100))]
    pub email: String,
    #[validate(length(min = 1, max = 128))]
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    #[serde(rename = "type")]
    pub token_type: &'static str,
    pub expires_in: i64,
    pub user: UserInfo,
}

#[derive(Debug, Serialize)]
pub struct UserInfo {
    pub id: Uuid,
    pub email: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ForgotPasswordRequest {
    #[validate(email, length(max = 100))]
    pub email: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    #[validate(length(min = 1, max = 255))]
    pub token: String,
    #[validate(length(min = 8, max = 128))]
    pub new_password: String,
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    // Shape errors look the same as bad credentials.
    body.validate().map_err(|_| AppError::InvalidCredentials)?;

    let outcome = state
        .authentication()
        .login(&body.email, &body.password)
        .await?;

    Ok(Json(LoginResponse {
        token: outcome.session.token,
        token_type: "Bearer",
        expires_in: outcome.session.expires_in,
        user: UserInfo {
            id: outcome.account.id,
            email: outcome.account.email,
        },
    }))
}

/// POST /api/auth/forgot-password
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(body): Json<ForgotPasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    body.validate().map_err(|e| AppError::Validation(e.to_string()))?;
    let message = state
        .authentication()
        .initiate_password_reset(&body.email)
        .await?;
    Ok(Json(MessageResponse::new(message)))
}

/// POST /api/auth/reset-password
pub async fn reset_password(
    State(state): State<AppState>,
    Json(body): Json<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    body.validate().map_err(|e| AppError::Validation(e.to_string()))?;
    let message = state
        .authentication()
        .complete_reset(&body.token, &body.new_password)
        .await?;
    Ok(Json(MessageResponse::new(message)))
}
