//! User HTTP handlers: register, confirm, profile, change-password.

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::AppError;
use crate::handlers::http::{AppState, MessageResponse};
use crate::middleware::AuthUser;
use crate::models::{AccountSummary, ProfileView};
use crate::services::credential::REGISTERED_MESSAGE;

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email, length(max = 100))]
    pub email: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    #[serde(flatten)]
    pub account: AccountSummary,
    pub message: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct ConfirmQuery {
    pub token: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, max = 128))]
    pub current_password: String,
    #[validate(length(min = 8, max = 128))]
    pub new_password: String,
}

/// POST /api/user/register
pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), AppError> {
    body.validate().map_err(|e| AppError::Validation(e.to_string()))?;
    let account = state
        .credentials()
        .register_account(&body.email, &body.password)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            account,
            message: REGISTERED_MESSAGE,
        }),
    ))
}

/// GET /api/user/confirm?token=
pub async fn confirm(
    State(state): State<AppState>,
    query: Result<Query<ConfirmQuery>, QueryRejection>,
) -> Result<Json<MessageResponse>, AppError> {
    let Query(query) = query.map_err(|e| AppError::Validation(e.body_text()))?;
    let message = state.credentials().confirm_account(&query.token).await?;
    Ok(Json(MessageResponse::new(message)))
}

/// GET /api/user/profile
pub async fn profile(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
) -> Result<Json<ProfileView>, AppError> {
    let profile = state.credentials().get_profile(&principal.email).await?;
    Ok(Json(profile))
}

/// PUT /api/user/change-password
pub async fn change_password(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Json(body): Json<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    body.validate().map_err(|e| AppError::Validation(e.to_string()))?;
    let message = state
        .credentials()
        .change_password(&principal.email, &body.current_password, &body.new_password)
        .await
        .map_err(|e| match e {
            // The caller is already authenticated; a wrong current password is a bad request here.
            AppError::InvalidCredentials => AppError::CurrentPasswordIncorrect,
            other => other,
        })?;
    Ok(Json(MessageResponse::new(message)))
}
