//! Login and the unauthenticated password-reset flow.

use chrono::{Duration, Utc};
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::auth::{generate_secret, Passwords, SessionToken, TokenIssuer};
use crate::error::{AppError, AppResult};
use crate::models::{Account, ResetConsumption};
use crate::repositories::AccountStore;
use crate::services::Notifier;

pub const RESET_REQUESTED_MESSAGE: &str =
    "If an account with that email exists, you will receive password reset instructions.";
pub const RESET_COMPLETED_MESSAGE: &str =
    "Your password has been reset successfully. You can now login with your new password.";

/// Successful login: the session token and the account it was minted for.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub session: SessionToken,
    pub account: Account,
}

#[derive(Clone)]
pub struct AuthenticationService {
    store: Arc<dyn AccountStore>,
    notifier: Arc<dyn Notifier>,
    tokens: TokenIssuer,
    reset_ttl: Duration,
}

impl AuthenticationService {
    pub fn new(
        store: Arc<dyn AccountStore>,
        notifier: Arc<dyn Notifier>,
        tokens: TokenIssuer,
        reset_ttl: Duration,
    ) -> Self {
        Self {
            store,
            notifier,
            tokens,
            reset_ttl,
        }
    }

    pub fn tokens(&self) -> &TokenIssuer {
        &self.tokens
    }

    /// Unknown email, wrong password and unconfirmed account all fail with the
    /// same `InvalidCredentials`; only the log tells them apart.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> AppResult<LoginOutcome> {
        let Some(account) = self.store.find_by_email(email).await? else {
            Passwords::verify_dummy_blocking(password).await;
            warn!(email = %email, "login failed: unknown email");
            return Err(AppError::InvalidCredentials);
        };
        if !Passwords::verify_blocking(password, &account.password_hash).await? {
            warn!(account_id = %account.id, "login failed: invalid password");
            return Err(AppError::InvalidCredentials);
        }
        if !account.confirmed {
            warn!(account_id = %account.id, "login failed: account not confirmed");
            return Err(AppError::InvalidCredentials);
        }

        let session = self.tokens.mint(&account.email)?;
        info!(account_id = %account.id, "login succeeded");
        Ok(LoginOutcome { session, account })
    }

    /// Same answer whether or not the account exists.
    #[instrument(skip(self))]
    pub async fn initiate_password_reset(&self, email: &str) -> AppResult<&'static str> {
        let token = generate_secret();
        let expiry = Utc::now()
            .checked_add_signed(self.reset_ttl)
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("reset token expiry out of range")))?;
        match self.store.set_reset_token(email, &token, expiry).await? {
            Some(account) => {
                self.notifier.send_password_reset(&account.email, &token);
                info!(account_id = %account.id, "password reset initiated");
            }
            None => info!("password reset requested for unknown email"),
        }
        Ok(RESET_REQUESTED_MESSAGE)
    }

    #[instrument(skip_all)]
    pub async fn complete_reset(&self, token: &str, new_password: &str) -> AppResult<&'static str> {
        Passwords::validate_strength(new_password)?;

        let account = self
            .store
            .find_by_reset_token(token)
            .await?
            .ok_or(AppError::InvalidToken)?;
        if !account.has_valid_reset_token(Utc::now()) {
            // Whoever clears the expired token reports the expiry; later
            // attempts find nothing.
            return if self.store.clear_reset_token(token).await? {
                warn!(account_id = %account.id, "password reset failed: token expired");
                Err(AppError::ResetTokenExpired)
            } else {
                Err(AppError::InvalidToken)
            };
        }

        let new_hash = Passwords::hash_blocking(new_password).await?;
        match self
            .store
            .consume_reset_token(token, &new_hash, Utc::now())
            .await?
        {
            ResetConsumption::Consumed(account) => {
                info!(account_id = %account.id, "password reset completed");
                Ok(RESET_COMPLETED_MESSAGE)
            }
            ResetConsumption::Expired => {
                warn!(account_id = %account.id, "password reset failed: token expired");
                Err(AppError::ResetTokenExpired)
            }
            ResetConsumption::Missing => Err(AppError::InvalidToken),
        }
    }
}
