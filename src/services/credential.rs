//! Account creation, email confirmation and authenticated password change.

use chrono::Utc;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::auth::{generate_secret, Passwords};
use crate::error::{AppError, AppResult};
use crate::models::{AccountSummary, NewAccount, ProfileView};
use crate::repositories::AccountStore;
use crate::services::Notifier;

pub const REGISTERED_MESSAGE: &str =
    "Registration successful. Please check your email to confirm your account.";
pub const CONFIRMED_MESSAGE: &str =
    "Your account has been confirmed successfully. You can now login.";
pub const PASSWORD_CHANGED_MESSAGE: &str = "Password changed successfully";

#[derive(Clone)]
pub struct CredentialService {
    store: Arc<dyn AccountStore>,
    notifier: Arc<dyn Notifier>,
}

impl CredentialService {
    pub fn new(store: Arc<dyn AccountStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self { store, notifier }
    }

    /// Create an unconfirmed account and queue its confirmation mail.
    /// Email uniqueness is decided by the store's insert.
    #[instrument(skip(self, raw_password))]
    pub async fn register_account(
        &self,
        email: &str,
        raw_password: &str,
    ) -> AppResult<AccountSummary> {
        Passwords::validate_email(email)?;
        Passwords::validate_strength(raw_password)?;

        let password_hash = Passwords::hash_blocking(raw_password).await?;
        let new_account = NewAccount::new(email, password_hash, generate_secret());
        let account = match self.store.insert(new_account).await {
            Ok(account) => account,
            Err(AppError::DuplicateEmail) => {
                warn!(email = %email, "registration failed: email already exists");
                return Err(AppError::DuplicateEmail);
            }
            Err(e) => return Err(e),
        };

        if let Some(token) = account.confirmation_token.as_deref() {
            self.notifier.send_confirmation(&account.email, token);
        }
        info!(account_id = %account.id, "account registered");
        Ok(account.summary())
    }

    #[instrument(skip_all)]
    pub async fn confirm_account(&self, token: &str) -> AppResult<&'static str> {
        let account = self
            .store
            .find_by_confirmation_token(token)
            .await?
            .ok_or(AppError::InvalidToken)?;
        if account.confirmed {
            warn!(account_id = %account.id, "account already confirmed");
            return Err(AppError::AlreadyConfirmed);
        }

        // A concurrent confirmation may have consumed the token in between.
        let confirmed = self
            .store
            .mark_confirmed(token)
            .await?
            .ok_or(AppError::InvalidToken)?;
        info!(account_id = %confirmed.id, "account confirmed");
        Ok(CONFIRMED_MESSAGE)
    }

    #[instrument(skip(self, current_password, new_password))]
    pub async fn change_password(
        &self,
        email: &str,
        current_password: &str,
        new_password: &str,
    ) -> AppResult<&'static str> {
        Passwords::validate_strength(new_password)?;

        let account = self
            .store
            .find_by_email(email)
            .await?
            .ok_or(AppError::AccountNotFound)?;
        if !Passwords::verify_blocking(current_password, &account.password_hash).await? {
            warn!(account_id = %account.id, "password change failed: incorrect current password");
            return Err(AppError::InvalidCredentials);
        }
        if Passwords::verify_blocking(new_password, &account.password_hash).await? {
            warn!(account_id = %account.id, "password change failed: new password same as current");
            return Err(AppError::PasswordReuse);
        }

        let new_hash = Passwords::hash_blocking(new_password).await?;
        // Swap only if nobody changed the hash since it was verified above.
        self.store
            .update_password(account.id, &account.password_hash, &new_hash, Utc::now())
            .await?
            .ok_or_else(|| {
                warn!(account_id = %account.id, "password change lost a concurrent update");
                AppError::InvalidCredentials
            })?;
        info!(account_id = %account.id, "password changed");
        Ok(PASSWORD_CHANGED_MESSAGE)
    }

    pub async fn get_profile(&self, email: &str) -> AppResult<ProfileView> {
        let account = self
            .store
            .find_by_email(email)
            .await?
            .ok_or(AppError::AccountNotFound)?;
        Ok(account.profile())
    }
}
