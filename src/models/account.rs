//! Account record and the read-only views derived from it.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// The single authority granted to every authenticated principal.
pub const AUTHORITY_USER: &str = "ROLE_USER";

/// Persisted identity record.
///
/// `reset_token` and `reset_token_expiry` are either both set or both absent.
/// `confirmation_token` is only present while `confirmed` is false.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Account {
    pub id: Uuid,
    /// Stored exactly as supplied; compared byte-for-byte.
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub password_changed_at: DateTime<Utc>,
    pub confirmed: bool,
    pub confirmation_token: Option<String>,
    pub reset_token: Option<String>,
    pub reset_token_expiry: Option<DateTime<Utc>>,
}

impl Account {
    /// A reset token counts only when present and expiring strictly after `now`.
    pub fn has_valid_reset_token(&self, now: DateTime<Utc>) -> bool {
        match (&self.reset_token, self.reset_token_expiry) {
            (Some(_), Some(expiry)) => expiry > now,
            _ => false,
        }
    }

    pub fn summary(&self) -> AccountSummary {
        AccountSummary {
            id: self.id,
            email: self.email.clone(),
            created_at: self.created_at,
            password_changed_at: self.password_changed_at,
        }
    }

    pub fn profile(&self) -> ProfileView {
        ProfileView {
            id: self.id,
            email: self.email.clone(),
            created_at: self.created_at,
            password_changed_at: self.password_changed_at,
            confirmed: self.confirmed,
        }
    }
}

/// Values for a freshly registered, unconfirmed account.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub confirmation_token: String,
    pub created_at: DateTime<Utc>,
}

impl NewAccount {
    pub fn new(email: &str, password_hash: String, confirmation_token: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash,
            confirmation_token,
            created_at: Utc::now(),
        }
    }

    pub fn into_account(self) -> Account {
        Account {
            id: self.id,
            email: self.email,
            password_hash: self.password_hash,
            created_at: self.created_at,
            password_changed_at: self.created_at,
            confirmed: false,
            confirmation_token: Some(self.confirmation_token),
            reset_token: None,
            reset_token_expiry: None,
        }
    }
}

/// Returned by registration. Never carries the hash or any token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSummary {
    pub id: Uuid,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub password_changed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileView {
    pub id: Uuid,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub password_changed_at: DateTime<Utc>,
    pub confirmed: bool,
}

/// Per-request view of an authenticated account. Lives in the request
/// extensions only and is dropped with the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub id: Uuid,
    pub email: String,
    pub confirmed: bool,
    pub authority: &'static str,
}

impl From<&Account> for Principal {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            email: account.email.clone(),
            confirmed: account.confirmed,
            authority: AUTHORITY_USER,
        }
    }
}

/// Result of an atomic attempt to redeem a reset token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResetConsumption {
    /// Password replaced and reset fields cleared.
    Consumed(Account),
    /// Token existed but had expired; it has now been cleared.
    Expired,
    /// No account carries the token.
    Missing,
}
