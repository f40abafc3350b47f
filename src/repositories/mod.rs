//! Account storage contract shared by the Postgres and in-memory backends.
//!
//! Every mutating method is a single atomic step at the store: uniqueness is
//! decided by the insert itself, and token redemption is a conditional update
//! rather than a read followed by a write.

mod memory;

pub use memory::MemoryAccountStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{Account, NewAccount, ResetConsumption};

#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Insert a new account. Fails with `AppError::DuplicateEmail` when the
    /// email is already taken, decided atomically with the insert.
    async fn insert(&self, account: NewAccount) -> AppResult<Account>;

    async fn find_by_email(&self, email: &str) -> AppResult<Option<Account>>;

    async fn find_by_confirmation_token(&self, token: &str) -> AppResult<Option<Account>>;

    async fn find_by_reset_token(&self, token: &str) -> AppResult<Option<Account>>;

    /// Informational only; never used to decide an insert.
    async fn exists_by_email(&self, email: &str) -> AppResult<bool>;

    /// Confirm the unconfirmed account holding `token` and clear the token.
    /// `None` when no unconfirmed account holds it.
    async fn mark_confirmed(&self, token: &str) -> AppResult<Option<Account>>;

    /// Replace the hash only if it is still `expected_hash`. `None` when the
    /// account is gone or its hash changed concurrently.
    async fn update_password(
        &self,
        id: Uuid,
        expected_hash: &str,
        new_hash: &str,
        changed_at: DateTime<Utc>,
    ) -> AppResult<Option<Account>>;

    /// Set both reset fields on the account with `email`. `None` if absent.
    async fn set_reset_token(
        &self,
        email: &str,
        token: &str,
        expiry: DateTime<Utc>,
    ) -> AppResult<Option<Account>>;

    /// Clear both reset fields on the account holding `token`.
    async fn clear_reset_token(&self, token: &str) -> AppResult<bool>;

    /// Redeem `token`: when it is present and expires after `now`, replace the
    /// hash, stamp `password_changed_at` and clear both reset fields in one step.
    /// An expired token is cleared and reported as such.
    async fn consume_reset_token(
        &self,
        token: &str,
        new_hash: &str,
        now: DateTime<Utc>,
    ) -> AppResult<ResetConsumption>;
}
