//! In-memory account store. Backs the test suites and `STORE=memory` runs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use super::AccountStore;
use crate::error::{AppError, AppResult};
use crate::models::{Account, NewAccount, ResetConsumption};

#[derive(Default)]
struct StoreData {
    accounts: HashMap<Uuid, Account>,
    /// email -> account id; the uniqueness constraint.
    emails: HashMap<String, Uuid>,
}

impl StoreData {
    fn find_mut<F>(&mut self, pred: F) -> Option<&mut Account>
    where
        F: Fn(&Account) -> bool,
    {
        self.accounts.values_mut().find(|a| pred(a))
    }
}

/// Account store held in process memory behind a single lock, so each
/// method observes and mutates the data atomically.
#[derive(Default)]
pub struct MemoryAccountStore {
    data: Mutex<StoreData>,
}

impl MemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.data.lock().await.accounts.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn insert(&self, account: NewAccount) -> AppResult<Account> {
        let mut data = self.data.lock().await;
        if data.emails.contains_key(&account.email) {
            return Err(AppError::DuplicateEmail);
        }
        let account = account.into_account();
        data.emails.insert(account.email.clone(), account.id);
        data.accounts.insert(account.id, account.clone());
        debug!(account_id = %account.id, "account inserted");
        Ok(account)
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<Account>> {
        let data = self.data.lock().await;
        Ok(data
            .emails
            .get(email)
            .and_then(|id| data.accounts.get(id))
            .cloned())
    }

    async fn find_by_confirmation_token(&self, token: &str) -> AppResult<Option<Account>> {
        let data = self.data.lock().await;
        Ok(data
            .accounts
            .values()
            .find(|a| a.confirmation_token.as_deref() == Some(token))
            .cloned())
    }

    async fn find_by_reset_token(&self, token: &str) -> AppResult<Option<Account>> {
        let data = self.data.lock().await;
        Ok(data
            .accounts
            .values()
            .find(|a| a.reset_token.as_deref() == Some(token))
            .cloned())
    }

    async fn exists_by_email(&self, email: &str) -> AppResult<bool> {
        Ok(self.data.lock().await.emails.contains_key(email))
    }

    async fn mark_confirmed(&self, token: &str) -> AppResult<Option<Account>> {
        let mut data = self.data.lock().await;
        let account =
            data.find_mut(|a| !a.confirmed && a.confirmation_token.as_deref() == Some(token));
        Ok(account.map(|a| {
            a.confirmed = true;
            a.confirmation_token = None;
            a.clone()
        }))
    }

    async fn update_password(
        &self,
        id: Uuid,
        expected_hash: &str,
        new_hash: &str,
        changed_at: DateTime<Utc>,
    ) -> AppResult<Option<Account>> {
        let mut data = self.data.lock().await;
        let account = data
            .accounts
            .get_mut(&id)
            .filter(|a| a.password_hash == expected_hash);
        Ok(account.map(|a| {
            a.password_hash = new_hash.to_string();
            a.password_changed_at = changed_at;
            a.clone()
        }))
    }

    async fn set_reset_token(
        &self,
        email: &str,
        token: &str,
        expiry: DateTime<Utc>,
    ) -> AppResult<Option<Account>> {
        let mut data = self.data.lock().await;
        let Some(id) = data.emails.get(email).copied() else {
            return Ok(None);
        };
        Ok(data.accounts.get_mut(&id).map(|a| {
            a.reset_token = Some(token.to_string());
            a.reset_token_expiry = Some(expiry);
            a.clone()
        }))
    }

    async fn clear_reset_token(&self, token: &str) -> AppResult<bool> {
        let mut data = self.data.lock().await;
        match data.find_mut(|a| a.reset_token.as_deref() == Some(token)) {
            Some(a) => {
                a.reset_token = None;
                a.reset_token_expiry = None;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn consume_reset_token(
        &self,
        token: &str,
        new_hash: &str,
        now: DateTime<Utc>,
    ) -> AppResult<ResetConsumption> {
        let mut data = self.data.lock().await;
        let Some(account) = data.find_mut(|a| a.reset_token.as_deref() == Some(token)) else {
            return Ok(ResetConsumption::Missing);
        };
        let valid = account.has_valid_reset_token(now);
        account.reset_token = None;
        account.reset_token_expiry = None;
        if !valid {
            return Ok(ResetConsumption::Expired);
        }
        account.password_hash = new_hash.to_string();
        account.password_changed_at = now;
        Ok(ResetConsumption::Consumed(account.clone()))
    }
}
