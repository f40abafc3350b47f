//! Postgres-backed account store.
//!
//! Race-sensitive operations are single conditional `UPDATE ... RETURNING`
//! statements; Postgres re-evaluates the `WHERE` clause after acquiring the
//! row lock, so the loser of a race matches zero rows.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, error};
use uuid::Uuid;

use super::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::{Account, NewAccount, ResetConsumption};
use crate::repositories::AccountStore;

const EMAIL_UNIQUE_CONSTRAINT: &str = "accounts_email_key";

#[derive(Clone)]
pub struct PgAccountStore {
    pool: DbPool,
}

impl PgAccountStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountStore for PgAccountStore {
    async fn insert(&self, account: NewAccount) -> AppResult<Account> {
        let result = sqlx::query_as::<_, Account>(
            r#"
            INSERT INTO accounts (id, email, password_hash, created_at, password_changed_at, confirmed, confirmation_token)
            VALUES ($1, $2, $3, $4, $4, false, $5)
            RETURNING id, email, password_hash, created_at, password_changed_at, confirmed,
                      confirmation_token, reset_token, reset_token_expiry
            "#,
        )
        .bind(account.id)
        .bind(&account.email)
        .bind(&account.password_hash)
        .bind(account.created_at)
        .bind(&account.confirmation_token)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(row) => Ok(row),
            Err(sqlx::Error::Database(db))
                if db.is_unique_violation() && db.constraint() == Some(EMAIL_UNIQUE_CONSTRAINT) =>
            {
                debug!("insert rejected by email unique constraint");
                Err(AppError::DuplicateEmail)
            }
            Err(e) => {
                error!(error = %e, "account insert failed");
                Err(e.into())
            }
        }
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<Account>> {
        let row = sqlx::query_as::<_, Account>(
            r#"
            SELECT id, email, password_hash, created_at, password_changed_at, confirmed,
                   confirmation_token, reset_token, reset_token_expiry
            FROM accounts WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn find_by_confirmation_token(&self, token: &str) -> AppResult<Option<Account>> {
        let row = sqlx::query_as::<_, Account>(
            r#"
            SELECT id, email, password_hash, created_at, password_changed_at, confirmed,
                   confirmation_token, reset_token, reset_token_expiry
            FROM accounts WHERE confirmation_token = $1
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn find_by_reset_token(&self, token: &str) -> AppResult<Option<Account>> {
        let row = sqlx::query_as::<_, Account>(
            r#"
            SELECT id, email, password_hash, created_at, password_changed_at, confirmed,
                   confirmation_token, reset_token, reset_token_expiry
            FROM accounts WHERE reset_token = $1
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn exists_by_email(&self, email: &str) -> AppResult<bool> {
        let (exists,): (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM accounts WHERE email = $1)")
                .bind(email)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn mark_confirmed(&self, token: &str) -> AppResult<Option<Account>> {
        let row = sqlx::query_as::<_, Account>(
            r#"
            UPDATE accounts SET confirmed = true, confirmation_token = NULL
            WHERE confirmation_token = $1 AND confirmed = false
            RETURNING id, email, password_hash, created_at, password_changed_at, confirmed,
                      confirmation_token, reset_token, reset_token_expiry
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn update_password(
        &self,
        id: Uuid,
        expected_hash: &str,
        new_hash: &str,
        changed_at: DateTime<Utc>,
    ) -> AppResult<Option<Account>> {
        let row = sqlx::query_as::<_, Account>(
            r#"
            UPDATE accounts SET password_hash = $3, password_changed_at = $4
            WHERE id = $1 AND password_hash = $2
            RETURNING id, email, password_hash, created_at, password_changed_at, confirmed,
                      confirmation_token, reset_token, reset_token_expiry
            "#,
        )
        .bind(id)
        .bind(expected_hash)
        .bind(new_hash)
        .bind(changed_at)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn set_reset_token(
        &self,
        email: &str,
        token: &str,
        expiry: DateTime<Utc>,
    ) -> AppResult<Option<Account>> {
        let row = sqlx::query_as::<_, Account>(
            r#"
            UPDATE accounts SET reset_token = $2, reset_token_expiry = $3
            WHERE email = $1
            RETURNING id, email, password_hash, created_at, password_changed_at, confirmed,
                      confirmation_token, reset_token, reset_token_expiry
            "#,
        )
        .bind(email)
        .bind(token)
        .bind(expiry)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn clear_reset_token(&self, token: &str) -> AppResult<bool> {
        let r = sqlx::query(
            "UPDATE accounts SET reset_token = NULL, reset_token_expiry = NULL WHERE reset_token = $1",
        )
        .bind(token)
        .execute(&self.pool)
        .await?;
        Ok(r.rows_affected() > 0)
    }

    async fn consume_reset_token(
        &self,
        token: &str,
        new_hash: &str,
        now: DateTime<Utc>,
    ) -> AppResult<ResetConsumption> {
        let consumed = sqlx::query_as::<_, Account>(
            r#"
            UPDATE accounts
            SET password_hash = $2, password_changed_at = $3,
                reset_token = NULL, reset_token_expiry = NULL
            WHERE reset_token = $1 AND reset_token_expiry > $3
            RETURNING id, email, password_hash, created_at, password_changed_at, confirmed,
                      confirmation_token, reset_token, reset_token_expiry
            "#,
        )
        .bind(token)
        .bind(new_hash)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;
        if let Some(account) = consumed {
            return Ok(ResetConsumption::Consumed(account));
        }

        // Still present means expired; clear it so the next attempt sees nothing.
        if self.clear_reset_token(token).await? {
            Ok(ResetConsumption::Expired)
        } else {
            Ok(ResetConsumption::Missing)
        }
    }
}
