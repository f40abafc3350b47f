//! Password hashing (Argon2id) and the password / email acceptance policy.

use crate::error::{AppError, AppResult};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use std::sync::OnceLock;
use validator::ValidateEmail;

pub const MIN_PASSWORD_LEN: usize = 8;
pub const MAX_PASSWORD_LEN: usize = 128;
pub const MAX_EMAIL_LEN: usize = 100;
pub const PASSWORD_SPECIALS: &str = "@$!%*?&";

const POLICY_MESSAGE: &str = "Password must be 8-128 characters and contain at least one uppercase letter, one lowercase letter, one number, and one special character (@$!%*?&)";

pub struct Passwords;

impl Passwords {
    pub fn hash(password: &str) -> AppResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("hash: {}", e)))?
            .to_string();
        Ok(hash)
    }

    pub fn verify(password: &str, hash: &str) -> AppResult<bool> {
        let parsed = PasswordHash::new(hash)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("parse hash: {}", e)))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    }

    /// Spend the same work as a real verification when there is no account,
    /// so an unknown email is not distinguishable by response time.
    pub fn verify_dummy(password: &str) {
        static DUMMY: OnceLock<Option<String>> = OnceLock::new();
        if let Some(hash) = DUMMY.get_or_init(|| Self::hash("dummy-password-for-timing").ok()) {
            let _ = Self::verify(password, hash);
        }
    }

    /// `hash` on the blocking pool; Argon2 is deliberately slow.
    pub async fn hash_blocking(password: &str) -> AppResult<String> {
        let password = password.to_owned();
        tokio::task::spawn_blocking(move || Self::hash(&password))
            .await
            .map_err(|e| AppError::Internal(e.into()))?
    }

    pub async fn verify_blocking(password: &str, hash: &str) -> AppResult<bool> {
        let (password, hash) = (password.to_owned(), hash.to_owned());
        tokio::task::spawn_blocking(move || Self::verify(&password, &hash))
            .await
            .map_err(|e| AppError::Internal(e.into()))?
    }

    pub async fn verify_dummy_blocking(password: &str) {
        let password = password.to_owned();
        let _ = tokio::task::spawn_blocking(move || Self::verify_dummy(&password)).await;
    }

    pub fn validate_strength(password: &str) -> AppResult<()> {
        let len = password.chars().count();
        let allowed = password
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || PASSWORD_SPECIALS.contains(c));
        let strong = (MIN_PASSWORD_LEN..=MAX_PASSWORD_LEN).contains(&len)
            && allowed
            && password.chars().any(|c| c.is_ascii_lowercase())
            && password.chars().any(|c| c.is_ascii_uppercase())
            && password.chars().any(|c| c.is_ascii_digit())
            && password.chars().any(|c| PASSWORD_SPECIALS.contains(c));
        if !strong {
            return Err(AppError::Validation(POLICY_MESSAGE.to_string()));
        }
        Ok(())
    }

    pub fn validate_email(email: &str) -> AppResult<()> {
        if email.len() > MAX_EMAIL_LEN || !email.validate_email() {
            return Err(AppError::Validation("Email must be a valid email address".to_string()));
        }
        Ok(())
    }
}
