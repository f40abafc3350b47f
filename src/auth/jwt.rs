//! Session token mint and verification (HS256 JWT).

use crate::error::{AppError, AppResult, TokenError};
use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // account email
    pub iat: i64,
    pub exp: i64,
}

/// A freshly minted session token and its lifetime in seconds.
#[derive(Debug, Clone)]
pub struct SessionToken {
    pub token: String,
    pub expires_in: i64,
}

struct Keys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    lifetime: Duration,
}

/// Mints and verifies self-contained session tokens. The key is fixed at
/// construction; there is no revocation, a token stays valid until `exp`.
#[derive(Clone)]
pub struct TokenIssuer {
    keys: Arc<Keys>,
}

impl TokenIssuer {
    pub fn new(secret: &str, lifetime_secs: i64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "iat", "sub"]);
        Self {
            keys: Arc::new(Keys {
                encoding: EncodingKey::from_secret(secret.as_bytes()),
                decoding: DecodingKey::from_secret(secret.as_bytes()),
                validation,
                lifetime: Duration::seconds(lifetime_secs),
            }),
        }
    }

    pub fn lifetime_secs(&self) -> i64 {
        self.keys.lifetime.num_seconds()
    }

    pub fn mint(&self, subject: &str) -> AppResult<SessionToken> {
        let now = Utc::now();
        let exp = now
            .checked_add_signed(self.keys.lifetime)
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("session expiry out of range")))?;
        let claims = Claims {
            sub: subject.to_string(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.keys.encoding)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("jwt encode: {}", e)))?;
        Ok(SessionToken {
            token,
            expires_in: self.lifetime_secs(),
        })
    }

    /// Check signature and expiry; returns the subject email.
    pub fn verify(&self, token: &str) -> Result<String, TokenError> {
        let data = decode::<Claims>(token, &self.keys.decoding, &self.keys.validation)
            .map_err(|e| {
                let failure = classify(e.kind());
                debug!(error = %e, reason = %failure, "session token rejected");
                failure
            })?;
        Ok(data.claims.sub)
    }
}

fn classify(kind: &ErrorKind) -> TokenError {
    match kind {
        ErrorKind::ExpiredSignature => TokenError::Expired,
        ErrorKind::InvalidSignature => TokenError::SignatureInvalid,
        ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => {
            TokenError::UnsupportedAlgorithm
        }
        _ => TokenError::Malformed,
    }
}
