//! Shared test harness: in-memory store, recording notifier, app state.

#![allow(dead_code)]

use accounts::auth::TokenIssuer;
use accounts::repositories::MemoryAccountStore;
use accounts::services::{Mail, Notifier};
use accounts::AppState;
use chrono::Duration;
use std::sync::{Arc, Mutex};

pub const JWT_SECRET: &str = "test-jwt-secret-min-32-chars!!!!";
pub const TOKEN_LIFETIME_SECS: i64 = 3600;
pub const PASSWORD: &str = "Secret123!";

/// Notifier that keeps every mail it is asked to send.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Mail>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<Mail> {
        self.sent.lock().unwrap().clone()
    }

    pub fn confirmation_token(&self, email: &str) -> Option<String> {
        self.sent().into_iter().rev().find_map(|m| match m {
            Mail::Confirmation { to, token } if to == email => Some(token),
            _ => None,
        })
    }

    pub fn reset_token(&self, email: &str) -> Option<String> {
        self.sent().into_iter().rev().find_map(|m| match m {
            Mail::PasswordReset { to, token } if to == email => Some(token),
            _ => None,
        })
    }
}

impl Notifier for RecordingNotifier {
    fn send_confirmation(&self, email: &str, token: &str) {
        self.sent.lock().unwrap().push(Mail::Confirmation {
            to: email.to_string(),
            token: token.to_string(),
        });
    }

    fn send_password_reset(&self, email: &str, token: &str) {
        self.sent.lock().unwrap().push(Mail::PasswordReset {
            to: email.to_string(),
            token: token.to_string(),
        });
    }
}

pub struct Harness {
    pub store: Arc<MemoryAccountStore>,
    pub notifier: Arc<RecordingNotifier>,
    pub tokens: TokenIssuer,
    pub state: AppState,
}

pub fn harness() -> Harness {
    let store = Arc::new(MemoryAccountStore::new());
    let notifier = Arc::new(RecordingNotifier::default());
    let tokens = TokenIssuer::new(JWT_SECRET, TOKEN_LIFETIME_SECS);
    let state = AppState::new(
        store.clone(),
        notifier.clone(),
        tokens.clone(),
        Duration::hours(24),
    );
    Harness {
        store,
        notifier,
        tokens,
        state,
    }
}

impl Harness {
    /// Register and confirm `email` with [`PASSWORD`].
    pub async fn confirmed_account(&self, email: &str) {
        self.state
            .credentials()
            .register_account(email, PASSWORD)
            .await
            .unwrap();
        let token = self.notifier.confirmation_token(email).unwrap();
        self.state.credentials().confirm_account(&token).await.unwrap();
    }
}
