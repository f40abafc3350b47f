//! Shared application state, message body and health probe.

use axum::{http::StatusCode, Json};
use chrono::Duration;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;

use crate::auth::TokenIssuer;
use crate::middleware::RequestAuthenticator;
use crate::repositories::AccountStore;
use crate::services::{AuthenticationService, CredentialService, Notifier};

/// Shared application state for every route.
#[derive(Clone)]
pub struct AppState {
    pub credentials: CredentialService,
    pub authentication: AuthenticationService,
    pub authenticator: RequestAuthenticator,
}

impl AppState {
    pub fn new(
        store: Arc<dyn AccountStore>,
        notifier: Arc<dyn Notifier>,
        tokens: TokenIssuer,
        reset_ttl: Duration,
    ) -> Self {
        Self {
            credentials: CredentialService::new(store.clone(), notifier.clone()),
            authentication: AuthenticationService::new(
                store.clone(),
                notifier,
                tokens.clone(),
                reset_ttl,
            ),
            authenticator: RequestAuthenticator::new(tokens, store),
        }
    }

    pub fn credentials(&self) -> &CredentialService {
        &self.credentials
    }
    pub fn authentication(&self) -> &AuthenticationService {
        &self.authentication
    }
    pub fn authenticator(&self) -> &RequestAuthenticator {
        &self.authenticator
    }
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// GET /health: liveness probe.
pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({ "status": "ok", "service": "accounts" })),
    )
}
