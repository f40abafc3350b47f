//! Per-request authentication.
//!
//! `authenticate` runs on every route and turns a valid bearer token into a
//! [`Principal`] in the request extensions. It never rejects: a missing,
//! invalid or orphaned token leaves the request anonymous.
//! `require_authenticated` guards the protected routes, and handlers read the
//! principal through [`AuthUser`].

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{authorization::Bearer, Authorization, HeaderMapExt};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::auth::TokenIssuer;
use crate::error::AppError;
use crate::handlers::http::AppState;
use crate::models::Principal;
use crate::repositories::AccountStore;

/// Resolves `Authorization: Bearer <token>` to a principal.
#[derive(Clone)]
pub struct RequestAuthenticator {
    tokens: TokenIssuer,
    store: Arc<dyn AccountStore>,
}

impl RequestAuthenticator {
    pub fn new(tokens: TokenIssuer, store: Arc<dyn AccountStore>) -> Self {
        Self { tokens, store }
    }

    /// `None` means anonymous. Only extraction, verification and account
    /// lookup all succeeding yield a principal.
    pub async fn authenticate(&self, headers: &HeaderMap) -> Option<Principal> {
        let bearer = headers.typed_get::<Authorization<Bearer>>()?;

        let email = match self.tokens.verify(bearer.token()) {
            Ok(email) => email,
            Err(reason) => {
                let rejected = AppError::from(reason);
                debug!(
                    code = rejected.code(),
                    error = %rejected,
                    "bearer token rejected, continuing anonymously"
                );
                return None;
            }
        };

        match self.store.find_by_email(&email).await {
            Ok(Some(account)) => Some(Principal::from(&account)),
            Ok(None) => {
                debug!(email = %email, "token subject no longer exists, continuing anonymously");
                None
            }
            Err(e) => {
                warn!(error = %e, "principal lookup failed, continuing anonymously");
                None
            }
        }
    }
}

/// Middleware: attach the principal, if any, and continue.
pub async fn authenticate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(principal) = state.authenticator().authenticate(request.headers()).await {
        request.extensions_mut().insert(principal);
    }
    next.run(request).await
}

/// Middleware: reject anonymous requests with 401.
pub async fn require_authenticated(request: Request, next: Next) -> Result<Response, AppError> {
    if request.extensions().get::<Principal>().is_none() {
        debug!(path = %request.uri().path(), "anonymous request to protected route");
        return Err(AppError::Unauthorized);
    }
    Ok(next.run(request).await)
}

/// Extractor: the authenticated principal of this request.
#[derive(Clone, Debug)]
pub struct AuthUser(pub Principal);

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .map(AuthUser)
            .ok_or(AppError::Unauthorized)
    }
}
