//! Account lifecycle service.
//!
//! Registration with email confirmation, password login issuing stateless
//! HS256 session tokens, authenticated password change and token-based
//! password reset, served over axum with a Postgres or in-memory store.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod repositories;
pub mod services;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use handlers::http::AppState;
pub use services::{AuthenticationService, CredentialService};

use axum::extract::Request;
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::{get, post, put};
use handlers::{http, user};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::Span;

/// Build the API router. Used by main and by integration tests.
///
/// Per request: trace, CORS, `authenticate` (attach principal or stay
/// anonymous), then `require_authenticated` on the protected routes only.
pub fn create_app(state: AppState) -> axum::Router {
    let public_routes = axum::Router::new()
        .route("/api/user/register", post(user::register))
        .route("/api/user/confirm", get(user::confirm))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/forgot-password", post(auth::forgot_password))
        .route("/api/auth/reset-password", post(auth::reset_password))
        .route("/health", get(http::health));

    let protected_routes = axum::Router::new()
        .route("/api/user/profile", get(user::profile))
        .route("/api/user/change-password", put(user::change_password))
        .route_layer(from_fn(middleware::require_authenticated));

    axum::Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(from_fn_with_state(state.clone(), middleware::authenticate))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http().make_span_with(request_span))
        .with_state(state)
}

/// Method and path only: query strings carry confirmation secrets.
fn request_span(request: &Request) -> Span {
    tracing::debug_span!("request", method = %request.method(), path = %request.uri().path())
}
