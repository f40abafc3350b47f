//! Middleware: bearer-token authentication and the authenticated-route guard.

pub mod auth;

pub use auth::{authenticate, require_authenticated, AuthUser, RequestAuthenticator};
