//! HTTP handlers: shared state, health and user routes.

pub mod http;
pub mod user;

pub use http::{health, AppState, MessageResponse};
