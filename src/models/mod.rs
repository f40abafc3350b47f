//! Data models: the account record, its views and the request principal.

pub mod account;

pub use account::*;
