//! Authentication: session tokens, password hashing, login and reset handlers.

mod handlers;
mod jwt;
mod password;
mod secret;

pub use handlers::{forgot_password, login, reset_password};
pub use jwt::{Claims, SessionToken, TokenIssuer};
pub use password::Passwords;
pub use secret::generate_secret;
