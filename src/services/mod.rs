//! Business logic: credential lifecycle, authentication, notifications.

pub mod authentication;
pub mod credential;
pub mod notifier;

pub use authentication::{AuthenticationService, LoginOutcome};
pub use credential::CredentialService;
pub use notifier::{LogMailer, Mail, MailQueue, Mailer, Notifier};
