//! Outgoing account notifications: confirmation and password-reset mails.
//!
//! Callers hand a [`Mail`] to a [`Notifier`] and move on. [`MailQueue`] puts it
//! on a bounded channel drained by a single background worker that passes each
//! mail to a [`Mailer`]. There are no retries: a full or closed queue drops
//! the mail, and a failed delivery is logged and forgotten.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mail {
    Confirmation { to: String, token: String },
    PasswordReset { to: String, token: String },
}

impl Mail {
    pub fn recipient(&self) -> &str {
        match self {
            Mail::Confirmation { to, .. } | Mail::PasswordReset { to, .. } => to,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Mail::Confirmation { .. } => "confirmation",
            Mail::PasswordReset { .. } => "password_reset",
        }
    }

    pub fn subject(&self) -> &'static str {
        match self {
            Mail::Confirmation { .. } => "Confirm Your Account",
            Mail::PasswordReset { .. } => "Password Reset Request",
        }
    }

    /// Link the recipient follows, rooted at `base_url`.
    pub fn link(&self, base_url: &str) -> String {
        match self {
            Mail::Confirmation { token, .. } => {
                format!("{}/api/user/confirm?token={}", base_url, token)
            }
            Mail::PasswordReset { token, .. } => {
                format!("{}/reset-password?token={}", base_url, token)
            }
        }
    }

    pub fn body(&self, base_url: &str) -> String {
        let link = self.link(base_url);
        match self {
            Mail::Confirmation { .. } => format!(
                "Thank you for registering. Confirm your account by opening:\n\n{}\n\n\
                 If you did not create an account, ignore this message.",
                link
            ),
            Mail::PasswordReset { .. } => format!(
                "We received a request to reset your password. Set a new one at:\n\n{}\n\n\
                 The link expires in 24 hours. If you did not ask for this, ignore this message.",
                link
            ),
        }
    }
}

/// Fire-and-forget dispatch of account notifications. Implementations must
/// not block the caller and must not report failures back to it.
pub trait Notifier: Send + Sync {
    fn send_confirmation(&self, email: &str, token: &str);
    fn send_password_reset(&self, email: &str, token: &str);
}

/// Delivery backend used by the mail worker.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn deliver(&self, mail: &Mail) -> anyhow::Result<()>;
}

/// Mailer that writes the rendered message to the log. Development delivery.
pub struct LogMailer {
    base_url: String,
}

impl LogMailer {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl Mailer for LogMailer {
    async fn deliver(&self, mail: &Mail) -> anyhow::Result<()> {
        info!(
            to = %mail.recipient(),
            subject = %mail.subject(),
            body = %mail.body(&self.base_url),
            "mail delivered to log"
        );
        Ok(())
    }
}

/// Bounded mail queue; the `Notifier` handed to the services.
#[derive(Clone)]
pub struct MailQueue {
    tx: mpsc::Sender<Mail>,
}

impl MailQueue {
    /// Create the queue and spawn its worker on the current runtime. The worker
    /// exits once every `MailQueue` clone has been dropped.
    pub fn start(capacity: usize, mailer: Arc<dyn Mailer>) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::channel::<Mail>(capacity.max(1));
        let worker = tokio::spawn(async move {
            while let Some(mail) = rx.recv().await {
                match mailer.deliver(&mail).await {
                    Ok(()) => debug!(kind = mail.kind(), to = %mail.recipient(), "mail sent"),
                    Err(e) => error!(
                        kind = mail.kind(),
                        to = %mail.recipient(),
                        error = %e,
                        "mail delivery failed, dropping"
                    ),
                }
            }
            debug!("mail worker stopped");
        });
        (Self { tx }, worker)
    }

    fn enqueue(&self, mail: Mail) {
        match self.tx.try_send(mail) {
            Ok(()) => {}
            Err(TrySendError::Full(mail)) => {
                warn!(kind = mail.kind(), to = %mail.recipient(), "mail queue full, dropping");
            }
            Err(TrySendError::Closed(mail)) => {
                warn!(kind = mail.kind(), to = %mail.recipient(), "mail queue closed, dropping");
            }
        }
    }
}

impl Notifier for MailQueue {
    fn send_confirmation(&self, email: &str, token: &str) {
        self.enqueue(Mail::Confirmation {
            to: email.to_string(),
            token: token.to_string(),
        });
    }

    fn send_password_reset(&self, email: &str, token: &str) {
        self.enqueue(Mail::PasswordReset {
            to: email.to_string(),
            token: token.to_string(),
        });
    }
}
