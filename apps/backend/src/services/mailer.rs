//! Outbound mail. Delivery is someone else's job; the backend only hands
//! messages to a `Mailer`.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use thiserror::Error;
use tracing::info;

use crate::logging::pii::Redacted;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("mail delivery failed: {0}")]
    Delivery(String),
}

#[derive(Clone, PartialEq, Eq)]
pub struct OutboundEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl std::fmt::Debug for OutboundEmail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutboundEmail")
            .field("to", &Redacted(&self.to))
            .field("subject", &self.subject)
            .finish_non_exhaustive()
    }
}

impl OutboundEmail {
    pub fn otp(to: &str, code: &str, token: &str) -> Self {
        Self {
            to: to.to_string(),
            subject: "Your verification code".to_string(),
            body: format!(
                "Your verification code is {code}. It expires in 10 minutes.\n\nSubmit it together with this token:\n\n{token}\n"
            ),
        }
    }

    pub fn password_reset(to: &str, token: &str) -> Self {
        Self {
            to: to.to_string(),
            subject: "Reset your password".to_string(),
            body: format!(
                "Use this token to reset your password within 15 minutes:\n\n{token}\n\nIf you did not ask for a reset, ignore this message."
            ),
        }
    }
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: OutboundEmail) -> Result<(), MailError>;
}

/// Logs that a message would have been sent. The body holds codes and
/// tokens, so only the masked recipient and subject are written.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: OutboundEmail) -> Result<(), MailError> {
        info!(to = %Redacted(&email.to), subject = %email.subject, "outbound email queued");
        Ok(())
    }
}

/// Keeps every message in memory so tests can read codes and tokens back.
#[derive(Debug, Default, Clone)]
pub struct RecordingMailer {
    sent: Arc<Mutex<Vec<OutboundEmail>>>,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<OutboundEmail> {
        self.sent.lock().clone()
    }

    pub fn last_to(&self, to: &str) -> Option<OutboundEmail> {
        self.sent.lock().iter().rev().find(|m| m.to == to).cloned()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: OutboundEmail) -> Result<(), MailError> {
        self.sent.lock().push(email);
        Ok(())
    }
}
