// Outbound email. Handlers only see the `Mailer` trait.
pub mod log;
pub mod smtp;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::{MailConfig, MailTransport};

pub use self::log::LogMailer;
pub use smtp::SmtpMailer;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Error)]
pub enum MailError {
    #[error("Invalid address: {0}")]
    Address(String),

    #[error("Failed to build message: {0}")]
    Build(String),

    #[error("Transport error: {0}")]
    Transport(String),
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: MailMessage) -> Result<(), MailError>;
}

/// Picks the transport named by the configuration.
pub fn from_config(config: &MailConfig) -> Result<Box<dyn Mailer>, MailError> {
    match config.transport {
        MailTransport::Smtp => Ok(Box::new(SmtpMailer::new(config)?)),
        MailTransport::Log => Ok(Box::new(LogMailer)),
    }
}

/// The email a user receives after asking to reset their password.
pub fn password_reset_message(to: &str, reset_link: &str, ttl_minutes: i64) -> MailMessage {
    MailMessage {
        to: to.to_string(),
        subject: format!("CleverMoney password reset (valid for {} min)", ttl_minutes),
        body: format!(
            "Forgot your password? Follow this link to choose a new one:\n\n{}\n\n\
             If you didn't ask to reset your password, please ignore this email.",
            reset_link
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_message_contains_link() {
        let msg = password_reset_message("ann@x.com", "http://localhost:3000/change-password/abc", 10);
        assert_eq!(msg.to, "ann@x.com");
        assert!(msg.subject.contains("10 min"));
        assert!(msg.body.contains("http://localhost:3000/change-password/abc"));
    }
}
