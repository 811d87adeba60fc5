use async_trait::async_trait;

use super::{MailError, MailMessage, Mailer};

/// Writes messages to the log instead of sending them.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: MailMessage) -> Result<(), MailError> {
        tracing::info!(to = %message.to, subject = %message.subject, "Outgoing email\n{}", message.body);
        Ok(())
    }
}
