use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::SmtpConfig;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("invalid address: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("message build error: {0}")]
    Build(#[from] lettre::error::Error),

    #[error("SMTP error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), MailError>;
}

/// SMTP relay with credentials, e.g. a Gmail app password.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig, from: &str) -> Result<Self, MailError> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)?
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .build();
        Ok(Self {
            transport,
            from: from.parse()?,
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), MailError> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(email.to.parse()?)
            .subject(email.subject.as_str())
            .header(ContentType::TEXT_HTML)
            .body(email.html.clone())?;

        let response = self.transport.send(message).await?;
        debug!("SMTP accepted mail to {}: {:?}", email.to, response.code());
        Ok(())
    }
}

/// Used when no SMTP relay is configured: records the mail in the log instead.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), MailError> {
        info!(to = %email.to, subject = %email.subject, "SMTP not configured; mail not sent");
        Ok(())
    }
}

#[cfg(test)]
pub use recording::RecordingMailer;
