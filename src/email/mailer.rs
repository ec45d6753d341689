//! Backend selection and dispatch

use super::mailgun::MailgunClient;
use super::message::{Message, Payload};
use super::smtp::{LettreConnector, SmtpBackend, SmtpConnector, SmtpMessage};
use crate::config::{BackendKind, EmailConfig};
use crate::error::{MailerError, Result};
use std::sync::Arc;
use tracing::info;

/// Sends messages through whichever backend was configured at startup
#[derive(Clone)]
pub struct Mailer {
    backend: Backend,
}

#[derive(Clone)]
enum Backend {
    Mailgun(MailgunClient),
    Smtp(SmtpBackend),
}

impl Mailer {
    /// Create a mailer from configuration.
    ///
    /// Mailgun is used when its domain and key are set, otherwise SMTP when
    /// host, port, username and password are all set.
    pub fn new(config: &EmailConfig) -> Result<Self> {
        match config.backend() {
            Some(BackendKind::Mailgun) => {
                let mut client = MailgunClient::new(&config.domain, &config.mailgun_private)?;
                if let Some(api_base) = &config.mailgun_api_base {
                    client = client.with_api_base(api_base);
                }
                info!(domain = %config.domain, "Using Mailgun email backend");
                Ok(Self::with_mailgun(client))
            }
            Some(BackendKind::Smtp) => {
                info!(
                    host = %config.host,
                    port = config.port,
                    starttls = config.enable_starttls,
                    "Using SMTP email backend"
                );
                Ok(Self::with_smtp_connector(Arc::new(
                    LettreConnector::from_config(config),
                )))
            }
            None => Err(MailerError::NotConfigured),
        }
    }

    pub fn with_mailgun(client: MailgunClient) -> Self {
        Self {
            backend: Backend::Mailgun(client),
        }
    }

    /// SMTP mailer over any connector
    pub fn with_smtp_connector(connector: Arc<dyn SmtpConnector>) -> Self {
        Self {
            backend: Backend::Smtp(SmtpBackend::new(connector)),
        }
    }

    pub fn backend(&self) -> BackendKind {
        match &self.backend {
            Backend::Mailgun(_) => BackendKind::Mailgun,
            Backend::Smtp(_) => BackendKind::Smtp,
        }
    }

    /// Build a message for the active backend. Reply-to and HTML start empty.
    pub fn new_message<I, S>(
        &self,
        from: impl Into<String>,
        subject: impl Into<String>,
        text: impl Into<String>,
        to: I,
    ) -> Result<Message>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let to: Vec<String> = to.into_iter().map(Into::into).collect();

        Ok(match &self.backend {
            Backend::Mailgun(client) => {
                Message::mailgun(client.new_message(from, subject, text, to))
            }
            Backend::Smtp(_) => Message::smtp(SmtpMessage::new(from, subject, text, to)),
        })
    }

    /// Send a message through the active backend
    pub async fn send(&self, message: &Message) -> Result<()> {
        match (&self.backend, message.payload()) {
            (Backend::Mailgun(client), Payload::Mailgun(msg)) => {
                let response = client.send(msg).await?;
                info!(
                    id = %response.id,
                    recipients = msg.to().len(),
                    "Email accepted by Mailgun"
                );
                Ok(())
            }
            (Backend::Smtp(smtp), Payload::Smtp(msg)) => smtp.send(msg).await,
            _ => Err(MailerError::BackendMismatch {
                message: message.backend().as_str(),
                mailer: self.backend().as_str(),
            }),
        }
    }
}
