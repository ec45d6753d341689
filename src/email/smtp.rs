//! SMTP relay backend using lettre
//!
//! SMTP has no batch or template support, so a batch is sent as one email per
//! recipient over a single connection, each rendered with that recipient's
//! merge variables.

use super::templates::RecipientTemplate;
use crate::config::EmailConfig;
use crate::domain::{MergeVariables, OutboundEmail, Recipient};
use crate::error::{MailerError, Result};
use async_trait::async_trait;
use lettre::{
    message::{Mailbox, MultiPart},
    transport::smtp::{
        authentication::{Credentials, Mechanism},
        client::{AsyncSmtpConnection, TlsParameters},
        extension::ClientId,
    },
    Message,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(60);

/// Opens sessions against an SMTP relay
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SmtpConnector: Send + Sync {
    /// Open an authenticated session ready to send
    async fn connect(&self) -> Result<Box<dyn SmtpSession>>;
}

/// An open SMTP session that delivers one rendered email at a time
#[async_trait]
pub trait SmtpSession: Send {
    async fn send(&mut self, email: &OutboundEmail) -> Result<()>;

    /// End the session (QUIT)
    async fn close(&mut self) -> Result<()>;
}

/// Batch payload for the SMTP backend
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SmtpMessage {
    from: String,
    reply_to: String,
    subject: String,
    recipients: Vec<Recipient>,
    html: String,
    text: String,
}

impl SmtpMessage {
    pub fn new(
        from: impl Into<String>,
        subject: impl Into<String>,
        text: impl Into<String>,
        to: Vec<String>,
    ) -> Self {
        Self {
            from: from.into(),
            subject: subject.into(),
            text: text.into(),
            recipients: to.into_iter().map(Recipient::new).collect(),
            ..Default::default()
        }
    }

    pub fn set_html(&mut self, html: impl Into<String>) {
        self.html = html.into();
    }

    /// Set the reply address. Empty means no Reply-To header.
    pub fn set_reply_to(&mut self, reply_to: impl Into<String>) {
        self.reply_to = reply_to.into();
    }

    pub fn add_recipient_and_variables(&mut self, email: impl Into<String>, vars: MergeVariables) {
        self.recipients.push(Recipient::with_vars(email, vars));
    }

    pub fn from(&self) -> &str {
        &self.from
    }

    pub fn reply_to(&self) -> Option<&str> {
        Some(self.reply_to.as_str()).filter(|r| !r.is_empty())
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn html(&self) -> &str {
        &self.html
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn recipients(&self) -> &[Recipient] {
        &self.recipients
    }

    /// Render the single-recipient email for `recipient`
    pub fn render_for(&self, recipient: &Recipient) -> OutboundEmail {
        let bodies =
            RecipientTemplate::for_recipient(recipient).render_bodies(&self.html, &self.text);

        OutboundEmail {
            from: self.from.clone(),
            reply_to: self.reply_to().map(str::to_string),
            subject: self.subject.clone(),
            to: recipient.email.clone(),
            html: bodies.html,
            text: bodies.text,
        }
    }
}

/// SMTP backend: per-recipient sends with partial-failure tolerance
#[derive(Clone)]
pub struct SmtpBackend {
    connector: Arc<dyn SmtpConnector>,
}

impl SmtpBackend {
    pub fn new(connector: Arc<dyn SmtpConnector>) -> Self {
        Self { connector }
    }

    /// Send one email per recipient over a single session.
    ///
    /// Succeeds if at least one recipient was reached, so a caller retry never
    /// re-delivers to those recipients. When every recipient fails, the last
    /// error is returned.
    pub async fn send(&self, message: &SmtpMessage) -> Result<()> {
        let mut session = self.connector.connect().await?;

        let mut delivered = 0usize;
        let mut failed = 0usize;
        let mut last_error = None;

        for recipient in message.recipients() {
            let email = message.render_for(recipient);
            match session.send(&email).await {
                Ok(()) => {
                    delivered += 1;
                    debug!(recipient = %recipient.email, "Email sent");
                }
                Err(e) => {
                    failed += 1;
                    error!(
                        recipient = %recipient.email,
                        error = %e,
                        per_recipient = e.is_per_recipient(),
                        "Unable to send email"
                    );
                    last_error = Some(e);
                }
            }
        }

        if let Err(e) = session.close().await {
            debug!(error = %e, "SMTP session did not close cleanly");
        }

        match last_error {
            Some(err) if delivered == 0 => Err(err),
            Some(_) => {
                warn!(delivered, failed, "Email batch partially delivered");
                Ok(())
            }
            None => Ok(()),
        }
    }
}

/// Connects to an SMTP relay with lettre
#[derive(Clone)]
pub struct LettreConnector {
    host: String,
    port: u16,
    credentials: Credentials,
    starttls: bool,
    hello_name: ClientId,
}

impl LettreConnector {
    pub fn from_config(config: &EmailConfig) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
            credentials: Credentials::new(config.username.clone(), config.password.clone()),
            starttls: config.enable_starttls,
            hello_name: ClientId::Domain("localhost".to_string()),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn uses_starttls(&self) -> bool {
        self.starttls
    }

    async fn open(&self) -> Result<AsyncSmtpConnection> {
        let mut connection = AsyncSmtpConnection::connect_tokio1(
            (self.host.as_str(), self.port),
            Some(CONNECT_TIMEOUT),
            &self.hello_name,
            None,
            None,
        )
        .await
        .map_err(|e| MailerError::ConnectionError(e.to_string()))?;

        if self.starttls {
            let tls = TlsParameters::new(self.host.clone())
                .map_err(|e| MailerError::InvalidConfiguration(e.to_string()))?;
            connection
                .starttls(tls, &self.hello_name)
                .await
                .map_err(|e| MailerError::ConnectionError(format!("STARTTLS failed: {}", e)))?;
        }

        connection
            .auth(&[Mechanism::Plain, Mechanism::Login], &self.credentials)
            .await
            .map_err(|e| MailerError::ConnectionError(format!("Authentication failed: {}", e)))?;

        Ok(connection)
    }
}

#[async_trait]
impl SmtpConnector for LettreConnector {
    async fn connect(&self) -> Result<Box<dyn SmtpSession>> {
        let connection = self.open().await?;
        Ok(Box::new(LettreSession::new(self.clone(), Some(connection))))
    }
}

/// One kept-alive connection, reopened only if the server drops it mid-batch
struct LettreSession {
    connector: LettreConnector,
    connection: Option<AsyncSmtpConnection>,
    /// Set when a reopen fails; the rest of the batch fails without redialing
    reconnect_error: Option<String>,
}

impl LettreSession {
    fn new(connector: LettreConnector, connection: Option<AsyncSmtpConnection>) -> Self {
        Self {
            connector,
            connection,
            reconnect_error: None,
        }
    }

    async fn reopen(&mut self) -> Result<AsyncSmtpConnection> {
        if let Some(reason) = &self.reconnect_error {
            return Err(MailerError::ConnectionError(reason.clone()));
        }

        debug!(host = %self.connector.host, "Reopening SMTP connection");
        match self.connector.open().await {
            Ok(connection) => Ok(connection),
            Err(e) => {
                let reason = match &e {
                    MailerError::ConnectionError(msg) => msg.clone(),
                    other => other.to_string(),
                };
                warn!(host = %self.connector.host, error = %reason, "SMTP reconnect failed");
                self.reconnect_error = Some(reason);
                Err(e)
            }
        }
    }
}

#[async_trait]
impl SmtpSession for LettreSession {
    async fn send(&mut self, email: &OutboundEmail) -> Result<()> {
        let message = build_message(email)?;

        let connection = match self.connection.take() {
            Some(connection) if !connection.has_broken() => connection,
            _ => self.reopen().await?,
        };
        let connection = self.connection.insert(connection);

        connection
            .send(message.envelope(), &message.formatted())
            .await
            .map(|_| ())
            .map_err(|e| MailerError::SendFailed(e.to_string()))
    }

    async fn close(&mut self) -> Result<()> {
        match self.connection.take() {
            Some(mut connection) if !connection.has_broken() => connection
                .quit()
                .await
                .map(|_| ())
                .map_err(|e| MailerError::ConnectionError(e.to_string())),
            _ => Ok(()),
        }
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox> {
    address.parse().map_err(|e: lettre::address::AddressError| {
        MailerError::InvalidAddress {
            address: address.to_string(),
            reason: e.to_string(),
        }
    })
}

/// Assemble a multipart/alternative message (plain text + HTML)
pub fn build_message(email: &OutboundEmail) -> Result<Message> {
    let mut builder = Message::builder()
        .from(parse_mailbox(&email.from)?)
        .to(parse_mailbox(&email.to)?)
        .subject(email.subject.as_str());

    if let Some(reply_to) = &email.reply_to {
        builder = builder.reply_to(parse_mailbox(reply_to)?);
    }

    builder
        .multipart(MultiPart::alternative_plain_html(
            email.text.clone(),
            email.html.clone(),
        ))
        .map_err(|e| MailerError::Build(e.to_string()))
}
