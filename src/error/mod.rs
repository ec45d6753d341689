//! Unified error handling for Mailbridge

use thiserror::Error;

/// Library-wide result type
pub type Result<T> = std::result::Result<T, MailerError>;

/// Mailer error types
#[derive(Error, Debug)]
pub enum MailerError {
    #[error("no email provider is configured")]
    NotConfigured,

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Invalid address {address:?}: {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("Failed to build message: {0}")]
    Build(String),

    #[error("Send failed: {0}")]
    SendFailed(String),

    #[error("Email API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("recipient limit exceeded (max {0})")]
    RecipientLimit(usize),

    #[error("message not valid: {0}")]
    InvalidMessage(String),

    #[error("message was created for the {message} backend but the mailer uses {mailer}")]
    BackendMismatch {
        message: &'static str,
        mailer: &'static str,
    },
}

impl MailerError {
    /// Whether this error came from a single recipient rather than the batch as a whole
    pub fn is_per_recipient(&self) -> bool {
        matches!(
            self,
            Self::InvalidAddress { .. } | Self::Build(_) | Self::SendFailed(_)
        )
    }
}
