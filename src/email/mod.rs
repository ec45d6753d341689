//! Email dispatch for Mailbridge
//!
//! This module sends one logical message through one of two backends:
//! - Mailgun HTTP API (native batch and template support)
//! - SMTP relay (using lettre, templates rendered per recipient)

pub mod mailer;
pub mod mailgun;
pub mod message;
pub mod smtp;
pub mod templates;

pub use mailer::Mailer;
pub use mailgun::{ApiMessage, MailgunClient};
pub use message::Message;
pub use smtp::{LettreConnector, SmtpConnector, SmtpMessage, SmtpSession};
pub use templates::RecipientTemplate;
