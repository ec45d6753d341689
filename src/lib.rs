//! Mailbridge - provider-agnostic email dispatch
//!
//! Build a message once and send it through either the Mailgun API or an SMTP
//! relay, whichever is configured.

pub mod config;
pub mod domain;
pub mod email;
pub mod error;
pub mod telemetry;

// Re-export commonly used types
pub use config::{BackendKind, Config, EmailConfig};
pub use email::{Mailer, Message};
pub use error::{MailerError, Result};
