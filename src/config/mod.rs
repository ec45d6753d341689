//! Configuration management for Mailbridge

use anyhow::{Context, Result};
use std::env;

/// Application configuration
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Email provider credentials
    pub email: EmailConfig,
    /// Logging configuration
    pub telemetry: TelemetryConfig,
}

/// Credentials for the supported email providers.
///
/// At most one group is used: the Mailgun group wins when both are complete.
#[derive(Clone, Default)]
pub struct EmailConfig {
    /// Mailgun sending domain
    pub domain: String,
    /// Mailgun private API key
    pub mailgun_private: String,
    /// Override for the Mailgun API base URL (e.g. the EU region)
    pub mailgun_api_base: Option<String>,
    /// SMTP relay host
    pub host: String,
    /// SMTP relay port (0 means unset)
    pub port: u16,
    pub username: String,
    pub password: String,
    /// Upgrade the SMTP connection with STARTTLS
    pub enable_starttls: bool,
}

/// Which backend a configuration selects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Mailgun,
    Smtp,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mailgun => "mailgun",
            Self::Smtp => "smtp",
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl EmailConfig {
    /// Check whether the Mailgun credential group is complete
    pub fn has_mailgun(&self) -> bool {
        !self.domain.is_empty() && !self.mailgun_private.is_empty()
    }

    /// Check whether the SMTP credential group is complete
    pub fn has_smtp(&self) -> bool {
        !self.username.is_empty()
            && !self.password.is_empty()
            && !self.host.is_empty()
            && self.port > 0
    }

    /// Backend selected by this configuration, if any
    pub fn backend(&self) -> Option<BackendKind> {
        if self.has_mailgun() {
            Some(BackendKind::Mailgun)
        } else if self.has_smtp() {
            Some(BackendKind::Smtp)
        } else {
            None
        }
    }
}

// Secrets stay out of logs
impl std::fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailConfig")
            .field("domain", &self.domain)
            .field("mailgun_private", &mask(&self.mailgun_private))
            .field("mailgun_api_base", &self.mailgun_api_base)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &mask(&self.password))
            .field("enable_starttls", &self.enable_starttls)
            .finish()
    }
}

fn mask(secret: &str) -> &'static str {
    if secret.is_empty() {
        ""
    } else {
        "***"
    }
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// "json" or "text"
    pub log_format: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            email: EmailConfig {
                domain: env::var("EMAIL_DOMAIN").unwrap_or_default(),
                mailgun_private: env::var("MAILGUN_PRIVATE").unwrap_or_default(),
                mailgun_api_base: env::var("MAILGUN_API_BASE")
                    .ok()
                    .filter(|s| !s.is_empty()),
                host: env::var("SMTP_HOST").unwrap_or_default(),
                port: match env::var("SMTP_PORT") {
                    Ok(port) if !port.is_empty() => port.parse().context("Invalid SMTP_PORT")?,
                    _ => 0,
                },
                username: env::var("SMTP_USERNAME").unwrap_or_default(),
                password: env::var("SMTP_PASSWORD").unwrap_or_default(),
                enable_starttls: env::var("SMTP_ENABLE_STARTTLS")
                    .map(|s| parse_flag(&s))
                    .unwrap_or(false),
            },
            telemetry: TelemetryConfig {
                log_format: env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string()),
            },
        })
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "true" | "1" | "yes")
}
