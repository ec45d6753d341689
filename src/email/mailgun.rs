//! Mailgun HTTP API client
//!
//! Sends a whole batch in one request. Per-recipient merge variables travel in
//! the `recipient-variables` field and Mailgun performs the substitution.

use crate::error::{MailerError, Result};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::time::Duration;

/// Default API base URL (US region)
pub const DEFAULT_API_BASE: &str = "https://api.mailgun.net/v3";

/// Maximum number of recipients Mailgun accepts in one batch message
pub const MAX_RECIPIENTS: usize = 1000;

/// Message payload for the Mailgun messages endpoint
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApiMessage {
    from: String,
    subject: String,
    text: String,
    html: String,
    to: Vec<String>,
    reply_to: Option<String>,
    tags: Vec<String>,
    recipient_variables: BTreeMap<String, Map<String, Value>>,
}

impl ApiMessage {
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
            to,
            ..Default::default()
        }
    }

    pub fn set_html(&mut self, html: impl Into<String>) {
        self.html = html.into();
    }

    /// Set the Reply-To header. An empty value is still sent.
    pub fn set_reply_to(&mut self, reply_to: impl Into<String>) {
        self.reply_to = Some(reply_to.into());
    }

    pub fn add_tag(&mut self, tag: impl Into<String>) {
        self.tags.push(tag.into());
    }

    /// Append a recipient along with its merge variables
    pub fn add_recipient_and_variables(
        &mut self,
        address: impl Into<String>,
        vars: Map<String, Value>,
    ) -> Result<()> {
        if self.to.len() >= MAX_RECIPIENTS {
            return Err(MailerError::RecipientLimit(MAX_RECIPIENTS));
        }

        let address = address.into();
        self.recipient_variables.insert(address.clone(), vars);
        self.to.push(address);
        Ok(())
    }

    pub fn from(&self) -> &str {
        &self.from
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn html(&self) -> &str {
        &self.html
    }

    pub fn to(&self) -> &[String] {
        &self.to
    }

    pub fn reply_to(&self) -> Option<&str> {
        self.reply_to.as_deref()
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn recipient_variables(&self) -> &BTreeMap<String, Map<String, Value>> {
        &self.recipient_variables
    }

    /// Reject messages Mailgun would refuse before making a request
    pub fn validate(&self) -> Result<()> {
        if self.from.is_empty() {
            return Err(MailerError::InvalidMessage("missing sender".to_string()));
        }
        if self.to.is_empty() {
            return Err(MailerError::InvalidMessage("no recipients".to_string()));
        }
        if self.text.is_empty() && self.html.is_empty() {
            return Err(MailerError::InvalidMessage("empty body".to_string()));
        }
        Ok(())
    }

    /// Form fields for the messages endpoint
    pub fn form_fields(&self) -> Result<Vec<(&'static str, String)>> {
        let mut fields = vec![("from", self.from.clone())];

        for to in &self.to {
            fields.push(("to", to.clone()));
        }

        fields.push(("subject", self.subject.clone()));

        if !self.text.is_empty() {
            fields.push(("text", self.text.clone()));
        }
        if !self.html.is_empty() {
            fields.push(("html", self.html.clone()));
        }
        if let Some(reply_to) = &self.reply_to {
            fields.push(("h:Reply-To", reply_to.clone()));
        }
        for tag in &self.tags {
            fields.push(("o:tag", tag.clone()));
        }

        if !self.recipient_variables.is_empty() {
            let encoded = serde_json::to_string(&self.recipient_variables)
                .map_err(|e| MailerError::Build(format!("recipient-variables: {}", e)))?;
            fields.push(("recipient-variables", encoded));
        }

        Ok(fields)
    }
}

/// Body returned by Mailgun when a message is accepted
#[derive(Debug, Clone, Deserialize)]
pub struct SendResponse {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub message: String,
}

/// Mailgun API client
#[derive(Clone)]
pub struct MailgunClient {
    http_client: Client,
    domain: String,
    api_key: String,
    api_base: String,
}

impl MailgunClient {
    /// Create a new Mailgun client
    pub fn new(domain: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| {
                MailerError::InvalidConfiguration(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            http_client,
            domain: domain.into(),
            api_key: api_key.into(),
            api_base: DEFAULT_API_BASE.to_string(),
        })
    }

    /// Point the client at a different API base URL
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    pub fn new_message(
        &self,
        from: impl Into<String>,
        subject: impl Into<String>,
        text: impl Into<String>,
        to: Vec<String>,
    ) -> ApiMessage {
        ApiMessage::new(from, subject, text, to)
    }

    fn messages_url(&self) -> String {
        format!("{}/{}/messages", self.api_base, self.domain)
    }

    /// Send a message in a single API call
    pub async fn send(&self, message: &ApiMessage) -> Result<SendResponse> {
        message.validate()?;

        let response = self
            .http_client
            .post(self.messages_url())
            .basic_auth("api", Some(&self.api_key))
            .form(&message.form_fields()?)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(MailerError::Api { status, body });
        }

        Ok(response.json::<SendResponse>().await?)
    }
}
