//! Provider-neutral message handle

use super::mailgun::ApiMessage;
use super::smtp::SmtpMessage;
use crate::config::BackendKind;
use crate::domain::MergeVariables;
use crate::error::Result;
use serde_json::{Map, Value};

/// One logical email for one or more recipients.
///
/// Created by [`crate::Mailer::new_message`] and only valid for the mailer
/// that created it.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    payload: Payload,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Payload {
    Mailgun(ApiMessage),
    Smtp(SmtpMessage),
}

impl Message {
    pub(crate) fn mailgun(message: ApiMessage) -> Self {
        Self {
            payload: Payload::Mailgun(message),
        }
    }

    pub(crate) fn smtp(message: SmtpMessage) -> Self {
        Self {
            payload: Payload::Smtp(message),
        }
    }

    pub(crate) fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Backend this message was built for
    pub fn backend(&self) -> BackendKind {
        match &self.payload {
            Payload::Mailgun(_) => BackendKind::Mailgun,
            Payload::Smtp(_) => BackendKind::Smtp,
        }
    }

    /// Set the HTML body
    pub fn set_html(&mut self, html: impl Into<String>) {
        match &mut self.payload {
            Payload::Mailgun(m) => m.set_html(html),
            Payload::Smtp(m) => m.set_html(html),
        }
    }

    /// Set the reply address.
    ///
    /// Mailgun receives the value as given, even when empty. SMTP only emits a
    /// Reply-To header for a non-empty value.
    pub fn set_reply_to(&mut self, reply_to: impl Into<String>) {
        match &mut self.payload {
            Payload::Mailgun(m) => m.set_reply_to(reply_to),
            Payload::Smtp(m) => m.set_reply_to(reply_to),
        }
    }

    /// Attach a tag. Ignored by SMTP.
    pub fn add_tag(&mut self, tag: impl Into<String>) {
        if let Payload::Mailgun(m) = &mut self.payload {
            m.add_tag(tag);
        }
    }

    /// Add a recipient with its own `%recipient.<key>%` values.
    ///
    /// Only Mailgun can reject a recipient (batch size limit).
    pub fn add_recipient_and_variables(
        &mut self,
        email: impl Into<String>,
        vars: MergeVariables,
    ) -> Result<()> {
        match &mut self.payload {
            Payload::Mailgun(m) => {
                let vars: Map<String, Value> =
                    vars.into_iter().map(|(k, v)| (k, Value::String(v))).collect();
                m.add_recipient_and_variables(email, vars)
            }
            Payload::Smtp(m) => {
                m.add_recipient_and_variables(email, vars);
                Ok(())
            }
        }
    }

    pub fn from(&self) -> &str {
        match &self.payload {
            Payload::Mailgun(m) => m.from(),
            Payload::Smtp(m) => m.from(),
        }
    }

    pub fn reply_to(&self) -> Option<&str> {
        match &self.payload {
            Payload::Mailgun(m) => m.reply_to(),
            Payload::Smtp(m) => m.reply_to(),
        }
    }

    pub fn subject(&self) -> &str {
        match &self.payload {
            Payload::Mailgun(m) => m.subject(),
            Payload::Smtp(m) => m.subject(),
        }
    }

    pub fn html(&self) -> &str {
        match &self.payload {
            Payload::Mailgun(m) => m.html(),
            Payload::Smtp(m) => m.html(),
        }
    }

    pub fn text(&self) -> &str {
        match &self.payload {
            Payload::Mailgun(m) => m.text(),
            Payload::Smtp(m) => m.text(),
        }
    }

    /// Tags attached so far (always empty for SMTP)
    pub fn tags(&self) -> &[String] {
        match &self.payload {
            Payload::Mailgun(m) => m.tags(),
            Payload::Smtp(_) => &[],
        }
    }

    /// Recipient addresses in the order they were added
    pub fn recipient_addresses(&self) -> Vec<&str> {
        match &self.payload {
            Payload::Mailgun(m) => m.to().iter().map(String::as_str).collect(),
            Payload::Smtp(m) => m.recipients().iter().map(|r| r.email.as_str()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn smtp_message() -> Message {
        Message::smtp(SmtpMessage::new(
            "noreply@example.com",
            "Hello",
            "Hi",
            vec!["a@example.com".to_string()],
        ))
    }

    fn mailgun_message() -> Message {
        Message::mailgun(ApiMessage::new(
            "noreply@example.com",
            "Hello",
            "Hi",
            vec!["a@example.com".to_string()],
        ))
    }

    #[test]
    fn test_backend_kind() {
        assert_eq!(smtp_message().backend(), BackendKind::Smtp);
        assert_eq!(mailgun_message().backend(), BackendKind::Mailgun);
    }

    #[test]
    fn test_add_tag_is_noop_for_smtp() {
        let mut message = smtp_message();
        let before = message.clone();

        message.add_tag("newsletter");

        assert_eq!(message, before);
        assert!(message.tags().is_empty());
    }

    #[test]
    fn test_add_tag_for_mailgun() {
        let mut message = mailgun_message();
        message.add_tag("newsletter");
        assert_eq!(message.tags(), ["newsletter".to_string()]);
    }

    #[test]
    fn test_reply_to_asymmetry() {
        let mut smtp = smtp_message();
        smtp.set_reply_to("");
        assert_eq!(smtp.reply_to(), None);

        let mut mailgun = mailgun_message();
        mailgun.set_reply_to("");
        assert_eq!(mailgun.reply_to(), Some(""));
    }

    #[test]
    fn test_set_html() {
        let mut message = smtp_message();
        message.set_html("<p>Hi</p>");
        assert_eq!(message.html(), "<p>Hi</p>");

        let mut message = mailgun_message();
        message.set_html("<p>Hi</p>");
        assert_eq!(message.html(), "<p>Hi</p>");
    }

    #[test]
    fn test_add_recipient_and_variables() {
        let vars = MergeVariables::from([("name".to_string(), "Ann".to_string())]);

        let mut smtp = smtp_message();
        smtp.add_recipient_and_variables("b@example.com", vars.clone())
            .unwrap();
        assert_eq!(smtp.recipient_addresses(), vec!["a@example.com", "b@example.com"]);

        let mut mailgun = mailgun_message();
        mailgun
            .add_recipient_and_variables("b@example.com", vars)
            .unwrap();
        assert_eq!(
            mailgun.recipient_addresses(),
            vec!["a@example.com", "b@example.com"]
        );
        match mailgun.payload() {
            Payload::Mailgun(m) => {
                assert_eq!(
                    m.recipient_variables()["b@example.com"]["name"],
                    Value::String("Ann".to_string())
                );
            }
            Payload::Smtp(_) => panic!("Expected Mailgun payload"),
        }
    }

    #[test]
    fn test_neutral_view() {
        let message = smtp_message();
        assert_eq!(message.from(), "noreply@example.com");
        assert_eq!(message.subject(), "Hello");
        assert_eq!(message.text(), "Hi");
        assert_eq!(message.html(), "");
    }
}
