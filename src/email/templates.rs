//! Per-recipient template rendering
//!
//! Placeholders use the `%recipient.<key>%` syntax understood by Mailgun batch
//! sends. Substitution is a plain, case-sensitive substring replacement with no
//! escaping of values. A placeholder whose key has no value is left untouched.
//!
//! Variables are applied one key at a time in map iteration order, so a value
//! that itself contains `%recipient.<other>%` may or may not be expanded again
//! depending on whether `<other>` was already applied. That outcome is
//! unspecified.

use crate::domain::{MergeVariables, Recipient};

/// Build the placeholder token for a variable name
pub fn placeholder(key: &str) -> String {
    format!("%recipient.{}%", key)
}

/// Renders message bodies for one recipient's merge variables
#[derive(Debug, Clone, Copy)]
pub struct RecipientTemplate<'a> {
    variables: &'a MergeVariables,
}

impl<'a> RecipientTemplate<'a> {
    pub fn new(variables: &'a MergeVariables) -> Self {
        Self { variables }
    }

    pub fn for_recipient(recipient: &'a Recipient) -> Self {
        Self::new(&recipient.vars)
    }

    /// Render a template string, replacing %recipient.key% with values
    pub fn render(&self, template: &str) -> String {
        let mut result = template.to_string();

        for (key, value) in self.variables {
            result = result.replace(&placeholder(key), value);
        }

        result
    }

    /// Render the html and plain-text bodies together
    pub fn render_bodies(&self, html: &str, text: &str) -> RenderedBodies {
        RenderedBodies {
            html: self.render(html),
            text: self.render(text),
        }
    }
}

/// Bodies with all known placeholders substituted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedBodies {
    pub html: String,
    pub text: String,
}
