//! Provider-neutral email value types

use std::collections::HashMap;

/// Per-recipient substitution values, keyed by placeholder name
pub type MergeVariables = HashMap<String, String>;

/// A single recipient with its own merge variables
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipient {
    pub email: String,
    pub vars: MergeVariables,
}

impl Recipient {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            vars: MergeVariables::new(),
        }
    }

    pub fn with_vars(email: impl Into<String>, vars: MergeVariables) -> Self {
        Self {
            email: email.into(),
            vars,
        }
    }
}

/// One fully rendered email addressed to exactly one recipient
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundEmail {
    pub from: String,
    pub reply_to: Option<String>,
    pub subject: String,
    pub to: String,
    pub html: String,
    pub text: String,
}
