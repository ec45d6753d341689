//! Common test utilities

use async_trait::async_trait;
use mailbridge::domain::{MergeVariables, OutboundEmail};
use mailbridge::email::{SmtpConnector, SmtpSession};
use mailbridge::{Mailer, MailerError, Result};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// What a recording SMTP relay saw
#[derive(Debug, Default)]
pub struct Outbox {
    pub sent: Vec<OutboundEmail>,
    pub attempts: usize,
    pub connections: usize,
    pub closed: usize,
}

/// In-memory SMTP relay that rejects a fixed set of addresses
#[derive(Clone, Default)]
pub struct RecordingRelay {
    outbox: Arc<Mutex<Outbox>>,
    rejected: HashSet<String>,
    refuse_connections: bool,
}

impl RecordingRelay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rejecting(addresses: &[&str]) -> Self {
        Self {
            rejected: addresses.iter().map(|a| a.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn unreachable() -> Self {
        Self {
            refuse_connections: true,
            ..Self::default()
        }
    }

    pub fn mailer(&self) -> Mailer {
        Mailer::with_smtp_connector(Arc::new(self.clone()))
    }

    pub fn sent(&self) -> Vec<OutboundEmail> {
        self.outbox.lock().unwrap().sent.clone()
    }

    pub fn sent_to(&self, address: &str) -> Option<OutboundEmail> {
        self.sent().into_iter().find(|email| email.to == address)
    }

    pub fn attempts(&self) -> usize {
        self.outbox.lock().unwrap().attempts
    }

    pub fn connections(&self) -> usize {
        self.outbox.lock().unwrap().connections
    }

    pub fn closed(&self) -> usize {
        self.outbox.lock().unwrap().closed
    }
}

struct RecordingSession {
    relay: RecordingRelay,
}

#[async_trait]
impl SmtpConnector for RecordingRelay {
    async fn connect(&self) -> Result<Box<dyn SmtpSession>> {
        if self.refuse_connections {
            return Err(MailerError::ConnectionError(
                "connection refused".to_string(),
            ));
        }
        self.outbox.lock().unwrap().connections += 1;
        Ok(Box::new(RecordingSession {
            relay: self.clone(),
        }))
    }
}

#[async_trait]
impl SmtpSession for RecordingSession {
    async fn send(&mut self, email: &OutboundEmail) -> Result<()> {
        let mut outbox = self.relay.outbox.lock().unwrap();
        outbox.attempts += 1;
        if self.relay.rejected.contains(&email.to) {
            return Err(MailerError::SendFailed(format!(
                "550 5.1.1 <{}>: Recipient address rejected",
                email.to
            )));
        }
        outbox.sent.push(email.clone());
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.relay.outbox.lock().unwrap().closed += 1;
        Ok(())
    }
}

pub fn vars(pairs: &[(&str, &str)]) -> MergeVariables {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}
