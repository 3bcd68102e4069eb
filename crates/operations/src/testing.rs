//! Test doubles for the operations services.

use std::sync::Mutex;

use async_trait::async_trait;
use mailer::{Email, Mailer, MailerError};

/// Mailer that keeps every email it is asked to send.
#[derive(Debug, Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<Email>>,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emails sent so far, oldest first.
    pub fn sent(&self) -> Vec<Email> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: &Email) -> Result<(), MailerError> {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(email.clone());
        }
        Ok(())
    }
}

/// Mailer whose relay is always down.
#[derive(Debug, Default, Clone, Copy)]
pub struct FailingMailer;

#[async_trait]
impl Mailer for FailingMailer {
    async fn send(&self, _email: &Email) -> Result<(), MailerError> {
        Err(MailerError::Config("SMTP relay unavailable".to_string()))
    }
}
