//! # mailer
//!
//! Transactional email over SMTP.
//!
//! ```no_run
//! use mailer::{Email, Mailer, MailerConfig, SmtpMailer};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), mailer::MailerError> {
//!     let config = MailerConfig::from_env()?;
//!     let mailer = SmtpMailer::new(config)?;
//!
//!     let email = Email::new("brandhead@agency.test", "New client", "Acme was assigned to you");
//!     mailer.send(&email).await?;
//!
//!     Ok(())
//! }
//! ```

mod config;
mod error;
mod smtp;
pub mod templates;
mod types;

use async_trait::async_trait;
use tracing::info;

pub use config::MailerConfig;
pub use error::MailerError;
pub use smtp::SmtpMailer;
pub use types::Email;

/// Sends email.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &Email) -> Result<(), MailerError>;
}

/// Mailer used when SMTP is not configured. Logs and drops every email.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledMailer;

#[async_trait]
impl Mailer for DisabledMailer {
    async fn send(&self, email: &Email) -> Result<(), MailerError> {
        info!(to = ?email.to, subject = %email.subject, "Email disabled, dropping message");
        Ok(())
    }
}
