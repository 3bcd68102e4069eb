use secrecy::{ExposeSecret, SecretString};
use std::env;

use crate::MailerError;

/// SMTP relay settings.
#[derive(Debug, Clone)]
pub struct MailerConfig {
    /// SMTP relay host
    pub smtp_host: String,
    /// SMTP port (default: 587)
    pub smtp_port: u16,
    /// SMTP login
    pub username: String,
    /// Sender address (default: the SMTP login)
    pub from_address: String,
    password: SecretString,
}

impl MailerConfig {
    pub fn new(
        smtp_host: impl Into<String>,
        smtp_port: u16,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        let username = username.into();
        Self {
            smtp_host: smtp_host.into(),
            smtp_port,
            from_address: username.clone(),
            username,
            password: SecretString::from(password.into()),
        }
    }

    /// Create configuration from environment variables.
    ///
    /// Required:
    /// - `SMTP_HOST`
    /// - `SMTP_USERNAME`
    /// - `SMTP_PASSWORD`
    ///
    /// Optional:
    /// - `SMTP_PORT` - Default: 587
    /// - `MAIL_FROM` - Default: `SMTP_USERNAME`
    pub fn from_env() -> Result<Self, MailerError> {
        let smtp_host =
            env::var("SMTP_HOST").map_err(|_| MailerError::MissingEnvVar("SMTP_HOST"))?;

        let smtp_port = env::var("SMTP_PORT")
            .unwrap_or_else(|_| "587".to_string())
            .parse::<u16>()
            .map_err(|e| MailerError::Config(format!("Invalid SMTP_PORT: {}", e)))?;

        let username = env::var("SMTP_USERNAME")
            .map_err(|_| MailerError::MissingEnvVar("SMTP_USERNAME"))?;

        let password = env::var("SMTP_PASSWORD")
            .map_err(|_| MailerError::MissingEnvVar("SMTP_PASSWORD"))?;

        let from_address = env::var("MAIL_FROM").unwrap_or_else(|_| username.clone());

        Ok(Self {
            smtp_host,
            smtp_port,
            username,
            from_address,
            password: SecretString::from(password),
        })
    }

    pub(crate) fn password(&self) -> &str {
        self.password.expose_secret()
    }

    /// Builder method to set the sender address.
    pub fn with_from(mut self, from: impl Into<String>) -> Self {
        self.from_address = from.into();
        self
    }
}
