use thiserror::Error;

/// Why an email could not be composed or delivered.
#[derive(Debug, Error)]
pub enum MailerError {
    /// The relay could not be reached or rejected the message.
    #[error("SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    /// A sender or recipient is not a valid mailbox.
    #[error("invalid address: {0}")]
    Address(#[from] lettre::address::AddressError),

    /// lettre refused to assemble the message.
    #[error("could not build message: {0}")]
    Message(#[from] lettre::error::Error),

    /// A body template failed to render.
    #[error("could not render template: {0}")]
    Template(#[from] askama::Error),

    #[error("email has no recipients")]
    NoRecipients,

    #[error("invalid mailer configuration: {0}")]
    Config(String),

    #[error("{0} is not set")]
    MissingEnvVar(&'static str),
}
