use async_trait::async_trait;
use lettre::{
    message::{MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::{info, instrument};

use crate::{Email, Mailer, MailerConfig, MailerError};

/// Mailer backed by a pooled STARTTLS SMTP relay.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl SmtpMailer {
    pub fn new(config: MailerConfig) -> Result<Self, MailerError> {
        let creds = Credentials::new(config.username.clone(), config.password().to_string());

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(creds)
            .build();

        info!(
            host = %config.smtp_host,
            port = config.smtp_port,
            from = %config.from_address,
            "Created SMTP mailer"
        );

        Ok(Self {
            transport,
            from_address: config.from_address,
        })
    }

    fn build_message(&self, email: &Email) -> Result<Message, MailerError> {
        build_message(&self.from_address, email)
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    #[instrument(skip(self, email), fields(to = ?email.to, subject = %email.subject))]
    async fn send(&self, email: &Email) -> Result<(), MailerError> {
        let message = self.build_message(email)?;

        self.transport.send(message).await?;

        info!(to = ?email.to, subject = %email.subject, "Email sent");
        Ok(())
    }
}

fn build_message(from: &str, email: &Email) -> Result<Message, MailerError> {
    if email.to.is_empty() {
        return Err(MailerError::NoRecipients);
    }

    let mut builder = Message::builder().from(from.parse()?).subject(&email.subject);
    for to in &email.to {
        builder = builder.to(to.parse()?);
    }

    let message = match &email.html_body {
        Some(html) => builder.multipart(
            MultiPart::alternative()
                .singlepart(SinglePart::plain(email.body.clone()))
                .singlepart(SinglePart::html(html.clone())),
        )?,
        None => builder.body(email.body.clone())?,
    };

    Ok(message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_plain_message() {
        let email = Email::new("bh@agency.test", "Hello", "Body");
        let message = build_message("ops@agency.test", &email).unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();
        assert!(raw.contains("To: bh@agency.test"));
        assert!(raw.contains("Subject: Hello"));
    }

    #[test]
    fn test_build_html_message() {
        let email = Email::new("bh@agency.test", "Hello", "Body").with_html("<p>Body</p>");
        let message = build_message("ops@agency.test", &email).unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();
        assert!(raw.contains("multipart/alternative"));
    }

    #[test]
    fn test_invalid_recipient() {
        let email = Email::new("not an address", "Hello", "Body");
        assert!(matches!(
            build_message("ops@agency.test", &email),
            Err(MailerError::Address(_))
        ));
    }

    #[test]
    fn test_invalid_sender() {
        let email = Email::new("bh@agency.test", "Hello", "Body");
        assert!(matches!(
            build_message("ops at agency", &email),
            Err(MailerError::Address(_))
        ));
    }

    #[test]
    fn test_no_recipients() {
        let mut email = Email::new("bh@agency.test", "Hello", "Body");
        email.to.clear();
        assert!(matches!(
            build_message("ops@agency.test", &email),
            Err(MailerError::NoRecipients)
        ));
    }
}
