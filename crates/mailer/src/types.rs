/// An email message to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    /// Primary recipients
    pub to: Vec<String>,
    pub subject: String,
    /// Plain text body
    pub body: String,
    /// Optional HTML body
    pub html_body: Option<String>,
}

impl Email {
    /// Create a new email with a single recipient.
    pub fn new(to: impl Into<String>, subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            to: vec![to.into()],
            subject: subject.into(),
            body: body.into(),
            html_body: None,
        }
    }

    /// Set the HTML body (sent as multipart alternative with the text fallback).
    pub fn with_html(mut self, html: impl Into<String>) -> Self {
        self.html_body = Some(html.into());
        self
    }
}
