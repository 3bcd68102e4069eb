//! Email templates.
//!
//! Bodies live under `templates/`. The `.html` variants are escaped by
//! askama; the `.txt` variants are rendered verbatim.

use askama::Template;

use crate::{Email, MailerError};

#[derive(Template)]
#[template(path = "welcome_brand_head.txt")]
struct WelcomeBrandHeadText<'a> {
    name: &'a str,
    company: &'a str,
    package: &'a str,
}

#[derive(Template)]
#[template(path = "welcome_brand_head.html")]
struct WelcomeBrandHeadHtml<'a> {
    name: &'a str,
    company: &'a str,
    package: &'a str,
}

/// Email a brand head receives when a new client is assigned to them.
pub fn welcome_brand_head(
    brand_head_email: &str,
    brand_head_name: &str,
    company_name: &str,
    package: &str,
) -> Result<Email, MailerError> {
    let body = WelcomeBrandHeadText {
        name: brand_head_name,
        company: company_name,
        package,
    }
    .render()?;

    let html = WelcomeBrandHeadHtml {
        name: brand_head_name,
        company: company_name,
        package,
    }
    .render()?;

    let subject = format!("New client assigned: {}", company_name);
    Ok(Email::new(brand_head_email, subject, body).with_html(html))
}
