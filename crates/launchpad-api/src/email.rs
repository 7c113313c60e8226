//! Outgoing mail. Only password reset links are sent today.

use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, header::ContentType},
    transport::smtp::authentication::Credentials,
};
use tracing::{info, warn};

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_email(&self, to: &str, subject: &str, html_body: &str) -> anyhow::Result<()>;
}

pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from: String,
}

/// STARTTLS relay.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(settings: &SmtpSettings) -> anyhow::Result<Self> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.host)
            .with_context(|| format!("create SMTP transport for {}", settings.host))?
            .port(settings.port);

        if let (Some(username), Some(password)) = (&settings.username, &settings.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        let from = settings
            .from
            .parse::<Mailbox>()
            .with_context(|| format!("parse sender address '{}'", settings.from))?;

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send_email(&self, to: &str, subject: &str, html_body: &str) -> anyhow::Result<()> {
        let to = to.parse::<Mailbox>().context("parse recipient address")?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(html_body.to_string())
            .context("build email message")?;

        self.transport.send(message).await.context("send SMTP email")?;
        Ok(())
    }
}

/// Development mailer: writes the message to the log instead of sending it.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_email(&self, to: &str, subject: &str, html_body: &str) -> anyhow::Result<()> {
        info!("Email to {} ({}):\n{}", to, subject, html_body);
        Ok(())
    }
}

pub fn reset_link(app_url: &str, token: &str) -> String {
    format!("{}/reset-password?token={}", app_url.trim_end_matches('/'), token)
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}

pub fn reset_email_body(name: &str, link: &str) -> String {
    let name = escape_html(name);
    let link = escape_html(link);
    format!(
        "<p>Hello {name},</p>\
         <p>We received a request to reset your password. The link below is valid for one hour \
         and can be used once:</p>\
         <p><a href=\"{link}\">{link}</a></p>\
         <p>If you did not request this, you can ignore this email.</p>"
    )
}

/// Send in the background. Failures are logged and never reach the caller,
/// whose response must not depend on whether the address exists.
pub fn dispatch(mailer: Arc<dyn Mailer>, to: String, subject: &'static str, html_body: String) {
    tokio::spawn(async move {
        if let Err(e) = mailer.send_email(&to, subject, &html_body).await {
            warn!("Failed to send '{}' email: {:#}", subject, e);
        }
    });
}
