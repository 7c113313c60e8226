use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};

use launchpad_api::email::SmtpSettings;

/// Secrets that must never reach production.
const PLACEHOLDER_SECRETS: &[&str] = &["dev-secret-change-me", "change-me", "changeme", "secret"];

pub struct Config {
    pub jwt_secret: String,
    pub db_path: PathBuf,
    pub addr: SocketAddr,
    pub app_url: String,
    pub secure_cookies: bool,
    /// `None` when no SMTP host is set; mail is then only logged.
    pub smtp: Option<SmtpSettings>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let or = |key: &str, default: &str| var(key).unwrap_or_else(|| default.to_string());

        let jwt_secret = var("LAUNCHPAD_JWT_SECRET").context("LAUNCHPAD_JWT_SECRET must be set")?;
        if PLACEHOLDER_SECRETS.contains(&jwt_secret.to_lowercase().as_str()) {
            bail!("LAUNCHPAD_JWT_SECRET is a placeholder value; set a real secret");
        }

        let host = or("LAUNCHPAD_HOST", "0.0.0.0");
        let port: u16 = or("LAUNCHPAD_PORT", "3000")
            .parse()
            .context("LAUNCHPAD_PORT must be a port number")?;
        let addr: SocketAddr = format!("{}:{}", host, port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", host, port))?;

        let secure_cookies = match or("LAUNCHPAD_SECURE_COOKIES", "false").to_lowercase().as_str() {
            "1" | "true" | "yes" => true,
            "0" | "false" | "no" => false,
            other => bail!("LAUNCHPAD_SECURE_COOKIES must be true or false, got '{}'", other),
        };

        let smtp = match var("LAUNCHPAD_SMTP_HOST") {
            Some(host) => Some(SmtpSettings {
                host,
                port: or("LAUNCHPAD_SMTP_PORT", "587")
                    .parse()
                    .context("LAUNCHPAD_SMTP_PORT must be a port number")?,
                username: var("LAUNCHPAD_SMTP_USERNAME"),
                password: var("LAUNCHPAD_SMTP_PASSWORD"),
                from: var("LAUNCHPAD_EMAIL_FROM").context("LAUNCHPAD_EMAIL_FROM must be set when SMTP is configured")?,
            }),
            None => None,
        };

        Ok(Self {
            jwt_secret,
            db_path: PathBuf::from(or("LAUNCHPAD_DB_PATH", "launchpad.db")),
            addr,
            app_url: or("LAUNCHPAD_APP_URL", "http://localhost:3000"),
            secure_cookies,
            smtp,
        })
    }
}
