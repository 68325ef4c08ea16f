use crate::{env_flag, env_optional, env_or_default, env_parse, ConfigError, FromEnv};
use std::fmt;
use std::str::FromStr;

/// Which delivery provider the notification pipeline talks to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum EmailProviderKind {
    /// SMTP relay (Mailpit locally, a real relay in production).
    #[default]
    Smtp,
    /// SendGrid v3 HTTP API.
    SendGrid,
}

impl FromStr for EmailProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "smtp" => Ok(Self::Smtp),
            "sendgrid" => Ok(Self::SendGrid),
            other => Err(format!("unknown email provider '{}' (expected smtp or sendgrid)", other)),
        }
    }
}

impl fmt::Display for EmailProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Smtp => write!(f, "smtp"),
            Self::SendGrid => write!(f, "sendgrid"),
        }
    }
}

/// SMTP relay settings.
#[derive(Clone, Debug)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub use_tls: bool,
}

impl Default for SmtpSettings {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 1025,
            username: None,
            password: None,
            use_tls: false,
        }
    }
}

/// Configuration for the transactional email pipeline.
///
/// Reads:
/// - `EMAIL_PROVIDER`: `smtp` (default) or `sendgrid`
/// - `EMAIL_FROM_ADDRESS` / `EMAIL_FROM_NAME`: default sender identity
/// - `ADMIN_ALERT_EMAIL`: global fallback for admin booking alerts
/// - `STOREFRONT_URL`: base URL used for booking verification links
/// - `EMAIL_TEMPLATE_DIR`: optional directory overriding the compiled-in templates
/// - `SMTP_HOST`, `SMTP_PORT`, `SMTP_USERNAME`, `SMTP_PASSWORD`, `SMTP_USE_TLS`
/// - `SENDGRID_API_KEY`
///
/// Credentials are not validated here; the provider builder reports the
/// missing variable when it needs one.
#[derive(Clone, Debug)]
pub struct EmailConfig {
    pub provider: EmailProviderKind,
    pub from_email: String,
    pub from_name: String,
    pub admin_alert_email: Option<String>,
    pub storefront_url: String,
    pub template_dir: Option<String>,
    pub smtp: SmtpSettings,
    pub sendgrid_api_key: Option<String>,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            provider: EmailProviderKind::Smtp,
            from_email: "bookings@localhost".to_string(),
            from_name: "Bookings".to_string(),
            admin_alert_email: None,
            storefront_url: "http://localhost:3000".to_string(),
            template_dir: None,
            smtp: SmtpSettings::default(),
            sendgrid_api_key: None,
        }
    }
}

impl FromEnv for EmailConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let provider = env_parse("EMAIL_PROVIDER", EmailProviderKind::Smtp)?;

        let smtp = SmtpSettings {
            host: env_or_default("SMTP_HOST", "localhost"),
            port: env_parse("SMTP_PORT", 1025u16)?,
            username: env_optional("SMTP_USERNAME"),
            password: env_optional("SMTP_PASSWORD"),
            use_tls: env_flag("SMTP_USE_TLS", false),
        };

        Ok(Self {
            provider,
            from_email: env_or_default("EMAIL_FROM_ADDRESS", "bookings@localhost"),
            from_name: env_or_default("EMAIL_FROM_NAME", "Bookings"),
            admin_alert_email: env_optional("ADMIN_ALERT_EMAIL"),
            storefront_url: env_or_default("STOREFRONT_URL", "http://localhost:3000")
                .trim_end_matches('/')
                .to_string(),
            template_dir: env_optional("EMAIL_TEMPLATE_DIR"),
            smtp,
            sendgrid_api_key: env_optional("SENDGRID_API_KEY"),
        })
    }
}
