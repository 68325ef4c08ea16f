//! Email provider implementations

pub mod lazy;
pub mod mock;
pub mod sendgrid;
pub mod smtp;

pub use lazy::LazyProvider;
pub use mock::RecordingProvider;
pub use sendgrid::SendGridProvider;
pub use smtp::SmtpProvider;

use crate::error::{NotificationError, NotificationResult};
use crate::models::Email;
use async_trait::async_trait;
use core_config::{EmailConfig, EmailProviderKind};
use std::sync::Arc;
use tracing::info;

/// Result of sending an email
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendResult {
    /// Provider-specific message ID
    pub message_id: String,
}

/// Trait for email providers
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmailProvider: Send + Sync {
    /// Send an email. Failures are returned as-is, never retried here.
    async fn send(&self, email: &Email) -> NotificationResult<SendResult>;

    /// Check if the provider is healthy
    async fn health_check(&self) -> NotificationResult<()>;

    /// Get provider name
    fn name(&self) -> &'static str;
}

/// Build the configured provider. Called once at startup; the result is shared.
pub fn build_provider(config: &EmailConfig) -> NotificationResult<Arc<dyn EmailProvider>> {
    let provider: Arc<dyn EmailProvider> = match config.provider {
        EmailProviderKind::Smtp => Arc::new(SmtpProvider::new(&config.smtp)?),
        EmailProviderKind::SendGrid => {
            let api_key = config.sendgrid_api_key.clone().ok_or_else(|| {
                NotificationError::ConfigError(
                    "SENDGRID_API_KEY must be set when EMAIL_PROVIDER=sendgrid".to_string(),
                )
            })?;
            Arc::new(SendGridProvider::new(api_key))
        }
    };

    info!(provider = provider.name(), "Email provider ready");
    Ok(provider)
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_config::SmtpSettings;

    #[test]
    fn test_build_smtp_provider_with_defaults() {
        let provider = build_provider(&EmailConfig::default()).unwrap();
        assert_eq!(provider.name(), "smtp");
    }

    #[test]
    fn test_sendgrid_without_key_names_the_variable() {
        let config = EmailConfig {
            provider: EmailProviderKind::SendGrid,
            ..Default::default()
        };
        let err = build_provider(&config).err().unwrap();
        assert!(matches!(err, NotificationError::ConfigError(_)));
        assert!(err.to_string().contains("SENDGRID_API_KEY"));
    }

    #[test]
    fn test_build_sendgrid_provider() {
        let config = EmailConfig {
            provider: EmailProviderKind::SendGrid,
            sendgrid_api_key: Some("SG.test".to_string()),
            ..Default::default()
        };
        assert_eq!(build_provider(&config).unwrap().name(), "sendgrid");
    }

    #[test]
    fn test_tls_relay_without_credentials_names_the_variable() {
        let config = EmailConfig {
            smtp: SmtpSettings {
                host: "smtp.example.com".to_string(),
                port: 587,
                use_tls: true,
                ..Default::default()
            },
            ..Default::default()
        };
        let err = build_provider(&config).err().unwrap();
        assert!(err.to_string().contains("SMTP_USERNAME"));
    }
}
