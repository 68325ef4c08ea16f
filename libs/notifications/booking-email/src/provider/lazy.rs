use super::{build_provider, EmailProvider, SendResult};
use crate::error::NotificationResult;
use crate::models::Email;
use async_trait::async_trait;
use core_config::EmailConfig;
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Builds the configured provider on first use and reuses it afterwards.
///
/// Concurrent first callers wait on a single construction; a failed
/// construction is not cached, so the next call tries again.
pub struct LazyProvider {
    config: EmailConfig,
    inner: OnceCell<Arc<dyn EmailProvider>>,
}

impl LazyProvider {
    pub fn new(config: EmailConfig) -> Self {
        Self {
            config,
            inner: OnceCell::new(),
        }
    }

    async fn get(&self) -> NotificationResult<&Arc<dyn EmailProvider>> {
        self.inner
            .get_or_try_init(|| async { build_provider(&self.config) })
            .await
    }

    pub fn is_initialized(&self) -> bool {
        self.inner.initialized()
    }
}

#[async_trait]
impl EmailProvider for LazyProvider {
    async fn send(&self, email: &Email) -> NotificationResult<SendResult> {
        self.get().await?.send(email).await
    }

    async fn health_check(&self) -> NotificationResult<()> {
        self.get().await?.health_check().await
    }

    fn name(&self) -> &'static str {
        match self.inner.get() {
            Some(provider) => provider.name(),
            None => "lazy",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_config::EmailProviderKind;

    #[tokio::test]
    async fn test_initializes_once() {
        let provider = LazyProvider::new(EmailConfig::default());
        assert!(!provider.is_initialized());
        assert_eq!(provider.name(), "lazy");

        let first = Arc::as_ptr(provider.get().await.unwrap());
        let second = Arc::as_ptr(provider.get().await.unwrap());
        assert!(std::ptr::eq(first as *const u8, second as *const u8));
        assert_eq!(provider.name(), "smtp");
    }

    #[tokio::test]
    async fn test_missing_credentials_surface_on_use() {
        let provider = LazyProvider::new(EmailConfig {
            provider: EmailProviderKind::SendGrid,
            ..Default::default()
        });

        let err = provider.health_check().await.unwrap_err();
        assert!(err.to_string().contains("SENDGRID_API_KEY"));
        assert!(!provider.is_initialized());
    }
}
