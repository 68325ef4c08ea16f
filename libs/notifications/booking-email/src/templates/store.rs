//! Template sources keyed by notification type.

use crate::error::{NotificationError, NotificationResult};
use crate::models::NotificationType;
use async_trait::async_trait;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Template store trait
#[async_trait]
pub trait TemplateStore: Send + Sync {
    /// Raw template text for a notification type.
    ///
    /// Fails with `TemplateNotFound` when no asset exists.
    async fn load(&self, notification_type: NotificationType) -> NotificationResult<String>;
}

/// The assets shipped with the crate, compiled in.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddedTemplateStore;

impl EmbeddedTemplateStore {
    pub fn source(notification_type: NotificationType) -> &'static str {
        match notification_type {
            NotificationType::BookingConfirmation => {
                include_str!("../../templates/booking-confirmation.html")
            }
            NotificationType::PaymentConfirmation => {
                include_str!("../../templates/payment-confirmation.html")
            }
            NotificationType::BankTransferInstructions => {
                include_str!("../../templates/bank-transfer-instructions.html")
            }
            NotificationType::TripReminder => include_str!("../../templates/trip-reminder.html"),
            NotificationType::TripCompletion => {
                include_str!("../../templates/trip-completion.html")
            }
            NotificationType::BookingCancellation => {
                include_str!("../../templates/booking-cancellation.html")
            }
            NotificationType::BookingUpdate => include_str!("../../templates/booking-update.html"),
            NotificationType::Welcome => include_str!("../../templates/welcome.html"),
            NotificationType::AdminBookingAlert => {
                include_str!("../../templates/admin-booking-alert.html")
            }
            NotificationType::AdminInvite => include_str!("../../templates/admin-invite.html"),
            NotificationType::AdminAccessUpdate => {
                include_str!("../../templates/admin-access-update.html")
            }
        }
    }
}

#[async_trait]
impl TemplateStore for EmbeddedTemplateStore {
    async fn load(&self, notification_type: NotificationType) -> NotificationResult<String> {
        Ok(Self::source(notification_type).to_string())
    }
}

/// Reads `<dir>/<type>.html` on every load.
#[derive(Debug, Clone)]
pub struct DirectoryTemplateStore {
    dir: PathBuf,
    embedded_fallback: bool,
}

impl DirectoryTemplateStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            embedded_fallback: false,
        }
    }

    /// Use the compiled-in asset for types the directory does not override.
    pub fn with_embedded_fallback(mut self) -> Self {
        self.embedded_fallback = true;
        self
    }

    fn path_for(&self, notification_type: NotificationType) -> PathBuf {
        self.dir.join(format!("{}.html", notification_type.as_str()))
    }
}

#[async_trait]
impl TemplateStore for DirectoryTemplateStore {
    async fn load(&self, notification_type: NotificationType) -> NotificationResult<String> {
        let path = self.path_for(notification_type);
        match tokio::fs::read_to_string(&path).await {
            Ok(source) => {
                debug!(path = %path.display(), "Loaded template override");
                Ok(source)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                if self.embedded_fallback {
                    Ok(EmbeddedTemplateStore::source(notification_type).to_string())
                } else {
                    Err(NotificationError::TemplateNotFound(notification_type))
                }
            }
            Err(e) => Err(NotificationError::TemplateError(format!(
                "failed to read {}: {}",
                path.display(),
                e
            ))),
        }
    }
}

/// In-memory template store
#[derive(Debug, Clone, Default)]
pub struct InMemoryTemplateStore {
    templates: Arc<RwLock<HashMap<NotificationType, String>>>,
}

impl InMemoryTemplateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeded with every embedded asset.
    pub fn with_defaults() -> Self {
        let templates = NotificationType::ALL
            .into_iter()
            .map(|t| (t, EmbeddedTemplateStore::source(t).to_string()))
            .collect();
        Self {
            templates: Arc::new(RwLock::new(templates)),
        }
    }

    pub async fn set(&self, notification_type: NotificationType, source: impl Into<String>) {
        self.templates
            .write()
            .await
            .insert(notification_type, source.into());
    }
}

#[async_trait]
impl TemplateStore for InMemoryTemplateStore {
    async fn load(&self, notification_type: NotificationType) -> NotificationResult<String> {
        self.templates
            .read()
            .await
            .get(&notification_type)
            .cloned()
            .ok_or(NotificationError::TemplateNotFound(notification_type))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_embedded_store_has_every_type() {
        let store = EmbeddedTemplateStore;
        for t in NotificationType::ALL {
            let source = store.load(t).await.unwrap();
            assert!(source.contains("<html"), "{} asset is not an HTML document", t);
        }
    }

    #[tokio::test]
    async fn test_in_memory_store_missing_template() {
        let store = InMemoryTemplateStore::new();
        let err = store.load(NotificationType::Welcome).await.unwrap_err();
        assert!(matches!(
            err,
            NotificationError::TemplateNotFound(NotificationType::Welcome)
        ));

        store.set(NotificationType::Welcome, "<p>Hi {{customer_name}}</p>").await;
        assert_eq!(
            store.load(NotificationType::Welcome).await.unwrap(),
            "<p>Hi {{customer_name}}</p>"
        );
    }

    #[tokio::test]
    async fn test_directory_store_reads_fresh_and_falls_back() {
        let dir = std::env::temp_dir().join(format!("booking-email-tpl-{}", uuid::Uuid::new_v4()));
        tokio::fs::create_dir_all(&dir).await.unwrap();
        let path = dir.join("welcome.html");

        tokio::fs::write(&path, "<p>v1</p>").await.unwrap();
        let strict = DirectoryTemplateStore::new(&dir);
        assert_eq!(strict.load(NotificationType::Welcome).await.unwrap(), "<p>v1</p>");

        tokio::fs::write(&path, "<p>v2</p>").await.unwrap();
        assert_eq!(strict.load(NotificationType::Welcome).await.unwrap(), "<p>v2</p>");

        assert!(matches!(
            strict.load(NotificationType::TripReminder).await,
            Err(NotificationError::TemplateNotFound(NotificationType::TripReminder))
        ));

        let lenient = DirectoryTemplateStore::new(&dir).with_embedded_fallback();
        assert_eq!(
            lenient.load(NotificationType::TripReminder).await.unwrap(),
            EmbeddedTemplateStore::source(NotificationType::TripReminder)
        );

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }
}
