//! Error types for the booking notification pipeline.

use crate::models::NotificationType;
use thiserror::Error;

/// Result type for notification operations.
pub type NotificationResult<T> = Result<T, NotificationError>;

/// Errors that can occur while preparing or delivering a notification.
#[derive(Debug, Error)]
pub enum NotificationError {
    /// No template asset exists for the notification type. A deployment defect.
    #[error("Template not found for notification type '{0}'")]
    TemplateNotFound(NotificationType),

    /// Template failed to compile or render.
    #[error("Template rendering error: {0}")]
    TemplateError(String),

    /// QR code or receipt generation failed.
    #[error("Artifact generation failed: {0}")]
    ArtifactError(String),

    /// Delivery provider rejected or failed the send.
    #[error("Provider error: {0}")]
    ProviderError(String),

    /// Missing or malformed configuration (e.g. provider credentials).
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Caller supplied data the pipeline cannot use (e.g. a malformed address).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl NotificationError {
    /// Whether this error came from the delivery provider.
    pub fn is_provider_failure(&self) -> bool {
        matches!(self, Self::ProviderError(_))
    }
}

impl From<serde_json::Error> for NotificationError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}

impl From<handlebars::RenderError> for NotificationError {
    fn from(err: handlebars::RenderError) -> Self {
        Self::TemplateError(err.to_string())
    }
}

impl From<handlebars::TemplateError> for NotificationError {
    fn from(err: handlebars::TemplateError) -> Self {
        Self::TemplateError(err.to_string())
    }
}

impl From<reqwest::Error> for NotificationError {
    fn from(err: reqwest::Error) -> Self {
        Self::ProviderError(err.to_string())
    }
}

impl From<core_config::ConfigError> for NotificationError {
    fn from(err: core_config::ConfigError) -> Self {
        Self::ConfigError(err.to_string())
    }
}
