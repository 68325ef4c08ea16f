//! Recording email provider for tests and dry runs

use super::{EmailProvider, SendResult};
use crate::error::{NotificationError, NotificationResult};
use crate::models::Email;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Provider that captures every envelope it is handed.
///
/// Failures are scripted per call: queued failures are consumed first, then
/// the `always_fail` switch applies. Failed attempts are recorded too.
#[derive(Clone, Default)]
pub struct RecordingProvider {
    attempts: Arc<Mutex<Vec<Email>>>,
    sent: Arc<Mutex<Vec<Email>>>,
    scripted_failures: Arc<Mutex<VecDeque<String>>>,
    always_fail: Option<String>,
}

impl RecordingProvider {
    /// Create a new recording provider
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a provider that always fails
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            always_fail: Some(message.into()),
            ..Self::default()
        }
    }

    /// Fail the next call with `message`, then behave normally.
    pub async fn fail_next(&self, message: impl Into<String>) {
        self.scripted_failures.lock().await.push_back(message.into());
    }

    /// Every envelope passed to `send`, successful or not.
    pub async fn attempts(&self) -> Vec<Email> {
        self.attempts.lock().await.clone()
    }

    /// Envelopes that were accepted.
    pub async fn sent_emails(&self) -> Vec<Email> {
        self.sent.lock().await.clone()
    }

    pub async fn sent_count(&self) -> usize {
        self.sent.lock().await.len()
    }

    /// Check if an email was sent to a specific address
    pub async fn was_sent_to(&self, address: &str) -> bool {
        self.sent
            .lock()
            .await
            .iter()
            .any(|e| e.to.iter().any(|to| to == address))
    }

    pub async fn clear(&self) {
        self.attempts.lock().await.clear();
        self.sent.lock().await.clear();
    }
}

#[async_trait]
impl EmailProvider for RecordingProvider {
    async fn send(&self, email: &Email) -> NotificationResult<SendResult> {
        self.attempts.lock().await.push(email.clone());

        let scripted = self.scripted_failures.lock().await.pop_front();
        if let Some(message) = scripted.or_else(|| self.always_fail.clone()) {
            return Err(NotificationError::ProviderError(message));
        }

        self.sent.lock().await.push(email.clone());

        Ok(SendResult {
            message_id: format!("mock-{}", email.id),
        })
    }

    async fn health_check(&self) -> NotificationResult<()> {
        match &self.always_fail {
            Some(message) => Err(NotificationError::ProviderError(message.clone())),
            None => Ok(()),
        }
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
