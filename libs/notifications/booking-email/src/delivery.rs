//! Provider-bound envelope construction and the single provider call.

use crate::branding::TenantBranding;
use crate::error::{NotificationError, NotificationResult};
use crate::models::{Email, InlineArtifact, NotificationType, RenderedMessage, Sender, StandaloneArtifact};
use crate::provider::{EmailProvider, SendResult};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

/// Everything the adapter needs for one provider call.
#[derive(Debug, Clone)]
pub struct DeliveryRequest<'a> {
    pub notification_type: NotificationType,
    pub to: &'a str,
    pub message: RenderedMessage,
    pub branding: Option<&'a TenantBranding>,
    pub inline: Vec<InlineArtifact>,
    pub attachments: Vec<StandaloneArtifact>,
}

impl<'a> DeliveryRequest<'a> {
    pub fn new(
        notification_type: NotificationType,
        to: &'a str,
        message: RenderedMessage,
        branding: Option<&'a TenantBranding>,
    ) -> Self {
        Self {
            notification_type,
            to,
            message,
            branding,
            inline: Vec::new(),
            attachments: Vec::new(),
        }
    }

    pub fn with_inline(mut self, artifact: InlineArtifact) -> Self {
        self.inline.push(artifact);
        self
    }

    pub fn with_attachment(mut self, artifact: StandaloneArtifact) -> Self {
        self.attachments.push(artifact);
        self
    }
}

/// Trimmed recipient, or `InvalidInput` when it cannot be an address.
pub fn validate_recipient(to: &str) -> NotificationResult<&str> {
    let trimmed = to.trim();
    if trimmed.is_empty() || !trimmed.contains('@') {
        return Err(NotificationError::InvalidInput(format!(
            "invalid recipient address '{}'",
            to
        )));
    }
    Ok(trimmed)
}

/// Builds envelopes and hands them to the provider. Never retries.
#[derive(Clone)]
pub struct DeliveryAdapter {
    provider: Arc<dyn EmailProvider>,
    default_sender: Sender,
}

impl DeliveryAdapter {
    pub fn new(provider: Arc<dyn EmailProvider>, default_sender: Sender) -> Self {
        Self {
            provider,
            default_sender,
        }
    }

    pub fn provider(&self) -> &Arc<dyn EmailProvider> {
        &self.provider
    }

    pub fn build_envelope(&self, request: DeliveryRequest<'_>) -> NotificationResult<Email> {
        let to = validate_recipient(request.to)?;

        let from = request
            .branding
            .and_then(TenantBranding::sender)
            .unwrap_or_else(|| self.default_sender.clone());
        let reply_to = request
            .branding
            .and_then(TenantBranding::reply_to)
            .map(str::to_string);

        for artifact in &request.inline {
            if !request.message.html.contains(&artifact.cid_reference()) {
                warn!(
                    content_id = %artifact.content_id,
                    notification_type = %request.notification_type,
                    "Inline attachment is not referenced by the email body"
                );
            }
        }

        Ok(Email {
            id: Uuid::new_v4().to_string(),
            from,
            to: vec![to.to_string()],
            reply_to,
            subject: request.message.subject,
            html: request.message.html,
            inline: request.inline,
            attachments: request.attachments,
            tag: request.notification_type.as_str().to_string(),
        })
    }

    /// Build the envelope and make exactly one provider call.
    pub async fn deliver(&self, request: DeliveryRequest<'_>) -> NotificationResult<SendResult> {
        let email = self.build_envelope(request)?;

        debug!(
            email_id = %email.id,
            provider = self.provider.name(),
            tag = %email.tag,
            attachments = email.attachment_count(),
            "Handing email to provider"
        );

        self.provider.send(&email).await
    }
}
