//! Notification service: one operation per notification type.
//!
//! Every send walks the same stages:
//!
//! ```text
//! Preparing -> [ArtifactsAttempted] -> Rendering -> Sending -> Delivered
//!                                                          \-> DegradedDelivered
//!                                                          \-> Failed
//! ```
//!
//! Artifact failures never fail a send. A provider failure while artifacts
//! are attached gets exactly one retry as a plain email; if that fails too,
//! its error is returned. Other errors (bad recipient, unbuildable message)
//! are returned as they are.

use crate::artifacts::{verification_url, ArtifactGenerators, ArtifactPlan, GeneratedArtifacts, ReceiptPayload};
use crate::branding::{build_template_context, TenantBranding};
use crate::delivery::{validate_recipient, DeliveryAdapter, DeliveryRequest};
use crate::error::{NotificationError, NotificationResult};
use crate::models::*;
use crate::provider::EmailProvider;
use crate::templates::{DirectoryTemplateStore, EmbeddedTemplateStore, TemplateEngine, TemplateStore};
use core_config::EmailConfig;
use observability::NotificationMetrics;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, instrument, warn};

/// Configuration for the notification service.
#[derive(Debug, Clone)]
pub struct NotificationServiceConfig {
    /// Sender used when the tenant has no override.
    pub default_sender: Sender,
    /// Fallback recipient for admin booking alerts.
    pub admin_alert_email: Option<String>,
    /// Storefront base URL, used for booking verification links.
    pub storefront_url: String,
}

impl NotificationServiceConfig {
    pub fn from_email_config(config: &EmailConfig) -> Self {
        Self {
            default_sender: Sender::new(config.from_email.clone(), Some(config.from_name.clone())),
            admin_alert_email: config.admin_alert_email.clone(),
            storefront_url: config.storefront_url.clone(),
        }
    }
}

impl Default for NotificationServiceConfig {
    fn default() -> Self {
        Self::from_email_config(&EmailConfig::default())
    }
}

/// Where a send currently is. Logged at every transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendStage {
    Preparing,
    ArtifactsAttempted,
    Rendering,
    Sending,
    Delivered,
    DegradedDelivered,
    Failed,
}

impl fmt::Display for SendStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Preparing => "preparing",
            Self::ArtifactsAttempted => "artifacts_attempted",
            Self::Rendering => "rendering",
            Self::Sending => "sending",
            Self::Delivered => "delivered",
            Self::DegradedDelivered => "degraded_delivered",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Which shape of the email a provider call carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Attempt {
    /// Generated artifacts attached and referenced from the body.
    WithArtifacts,
    /// No attachments and no references to them.
    Plain,
}

impl Attempt {
    /// The attempt to make after this one failed, if any.
    fn fallback(self) -> Option<Attempt> {
        match self {
            Self::WithArtifacts => Some(Self::Plain),
            Self::Plain => None,
        }
    }
}

impl fmt::Display for Attempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WithArtifacts => f.write_str("with_artifacts"),
            Self::Plain => f.write_str("plain"),
        }
    }
}

/// Turns business events into delivered, branded emails.
///
/// Cheap to clone; every part is shared.
#[derive(Clone)]
pub struct NotificationService {
    config: Arc<NotificationServiceConfig>,
    templates: Arc<dyn TemplateStore>,
    engine: Arc<TemplateEngine>,
    artifacts: ArtifactGenerators,
    delivery: DeliveryAdapter,
}

impl NotificationService {
    /// Create a new notification service.
    pub fn new(
        provider: Arc<dyn EmailProvider>,
        templates: Arc<dyn TemplateStore>,
        config: NotificationServiceConfig,
    ) -> Self {
        let delivery = DeliveryAdapter::new(provider, config.default_sender.clone());
        Self {
            config: Arc::new(config),
            templates,
            engine: Arc::new(TemplateEngine::new()),
            artifacts: ArtifactGenerators::default(),
            delivery,
        }
    }

    /// Wire the service from environment-driven email configuration.
    ///
    /// `EMAIL_TEMPLATE_DIR` overrides individual assets; the rest stay embedded.
    pub fn from_config(config: &EmailConfig, provider: Arc<dyn EmailProvider>) -> Self {
        let templates: Arc<dyn TemplateStore> = match &config.template_dir {
            Some(dir) => Arc::new(DirectoryTemplateStore::new(dir).with_embedded_fallback()),
            None => Arc::new(EmbeddedTemplateStore),
        };
        Self::new(
            provider,
            templates,
            NotificationServiceConfig::from_email_config(config),
        )
    }

    /// Replace the QR and receipt generators.
    pub fn with_artifacts(mut self, artifacts: ArtifactGenerators) -> Self {
        self.artifacts = artifacts;
        self
    }

    pub fn config(&self) -> &NotificationServiceConfig {
        &self.config
    }

    pub fn provider(&self) -> &Arc<dyn EmailProvider> {
        self.delivery.provider()
    }

    /// Booking confirmation with an inline verification QR code and a PDF receipt.
    #[instrument(skip(self, data, branding), fields(booking_id = %data.booking.booking_id))]
    pub async fn send_booking_confirmation(
        &self,
        to: &str,
        data: &BookingConfirmationData,
        branding: Option<&TenantBranding>,
    ) -> NotificationResult<DeliveryOutcome> {
        let booking_id = &data.booking.booking_id;
        let plan = ArtifactPlan {
            booking_id: booking_id.clone(),
            qr_url: Some(verification_url(&self.config.storefront_url, booking_id)),
            receipt: Some(ReceiptPayload::from_booking(&data.booking, branding)),
        };
        self.dispatch(BookingConfirmationData::NOTIFICATION_TYPE, to, data, branding, plan)
            .await
    }

    #[instrument(skip(self, data, branding), fields(booking_id = %data.booking_id))]
    pub async fn send_payment_confirmation(
        &self,
        to: &str,
        data: &PaymentConfirmationData,
        branding: Option<&TenantBranding>,
    ) -> NotificationResult<DeliveryOutcome> {
        self.send(to, data, branding).await
    }

    #[instrument(skip(self, data, branding), fields(booking_id = %data.booking_id))]
    pub async fn send_bank_transfer_instructions(
        &self,
        to: &str,
        data: &BankTransferInstructionsData,
        branding: Option<&TenantBranding>,
    ) -> NotificationResult<DeliveryOutcome> {
        self.send(to, data, branding).await
    }

    #[instrument(skip(self, data, branding), fields(booking_id = %data.booking.booking_id))]
    pub async fn send_trip_reminder(
        &self,
        to: &str,
        data: &TripReminderData,
        branding: Option<&TenantBranding>,
    ) -> NotificationResult<DeliveryOutcome> {
        self.send(to, data, branding).await
    }

    #[instrument(skip(self, data, branding), fields(booking_id = %data.booking_id))]
    pub async fn send_trip_completion(
        &self,
        to: &str,
        data: &TripCompletionData,
        branding: Option<&TenantBranding>,
    ) -> NotificationResult<DeliveryOutcome> {
        self.send(to, data, branding).await
    }

    #[instrument(skip(self, data, branding), fields(booking_id = %data.booking_id))]
    pub async fn send_booking_cancellation(
        &self,
        to: &str,
        data: &BookingCancellationData,
        branding: Option<&TenantBranding>,
    ) -> NotificationResult<DeliveryOutcome> {
        self.send(to, data, branding).await
    }

    #[instrument(skip(self, data, branding), fields(booking_id = %data.booking.booking_id))]
    pub async fn send_booking_update(
        &self,
        to: &str,
        data: &BookingUpdateData,
        branding: Option<&TenantBranding>,
    ) -> NotificationResult<DeliveryOutcome> {
        self.send(to, data, branding).await
    }

    #[instrument(skip(self, data, branding))]
    pub async fn send_welcome(
        &self,
        to: &str,
        data: &WelcomeData,
        branding: Option<&TenantBranding>,
    ) -> NotificationResult<DeliveryOutcome> {
        self.send(to, data, branding).await
    }

    /// Alert the operator about a new booking.
    ///
    /// Goes to the tenant's admin address, else the configured fallback.
    /// With neither, nothing is sent and the outcome is `Skipped`.
    #[instrument(skip(self, data, branding), fields(booking_id = %data.booking.booking_id))]
    pub async fn send_admin_booking_alert(
        &self,
        data: &AdminBookingAlertData,
        branding: Option<&TenantBranding>,
    ) -> NotificationResult<DeliveryOutcome> {
        let recipient = branding
            .and_then(|b| b.admin_email.as_deref())
            .filter(|s| !s.trim().is_empty())
            .or(self
                .config
                .admin_alert_email
                .as_deref()
                .filter(|s| !s.trim().is_empty()));

        match recipient {
            Some(to) => self.send(to, data, branding).await,
            None => {
                warn!(
                    booking_id = %data.booking.booking_id,
                    "No admin alert recipient configured, skipping admin booking alert"
                );
                NotificationMetrics::record_sent(
                    AdminBookingAlertData::NOTIFICATION_TYPE.as_str(),
                    "skipped",
                );
                Ok(DeliveryOutcome::Skipped {
                    reason: "no admin alert recipient configured".to_string(),
                })
            }
        }
    }

    #[instrument(skip(self, data, branding), fields(role = %data.role))]
    pub async fn send_admin_invite(
        &self,
        to: &str,
        data: &AdminInviteData,
        branding: Option<&TenantBranding>,
    ) -> NotificationResult<DeliveryOutcome> {
        self.send(to, data, branding).await
    }

    #[instrument(skip(self, data, branding), fields(role = %data.role))]
    pub async fn send_admin_access_update(
        &self,
        to: &str,
        data: &AdminAccessUpdateData,
        branding: Option<&TenantBranding>,
    ) -> NotificationResult<DeliveryOutcome> {
        self.send(to, data, branding).await
    }

    /// Route untyped event data to the matching operation.
    ///
    /// The data must deserialize into the record for `notification_type`.
    /// `to` is ignored for admin booking alerts, which pick their own recipient.
    pub async fn send_event(
        &self,
        notification_type: NotificationType,
        to: Option<&str>,
        data: Value,
        branding: Option<&TenantBranding>,
    ) -> NotificationResult<DeliveryOutcome> {
        let recipient = || {
            to.ok_or_else(|| {
                NotificationError::InvalidInput(format!(
                    "a recipient is required for {}",
                    notification_type
                ))
            })
        };

        match notification_type {
            NotificationType::BookingConfirmation => {
                self.send_booking_confirmation(recipient()?, &parse(data)?, branding)
                    .await
            }
            NotificationType::PaymentConfirmation => {
                self.send_payment_confirmation(recipient()?, &parse(data)?, branding)
                    .await
            }
            NotificationType::BankTransferInstructions => {
                self.send_bank_transfer_instructions(recipient()?, &parse(data)?, branding)
                    .await
            }
            NotificationType::TripReminder => {
                self.send_trip_reminder(recipient()?, &parse(data)?, branding).await
            }
            NotificationType::TripCompletion => {
                self.send_trip_completion(recipient()?, &parse(data)?, branding)
                    .await
            }
            NotificationType::BookingCancellation => {
                self.send_booking_cancellation(recipient()?, &parse(data)?, branding)
                    .await
            }
            NotificationType::BookingUpdate => {
                self.send_booking_update(recipient()?, &parse(data)?, branding).await
            }
            NotificationType::Welcome => {
                self.send_welcome(recipient()?, &parse(data)?, branding).await
            }
            NotificationType::AdminBookingAlert => {
                if to.is_some() {
                    debug!("Ignoring explicit recipient for admin booking alert");
                }
                self.send_admin_booking_alert(&parse(data)?, branding).await
            }
            NotificationType::AdminInvite => {
                self.send_admin_invite(recipient()?, &parse(data)?, branding).await
            }
            NotificationType::AdminAccessUpdate => {
                self.send_admin_access_update(recipient()?, &parse(data)?, branding)
                    .await
            }
        }
    }

    /// Render subject and body without sending or generating artifacts.
    pub async fn preview(
        &self,
        notification_type: NotificationType,
        data: &Value,
        branding: Option<&TenantBranding>,
    ) -> NotificationResult<RenderedMessage> {
        let context = build_template_context(notification_type, data, branding)?;
        let source = self.templates.load(notification_type).await?;
        self.engine.render_message(notification_type, &source, &context)
    }

    async fn send<P: NotificationPayload>(
        &self,
        to: &str,
        data: &P,
        branding: Option<&TenantBranding>,
    ) -> NotificationResult<DeliveryOutcome> {
        self.dispatch(P::NOTIFICATION_TYPE, to, data, branding, ArtifactPlan::none())
            .await
    }

    /// Run one send and record its outcome.
    async fn dispatch<D: Serialize + ?Sized>(
        &self,
        notification_type: NotificationType,
        to: &str,
        data: &D,
        branding: Option<&TenantBranding>,
        plan: ArtifactPlan,
    ) -> NotificationResult<DeliveryOutcome> {
        let started = Instant::now();
        let result = self
            .run(notification_type, to, data, branding, plan)
            .await;

        let label = match &result {
            Ok(outcome) => outcome.label(),
            Err(_) => "failed",
        };
        NotificationMetrics::record_sent(notification_type.as_str(), label);
        NotificationMetrics::record_duration(
            notification_type.as_str(),
            started.elapsed().as_secs_f64(),
        );

        match &result {
            Ok(DeliveryOutcome::Degraded { omitted, reason, .. }) => info!(
                stage = %SendStage::DegradedDelivered,
                notification_type = %notification_type,
                to = %to,
                omitted = ?omitted,
                reason = ?reason,
                "Notification delivered without some attachments"
            ),
            Ok(outcome) => info!(
                stage = %SendStage::Delivered,
                notification_type = %notification_type,
                to = %to,
                message_id = outcome.message_id().unwrap_or_default(),
                "Notification delivered"
            ),
            Err(e) => error!(
                stage = %SendStage::Failed,
                notification_type = %notification_type,
                to = %to,
                error = %e,
                "Notification failed"
            ),
        }

        result
    }

    async fn run<D: Serialize + ?Sized>(
        &self,
        notification_type: NotificationType,
        to: &str,
        data: &D,
        branding: Option<&TenantBranding>,
        plan: ArtifactPlan,
    ) -> NotificationResult<DeliveryOutcome> {
        debug!(stage = %SendStage::Preparing, notification_type = %notification_type, "Building template context");
        validate_recipient(to)?;
        let context = build_template_context(notification_type, data, branding)?;
        let source = self.templates.load(notification_type).await?;

        let planned = plan.planned();
        let artifacts = if plan.is_empty() {
            GeneratedArtifacts::default()
        } else {
            let generated = self.artifacts.generate(plan).await;
            debug!(
                stage = %SendStage::ArtifactsAttempted,
                generated = ?generated.kinds(),
                missing = ?generated.missing,
                "Artifacts attempted"
            );
            generated
        };

        let mut attempt = if artifacts.is_empty() {
            Attempt::Plain
        } else {
            Attempt::WithArtifacts
        };
        let mut retried = false;

        loop {
            debug!(stage = %SendStage::Rendering, attempt = %attempt, "Rendering email");
            let message = self.render(notification_type, &source, &context, attempt, &artifacts)?;

            let mut request = DeliveryRequest::new(notification_type, to, message, branding);
            if attempt == Attempt::WithArtifacts {
                if let Some(qr) = &artifacts.qr_code {
                    request = request.with_inline(qr.clone());
                }
                if let Some(receipt) = &artifacts.receipt {
                    request = request.with_attachment(receipt.clone());
                }
            }

            debug!(stage = %SendStage::Sending, attempt = %attempt, "Sending email");
            match self.delivery.deliver(request).await {
                Ok(sent) => {
                    let omitted = match attempt {
                        Attempt::WithArtifacts => artifacts.missing.clone(),
                        Attempt::Plain => planned.clone(),
                    };
                    if omitted.is_empty() {
                        return Ok(DeliveryOutcome::Delivered {
                            message_id: sent.message_id,
                        });
                    }
                    let reason = if retried {
                        DegradeReason::SendRetriedWithoutAttachments
                    } else {
                        DegradeReason::ArtifactsUnavailable
                    };
                    return Ok(DeliveryOutcome::Degraded {
                        message_id: sent.message_id,
                        omitted,
                        reason,
                    });
                }
                Err(e) => match attempt.fallback().filter(|_| e.is_provider_failure()) {
                    Some(next) => {
                        warn!(
                            error = %e,
                            notification_type = %notification_type,
                            "Send with attachments failed, retrying without them"
                        );
                        NotificationMetrics::record_plain_retry(notification_type.as_str());
                        attempt = next;
                        retried = true;
                    }
                    None => return Err(e),
                },
            }
        }
    }

    fn render(
        &self,
        notification_type: NotificationType,
        source: &str,
        context: &Map<String, Value>,
        attempt: Attempt,
        artifacts: &GeneratedArtifacts,
    ) -> NotificationResult<RenderedMessage> {
        if attempt == Attempt::Plain {
            return self.engine.render_message(notification_type, source, context);
        }

        let mut context = context.clone();
        if let Some(qr) = &artifacts.qr_code {
            context.insert("qr_code_src".to_string(), Value::String(qr.cid_reference()));
        }
        if artifacts.receipt.is_some() {
            context.insert("has_receipt".to_string(), Value::Bool(true));
        }
        self.engine.render_message(notification_type, source, &context)
    }
}

fn parse<P: DeserializeOwned>(data: Value) -> NotificationResult<P> {
    serde_json::from_value(data)
        .map_err(|e| NotificationError::InvalidInput(format!("invalid event data: {}", e)))
}
