//! SendGrid email provider
//!
//! Sends emails via SendGrid HTTP API.

use crate::error::{NotificationError, NotificationResult};
use crate::models::Email;
use crate::provider::{EmailProvider, SendResult};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, error};

/// SendGrid API endpoint
const SENDGRID_API_URL: &str = "https://api.sendgrid.com/v3/mail/send";

/// SendGrid email provider
pub struct SendGridProvider {
    api_key: String,
    endpoint: String,
    client: Client,
}

impl SendGridProvider {
    /// Create a new SendGridProvider
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            endpoint: SENDGRID_API_URL.to_string(),
            client: Client::new(),
        }
    }

    /// Point at a different API host (sandbox or a local stub).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

/// SendGrid API request payload
#[derive(Debug, Serialize)]
struct SendGridRequest {
    personalizations: Vec<Personalization>,
    from: EmailAddress,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_to: Option<EmailAddress>,
    subject: String,
    content: Vec<Content>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    attachments: Vec<SendGridAttachment>,
    categories: Vec<String>,
}

#[derive(Debug, Serialize)]
struct Personalization {
    to: Vec<EmailAddress>,
}

#[derive(Debug, Serialize)]
struct EmailAddress {
    email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

#[derive(Debug, Serialize)]
struct Content {
    #[serde(rename = "type")]
    content_type: String,
    value: String,
}

#[derive(Debug, Serialize)]
struct SendGridAttachment {
    /// Base64-encoded payload
    content: String,
    #[serde(rename = "type")]
    content_type: String,
    filename: String,
    disposition: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    content_id: Option<String>,
}

impl SendGridRequest {
    fn from_email(email: &Email) -> Self {
        let inline = email.inline.iter().map(|a| SendGridAttachment {
            content: STANDARD.encode(&a.data),
            content_type: a.content_type.clone(),
            filename: a.filename.clone(),
            disposition: "inline",
            content_id: Some(a.content_id.clone()),
        });
        let standalone = email.attachments.iter().map(|a| SendGridAttachment {
            content: STANDARD.encode(&a.data),
            content_type: a.content_type.clone(),
            filename: a.filename.clone(),
            disposition: "attachment",
            content_id: None,
        });

        Self {
            personalizations: vec![Personalization {
                to: email
                    .to
                    .iter()
                    .map(|to| EmailAddress {
                        email: to.clone(),
                        name: None,
                    })
                    .collect(),
            }],
            from: EmailAddress {
                email: email.from.email.clone(),
                name: email.from.name.clone(),
            },
            reply_to: email.reply_to.as_ref().map(|r| EmailAddress {
                email: r.clone(),
                name: None,
            }),
            subject: email.subject.clone(),
            content: vec![Content {
                content_type: "text/html".to_string(),
                value: email.html.clone(),
            }],
            attachments: inline.chain(standalone).collect(),
            categories: vec![email.tag.clone()],
        }
    }
}

#[async_trait]
impl EmailProvider for SendGridProvider {
    async fn send(&self, email: &Email) -> NotificationResult<SendResult> {
        let request = SendGridRequest::from_email(email);

        debug!(
            to = ?email.to,
            subject = %email.subject,
            attachments = request.attachments.len(),
            "Sending email via SendGrid"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| NotificationError::ProviderError(format!("SendGrid request failed: {}", e)))?;

        let status = response.status();

        if status.is_success() {
            // SendGrid returns message ID in X-Message-Id header
            let message_id = response
                .headers()
                .get("X-Message-Id")
                .and_then(|v| v.to_str().ok())
                .unwrap_or(&email.id)
                .to_string();

            debug!(message_id = %message_id, "Email sent successfully");

            Ok(SendResult { message_id })
        } else {
            let error_body = response.text().await.unwrap_or_default();
            error!(
                status = %status,
                error = %error_body,
                "SendGrid API error"
            );

            // Map status codes to appropriate errors
            let message = match status.as_u16() {
                429 => "rate limit exceeded".to_string(),
                400 => format!("invalid request: {}", error_body),
                401 | 403 => "authentication failed".to_string(),
                _ => format!("SendGrid error ({}): {}", status, error_body),
            };
            Err(NotificationError::ProviderError(message))
        }
    }

    async fn health_check(&self) -> NotificationResult<()> {
        // Simple validation that API key is set
        if self.api_key.is_empty() {
            return Err(NotificationError::ConfigError(
                "SendGrid API key not configured".to_string(),
            ));
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "sendgrid"
    }
}
