//! SMTP email provider using lettre

use super::{EmailProvider, SendResult};
use crate::error::{NotificationError, NotificationResult};
use crate::models::{Email, Sender};
use async_trait::async_trait;
use core_config::SmtpSettings;
use lettre::{
    message::{
        header::{ContentType, Header, HeaderName, HeaderValue},
        Attachment, Mailbox, MultiPart, SinglePart,
    },
    transport::smtp::authentication::Credentials,
    Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::info;

/// `X-Notification-Type`, the analytics tag on SMTP mail.
#[derive(Debug, Clone)]
struct NotificationTag(String);

impl Header for NotificationTag {
    fn name() -> HeaderName {
        HeaderName::new_from_ascii_str("X-Notification-Type")
    }

    fn parse(s: &str) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        Ok(Self(s.to_string()))
    }

    fn display(&self) -> HeaderValue {
        HeaderValue::new(Self::name(), self.0.clone())
    }
}

/// SMTP email provider
pub struct SmtpProvider {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpProvider {
    /// Create a new SMTP provider
    pub fn new(settings: &SmtpSettings) -> NotificationResult<Self> {
        let credentials = match (&settings.username, &settings.password) {
            (Some(user), password) => Some(Credentials::new(
                user.clone(),
                password.clone().unwrap_or_default(),
            )),
            (None, _) => None,
        };

        let transport = if settings.use_tls {
            let creds = credentials.ok_or_else(|| {
                NotificationError::ConfigError(
                    "SMTP_USERNAME must be set when SMTP_USE_TLS is enabled".to_string(),
                )
            })?;
            AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.host)
                .map_err(|e| {
                    NotificationError::ConfigError(format!(
                        "invalid SMTP relay '{}': {}",
                        settings.host, e
                    ))
                })?
                .credentials(creds)
                .port(settings.port)
                .build()
        } else {
            // Plain connection, e.g. Mailpit in development.
            let mut builder =
                AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&settings.host)
                    .port(settings.port);
            if let Some(creds) = credentials {
                builder = builder.credentials(creds);
            }
            builder.build()
        };

        Ok(Self { transport })
    }

    fn build_message(&self, email: &Email) -> NotificationResult<Message> {
        let mut builder = Message::builder()
            .from(mailbox(&email.from)?)
            .subject(&email.subject)
            .header(NotificationTag(email.tag.clone()));

        for to in &email.to {
            builder = builder.to(Mailbox::new(None, parse_address(to)?));
        }

        if let Some(reply_to) = &email.reply_to {
            builder = builder.reply_to(Mailbox::new(None, parse_address(reply_to)?));
        }

        let body = if email.inline.is_empty() {
            Body::Single(SinglePart::html(email.html.clone()))
        } else {
            let mut related = MultiPart::related().singlepart(SinglePart::html(email.html.clone()));
            for artifact in &email.inline {
                related = related.singlepart(
                    Attachment::new_inline(artifact.content_id.clone())
                        .body(artifact.data.clone(), content_type(&artifact.content_type)?),
                );
            }
            Body::Multi(related)
        };

        let message = if email.attachments.is_empty() {
            match body {
                Body::Single(part) => builder.singlepart(part),
                Body::Multi(part) => builder.multipart(part),
            }
        } else {
            let mut mixed = match body {
                Body::Single(part) => MultiPart::mixed().singlepart(part),
                Body::Multi(part) => MultiPart::mixed().multipart(part),
            };
            for artifact in &email.attachments {
                mixed = mixed.singlepart(
                    Attachment::new(artifact.filename.clone())
                        .body(artifact.data.clone(), content_type(&artifact.content_type)?),
                );
            }
            builder.multipart(mixed)
        };

        message.map_err(|e| NotificationError::InvalidInput(format!("failed to build message: {}", e)))
    }
}

/// Message body before attachments are wrapped around it.
enum Body {
    Single(SinglePart),
    Multi(MultiPart),
}

fn parse_address(raw: &str) -> NotificationResult<Address> {
    raw.parse::<Address>()
        .map_err(|e| NotificationError::InvalidInput(format!("invalid address '{}': {}", raw, e)))
}

fn mailbox(sender: &Sender) -> NotificationResult<Mailbox> {
    Ok(Mailbox::new(sender.name.clone(), parse_address(&sender.email)?))
}

fn content_type(raw: &str) -> NotificationResult<ContentType> {
    ContentType::parse(raw)
        .map_err(|e| NotificationError::InvalidInput(format!("invalid content type '{}': {}", raw, e)))
}

#[async_trait]
impl EmailProvider for SmtpProvider {
    async fn send(&self, email: &Email) -> NotificationResult<SendResult> {
        let message = self.build_message(email)?;

        let response = self
            .transport
            .send(message)
            .await
            .map_err(|e| NotificationError::ProviderError(format!("SMTP send failed: {}", e)))?;

        // Extract message ID from response
        let message_id = response
            .message()
            .next()
            .map(|s| s.to_string())
            .unwrap_or_else(|| email.id.clone());

        info!(
            email_id = %email.id,
            to = ?email.to,
            tag = %email.tag,
            "Email sent via SMTP"
        );

        Ok(SendResult { message_id })
    }

    async fn health_check(&self) -> NotificationResult<()> {
        let reachable = self
            .transport
            .test_connection()
            .await
            .map_err(|e| NotificationError::ProviderError(format!("SMTP health check failed: {}", e)))?;
        if !reachable {
            return Err(NotificationError::ProviderError(
                "SMTP server did not accept the connection".to_string(),
            ));
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "smtp"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{InlineArtifact, StandaloneArtifact};

    fn provider() -> SmtpProvider {
        SmtpProvider::new(&SmtpSettings::default()).unwrap()
    }

    fn email() -> Email {
        Email {
            id: "e-1".to_string(),
            from: Sender::new("bookings@acme.example", Some("Acme Tours".to_string())),
            to: vec!["ana@example.com".to_string()],
            reply_to: Some("help@acme.example".to_string()),
            subject: "Booking confirmed".to_string(),
            html: r#"<img src="cid:booking-qr-BK-1">"#.to_string(),
            inline: vec![],
            attachments: vec![],
            tag: "booking-confirmation".to_string(),
        }
    }

    fn formatted(email: &Email) -> String {
        String::from_utf8_lossy(&provider().build_message(email).unwrap().formatted()).into_owned()
    }

    #[test]
    fn test_plain_html_message() {
        let raw = formatted(&email());
        assert!(raw.contains("Subject: Booking confirmed"));
        assert!(raw.contains("Reply-To: help@acme.example"));
        assert!(raw.contains("X-Notification-Type: booking-confirmation"));
        assert!(raw.contains("text/html"));
        assert!(!raw.contains("multipart/"));
    }

    #[test]
    fn test_inline_and_standalone_attachments() {
        let mut email = email();
        email.inline.push(InlineArtifact {
            content_id: "booking-qr-BK-1".to_string(),
            filename: "booking-BK-1-qr.png".to_string(),
            content_type: "image/png".to_string(),
            data: vec![0x89, b'P', b'N', b'G'],
        });
        email.attachments.push(StandaloneArtifact {
            filename: "receipt-BK-1.pdf".to_string(),
            content_type: "application/pdf".to_string(),
            data: b"%PDF-1.3".to_vec(),
        });

        let raw = formatted(&email);
        assert!(raw.contains("multipart/mixed"));
        assert!(raw.contains("multipart/related"));
        assert!(raw.contains("Content-ID: <booking-qr-BK-1>"));
        assert!(raw.contains("receipt-BK-1.pdf"));
    }

    #[test]
    fn test_invalid_recipient_is_invalid_input() {
        let mut email = email();
        email.to = vec!["not-an-address".to_string()];
        let err = provider().build_message(&email).unwrap_err();
        assert!(matches!(err, NotificationError::InvalidInput(_)));
    }
}
