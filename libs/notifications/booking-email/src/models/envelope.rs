use std::fmt;

/// Subject and body produced by one render pass. Never cached across sends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    pub subject: String,
    pub html: String,
}

/// Sender identity of an outgoing email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sender {
    pub email: String,
    pub name: Option<String>,
}

impl Sender {
    pub fn new(email: impl Into<String>, name: Option<String>) -> Self {
        Self {
            email: email.into(),
            name,
        }
    }
}

/// An attachment rendered in place, referenced from the HTML via `cid:`.
#[derive(Clone, PartialEq, Eq)]
pub struct InlineArtifact {
    pub content_id: String,
    pub filename: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

impl InlineArtifact {
    /// The `src` value the HTML body uses to embed this artifact.
    pub fn cid_reference(&self) -> String {
        format!("cid:{}", self.content_id)
    }
}

/// A downloadable attachment, not referenced from the body.
#[derive(Clone, PartialEq, Eq)]
pub struct StandaloneArtifact {
    pub filename: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

// Payload bytes are printed as a length only.
impl fmt::Debug for InlineArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InlineArtifact")
            .field("content_id", &self.content_id)
            .field("filename", &self.filename)
            .field("content_type", &self.content_type)
            .field("bytes", &self.data.len())
            .finish()
    }
}

impl fmt::Debug for StandaloneArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StandaloneArtifact")
            .field("filename", &self.filename)
            .field("content_type", &self.content_type)
            .field("bytes", &self.data.len())
            .finish()
    }
}

/// Provider-bound envelope built by the delivery adapter.
#[derive(Debug, Clone)]
pub struct Email {
    /// Unique identifier for this send attempt
    pub id: String,
    pub from: Sender,
    pub to: Vec<String>,
    pub reply_to: Option<String>,
    pub subject: String,
    pub html: String,
    pub inline: Vec<InlineArtifact>,
    pub attachments: Vec<StandaloneArtifact>,
    /// Analytics tag; always the notification type.
    pub tag: String,
}

impl Email {
    pub fn has_attachments(&self) -> bool {
        !self.inline.is_empty() || !self.attachments.is_empty()
    }

    pub fn attachment_count(&self) -> usize {
        self.inline.len() + self.attachments.len()
    }
}

/// Secondary artifacts a notification may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    QrCode,
    Receipt,
}

impl ArtifactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::QrCode => "qr_code",
            Self::Receipt => "receipt",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a delivered email is missing artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DegradeReason {
    /// One or more generators failed before the send.
    ArtifactsUnavailable,
    /// The send with attachments failed; the plain retry succeeded.
    SendRetriedWithoutAttachments,
}

/// Result of one notification operation. Failure is the `Err` side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Sent with everything that was planned.
    Delivered { message_id: String },
    /// Sent, but without some planned artifacts.
    Degraded {
        message_id: String,
        omitted: Vec<ArtifactKind>,
        reason: DegradeReason,
    },
    /// Intentionally not sent (e.g. no admin recipient configured).
    Skipped { reason: String },
}

impl DeliveryOutcome {
    /// True when an email actually left the pipeline.
    pub fn is_sent(&self) -> bool {
        !matches!(self, Self::Skipped { .. })
    }

    pub fn message_id(&self) -> Option<&str> {
        match self {
            Self::Delivered { message_id } | Self::Degraded { message_id, .. } => Some(message_id),
            Self::Skipped { .. } => None,
        }
    }

    /// Metric label for this outcome.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Delivered { .. } => "delivered",
            Self::Degraded { .. } => "degraded",
            Self::Skipped { .. } => "skipped",
        }
    }
}
