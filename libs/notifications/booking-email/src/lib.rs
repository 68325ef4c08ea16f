//! Transactional booking notifications.
//!
//! Turns a business event (booking created, payment captured, admin invited,
//! ...) into a delivered, tenant-branded email. Booking confirmations carry
//! a verification QR code inline and a PDF receipt; either may fail without
//! losing the email.
//!
//! ## Components
//!
//! - **Models**: `NotificationType`, per-type event records, `DeliveryOutcome`
//! - **Branding**: `TenantBranding`, `BrandingResolver`, context merge
//! - **Templates**: Handlebars `TemplateEngine` and `TemplateStore` implementations
//! - **Artifacts**: `PngQrEncoder`, `PdfReceiptComposer`
//! - **Delivery**: `DeliveryAdapter` and the `EmailProvider` implementations
//!   (SMTP, SendGrid, recording)
//! - **Service**: `NotificationService`, one operation per notification type
//!
//! ## Usage
//!
//! ```ignore
//! use booking_email::{build_provider, NotificationService};
//! use core_config::{EmailConfig, FromEnv};
//!
//! let config = EmailConfig::from_env()?;
//! let provider = build_provider(&config)?;
//! let service = NotificationService::from_config(&config, provider);
//! let outcome = service
//!     .send_booking_confirmation("ana@example.com", &data, branding.as_ref())
//!     .await?;
//! ```

pub mod artifacts;
pub mod branding;
pub mod delivery;
pub mod error;
pub mod models;
pub mod provider;
pub mod service;
pub mod templates;

pub use artifacts::{
    verification_url, ArtifactGenerators, PdfReceiptComposer, PngQrEncoder, QrEncoder, QrOptions,
    ReceiptComposer, ReceiptPayload,
};
pub use branding::{build_template_context, BrandingResolver, StaticBrandingResolver, TenantBranding};
pub use delivery::{DeliveryAdapter, DeliveryRequest};
pub use error::{NotificationError, NotificationResult};
pub use models::*;
pub use provider::{
    build_provider, EmailProvider, LazyProvider, RecordingProvider, SendGridProvider, SendResult,
    SmtpProvider,
};
pub use service::{NotificationService, NotificationServiceConfig, SendStage};
pub use templates::{
    DirectoryTemplateStore, EmbeddedTemplateStore, InMemoryTemplateStore, TemplateEngine,
    TemplateStore,
};
