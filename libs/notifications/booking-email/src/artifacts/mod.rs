//! Secondary artifacts: the verification QR code and the PDF receipt.
//!
//! Generators are pure functions of their input. [`ArtifactGenerators::generate`]
//! runs them on the blocking pool side by side and turns every failure into a
//! missing artifact instead of an error.

pub mod qr;
pub mod receipt;

pub use qr::{PngQrEncoder, QrEncoder, QrOptions, DEFAULT_QR_MARGIN, DEFAULT_QR_WIDTH};
pub use receipt::{PdfReceiptComposer, ReceiptComposer, ReceiptLine, ReceiptPayload};

use crate::error::{NotificationError, NotificationResult};
use crate::models::{ArtifactKind, InlineArtifact, StandaloneArtifact};
use observability::NotificationMetrics;
use std::sync::Arc;
use tracing::{debug, warn};

pub const QR_CONTENT_TYPE: &str = "image/png";
pub const RECEIPT_CONTENT_TYPE: &str = "application/pdf";

/// Public URL the QR code points at.
pub fn verification_url(base_url: &str, booking_id: &str) -> String {
    format!(
        "{}/bookings/verify/{}",
        base_url.trim_end_matches('/'),
        urlencoding::encode(booking_id)
    )
}

/// Booking id reduced to characters safe in a content-id and a filename.
fn file_safe(booking_id: &str) -> String {
    booking_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '-' })
        .collect()
}

/// What one send would like to attach.
#[derive(Debug, Clone, Default)]
pub struct ArtifactPlan {
    pub booking_id: String,
    /// URL to encode as the inline QR code.
    pub qr_url: Option<String>,
    /// Receipt to attach as a PDF.
    pub receipt: Option<ReceiptPayload>,
}

impl ArtifactPlan {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.qr_url.is_none() && self.receipt.is_none()
    }

    pub fn planned(&self) -> Vec<ArtifactKind> {
        let mut kinds = Vec::new();
        if self.qr_url.is_some() {
            kinds.push(ArtifactKind::QrCode);
        }
        if self.receipt.is_some() {
            kinds.push(ArtifactKind::Receipt);
        }
        kinds
    }
}

/// Artifacts that made it, plus the planned ones that did not.
#[derive(Debug, Clone, Default)]
pub struct GeneratedArtifacts {
    pub qr_code: Option<InlineArtifact>,
    pub receipt: Option<StandaloneArtifact>,
    pub missing: Vec<ArtifactKind>,
}

impl GeneratedArtifacts {
    pub fn is_empty(&self) -> bool {
        self.qr_code.is_none() && self.receipt.is_none()
    }

    /// Every artifact this set carries.
    pub fn kinds(&self) -> Vec<ArtifactKind> {
        let mut kinds = Vec::new();
        if self.qr_code.is_some() {
            kinds.push(ArtifactKind::QrCode);
        }
        if self.receipt.is_some() {
            kinds.push(ArtifactKind::Receipt);
        }
        kinds
    }
}

/// The two generators, shared across sends.
#[derive(Clone)]
pub struct ArtifactGenerators {
    qr: Arc<dyn QrEncoder>,
    receipt: Arc<dyn ReceiptComposer>,
    qr_options: QrOptions,
}

impl ArtifactGenerators {
    pub fn new(qr: Arc<dyn QrEncoder>, receipt: Arc<dyn ReceiptComposer>) -> Self {
        Self {
            qr,
            receipt,
            qr_options: QrOptions::default(),
        }
    }

    /// Attempt every planned artifact. Never fails.
    pub async fn generate(&self, plan: ArtifactPlan) -> GeneratedArtifacts {
        let stem = file_safe(&plan.booking_id);

        let qr_task = plan.qr_url.map(|url| {
            let encoder = Arc::clone(&self.qr);
            let options = self.qr_options;
            tokio::task::spawn_blocking(move || encoder.encode(&url, &options))
        });
        let receipt_task = plan.receipt.map(|payload| {
            let composer = Arc::clone(&self.receipt);
            tokio::task::spawn_blocking(move || composer.compose(&payload))
        });

        let (qr_bytes, pdf_bytes) = tokio::join!(
            async {
                match qr_task {
                    Some(task) => Some(join_artifact(task).await),
                    None => None,
                }
            },
            async {
                match receipt_task {
                    Some(task) => Some(join_artifact(task).await),
                    None => None,
                }
            }
        );

        let mut generated = GeneratedArtifacts::default();

        match qr_bytes {
            Some(Ok(data)) => {
                debug!(bytes = data.len(), "QR code generated");
                generated.qr_code = Some(InlineArtifact {
                    content_id: format!("booking-qr-{}", stem),
                    filename: format!("booking-{}-qr.png", stem),
                    content_type: QR_CONTENT_TYPE.to_string(),
                    data,
                });
            }
            Some(Err(e)) => {
                warn!(error = %e, booking_id = %plan.booking_id, "QR code generation failed, sending without it");
                NotificationMetrics::record_artifact_failure(ArtifactKind::QrCode.as_str());
                generated.missing.push(ArtifactKind::QrCode);
            }
            None => {}
        }

        match pdf_bytes {
            Some(Ok(data)) => {
                debug!(bytes = data.len(), "Receipt generated");
                generated.receipt = Some(StandaloneArtifact {
                    filename: format!("receipt-{}.pdf", stem),
                    content_type: RECEIPT_CONTENT_TYPE.to_string(),
                    data,
                });
            }
            Some(Err(e)) => {
                warn!(error = %e, booking_id = %plan.booking_id, "Receipt generation failed, sending without it");
                NotificationMetrics::record_artifact_failure(ArtifactKind::Receipt.as_str());
                generated.missing.push(ArtifactKind::Receipt);
            }
            None => {}
        }

        generated
    }
}

impl Default for ArtifactGenerators {
    fn default() -> Self {
        Self::new(Arc::new(PngQrEncoder), Arc::new(PdfReceiptComposer))
    }
}

async fn join_artifact(
    task: tokio::task::JoinHandle<NotificationResult<Vec<u8>>>,
) -> NotificationResult<Vec<u8>> {
    task.await
        .map_err(|e| NotificationError::ArtifactError(format!("generator task failed: {}", e)))?
}

#[cfg(test)]
mod tests {
    use super::qr::MockQrEncoder;
    use super::receipt::MockReceiptComposer;
    use super::*;

    fn receipt() -> ReceiptPayload {
        ReceiptPayload {
            receipt_number: "BK/7".to_string(),
            issued_on: "2026-01-01".to_string(),
            company_name: "Acme".to_string(),
            contact_email: "a@acme.example".to_string(),
            brand_color: "#000000".to_string(),
            customer_name: "Ana".to_string(),
            customer_email: "ana@example.com".to_string(),
            tour_name: "Kayak".to_string(),
            tour_date: "2026-02-01".to_string(),
            guests: 2,
            currency: "USD".to_string(),
            lines: vec![],
            subtotal: 10.0,
            discount: 0.0,
            taxes: 0.0,
            total: 10.0,
        }
    }

    fn plan() -> ArtifactPlan {
        ArtifactPlan {
            booking_id: "BK/7".to_string(),
            qr_url: Some(verification_url("https://tours.example", "BK/7")),
            receipt: Some(receipt()),
        }
    }

    #[test]
    fn test_verification_url() {
        assert_eq!(
            verification_url("https://tours.example/", "BK 7/a"),
            "https://tours.example/bookings/verify/BK%207%2Fa"
        );
        assert_eq!(
            verification_url("https://tours.example", "BK-7"),
            verification_url("https://tours.example", "BK-7")
        );
    }

    #[tokio::test]
    async fn test_generates_both_artifacts() {
        let mut qr = MockQrEncoder::new();
        qr.expect_encode()
            .withf(|url, _| url.ends_with("/bookings/verify/BK%2F7"))
            .returning(|_, _| Ok(vec![1, 2, 3]));
        let mut pdf = MockReceiptComposer::new();
        pdf.expect_compose().returning(|_| Ok(b"%PDF".to_vec()));

        let generators = ArtifactGenerators::new(Arc::new(qr), Arc::new(pdf));
        let generated = generators.generate(plan()).await;

        let qr_code = generated.qr_code.unwrap();
        assert_eq!(qr_code.content_id, "booking-qr-BK-7");
        assert_eq!(qr_code.filename, "booking-BK-7-qr.png");
        assert_eq!(generated.receipt.unwrap().filename, "receipt-BK-7.pdf");
        assert!(generated.missing.is_empty());
    }

    #[tokio::test]
    async fn test_failures_become_missing_artifacts() {
        let mut qr = MockQrEncoder::new();
        qr.expect_encode()
            .returning(|_, _| Err(NotificationError::ArtifactError("boom".to_string())));
        let mut pdf = MockReceiptComposer::new();
        pdf.expect_compose().returning(|_| Ok(b"%PDF".to_vec()));

        let generators = ArtifactGenerators::new(Arc::new(qr), Arc::new(pdf));
        let generated = generators.generate(plan()).await;

        assert!(generated.qr_code.is_none());
        assert!(generated.receipt.is_some());
        assert_eq!(generated.missing, vec![ArtifactKind::QrCode]);
    }

    #[tokio::test]
    async fn test_empty_plan_calls_nothing() {
        let generators =
            ArtifactGenerators::new(Arc::new(MockQrEncoder::new()), Arc::new(MockReceiptComposer::new()));
        let generated = generators.generate(ArtifactPlan::none()).await;
        assert!(generated.is_empty());
        assert!(generated.missing.is_empty());
    }

    #[tokio::test]
    async fn test_default_generators_produce_real_files() {
        let generated = ArtifactGenerators::default().generate(plan()).await;
        assert!(generated.qr_code.unwrap().data.starts_with(&[0x89, b'P', b'N', b'G']));
        assert!(generated.receipt.unwrap().data.starts_with(b"%PDF"));
    }
}
