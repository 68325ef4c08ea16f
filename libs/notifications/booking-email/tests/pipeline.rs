//! Integration tests for the booking notification pipeline

use booking_email::artifacts::{ArtifactGenerators, PdfReceiptComposer, PngQrEncoder, QrEncoder, QrOptions};
use booking_email::templates::{unresolved_placeholders, InMemoryTemplateStore};
use booking_email::{
    BookingConfirmationData, DegradeReason, DeliveryOutcome, NotificationError, NotificationService,
    NotificationServiceConfig, NotificationType, RecordingProvider, Sender, TenantBranding,
};
use booking_email::{EmbeddedTemplateStore, NotificationResult};
use serde_json::{json, Value};
use std::sync::Arc;

fn config() -> NotificationServiceConfig {
    NotificationServiceConfig {
        default_sender: Sender::new("bookings@platform.example", Some("Bookings".to_string())),
        admin_alert_email: Some("ops@platform.example".to_string()),
        storefront_url: "https://tours.example".to_string(),
    }
}

fn service(provider: &RecordingProvider) -> NotificationService {
    NotificationService::new(
        Arc::new(provider.clone()),
        Arc::new(EmbeddedTemplateStore),
        config(),
    )
}

fn branding() -> TenantBranding {
    TenantBranding {
        company_name: Some("Tom & Jerry's \"Tours\"".to_string()),
        logo_url: Some("https://cdn.example/logo.png".to_string()),
        primary_color: Some("#0f766e".to_string()),
        contact_email: Some("hello@tj.example".to_string()),
        phone: Some("+1 555 0100".to_string()),
        website: Some("https://tj.example".to_string()),
        admin_email: Some("owner@tj.example".to_string()),
        ..Default::default()
    }
}

fn booking() -> Value {
    json!({
        "booking_id": "BK-1001",
        "customer_name": "Ana <Souza>",
        "customer_email": "ana@example.com",
        "customer_phone": "+1 555 0199",
        "tour_name": "Tapas & Wine <Night>",
        "tour_date": "2026-07-01",
        "start_time": "18:30",
        "duration": "3 hours",
        "participants": { "adults": 2, "children": 1, "infants": 1 },
        "pricing": {
            "currency": "USD",
            "subtotal": "$240.00",
            "discount": 20,
            "taxes": "12.50",
            "total": 232.5,
            "line_items": [
                { "description": "Adult", "quantity": 2, "unit_price": 90, "amount": 180 },
                { "description": "Child", "quantity": 1, "amount": "$60.00" }
            ]
        },
        "special_requests": "One vegetarian",
        "pickup": { "address": "Hotel Sol", "time": "18:00", "latitude": 41.39, "longitude": 2.17 },
        "meeting_point": "Main square fountain"
    })
}

fn with_booking(extra: Value) -> Value {
    let mut data = booking();
    if let (Value::Object(base), Value::Object(extra)) = (&mut data, extra) {
        base.extend(extra);
    }
    data
}

/// Complete event data for every notification type.
fn complete_events() -> Vec<(NotificationType, Value)> {
    vec![
        (
            NotificationType::BookingConfirmation,
            with_booking(json!({ "manage_url": "https://tj.example/bookings/BK-1001" })),
        ),
        (
            NotificationType::PaymentConfirmation,
            json!({
                "booking_id": "BK-1001",
                "customer_name": "Ana",
                "tour_name": "Tapas & Wine <Night>",
                "tour_date": "2026-07-01",
                "amount_paid": "$232.50",
                "currency": "USD",
                "payment_method": "Visa 4242",
                "transaction_id": "txn_123",
                "paid_at": "2026-06-01 10:00",
                "remaining_balance": 0.5
            }),
        ),
        (
            NotificationType::BankTransferInstructions,
            json!({
                "booking_id": "BK-1001",
                "customer_name": "Ana",
                "tour_name": "Tapas & Wine <Night>",
                "tour_date": "2026-07-01",
                "amount_due": 232.5,
                "currency": "EUR",
                "bank": {
                    "bank_name": "First Bank",
                    "account_name": "TJ Tours SL",
                    "account_number": "000123",
                    "iban": "ES91 2100 0418 4502 0005 1332",
                    "swift_code": "CAIXESBBXXX"
                },
                "payment_reference": "BK-1001-TRF",
                "due_date": "2026-06-15"
            }),
        ),
        (
            NotificationType::TripReminder,
            with_booking(json!({
                "days_until": 2,
                "what_to_bring": ["Water", "Comfortable shoes"],
                "guide_name": "Luis",
                "guide_phone": "+34 600 000 000"
            })),
        ),
        (
            NotificationType::TripCompletion,
            json!({
                "booking_id": "BK-1001",
                "customer_name": "Ana",
                "tour_name": "Tapas & Wine <Night>",
                "tour_date": "2026-07-01",
                "review_url": "https://tj.example/review/BK-1001",
                "rebook_url": "https://tj.example/tours"
            }),
        ),
        (
            NotificationType::BookingCancellation,
            json!({
                "booking_id": "BK-1001",
                "customer_name": "Ana",
                "tour_name": "Tapas & Wine <Night>",
                "tour_date": "2026-07-01",
                "reason": "Storm warning",
                "refund_amount": "$232.50",
                "currency": "USD",
                "cancelled_by": "the operator"
            }),
        ),
        (
            NotificationType::BookingUpdate,
            with_booking(json!({
                "changes": [
                    { "field": "Date", "previous": "2026-06-30", "current": "2026-07-01" },
                    { "field": "Guests", "current": "4" }
                ],
                "note": "Moved one day because of the festival."
            })),
        ),
        (
            NotificationType::Welcome,
            json!({
                "customer_name": "Ana",
                "login_url": "https://tj.example/login",
                "browse_url": "https://tj.example/tours"
            }),
        ),
        (
            NotificationType::AdminBookingAlert,
            with_booking(json!({
                "dashboard_url": "https://admin.tj.example/bookings/BK-1001",
                "booking_source": "website"
            })),
        ),
        (
            NotificationType::AdminInvite,
            json!({
                "invitee_name": "Maria",
                "invited_by": "Tom",
                "role": "owner",
                "invite_url": "https://admin.tj.example/invite/abc",
                "expires_in_days": 7
            }),
        ),
        (
            NotificationType::AdminAccessUpdate,
            json!({
                "admin_name": "Maria",
                "role": "manager",
                "previous_role": "owner",
                "updated_by": "Tom",
                "access_revoked": false,
                "dashboard_url": "https://admin.tj.example"
            }),
        ),
    ]
}

mod rendering_tests {
    use super::*;

    #[tokio::test]
    async fn test_every_type_renders_completely() {
        let provider = RecordingProvider::new();
        let service = service(&provider);
        let branding = branding();

        for (notification_type, data) in complete_events() {
            let outcome = service
                .send_event(notification_type, Some("ana@example.com"), data, Some(&branding))
                .await
                .unwrap_or_else(|e| panic!("{} failed: {}", notification_type, e));
            assert!(outcome.is_sent(), "{} was not sent", notification_type);
        }

        let sent = provider.sent_emails().await;
        assert_eq!(sent.len(), NotificationType::ALL.len());

        for email in &sent {
            let leftovers = unresolved_placeholders(&email.html);
            assert!(leftovers.is_empty(), "{} left {:?}", email.tag, leftovers);
            assert!(email.html.contains("Tom &amp; Jerry"), "{} lost branding", email.tag);
            assert!(email.html.contains("#0f766e"));
        }
    }

    #[tokio::test]
    async fn test_subjects_are_plain_text() {
        let provider = RecordingProvider::new();
        let service = service(&provider);
        let branding = branding();

        for (notification_type, data) in complete_events() {
            service
                .send_event(notification_type, Some("ana@example.com"), data, Some(&branding))
                .await
                .unwrap();
        }

        for email in provider.sent_emails().await {
            for entity in ["&amp;", "&lt;", "&gt;", "&quot;", "&#39;", "&#x27;"] {
                assert!(
                    !email.subject.contains(entity),
                    "{} subject '{}' contains {}",
                    email.tag,
                    email.subject,
                    entity
                );
            }
        }

        let subjects: Vec<String> = provider
            .sent_emails()
            .await
            .into_iter()
            .map(|e| e.subject)
            .collect();
        assert!(subjects.contains(&"Booking confirmed: Tapas & Wine <Night> on 2026-07-01".to_string()));
        assert!(subjects.contains(&"Welcome to Tom & Jerry's \"Tours\"".to_string()));
    }

    #[tokio::test]
    async fn test_optional_sections_follow_the_data() {
        let provider = RecordingProvider::new();
        let service = service(&provider);

        let mut data = booking();
        if let Value::Object(map) = &mut data {
            map.remove("special_requests");
            map.remove("pickup");
        }
        service
            .send_event(NotificationType::TripReminder, Some("ana@example.com"), data, None)
            .await
            .unwrap();
        service
            .send_event(NotificationType::TripReminder, Some("ana@example.com"), booking(), None)
            .await
            .unwrap();

        let sent = provider.sent_emails().await;
        assert!(!sent[0].html.contains("Your requests:"));
        assert!(!sent[0].html.contains("View on map"));
        assert!(sent[1].html.contains("Your requests:</strong> One vegetarian"));
        assert!(sent[1].html.contains("41.39,2.17"));
    }

    #[tokio::test]
    async fn test_discount_rendered_as_one_deduction() {
        let provider = RecordingProvider::new();
        let service = service(&provider);

        for discount in [json!("-$100.00"), json!(-100), json!(100)] {
            let mut data = booking();
            data["pricing"]["discount"] = discount;
            service
                .send_event(NotificationType::BookingConfirmation, Some("ana@example.com"), data, None)
                .await
                .unwrap();
        }

        let sent = provider.sent_emails().await;
        assert!(sent[0].html.contains(">-$100.00<"));
        assert!(sent[1].html.contains(">-USD 100.00<"));
        assert!(sent[2].html.contains(">-USD 100.00<"));
        for email in &sent {
            assert!(!email.html.contains("--"));
        }
    }

    #[tokio::test]
    async fn test_default_branding_without_tenant() {
        let provider = RecordingProvider::new();
        let service = service(&provider);

        service
            .send_event(
                NotificationType::Welcome,
                Some("ana@example.com"),
                json!({ "customer_name": "Ana" }),
                None,
            )
            .await
            .unwrap();

        let email = &provider.sent_emails().await[0];
        assert_eq!(email.subject, "Welcome to the operator");
        assert!(email.html.contains("support@example.com"));
        assert!(email.html.contains("#1f2937"));
        assert_eq!(email.from.email, "bookings@platform.example");
        assert!(email.reply_to.is_none());
    }

    #[tokio::test]
    async fn test_custom_template_asset() {
        let provider = RecordingProvider::new();
        let store = InMemoryTemplateStore::with_defaults();
        store
            .set(NotificationType::Welcome, "<html><p>Hola {{customer_name}} from {{company_name}}</p></html>")
            .await;
        let service = NotificationService::new(Arc::new(provider.clone()), Arc::new(store), config());

        service
            .send_event(
                NotificationType::Welcome,
                Some("ana@example.com"),
                json!({ "customer_name": "Ana", "company_name": "Override Co" }),
                Some(&branding()),
            )
            .await
            .unwrap();

        let email = &provider.sent_emails().await[0];
        assert_eq!(email.html, "<html><p>Hola Ana from Override Co</p></html>");
    }
}

mod degrade_tests {
    use super::*;

    struct BrokenQr;

    impl QrEncoder for BrokenQr {
        fn encode(&self, _: &str, _: &QrOptions) -> NotificationResult<Vec<u8>> {
            Err(NotificationError::ArtifactError("encoder offline".to_string()))
        }
    }

    fn confirmation() -> BookingConfirmationData {
        serde_json::from_value(booking()).unwrap()
    }

    #[tokio::test]
    async fn test_real_artifacts_attached() {
        let provider = RecordingProvider::new();
        let service = service(&provider);

        let outcome = service
            .send_booking_confirmation("ana@example.com", &confirmation(), Some(&branding()))
            .await
            .unwrap();
        assert!(matches!(outcome, DeliveryOutcome::Delivered { .. }));

        let email = &provider.sent_emails().await[0];
        assert_eq!(email.inline.len(), 1);
        assert_eq!(email.inline[0].content_type, "image/png");
        assert!(email.html.contains(&email.inline[0].cid_reference()));
        assert_eq!(email.attachments.len(), 1);
        assert_eq!(email.attachments[0].filename, "receipt-BK-1001.pdf");
        assert!(email.attachments[0].data.starts_with(b"%PDF"));
        assert_eq!(email.from.email, "bookings@platform.example");
        assert_eq!(email.reply_to.as_deref(), Some("hello@tj.example"));
    }

    #[tokio::test]
    async fn test_qr_failure_keeps_receipt() {
        let provider = RecordingProvider::new();
        let service = service(&provider).with_artifacts(ArtifactGenerators::new(
            Arc::new(BrokenQr),
            Arc::new(PdfReceiptComposer),
        ));

        let outcome = service
            .send_booking_confirmation("ana@example.com", &confirmation(), None)
            .await
            .unwrap();

        assert!(matches!(
            outcome,
            DeliveryOutcome::Degraded {
                reason: DegradeReason::ArtifactsUnavailable,
                ..
            }
        ));
        let email = &provider.sent_emails().await[0];
        assert!(email.inline.is_empty());
        assert!(!email.html.contains("cid:"));
        assert_eq!(email.attachments.len(), 1);
    }

    #[tokio::test]
    async fn test_rejected_send_retries_plain() {
        let provider = RecordingProvider::new();
        provider.fail_next("552 message size exceeds limit").await;
        let service = service(&provider).with_artifacts(ArtifactGenerators::new(
            Arc::new(PngQrEncoder),
            Arc::new(PdfReceiptComposer),
        ));

        let outcome = service
            .send_booking_confirmation("ana@example.com", &confirmation(), None)
            .await
            .unwrap();

        assert!(matches!(
            outcome,
            DeliveryOutcome::Degraded {
                reason: DegradeReason::SendRetriedWithoutAttachments,
                ..
            }
        ));
        let attempts = provider.attempts().await;
        assert_eq!(attempts.len(), 2);
        assert!(attempts[0].has_attachments());
        assert!(!attempts[1].has_attachments());
        assert!(!attempts[1].html.contains("cid:"));
    }

    #[tokio::test]
    async fn test_provider_down_fails_after_one_retry() {
        let provider = RecordingProvider::failing("connection refused");
        let service = service(&provider);

        let err = service
            .send_booking_confirmation("ana@example.com", &confirmation(), None)
            .await
            .unwrap_err();

        assert!(err.is_provider_failure());
        assert_eq!(provider.attempts().await.len(), 2);
        assert_eq!(provider.sent_count().await, 0);
    }
}

mod admin_tests {
    use super::*;

    #[tokio::test]
    async fn test_admin_alert_without_any_recipient_is_a_no_op() {
        let provider = RecordingProvider::new();
        let service = NotificationService::new(
            Arc::new(provider.clone()),
            Arc::new(EmbeddedTemplateStore),
            NotificationServiceConfig {
                admin_alert_email: None,
                ..config()
            },
        );

        let outcome = service
            .send_event(NotificationType::AdminBookingAlert, None, booking(), None)
            .await
            .unwrap();

        assert!(matches!(outcome, DeliveryOutcome::Skipped { .. }));
        assert!(provider.attempts().await.is_empty());
    }

    #[tokio::test]
    async fn test_admin_alert_recipient_resolution() {
        let provider = RecordingProvider::new();
        let service = service(&provider);

        service
            .send_event(NotificationType::AdminBookingAlert, None, booking(), Some(&branding()))
            .await
            .unwrap();
        assert!(provider.was_sent_to("owner@tj.example").await);
        assert!(!provider.was_sent_to("ops@platform.example").await);

        provider.clear().await;
        let blank = TenantBranding {
            admin_email: Some(" ".to_string()),
            ..branding()
        };
        service
            .send_event(NotificationType::AdminBookingAlert, None, booking(), Some(&blank))
            .await
            .unwrap();
        assert_eq!(provider.sent_count().await, 1);
        assert!(provider.was_sent_to("ops@platform.example").await);
    }

    #[tokio::test]
    async fn test_blank_admin_addresses_are_a_no_op() {
        let provider = RecordingProvider::new();
        let service = NotificationService::new(
            Arc::new(provider.clone()),
            Arc::new(EmbeddedTemplateStore),
            NotificationServiceConfig {
                admin_alert_email: None,
                ..config()
            },
        );
        let branding: TenantBranding =
            serde_json::from_value(json!({ "company_name": "Acme", "admin_email": "" })).unwrap();

        let outcome = service
            .send_event(NotificationType::AdminBookingAlert, None, booking(), Some(&branding))
            .await
            .unwrap();

        assert!(matches!(outcome, DeliveryOutcome::Skipped { .. }));
        assert!(provider.attempts().await.is_empty());
    }
}
