//! Notification types, event records and delivery envelopes.

pub mod data;
pub mod envelope;

pub use data::*;
pub use envelope::*;

use crate::error::NotificationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The closed set of business events that produce an email.
///
/// The kebab-case name doubles as the template asset name and the analytics tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NotificationType {
    BookingConfirmation,
    PaymentConfirmation,
    BankTransferInstructions,
    TripReminder,
    TripCompletion,
    BookingCancellation,
    BookingUpdate,
    Welcome,
    AdminBookingAlert,
    AdminInvite,
    AdminAccessUpdate,
}

impl NotificationType {
    pub const ALL: [NotificationType; 11] = [
        Self::BookingConfirmation,
        Self::PaymentConfirmation,
        Self::BankTransferInstructions,
        Self::TripReminder,
        Self::TripCompletion,
        Self::BookingCancellation,
        Self::BookingUpdate,
        Self::Welcome,
        Self::AdminBookingAlert,
        Self::AdminInvite,
        Self::AdminAccessUpdate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BookingConfirmation => "booking-confirmation",
            Self::PaymentConfirmation => "payment-confirmation",
            Self::BankTransferInstructions => "bank-transfer-instructions",
            Self::TripReminder => "trip-reminder",
            Self::TripCompletion => "trip-completion",
            Self::BookingCancellation => "booking-cancellation",
            Self::BookingUpdate => "booking-update",
            Self::Welcome => "welcome",
            Self::AdminBookingAlert => "admin-booking-alert",
            Self::AdminInvite => "admin-invite",
            Self::AdminAccessUpdate => "admin-access-update",
        }
    }

    /// Subject line template rendered against the same context as the body.
    pub fn default_subject(&self) -> &'static str {
        match self {
            Self::BookingConfirmation => "Booking confirmed: {{tour_name}} on {{tour_date}}",
            Self::PaymentConfirmation => "Payment received for booking {{booking_id}}",
            Self::BankTransferInstructions => "Bank transfer details for booking {{booking_id}}",
            Self::TripReminder => "Reminder: {{tour_name}} is coming up on {{tour_date}}",
            Self::TripCompletion => "Thanks for touring with {{company_name}}",
            Self::BookingCancellation => "Booking {{booking_id}} has been cancelled",
            Self::BookingUpdate => "Your booking {{booking_id}} has been updated",
            Self::Welcome => "Welcome to {{company_name}}",
            Self::AdminBookingAlert => "New booking: {{tour_name}} for {{customer_name}}",
            Self::AdminInvite => "You've been invited to manage {{company_name}}",
            Self::AdminAccessUpdate => "Your {{company_name}} admin access has changed",
        }
    }
}

impl fmt::Display for NotificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationType {
    type Err = NotificationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == normalized)
            .ok_or_else(|| NotificationError::InvalidInput(format!("unknown notification type '{}'", s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notification_type_round_trips_through_str() {
        for t in NotificationType::ALL {
            assert_eq!(t.as_str().parse::<NotificationType>().unwrap(), t);
        }
    }

    #[test]
    fn test_notification_type_accepts_snake_case() {
        assert_eq!(
            "ADMIN_BOOKING_ALERT".parse::<NotificationType>().unwrap(),
            NotificationType::AdminBookingAlert
        );
    }

    #[test]
    fn test_unknown_notification_type() {
        let err = "newsletter".parse::<NotificationType>().unwrap_err();
        assert!(err.to_string().contains("newsletter"));
    }

    #[test]
    fn test_serde_uses_kebab_case() {
        let json = serde_json::to_string(&NotificationType::BankTransferInstructions).unwrap();
        assert_eq!(json, "\"bank-transfer-instructions\"");
    }
}
