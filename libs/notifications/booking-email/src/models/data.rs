//! Per-type event records handed in by the booking flows.
//!
//! Records are immutable inputs owned by the caller. They serialize into the
//! template context; optional fields that are `None` are omitted so they never
//! mask branding values or trip a conditional block.

use super::NotificationType;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

/// A record that can be rendered as exactly one notification type.
pub trait NotificationPayload: Serialize + Send + Sync {
    const NOTIFICATION_TYPE: NotificationType;
}

fn default_currency() -> String {
    "USD".to_string()
}

/// Parse a money value that may carry currency symbols or grouping separators.
///
/// Everything except digits, `-` and `.` is discarded (`"$1,234.50"` → `1234.5`).
/// Returns `0.0` when nothing numeric remains.
pub fn parse_amount(raw: &str) -> f64 {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '-' || *c == '.')
        .collect();
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite()).unwrap_or(0.0)
}

/// Money as it arrives from upstream: a number, or a pre-formatted display string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PriceValue {
    Amount(f64),
    Display(String),
}

impl PriceValue {
    /// Numeric value of this price.
    pub fn amount(&self) -> f64 {
        match self {
            Self::Amount(value) => *value,
            Self::Display(text) => parse_amount(text),
        }
    }
}

impl From<f64> for PriceValue {
    fn from(value: f64) -> Self {
        Self::Amount(value)
    }
}

impl From<&str> for PriceValue {
    fn from(value: &str) -> Self {
        Self::Display(value.to_string())
    }
}

/// Head count per fare category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ParticipantBreakdown {
    pub adults: u32,
    pub children: u32,
    pub infants: u32,
}

impl ParticipantBreakdown {
    pub fn total(&self) -> u32 {
        self.adults
            .saturating_add(self.children)
            .saturating_add(self.infants)
    }
}

// Serialized by hand so templates can use `{{participants.total}}`.
impl Serialize for ParticipantBreakdown {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ParticipantBreakdown", 4)?;
        state.serialize_field("adults", &self.adults)?;
        state.serialize_field("children", &self.children)?;
        state.serialize_field("infants", &self.infants)?;
        state.serialize_field("total", &self.total())?;
        state.end()
    }
}

/// One priced line of a booking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_price: Option<PriceValue>,
    pub amount: PriceValue,
}

/// Price breakdown as computed upstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingBreakdown {
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtotal: Option<PriceValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount: Option<PriceValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub taxes: Option<PriceValue>,
    pub total: PriceValue,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub line_items: Vec<LineItem>,
}

/// Where the operator collects the party.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PickupLocation {
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
}

impl PickupLocation {
    /// Map link for the pickup point. Coordinates win over the street address.
    pub fn maps_url(&self) -> String {
        let query = match (self.latitude, self.longitude) {
            (Some(lat), Some(lng)) => format!("{},{}", lat, lng),
            _ => urlencoding::encode(&self.address).into_owned(),
        };
        format!("https://www.google.com/maps/search/?api=1&query={}", query)
    }
}

impl Serialize for PickupLocation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("PickupLocation", 5)?;
        state.serialize_field("address", &self.address)?;
        if let Some(time) = &self.time {
            state.serialize_field("time", time)?;
        }
        if let Some(latitude) = self.latitude {
            state.serialize_field("latitude", &latitude)?;
        }
        if let Some(longitude) = self.longitude {
            state.serialize_field("longitude", &longitude)?;
        }
        state.serialize_field("maps_url", &self.maps_url())?;
        state.end()
    }
}

/// Booking facts shared by every customer-facing booking notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingDetails {
    pub booking_id: String,
    pub customer_name: String,
    pub customer_email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_phone: Option<String>,
    pub tour_name: String,
    pub tour_date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    #[serde(default)]
    pub participants: ParticipantBreakdown,
    pub pricing: PricingBreakdown,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub special_requests: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pickup: Option<PickupLocation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meeting_point: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingConfirmationData {
    #[serde(flatten)]
    pub booking: BookingDetails,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manage_url: Option<String>,
}

impl NotificationPayload for BookingConfirmationData {
    const NOTIFICATION_TYPE: NotificationType = NotificationType::BookingConfirmation;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentConfirmationData {
    pub booking_id: String,
    pub customer_name: String,
    pub tour_name: String,
    pub tour_date: String,
    pub amount_paid: PriceValue,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remaining_balance: Option<PriceValue>,
}

impl NotificationPayload for PaymentConfirmationData {
    const NOTIFICATION_TYPE: NotificationType = NotificationType::PaymentConfirmation;
}

/// Operator bank account the customer should wire to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankAccount {
    pub bank_name: String,
    pub account_name: String,
    pub account_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iban: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub swift_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankTransferInstructionsData {
    pub booking_id: String,
    pub customer_name: String,
    pub tour_name: String,
    pub tour_date: String,
    pub amount_due: PriceValue,
    #[serde(default = "default_currency")]
    pub currency: String,
    pub bank: BankAccount,
    pub payment_reference: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
}

impl NotificationPayload for BankTransferInstructionsData {
    const NOTIFICATION_TYPE: NotificationType = NotificationType::BankTransferInstructions;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripReminderData {
    #[serde(flatten)]
    pub booking: BookingDetails,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days_until: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub what_to_bring: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guide_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guide_phone: Option<String>,
}

impl NotificationPayload for TripReminderData {
    const NOTIFICATION_TYPE: NotificationType = NotificationType::TripReminder;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripCompletionData {
    pub booking_id: String,
    pub customer_name: String,
    pub tour_name: String,
    pub tour_date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rebook_url: Option<String>,
}

impl NotificationPayload for TripCompletionData {
    const NOTIFICATION_TYPE: NotificationType = NotificationType::TripCompletion;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingCancellationData {
    pub booking_id: String,
    pub customer_name: String,
    pub tour_name: String,
    pub tour_date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refund_amount: Option<PriceValue>,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancelled_by: Option<String>,
}

impl NotificationPayload for BookingCancellationData {
    const NOTIFICATION_TYPE: NotificationType = NotificationType::BookingCancellation;
}

/// One changed field of an updated booking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingChange {
    pub field: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous: Option<String>,
    pub current: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingUpdateData {
    #[serde(flatten)]
    pub booking: BookingDetails,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub changes: Vec<BookingChange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl NotificationPayload for BookingUpdateData {
    const NOTIFICATION_TYPE: NotificationType = NotificationType::BookingUpdate;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WelcomeData {
    pub customer_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub login_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub browse_url: Option<String>,
}

impl NotificationPayload for WelcomeData {
    const NOTIFICATION_TYPE: NotificationType = NotificationType::Welcome;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminBookingAlertData {
    #[serde(flatten)]
    pub booking: BookingDetails,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dashboard_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub booking_source: Option<String>,
}

impl NotificationPayload for AdminBookingAlertData {
    const NOTIFICATION_TYPE: NotificationType = NotificationType::AdminBookingAlert;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminInviteData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invitee_name: Option<String>,
    pub invited_by: String,
    pub role: String,
    pub invite_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in_days: Option<u32>,
}

impl NotificationPayload for AdminInviteData {
    const NOTIFICATION_TYPE: NotificationType = NotificationType::AdminInvite;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminAccessUpdateData {
    pub admin_name: String,
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_role: Option<String>,
    pub updated_by: String,
    #[serde(default)]
    pub access_revoked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dashboard_url: Option<String>,
}

impl NotificationPayload for AdminAccessUpdateData {
    const NOTIFICATION_TYPE: NotificationType = NotificationType::AdminAccessUpdate;
}
