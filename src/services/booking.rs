//! Booking form — validation, price estimate, and submission.
//!
//! The draft lives in the browser; the server validates it, quotes it, and
//! inserts one denormalized row into `bookings` tagged with the signed-in
//! user's id.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::Date;
use tracing::info;
use uuid::Uuid;

use super::feedback::{MSG_PERMISSION_DENIED, MSG_RATE_LIMITED};
use super::validate;
use crate::supabase::{Backend, BackendError, ErrorCode};

pub const BOOKINGS_TABLE: &str = "bookings";

pub const BASE_FARE: u32 = 150;
pub const PER_EXTRA_BAG: u32 = 50;
pub const MAX_BAGS: u8 = 10;

// =============================================================================
// DRAFT
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeliveryPreference {
    #[serde(rename = "Deliver to Seat")]
    DeliverToSeat,
    #[serde(rename = "Meet at Platform")]
    MeetAtPlatform,
    #[serde(rename = "Deliver to Address")]
    DeliverToAddress,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WeightCategory {
    #[serde(rename = "0-10kg")]
    Light,
    #[serde(rename = "10-20kg")]
    Medium,
    #[serde(rename = "20kg+")]
    Heavy,
}

impl WeightCategory {
    #[must_use]
    pub fn surcharge(self) -> u32 {
        match self {
            Self::Light => 0,
            Self::Medium => 50,
            Self::Heavy => 100,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServiceTier {
    Standard,
    Express,
}

impl ServiceTier {
    /// Apply the tier multiplier (Express is 1.5x).
    #[must_use]
    pub fn apply(self, subtotal: u32) -> u32 {
        match self {
            Self::Standard => subtotal,
            Self::Express => subtotal * 3 / 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentMode {
    Cash,
    #[serde(rename = "UPI")]
    Upi,
    Card,
}

/// In-progress booking form as posted by the browser.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BookingDraft {
    pub full_name: String,
    pub phone: String,
    pub email: String,
    pub pickup_address: String,
    pub pickup_date: String,
    pub pickup_time: String,
    pub dropoff_address: String,
    pub train_number: String,
    pub train_name: String,
    pub pnr: String,
    pub travel_date: String,
    pub delivery_preference: Option<DeliveryPreference>,
    pub coach: String,
    pub seat_number: String,
    pub bag_count: Option<u8>,
    pub weight_category: Option<WeightCategory>,
    pub luggage_description: String,
    pub fragile: bool,
    pub service_tier: Option<ServiceTier>,
    pub payment_mode: Option<PaymentMode>,
    pub special_instructions: String,
    pub terms_accepted: bool,
}

impl BookingDraft {
    /// Price for the draft's current luggage and tier selection.
    #[must_use]
    pub fn quote(&self) -> Option<u32> {
        estimate_cost(self.bag_count, self.weight_category, self.service_tier)
    }

    fn seat_delivery(&self) -> bool {
        self.delivery_preference == Some(DeliveryPreference::DeliverToSeat)
    }
}

/// Price in rupees, or `None` while any input is unset.
#[must_use]
pub fn estimate_cost(bags: Option<u8>, weight: Option<WeightCategory>, tier: Option<ServiceTier>) -> Option<u32> {
    let bags = u32::from(bags.filter(|&b| b >= 1)?);
    let subtotal = BASE_FARE + (bags - 1) * PER_EXTRA_BAG + weight?.surcharge();
    Some(tier?.apply(subtotal))
}

// =============================================================================
// VALIDATION
// =============================================================================

/// Form fields in on-screen order. The first failing field takes focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingField {
    FullName,
    Phone,
    Email,
    PickupAddress,
    PickupDate,
    PickupTime,
    DropoffAddress,
    TrainNumber,
    Pnr,
    TravelDate,
    DeliveryPreference,
    Coach,
    SeatNumber,
    BagCount,
    WeightCategory,
    ServiceTier,
    PaymentMode,
    TermsAccepted,
}

pub type FieldErrors = BTreeMap<BookingField, &'static str>;

/// Check every field; an empty map means the draft can be submitted.
#[must_use]
pub fn validate(draft: &BookingDraft, today: Date) -> FieldErrors {
    let mut errors = FieldErrors::new();
    let blank = |s: &str| s.trim().is_empty();

    if blank(&draft.full_name) {
        errors.insert(BookingField::FullName, "Full name is required.");
    }
    if !validate::is_digits(&draft.phone, 10) {
        errors.insert(BookingField::Phone, "Phone number must be 10 digits.");
    }
    if validate::normalize_email(&draft.email).is_none() {
        errors.insert(BookingField::Email, "Please enter a valid email address.");
    }
    if blank(&draft.pickup_address) {
        errors.insert(BookingField::PickupAddress, "Pickup address is required.");
    }

    let pickup_date = validate::parse_date(&draft.pickup_date);
    match pickup_date {
        None => {
            errors.insert(BookingField::PickupDate, "Pickup date is required.");
        }
        Some(d) if d < today => {
            errors.insert(BookingField::PickupDate, "Pickup date cannot be in the past.");
        }
        Some(_) => {}
    }
    if validate::parse_time(&draft.pickup_time).is_none() {
        errors.insert(BookingField::PickupTime, "Pickup time must be in HH:MM format.");
    }
    if blank(&draft.dropoff_address) {
        errors.insert(BookingField::DropoffAddress, "Drop-off address is required.");
    }
    if !validate::is_digits(&draft.train_number, 5) {
        errors.insert(BookingField::TrainNumber, "Train number must be 5 digits.");
    }
    if !validate::is_digits(&draft.pnr, 10) {
        errors.insert(BookingField::Pnr, "PNR must be 10 digits.");
    }
    match validate::parse_date(&draft.travel_date) {
        None => {
            errors.insert(BookingField::TravelDate, "Travel date is required.");
        }
        Some(d) if pickup_date.is_some_and(|p| d < p) => {
            errors.insert(BookingField::TravelDate, "Travel date cannot be before the pickup date.");
        }
        Some(_) => {}
    }

    if draft.delivery_preference.is_none() {
        errors.insert(BookingField::DeliveryPreference, "Please choose a delivery preference.");
    }
    if draft.seat_delivery() {
        if blank(&draft.coach) {
            errors.insert(BookingField::Coach, "Coach is required for seat delivery.");
        }
        if blank(&draft.seat_number) {
            errors.insert(BookingField::SeatNumber, "Seat number is required for seat delivery.");
        }
    }

    if !draft.bag_count.is_some_and(|n| (1..=MAX_BAGS).contains(&n)) {
        errors.insert(BookingField::BagCount, "Number of bags must be between 1 and 10.");
    }
    if draft.weight_category.is_none() {
        errors.insert(BookingField::WeightCategory, "Please choose a weight category.");
    }
    if draft.service_tier.is_none() {
        errors.insert(BookingField::ServiceTier, "Please choose a service type.");
    }
    if draft.payment_mode.is_none() {
        errors.insert(BookingField::PaymentMode, "Please choose a payment mode.");
    }
    if !draft.terms_accepted {
        errors.insert(BookingField::TermsAccepted, "You must accept the terms and conditions.");
    }

    errors
}

/// Field that should receive focus after a failed validation.
#[must_use]
pub fn focus_field(errors: &FieldErrors) -> Option<BookingField> {
    errors.keys().next().copied()
}

// =============================================================================
// SUBMISSION
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingConfig {
    /// Status stamped on every new booking.
    pub default_status: String,
    /// How long the browser shows the success overlay before clearing the draft.
    pub success_overlay: Duration,
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self { default_status: "Pending".into(), success_overlay: Duration::from_secs(3) }
    }
}

/// Row written to `bookings`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookingRecord {
    pub user_id: Uuid,
    pub status: String,
    pub estimated_cost: u32,
    pub full_name: String,
    pub phone: String,
    pub email: String,
    pub pickup_address: String,
    pub pickup_date: String,
    pub pickup_time: String,
    pub dropoff_address: String,
    pub train_number: String,
    pub train_name: Option<String>,
    pub pnr: String,
    pub travel_date: String,
    pub delivery_preference: DeliveryPreference,
    pub coach: Option<String>,
    pub seat_number: Option<String>,
    pub bag_count: u8,
    pub weight_category: WeightCategory,
    pub luggage_description: Option<String>,
    pub fragile: bool,
    pub service_tier: ServiceTier,
    pub payment_mode: PaymentMode,
    pub special_instructions: Option<String>,
}

fn optional(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() { None } else { Some(trimmed.to_owned()) }
}

impl BookingRecord {
    /// Assemble the row from a draft that has passed validation. Returns
    /// `None` only for drafts `validate` would reject.
    fn assemble(draft: &BookingDraft, user_id: Uuid, status: &str) -> Option<Self> {
        let seat = draft.seat_delivery();
        Some(Self {
            user_id,
            status: status.to_owned(),
            estimated_cost: draft.quote()?,
            full_name: draft.full_name.trim().to_owned(),
            phone: draft.phone.trim().to_owned(),
            email: validate::normalize_email(&draft.email)?,
            pickup_address: draft.pickup_address.trim().to_owned(),
            pickup_date: validate::parse_date(&draft.pickup_date)?.to_string(),
            pickup_time: draft.pickup_time.trim().to_owned(),
            dropoff_address: draft.dropoff_address.trim().to_owned(),
            train_number: draft.train_number.trim().to_owned(),
            train_name: optional(&draft.train_name),
            pnr: draft.pnr.trim().to_owned(),
            travel_date: validate::parse_date(&draft.travel_date)?.to_string(),
            delivery_preference: draft.delivery_preference?,
            coach: optional(&draft.coach).filter(|_| seat),
            seat_number: optional(&draft.seat_number).filter(|_| seat),
            bag_count: draft.bag_count?,
            weight_category: draft.weight_category?,
            luggage_description: optional(&draft.luggage_description),
            fragile: draft.fragile,
            service_tier: draft.service_tier?,
            payment_mode: draft.payment_mode?,
            special_instructions: optional(&draft.special_instructions),
        })
    }
}

/// What the browser needs after a successful submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookingReceipt {
    pub id: Option<String>,
    pub status: String,
    pub estimated_cost: u32,
    /// Milliseconds to show the success overlay before clearing the draft.
    pub overlay_ms: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("booking has {} invalid field(s)", .0.len())]
    Invalid(FieldErrors),
    #[error("no signed-in user")]
    NotSignedIn,
    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl BookingError {
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Invalid(_) => "E_BOOKING_INVALID",
            Self::NotSignedIn => "E_NOT_SIGNED_IN",
            Self::Backend(e) => e.code.as_str(),
        }
    }

    /// Text shown in the booking form's banner.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Invalid(_) => "Please correct the highlighted fields.".into(),
            Self::NotSignedIn => "Please log in to book a pickup.".into(),
            Self::Backend(e) => match e.code {
                ErrorCode::PermissionDenied => MSG_PERMISSION_DENIED.into(),
                ErrorCode::RateLimited => MSG_RATE_LIMITED.into(),
                ErrorCode::Provider if !e.message.trim().is_empty() => e.message.clone(),
                _ => "We couldn't submit your booking. Please try again.".into(),
            },
        }
    }
}

fn row_id(row: &Value) -> Option<String> {
    match row.get("id")? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Validate, price, and insert a booking for the backend's current user.
///
/// # Errors
///
/// `Invalid` with every failing field, `NotSignedIn` when there is no
/// session, or the backend error from the session lookup or insert.
pub async fn submit_booking<B>(
    backend: &B,
    draft: &BookingDraft,
    config: &BookingConfig,
    today: Date,
) -> Result<BookingReceipt, BookingError>
where
    B: Backend + ?Sized,
{
    let errors = validate(draft, today);
    if !errors.is_empty() {
        return Err(BookingError::Invalid(errors));
    }

    let user_id = backend
        .get_session()
        .await?
        .map(|s| s.user.id)
        .ok_or(BookingError::NotSignedIn)?;

    let record = BookingRecord::assemble(draft, user_id, &config.default_status)
        .ok_or_else(|| BookingError::Invalid(validate(draft, today)))?;
    let row = serde_json::to_value(&record).map_err(BackendError::unexpected)?;
    let stored = backend.insert(BOOKINGS_TABLE, row).await?;

    let id = row_id(&stored);
    info!(%user_id, booking_id = ?id, estimated_cost = record.estimated_cost, "booking submitted");
    Ok(BookingReceipt {
        id,
        status: record.status,
        estimated_cost: record.estimated_cost,
        overlay_ms: u64::try_from(config.success_overlay.as_millis()).unwrap_or(u64::MAX),
    })
}

#[cfg(test)]
#[path = "booking_test.rs"]
mod tests;
