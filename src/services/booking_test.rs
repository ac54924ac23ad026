use time::macros::date;

use super::*;
use crate::supabase::mock::{MockBackend, session_for, user};

const TODAY: Date = date!(2026 - 10 - 16);

fn complete_draft() -> BookingDraft {
    BookingDraft {
        full_name: "Asha Rao".into(),
        phone: "9876543210".into(),
        email: "Asha@Example.com".into(),
        pickup_address: "12 MG Road, Bengaluru".into(),
        pickup_date: "2026-10-20".into(),
        pickup_time: "09:30".into(),
        dropoff_address: "KSR Bengaluru City Junction".into(),
        train_number: "12628".into(),
        train_name: "Karnataka Express".into(),
        pnr: "4521873690".into(),
        travel_date: "2026-10-20".into(),
        delivery_preference: Some(DeliveryPreference::DeliverToSeat),
        coach: "S4".into(),
        seat_number: "32".into(),
        bag_count: Some(2),
        weight_category: Some(WeightCategory::Medium),
        luggage_description: "Blue suitcase".into(),
        fragile: true,
        service_tier: Some(ServiceTier::Standard),
        payment_mode: Some(PaymentMode::Upi),
        special_instructions: String::new(),
        terms_accepted: true,
    }
}

// =============================================================================
// estimate_cost
// =============================================================================

#[test]
fn estimate_examples() {
    assert_eq!(
        estimate_cost(Some(1), Some(WeightCategory::Light), Some(ServiceTier::Standard)),
        Some(150)
    );
    assert_eq!(
        estimate_cost(Some(3), Some(WeightCategory::Heavy), Some(ServiceTier::Express)),
        Some(525)
    );
    assert_eq!(
        estimate_cost(Some(2), Some(WeightCategory::Medium), Some(ServiceTier::Standard)),
        Some(250)
    );
}

#[test]
fn estimate_undefined_until_all_inputs_set() {
    assert_eq!(estimate_cost(None, Some(WeightCategory::Light), Some(ServiceTier::Standard)), None);
    assert_eq!(estimate_cost(Some(1), None, Some(ServiceTier::Standard)), None);
    assert_eq!(estimate_cost(Some(1), Some(WeightCategory::Light), None), None);
    assert_eq!(estimate_cost(Some(0), Some(WeightCategory::Light), Some(ServiceTier::Standard)), None);
}

#[test]
fn express_multiplier_is_exact() {
    for bags in 1..=MAX_BAGS {
        for weight in [WeightCategory::Light, WeightCategory::Medium, WeightCategory::Heavy] {
            let standard = estimate_cost(Some(bags), Some(weight), Some(ServiceTier::Standard)).unwrap();
            let express = estimate_cost(Some(bags), Some(weight), Some(ServiceTier::Express)).unwrap();
            assert_eq!(express * 2, standard * 3);
        }
    }
}

#[test]
fn wire_names_match_form_values() {
    let json = serde_json::json!({
        "delivery_preference": "Meet at Platform",
        "weight_category": "20kg+",
        "service_tier": "Express",
        "payment_mode": "UPI",
        "bag_count": 3,
    });
    let draft: BookingDraft = serde_json::from_value(json).unwrap();
    assert_eq!(draft.delivery_preference, Some(DeliveryPreference::MeetAtPlatform));
    assert_eq!(draft.payment_mode, Some(PaymentMode::Upi));
    assert_eq!(draft.quote(), Some(525));
}

// =============================================================================
// validate
// =============================================================================

#[test]
fn complete_draft_is_valid() {
    assert!(validate(&complete_draft(), TODAY).is_empty());
}

#[test]
fn empty_draft_focuses_first_field() {
    let errors = validate(&BookingDraft::default(), TODAY);
    assert_eq!(focus_field(&errors), Some(BookingField::FullName));
    assert!(errors.contains_key(&BookingField::TermsAccepted));
    // Seat fields only apply once seat delivery is chosen.
    assert!(!errors.contains_key(&BookingField::Coach));
}

#[test]
fn coach_and_seat_required_only_for_seat_delivery() {
    let mut draft = complete_draft();
    draft.coach.clear();
    draft.seat_number.clear();
    let errors = validate(&draft, TODAY);
    assert_eq!(errors.keys().copied().collect::<Vec<_>>(), vec![BookingField::Coach, BookingField::SeatNumber]);

    draft.delivery_preference = Some(DeliveryPreference::DeliverToAddress);
    assert!(validate(&draft, TODAY).is_empty());
}

#[test]
fn date_rules() {
    let mut draft = complete_draft();
    draft.pickup_date = "2026-10-15".into();
    draft.travel_date = "2026-10-15".into();
    let errors = validate(&draft, TODAY);
    assert_eq!(errors.get(&BookingField::PickupDate), Some(&"Pickup date cannot be in the past."));
    assert!(!errors.contains_key(&BookingField::TravelDate));

    let mut draft = complete_draft();
    draft.travel_date = "2026-10-19".into();
    assert_eq!(focus_field(&validate(&draft, TODAY)), Some(BookingField::TravelDate));

    let mut draft = complete_draft();
    draft.pickup_time = "9.30am".into();
    assert_eq!(focus_field(&validate(&draft, TODAY)), Some(BookingField::PickupTime));
}

#[test]
fn identifier_formats() {
    let mut draft = complete_draft();
    draft.train_number = "1262".into();
    draft.pnr = "45218736901".into();
    draft.phone = "98765 43210".into();
    let errors = validate(&draft, TODAY);
    assert!(errors.contains_key(&BookingField::TrainNumber));
    assert!(errors.contains_key(&BookingField::Pnr));
    assert_eq!(focus_field(&errors), Some(BookingField::Phone));
}

#[test]
fn bag_count_bounds() {
    let mut draft = complete_draft();
    draft.bag_count = Some(11);
    assert!(validate(&draft, TODAY).contains_key(&BookingField::BagCount));
    draft.bag_count = Some(10);
    assert!(validate(&draft, TODAY).is_empty());
}

// =============================================================================
// submit_booking
// =============================================================================

#[tokio::test]
async fn submit_inserts_one_tagged_row() {
    let u = user("asha@example.com");
    let backend = MockBackend::signed_in(session_for(u.clone()));
    let config = BookingConfig::default();

    let receipt = submit_booking(&backend, &complete_draft(), &config, TODAY).await.unwrap();
    assert_eq!(receipt.status, "Pending");
    assert_eq!(receipt.estimated_cost, 250);
    assert_eq!(receipt.overlay_ms, 3000);
    assert!(receipt.id.is_some());

    let rows = backend.rows_in(BOOKINGS_TABLE);
    assert_eq!(rows.len(), 1);
    let row = &rows[0];
    assert_eq!(row["user_id"], u.id.to_string());
    assert_eq!(row["email"], "asha@example.com");
    assert_eq!(row["pickup_date"], "2026-10-20");
    assert_eq!(row["delivery_preference"], "Deliver to Seat");
    assert_eq!(row["coach"], "S4");
    assert_eq!(row["estimated_cost"], 250);
    assert_eq!(row["special_instructions"], serde_json::Value::Null);
}

#[test]
fn assembled_row_carries_the_quote() {
    let id = Uuid::new_v4();
    let mut draft = complete_draft();
    draft.service_tier = Some(ServiceTier::Express);
    let record = BookingRecord::assemble(&draft, id, "Pending").unwrap();
    assert_eq!(Some(record.estimated_cost), draft.quote());

    // A draft without a price is one validation already rejects.
    draft.service_tier = None;
    assert!(!validate(&draft, TODAY).is_empty());
    assert!(BookingRecord::assemble(&draft, id, "Pending").is_none());
}

#[tokio::test]
async fn non_seat_delivery_drops_coach_and_seat() {
    let backend = MockBackend::signed_in(session_for(user("a@example.com")));
    let mut draft = complete_draft();
    draft.delivery_preference = Some(DeliveryPreference::MeetAtPlatform);
    let config = BookingConfig { default_status: "Confirmed".into(), ..BookingConfig::default() };

    let receipt = submit_booking(&backend, &draft, &config, TODAY).await.unwrap();
    assert_eq!(receipt.status, "Confirmed");
    let row = &backend.rows_in(BOOKINGS_TABLE)[0];
    assert_eq!(row["coach"], serde_json::Value::Null);
    assert_eq!(row["status"], "Confirmed");
}

#[tokio::test]
async fn submit_without_user_is_rejected_before_insert() {
    let backend = MockBackend::new();
    let err = submit_booking(&backend, &complete_draft(), &BookingConfig::default(), TODAY)
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::NotSignedIn));
    assert_eq!(err.error_code(), "E_NOT_SIGNED_IN");
    assert!(backend.rows_in(BOOKINGS_TABLE).is_empty());
}

#[tokio::test]
async fn invalid_draft_never_reaches_backend() {
    let backend = MockBackend::signed_in(session_for(user("a@example.com")));
    let mut draft = complete_draft();
    draft.terms_accepted = false;
    let err = submit_booking(&backend, &draft, &BookingConfig::default(), TODAY)
        .await
        .unwrap_err();
    let BookingError::Invalid(errors) = err else {
        panic!("expected Invalid");
    };
    assert_eq!(focus_field(&errors), Some(BookingField::TermsAccepted));
    assert!(backend.calls().is_empty());
}

#[tokio::test]
async fn insert_failure_is_reported() {
    let backend = MockBackend::signed_in(session_for(user("a@example.com")));
    *backend.insert_error.lock().unwrap() = Some(BackendError::new(ErrorCode::PermissionDenied, "rls"));
    let err = submit_booking(&backend, &complete_draft(), &BookingConfig::default(), TODAY)
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "E_PERMISSION_DENIED");
    assert_eq!(err.user_message(), MSG_PERMISSION_DENIED);
}
