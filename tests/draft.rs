use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
use uuid::Uuid;

use detailing_booking_api::draft::{
    AddOnSelection, BookingDraft, LocationSelection, ServiceSelection,
};
use detailing_booking_api::error::AppError;
use detailing_booking_api::models::BookingStatus;
use detailing_booking_api::services::booking_service::day_slots;

fn full_wash(provider_id: Uuid) -> ServiceSelection {
    ServiceSelection {
        id: Uuid::new_v4(),
        provider_id,
        name: "Full Exterior Wash".into(),
        price_cents: 4999,
    }
}

fn add_on(name: &str, price_cents: i64) -> AddOnSelection {
    AddOnSelection {
        id: Uuid::new_v4(),
        name: name.into(),
        price_cents,
    }
}

fn home() -> LocationSelection {
    LocationSelection {
        address: "12 Riverside Drive".into(),
        latitude: Some(40.7),
        longitude: Some(-74.0),
    }
}

#[test]
fn quote_sums_service_and_add_ons_exactly_in_cents() {
    let mut draft = BookingDraft::new();
    draft.set_service(full_wash(Uuid::new_v4()));
    draft.toggle_add_on(add_on("Interior Vacuum", 1000));
    draft.toggle_add_on(add_on("Wax Finish", 550));

    let quote = draft.quote();
    assert_eq!(quote.subtotal_cents, 6549);
    assert_eq!(quote.platform_fee_cents, 0);
    assert_eq!(quote.tax_cents, 0);
    assert_eq!(quote.total_cents, 6549);
}

#[test]
fn quote_on_an_empty_draft_is_zero() {
    let draft = BookingDraft::new();
    assert_eq!(draft.quote().total_cents, 0);
}

#[test]
fn toggling_an_add_on_twice_leaves_the_draft_unchanged() {
    let mut draft = BookingDraft::new();
    let wax = add_on("Wax Finish", 550);
    let before = draft.clone();

    draft.toggle_add_on(wax.clone());
    assert_eq!(draft.add_ons.len(), 1);
    draft.toggle_add_on(wax);
    assert_eq!(draft, before);
}

#[test]
fn toggle_matches_on_id_not_on_price() {
    let mut draft = BookingDraft::new();
    let mut wax = add_on("Wax Finish", 550);
    draft.toggle_add_on(wax.clone());

    // Same add-on at a stale price still removes rather than duplicates.
    wax.price_cents = 600;
    draft.toggle_add_on(wax);
    assert!(draft.add_ons.is_empty());
}

#[test]
fn selecting_a_service_pins_its_provider() {
    let provider_id = Uuid::new_v4();
    let mut draft = BookingDraft::new();
    draft.set_service(full_wash(provider_id));
    assert_eq!(draft.provider_id, Some(provider_id));
}

#[test]
fn reset_restores_the_empty_draft() {
    let mut draft = BookingDraft::new();
    draft.set_vehicle(Uuid::new_v4());
    draft.set_service(full_wash(Uuid::new_v4()));
    draft.toggle_add_on(add_on("Interior Vacuum", 1000));
    draft.set_location(home());
    draft.set_notes(Some("gate code 4411".into()));

    draft.reset();
    assert_eq!(draft, BookingDraft::new());
}

#[test]
fn build_request_combines_all_selections() {
    let provider_id = Uuid::new_v4();
    let vehicle_id = Uuid::new_v4();
    let service = full_wash(provider_id);
    let service_id = service.id;

    let mut draft = BookingDraft::new();
    draft.set_vehicle(vehicle_id);
    draft.set_service(service);
    draft.toggle_add_on(add_on("Wax Finish", 550));
    draft.set_schedule(
        NaiveDate::from_ymd_opt(2026, 9, 14).unwrap(),
        NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
    );
    draft.set_location(home());
    draft.set_notes(Some("gate code 4411".into()));

    let request = draft.build_request().unwrap();
    assert_eq!(request.provider_id, provider_id);
    assert_eq!(request.service_id, service_id);
    assert_eq!(request.vehicle_id, vehicle_id);
    assert_eq!(request.total_cents, 5549);
    assert_eq!(request.address, "12 Riverside Drive");
    assert_eq!(
        request.scheduled_at,
        Utc.with_ymd_and_hms(2026, 9, 14, 10, 0, 0).unwrap()
    );
    assert_eq!(request.notes.as_deref(), Some("gate code 4411"));
}

#[test]
fn build_request_rejects_incomplete_drafts() {
    let mut draft = BookingDraft::new();
    assert!(matches!(
        draft.build_request(),
        Err(AppError::Validation(_))
    ));

    // Filling everything but the location still fails.
    draft.set_vehicle(Uuid::new_v4());
    draft.set_service(full_wash(Uuid::new_v4()));
    draft.set_schedule(
        NaiveDate::from_ymd_opt(2026, 9, 14).unwrap(),
        NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
    );
    assert!(matches!(
        draft.build_request(),
        Err(AppError::Validation(_))
    ));

    draft.set_location(home());
    assert!(draft.build_request().is_ok());
}

#[test]
fn status_transitions_follow_the_forward_path() {
    use BookingStatus::*;

    assert!(Pending.can_transition_to(Confirmed));
    assert!(Confirmed.can_transition_to(InProgress));
    assert!(InProgress.can_transition_to(Completed));

    assert!(Pending.can_transition_to(Cancelled));
    assert!(Confirmed.can_transition_to(Cancelled));
    assert!(InProgress.can_transition_to(Cancelled));
}

#[test]
fn terminal_statuses_accept_no_transition() {
    use BookingStatus::*;

    for next in [Pending, Confirmed, InProgress, Completed, Cancelled] {
        assert!(!Completed.can_transition_to(next), "completed -> {next}");
        assert!(!Cancelled.can_transition_to(next), "cancelled -> {next}");
    }
}

#[test]
fn no_skipping_or_rewinding_between_statuses() {
    use BookingStatus::*;

    assert!(!Pending.can_transition_to(InProgress));
    assert!(!Pending.can_transition_to(Completed));
    assert!(!Confirmed.can_transition_to(Pending));
    assert!(!Confirmed.can_transition_to(Completed));
    assert!(!InProgress.can_transition_to(Confirmed));
    assert!(!Pending.can_transition_to(Pending));
}

#[test]
fn status_round_trips_through_its_string_form() {
    use BookingStatus::*;

    for status in [Pending, Confirmed, InProgress, Completed, Cancelled] {
        assert_eq!(BookingStatus::parse(status.as_str()), Some(status));
    }
    assert_eq!(BookingStatus::parse("archived"), None);
}

#[test]
fn day_slots_cover_business_hours_and_mark_past_and_taken_hours() {
    let date = NaiveDate::from_ymd_opt(2026, 9, 14).unwrap();
    // Mid-morning on the day itself.
    let now = Utc.with_ymd_and_hms(2026, 9, 14, 10, 30, 0).unwrap();
    let taken = vec![Utc.with_ymd_and_hms(2026, 9, 14, 14, 0, 0).unwrap()];

    let slots = day_slots(date, now, &taken);
    assert_eq!(slots.len(), 9);
    assert_eq!(
        slots[0].starts_at,
        Utc.with_ymd_and_hms(2026, 9, 14, 9, 0, 0).unwrap()
    );
    assert_eq!(
        slots[8].starts_at,
        Utc.with_ymd_and_hms(2026, 9, 14, 17, 0, 0).unwrap()
    );

    // 9:00 and 10:00 already started, 14:00 is booked, the rest are open.
    let available: Vec<bool> = slots.iter().map(|s| s.available).collect();
    assert_eq!(
        available,
        vec![false, false, true, true, true, false, true, true, true]
    );
}

#[test]
fn day_slots_for_a_future_day_block_only_taken_hours() {
    let date = NaiveDate::from_ymd_opt(2026, 9, 14).unwrap();
    let now = Utc.with_ymd_and_hms(2026, 9, 1, 12, 0, 0).unwrap();
    // A booking at 11:15 occupies the 11:00 slot.
    let taken = vec![Utc.with_ymd_and_hms(2026, 9, 14, 11, 15, 0).unwrap()];

    let slots = day_slots(date, now, &taken);
    let blocked: Vec<_> = slots.iter().filter(|s| !s.available).collect();
    assert_eq!(blocked.len(), 1);
    assert_eq!(
        blocked[0].starts_at,
        Utc.with_ymd_and_hms(2026, 9, 14, 11, 0, 0).unwrap()
    );
}
