use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use sqlx::FromRow;
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::bookings::{
        AvailabilityResponse, BookingList, BookingSummary, CreateBookingRequest, TimeSlot,
    },
    entity::{
        bookings::{ActiveModel as BookingActive, Entity as Bookings, Model as BookingModel},
        providers::Entity as Providers,
        services::{Column as ServiceCol, Entity as Services},
        vehicles::Entity as Vehicles,
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ROLE_PROVIDER, ensure_customer},
    models::{Booking, BookingStatus},
    response::{ApiResponse, Meta},
    routes::params::{AvailabilityQuery, BookingListQuery},
    services::{catalog_service, notification_service},
    state::AppState,
};

const MIN_ADDRESS_LEN: usize = 5;

// Placeholder slot grid; not a scheduling engine.
const FIRST_SLOT_HOUR: u32 = 9;
const LAST_SLOT_HOUR: u32 = 17;

pub async fn create_booking(
    state: &AppState,
    user: &AuthUser,
    payload: CreateBookingRequest,
) -> AppResult<ApiResponse<Booking>> {
    ensure_customer(user)?;
    validate_input(&payload)?;

    // Referenced rows must exist and agree with each other before insert.
    let provider = Providers::find_by_id(payload.provider_id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::Validation("provider does not exist".into()))?;

    let service = Services::find_by_id(payload.service_id)
        .filter(ServiceCol::Active.eq(true))
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::Validation("service does not exist or is inactive".into()))?;
    if service.provider_id != provider.id {
        return Err(AppError::Validation(
            "service does not belong to the selected provider".into(),
        ));
    }

    let vehicle = Vehicles::find_by_id(payload.vehicle_id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::Validation("vehicle does not exist".into()))?;
    if vehicle.owner_id != user.user_id {
        return Err(AppError::Forbidden);
    }

    let booking = BookingActive {
        id: Set(Uuid::new_v4()),
        customer_id: Set(user.user_id),
        provider_id: Set(provider.id),
        service_id: Set(service.id),
        vehicle_id: Set(vehicle.id),
        scheduled_at: Set(payload.scheduled_at.into()),
        address: Set(payload.address),
        latitude: Set(payload.latitude),
        longitude: Set(payload.longitude),
        status: Set(BookingStatus::Pending.as_str().into()),
        total_cents: Set(payload.total_cents),
        notes: Set(payload.notes),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    // Provider notification is fire-and-forget; the booking stands even if
    // it fails.
    if let Err(err) = notification_service::create_notification(
        &state.pool,
        provider.user_id,
        "booking_created",
        "New booking request",
        &format!("You have a new booking request for {}", service.name),
        Some(serde_json::json!({ "booking_id": booking.id })),
    )
    .await
    {
        tracing::warn!(error = %err, booking_id = %booking.id, "provider notification failed");
    }

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "booking_create",
        "bookings",
        Some(serde_json::json!({ "booking_id": booking.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Booking created",
        booking_from_entity(booking)?,
        None,
    ))
}

pub async fn get_booking(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Booking>> {
    let booking = find_for_participant(state, user, id).await?;
    Ok(ApiResponse::success("OK", booking_from_entity(booking)?, None))
}

/// Move a booking along its lifecycle. The transition table is enforced:
/// the source of truth is [`BookingStatus::can_transition_to`].
pub async fn update_status(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    new_status: BookingStatus,
) -> AppResult<ApiResponse<Booking>> {
    let booking = find_for_participant(state, user, id).await?;

    // Only the provider advances the forward path; either side may cancel.
    // Authorization comes before the transition table so an unauthorized
    // caller learns nothing about the booking's lifecycle state.
    if new_status != BookingStatus::Cancelled && user.user_id == booking.customer_id {
        return Err(AppError::Forbidden);
    }

    let current = parse_status(&booking.status)?;
    if !current.can_transition_to(new_status) {
        return Err(AppError::IllegalTransition {
            from: current,
            to: new_status,
        });
    }

    let customer_id = booking.customer_id;
    let mut active: BookingActive = booking.into();
    active.status = Set(new_status.as_str().into());
    active.updated_at = Set(Utc::now().into());
    let booking = active.update(&state.orm).await?;

    let (title, body) = status_notification(new_status);
    if let Err(err) = notification_service::create_notification(
        &state.pool,
        customer_id,
        "booking_status",
        title,
        body,
        Some(serde_json::json!({ "booking_id": booking.id, "status": new_status })),
    )
    .await
    {
        tracing::warn!(error = %err, booking_id = %booking.id, "customer notification failed");
    }

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "booking_status",
        "bookings",
        Some(serde_json::json!({ "booking_id": booking.id, "status": new_status })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Status updated",
        booking_from_entity(booking)?,
        None,
    ))
}

pub async fn cancel_booking(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Booking>> {
    update_status(state, user, id, BookingStatus::Cancelled).await
}

/// Customer-initiated hard removal of an own booking; distinct from
/// cancellation, which keeps the record.
pub async fn delete_booking(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let booking = Bookings::find_by_id(id).one(&state.orm).await?;
    let booking = match booking {
        Some(b) => b,
        None => return Err(AppError::NotFound),
    };
    if booking.customer_id != user.user_id {
        return Err(AppError::Forbidden);
    }

    let booking: BookingActive = booking.into();
    booking.delete(&state.orm).await?;

    Ok(ApiResponse::success(
        "Booking deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

#[derive(FromRow)]
struct BookingRow {
    id: Uuid,
    customer_id: Uuid,
    provider_id: Uuid,
    service_id: Uuid,
    vehicle_id: Uuid,
    scheduled_at: DateTime<Utc>,
    address: String,
    latitude: Option<f64>,
    longitude: Option<f64>,
    status: String,
    total_cents: i64,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    service_name: String,
    provider_name: String,
    customer_name: String,
    vehicle_make: String,
    vehicle_model: String,
    vehicle_year: i32,
}

pub async fn list_for_customer(
    state: &AppState,
    user: &AuthUser,
    query: BookingListQuery,
) -> AppResult<ApiResponse<BookingList>> {
    list_bookings(state, "b.customer_id", user.user_id, query).await
}

pub async fn list_for_provider(
    state: &AppState,
    user: &AuthUser,
    query: BookingListQuery,
) -> AppResult<ApiResponse<BookingList>> {
    let provider_id = catalog_service::own_provider_id(state, user).await?;
    list_bookings(state, "b.provider_id", provider_id, query).await
}

async fn list_bookings(
    state: &AppState,
    owner_column: &str,
    owner_id: Uuid,
    query: BookingListQuery,
) -> AppResult<ApiResponse<BookingList>> {
    let (page, limit, offset) = query.pagination.normalize();

    let mut sql = format!(
        r#"
        SELECT b.*, s.name AS service_name, p.business_name AS provider_name,
               u.full_name AS customer_name,
               v.make AS vehicle_make, v.model AS vehicle_model, v.year AS vehicle_year
        FROM bookings b
        JOIN services s ON s.id = b.service_id
        JOIN providers p ON p.id = b.provider_id
        JOIN users u ON u.id = b.customer_id
        JOIN vehicles v ON v.id = b.vehicle_id
        WHERE {owner_column} = $1
        "#
    );
    if query.status.is_some() {
        sql.push_str(" AND b.status = $4");
    }
    sql.push_str(" ORDER BY b.scheduled_at DESC LIMIT $2 OFFSET $3");

    let mut rows = sqlx::query_as::<_, BookingRow>(&sql)
        .bind(owner_id)
        .bind(limit)
        .bind(offset);
    if let Some(status) = query.status.as_ref() {
        rows = rows.bind(status.as_str());
    }
    let rows = rows.fetch_all(&state.pool).await?;

    let mut count_sql =
        format!("SELECT COUNT(*) FROM bookings b WHERE {owner_column} = $1");
    if query.status.is_some() {
        count_sql.push_str(" AND b.status = $2");
    }
    let mut count = sqlx::query_as::<_, (i64,)>(&count_sql).bind(owner_id);
    if let Some(status) = query.status.as_ref() {
        count = count.bind(status.as_str());
    }
    let total = count.fetch_one(&state.pool).await?.0;

    let mut items = Vec::with_capacity(rows.len());
    for row in rows {
        items.push(summary_from_row(row)?);
    }

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "Bookings",
        BookingList { items },
        Some(meta),
    ))
}

/// Bookable slots for a provider and day. Fixed hourly grid; an hour is out
/// when it is already past or the provider holds a non-cancelled booking
/// starting inside it.
pub async fn availability(
    state: &AppState,
    query: AvailabilityQuery,
) -> AppResult<ApiResponse<AvailabilityResponse>> {
    let date = query.date;
    let taken: Vec<(DateTime<Utc>,)> = sqlx::query_as(
        r#"
        SELECT scheduled_at FROM bookings
        WHERE provider_id = $1
          AND status <> 'cancelled'
          AND scheduled_at >= $2
          AND scheduled_at < $3
        "#,
    )
    .bind(query.provider_id)
    .bind(day_start(date))
    .bind(day_start(date) + Duration::days(1))
    .fetch_all(&state.pool)
    .await?;

    let slots = day_slots(date, Utc::now(), &taken.into_iter().map(|t| t.0).collect::<Vec<_>>());

    Ok(ApiResponse::success(
        "Availability",
        AvailabilityResponse {
            date,
            provider_id: query.provider_id,
            slots,
        },
        Some(Meta::empty()),
    ))
}

/// Pure slot computation, split out for testing.
pub fn day_slots(date: NaiveDate, now: DateTime<Utc>, taken: &[DateTime<Utc>]) -> Vec<TimeSlot> {
    (FIRST_SLOT_HOUR..=LAST_SLOT_HOUR)
        .map(|hour| {
            let starts_at = day_start(date) + Duration::hours(hour as i64);
            let occupied = taken
                .iter()
                .any(|t| *t >= starts_at && *t < starts_at + Duration::hours(1));
            TimeSlot {
                starts_at,
                available: starts_at > now && !occupied,
            }
        })
        .collect()
}

fn day_start(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0).expect("midnight is valid"))
}

fn validate_input(payload: &CreateBookingRequest) -> AppResult<()> {
    if payload.address.trim().len() < MIN_ADDRESS_LEN {
        return Err(AppError::Validation(format!(
            "address must be at least {MIN_ADDRESS_LEN} characters"
        )));
    }
    if payload.total_cents <= 0 {
        return Err(AppError::Validation("total price must be positive".into()));
    }
    if payload.scheduled_at < Utc::now() {
        return Err(AppError::Validation(
            "scheduled time must not be in the past".into(),
        ));
    }
    if payload.latitude.is_some() != payload.longitude.is_some() {
        return Err(AppError::Validation(
            "latitude and longitude must be supplied together".into(),
        ));
    }
    Ok(())
}

async fn find_for_participant(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<BookingModel> {
    let booking = Bookings::find_by_id(id).one(&state.orm).await?;
    let booking = match booking {
        Some(b) => b,
        None => return Err(AppError::NotFound),
    };

    if booking.customer_id == user.user_id {
        return Ok(booking);
    }
    if user.role == ROLE_PROVIDER {
        let provider_id = catalog_service::own_provider_id(state, user).await?;
        if booking.provider_id == provider_id {
            return Ok(booking);
        }
    }
    Err(AppError::Forbidden)
}

fn status_notification(status: BookingStatus) -> (&'static str, &'static str) {
    match status {
        BookingStatus::Pending => ("Booking received", "Your booking request was received"),
        BookingStatus::Confirmed => ("Booking confirmed", "Your booking has been confirmed"),
        BookingStatus::InProgress => (
            "Service started",
            "Your detailing service is now in progress",
        ),
        BookingStatus::Completed => (
            "Service completed",
            "Your detailing service has been completed",
        ),
        BookingStatus::Cancelled => ("Booking cancelled", "Your booking has been cancelled"),
    }
}

fn parse_status(value: &str) -> AppResult<BookingStatus> {
    BookingStatus::parse(value)
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("unknown booking status '{value}'")))
}

pub(crate) fn booking_from_entity(model: BookingModel) -> AppResult<Booking> {
    Ok(Booking {
        id: model.id,
        customer_id: model.customer_id,
        provider_id: model.provider_id,
        service_id: model.service_id,
        vehicle_id: model.vehicle_id,
        scheduled_at: model.scheduled_at.with_timezone(&Utc),
        address: model.address,
        latitude: model.latitude,
        longitude: model.longitude,
        status: parse_status(&model.status)?,
        total_cents: model.total_cents,
        notes: model.notes,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    })
}

fn summary_from_row(row: BookingRow) -> AppResult<BookingSummary> {
    let vehicle_label = format!("{} {} {}", row.vehicle_year, row.vehicle_make, row.vehicle_model);
    Ok(BookingSummary {
        booking: Booking {
            id: row.id,
            customer_id: row.customer_id,
            provider_id: row.provider_id,
            service_id: row.service_id,
            vehicle_id: row.vehicle_id,
            scheduled_at: row.scheduled_at,
            address: row.address,
            latitude: row.latitude,
            longitude: row.longitude,
            status: parse_status(&row.status)?,
            total_cents: row.total_cents,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        },
        service_name: row.service_name,
        provider_name: row.provider_name,
        customer_name: row.customer_name,
        vehicle_label,
    })
}
