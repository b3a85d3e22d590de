use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    dto::bookings::{
        AvailabilityResponse, BookingList, CreateBookingRequest, UpdateBookingStatusRequest,
    },
    error::AppResult,
    middleware::auth::AuthUser,
    models::Booking,
    response::ApiResponse,
    routes::params::{AvailabilityQuery, BookingListQuery},
    services::booking_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_my_bookings).post(create_booking))
        .route("/provider", get(list_provider_bookings))
        .route("/availability", get(availability))
        .route("/{id}", get(get_booking).delete(delete_booking))
        .route("/{id}/status", post(update_status))
        .route("/{id}/cancel", post(cancel_booking))
}

#[utoipa::path(
    post,
    path = "/api/bookings",
    request_body = CreateBookingRequest,
    tag = "Bookings"
)]
pub async fn create_booking(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateBookingRequest>,
) -> AppResult<Json<ApiResponse<Booking>>> {
    let resp = booking_service::create_booking(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(get, path = "/api/bookings", tag = "Bookings")]
pub async fn list_my_bookings(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<BookingListQuery>,
) -> AppResult<Json<ApiResponse<BookingList>>> {
    let resp = booking_service::list_for_customer(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(get, path = "/api/bookings/provider", tag = "Bookings")]
pub async fn list_provider_bookings(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<BookingListQuery>,
) -> AppResult<Json<ApiResponse<BookingList>>> {
    let resp = booking_service::list_for_provider(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(get, path = "/api/bookings/availability", tag = "Bookings")]
pub async fn availability(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(query): Query<AvailabilityQuery>,
) -> AppResult<Json<ApiResponse<AvailabilityResponse>>> {
    let resp = booking_service::availability(&state, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(get, path = "/api/bookings/{id}", tag = "Bookings")]
pub async fn get_booking(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Booking>>> {
    let resp = booking_service::get_booking(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/bookings/{id}/status",
    request_body = UpdateBookingStatusRequest,
    tag = "Bookings"
)]
pub async fn update_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateBookingStatusRequest>,
) -> AppResult<Json<ApiResponse<Booking>>> {
    let resp = booking_service::update_status(&state, &user, id, payload.status).await?;
    Ok(Json(resp))
}

#[utoipa::path(post, path = "/api/bookings/{id}/cancel", tag = "Bookings")]
pub async fn cancel_booking(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Booking>>> {
    let resp = booking_service::cancel_booking(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(delete, path = "/api/bookings/{id}", tag = "Bookings")]
pub async fn delete_booking(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = booking_service::delete_booking(&state, &user, id).await?;
    Ok(Json(resp))
}
