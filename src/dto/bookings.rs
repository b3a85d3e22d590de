use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{Booking, BookingStatus};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateBookingRequest {
    pub provider_id: Uuid,
    pub service_id: Uuid,
    pub vehicle_id: Uuid,
    pub scheduled_at: DateTime<Utc>,
    pub address: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub total_cents: i64,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateBookingStatusRequest {
    pub status: BookingStatus,
}

/// Booking joined with the display fields the listings need.
#[derive(Debug, Serialize, ToSchema)]
pub struct BookingSummary {
    #[serde(flatten)]
    pub booking: Booking,
    pub service_name: String,
    pub provider_name: String,
    pub customer_name: String,
    pub vehicle_label: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BookingList {
    pub items: Vec<BookingSummary>,
}

#[derive(Debug, Clone, Copy, Serialize, ToSchema)]
pub struct TimeSlot {
    pub starts_at: DateTime<Utc>,
    pub available: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AvailabilityResponse {
    pub date: NaiveDate,
    pub provider_id: Uuid,
    pub slots: Vec<TimeSlot>,
}
