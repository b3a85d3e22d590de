//! Client-side booking wizard state: one draft per wizard session,
//! incrementally filled as the customer steps through service, vehicle,
//! location, schedule and add-on selection.
//!
//! The draft itself never validates; [`BookingDraft::build_request`] checks
//! completeness once, at submission.

use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::dto::bookings::CreateBookingRequest;
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ServiceSelection {
    pub id: Uuid,
    pub provider_id: Uuid,
    pub name: String,
    pub price_cents: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AddOnSelection {
    pub id: Uuid,
    pub name: String,
    pub price_cents: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LocationSelection {
    pub address: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// Price breakdown for the current selections. Fee and tax are carried for
/// forward compatibility but are not computed anywhere yet; the total is the
/// raw subtotal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PriceQuote {
    pub subtotal_cents: i64,
    pub platform_fee_cents: i64,
    pub tax_cents: i64,
    pub total_cents: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct BookingDraft {
    pub vehicle_id: Option<Uuid>,
    pub provider_id: Option<Uuid>,
    pub service: Option<ServiceSelection>,
    pub add_ons: Vec<AddOnSelection>,
    pub date: Option<NaiveDate>,
    pub time: Option<NaiveTime>,
    pub location: Option<LocationSelection>,
    pub notes: Option<String>,
}

impl BookingDraft {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_vehicle(&mut self, vehicle_id: Uuid) {
        self.vehicle_id = Some(vehicle_id);
    }

    pub fn set_provider(&mut self, provider_id: Uuid) {
        self.provider_id = Some(provider_id);
    }

    pub fn set_service(&mut self, service: ServiceSelection) {
        self.provider_id = Some(service.provider_id);
        self.service = Some(service);
    }

    pub fn set_schedule(&mut self, date: NaiveDate, time: NaiveTime) {
        self.date = Some(date);
        self.time = Some(time);
    }

    pub fn set_location(&mut self, location: LocationSelection) {
        self.location = Some(location);
    }

    pub fn set_notes(&mut self, notes: Option<String>) {
        self.notes = notes;
    }

    /// Add the add-on if absent, remove it (by id) if present. No duplicates.
    pub fn toggle_add_on(&mut self, add_on: AddOnSelection) {
        if let Some(pos) = self.add_ons.iter().position(|a| a.id == add_on.id) {
            self.add_ons.remove(pos);
        } else {
            self.add_ons.push(add_on);
        }
    }

    /// Restore every slot to empty.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Subtotal over the current selections: service price plus add-on
    /// prices. Fee/tax stay zero until a pricing policy exists.
    pub fn quote(&self) -> PriceQuote {
        let service_cents = self.service.as_ref().map(|s| s.price_cents).unwrap_or(0);
        let add_on_cents: i64 = self.add_ons.iter().map(|a| a.price_cents).sum();
        let subtotal = service_cents + add_on_cents;
        PriceQuote {
            subtotal_cents: subtotal,
            platform_fee_cents: 0,
            tax_cents: 0,
            total_cents: subtotal,
        }
    }

    /// Consume the draft into a creation request, validating completeness.
    pub fn build_request(&self) -> AppResult<CreateBookingRequest> {
        let service = self
            .service
            .as_ref()
            .ok_or_else(|| AppError::Validation("no service selected".into()))?;
        let provider_id = self
            .provider_id
            .ok_or_else(|| AppError::Validation("no provider selected".into()))?;
        let vehicle_id = self
            .vehicle_id
            .ok_or_else(|| AppError::Validation("no vehicle selected".into()))?;
        let date = self
            .date
            .ok_or_else(|| AppError::Validation("no date selected".into()))?;
        let time = self
            .time
            .ok_or_else(|| AppError::Validation("no time selected".into()))?;
        let location = self
            .location
            .as_ref()
            .ok_or_else(|| AppError::Validation("no location selected".into()))?;

        let scheduled_at = Utc
            .from_utc_datetime(&date.and_time(time));

        Ok(CreateBookingRequest {
            provider_id,
            service_id: service.id,
            vehicle_id,
            scheduled_at,
            address: location.address.clone(),
            latitude: location.latitude,
            longitude: location.longitude,
            total_cents: self.quote().total_cents,
            notes: self.notes.clone(),
        })
    }
}
