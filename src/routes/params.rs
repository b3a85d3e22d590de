use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Deserialize, ToSchema)]
pub struct Pagination {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl Pagination {
    pub fn normalize(&self) -> (i64, i64, i64) {
        let page = self.page.unwrap_or(1).max(1);
        let per_page = self.per_page.unwrap_or(20).clamp(1, 100);
        let offset = (page - 1) * per_page;
        (page, per_page, offset)
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ProviderSearchQuery {
    #[serde(flatten)]
    pub pagination: Pagination,
    pub q: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    /// Restrict results to each provider's service radius (or `radius_m`).
    pub within_radius: Option<bool>,
    pub radius_m: Option<f64>,
    pub verified_only: Option<bool>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ServiceListQuery {
    #[serde(flatten)]
    pub pagination: Pagination,
    pub category: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct BookingListQuery {
    #[serde(flatten)]
    pub pagination: Pagination,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AvailabilityQuery {
    pub provider_id: Uuid,
    pub date: NaiveDate,
}
