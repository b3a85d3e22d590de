use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::geo::{Located, Point};
use crate::models::Provider;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateProviderRequest {
    pub business_name: String,
    pub description: Option<String>,
    pub service_area: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub service_radius_m: Option<f64>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateProviderRequest {
    pub business_name: Option<String>,
    pub description: Option<String>,
    pub service_area: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub service_radius_m: Option<f64>,
}

/// Provider row enriched with the distance from the search reference point,
/// when one was supplied.
#[derive(Debug, Serialize, ToSchema)]
pub struct ProviderWithDistance {
    #[serde(flatten)]
    pub provider: Provider,
    pub distance_m: Option<f64>,
    pub distance_label: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProviderList {
    pub items: Vec<ProviderWithDistance>,
}

impl Located for Provider {
    fn coordinates(&self) -> Option<Point> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lng)) => Some(Point::new(lat, lng)),
            _ => None,
        }
    }

    fn service_radius_m(&self) -> Option<f64> {
        self.service_radius_m
    }
}
