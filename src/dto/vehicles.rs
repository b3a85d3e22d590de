use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::Vehicle;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateVehicleRequest {
    pub make: String,
    pub model: String,
    pub year: i32,
    pub color: Option<String>,
    pub license_plate: Option<String>,
    pub category: String,
    pub set_default: Option<bool>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateVehicleRequest {
    pub make: Option<String>,
    pub model: Option<String>,
    pub year: Option<i32>,
    pub color: Option<String>,
    pub license_plate: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct VehicleList {
    pub items: Vec<Vehicle>,
}
