use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post, put},
};
use uuid::Uuid;

use crate::{
    dto::vehicles::{CreateVehicleRequest, UpdateVehicleRequest, VehicleList},
    error::AppResult,
    middleware::auth::AuthUser,
    models::Vehicle,
    response::ApiResponse,
    services::vehicle_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_vehicles).post(create_vehicle))
        .route("/{id}", put(update_vehicle).delete(delete_vehicle))
        .route("/{id}/default", post(set_default_vehicle))
}

#[utoipa::path(get, path = "/api/vehicles", tag = "Vehicles")]
pub async fn list_vehicles(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<VehicleList>>> {
    let resp = vehicle_service::list_vehicles(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/vehicles",
    request_body = CreateVehicleRequest,
    tag = "Vehicles"
)]
pub async fn create_vehicle(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateVehicleRequest>,
) -> AppResult<Json<ApiResponse<Vehicle>>> {
    let resp = vehicle_service::create_vehicle(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/vehicles/{id}",
    request_body = UpdateVehicleRequest,
    tag = "Vehicles"
)]
pub async fn update_vehicle(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateVehicleRequest>,
) -> AppResult<Json<ApiResponse<Vehicle>>> {
    let resp = vehicle_service::update_vehicle(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(post, path = "/api/vehicles/{id}/default", tag = "Vehicles")]
pub async fn set_default_vehicle(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Vehicle>>> {
    let resp = vehicle_service::set_default(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(delete, path = "/api/vehicles/{id}", tag = "Vehicles")]
pub async fn delete_vehicle(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = vehicle_service::delete_vehicle(&state, &user, id).await?;
    Ok(Json(resp))
}
