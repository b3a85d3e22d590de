use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use uuid::Uuid;

use crate::{
    dto::providers::{CreateProviderRequest, ProviderList, UpdateProviderRequest},
    dto::reviews::ReviewList,
    error::AppResult,
    middleware::auth::AuthUser,
    models::Provider,
    response::ApiResponse,
    routes::params::{Pagination, ProviderSearchQuery},
    services::{provider_service, review_service},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(search_providers).post(create_profile))
        .route("/me", get(my_profile).put(update_profile))
        .route("/{id}", get(get_provider))
        .route("/{id}/reviews", get(list_provider_reviews))
}

#[utoipa::path(get, path = "/api/providers", tag = "Providers")]
pub async fn search_providers(
    State(state): State<AppState>,
    Query(query): Query<ProviderSearchQuery>,
) -> AppResult<Json<ApiResponse<ProviderList>>> {
    let resp = provider_service::search(&state, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/providers",
    request_body = CreateProviderRequest,
    tag = "Providers"
)]
pub async fn create_profile(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateProviderRequest>,
) -> AppResult<Json<ApiResponse<Provider>>> {
    let resp = provider_service::create_profile(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(get, path = "/api/providers/me", tag = "Providers")]
pub async fn my_profile(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<Provider>>> {
    let resp = provider_service::my_profile(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/providers/me",
    request_body = UpdateProviderRequest,
    tag = "Providers"
)]
pub async fn update_profile(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<UpdateProviderRequest>,
) -> AppResult<Json<ApiResponse<Provider>>> {
    let resp = provider_service::update_profile(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(get, path = "/api/providers/{id}", tag = "Providers")]
pub async fn get_provider(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Provider>>> {
    let resp = provider_service::get_provider(&state, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(get, path = "/api/providers/{id}/reviews", tag = "Providers")]
pub async fn list_provider_reviews(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<ApiResponse<ReviewList>>> {
    let resp = review_service::list_for_provider(&state, id, pagination).await?;
    Ok(Json(resp))
}
