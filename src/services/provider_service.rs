use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::Expr;
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::providers::{
        CreateProviderRequest, ProviderList, ProviderWithDistance, UpdateProviderRequest,
    },
    entity::providers::{
        ActiveModel as ProviderActive, Column as ProviderCol, Entity as Providers,
        Model as ProviderModel,
    },
    error::{AppError, AppResult},
    geo::{self, Point},
    middleware::auth::{AuthUser, ensure_provider},
    models::Provider,
    response::{ApiResponse, Meta},
    routes::params::ProviderSearchQuery,
    state::AppState,
};

pub async fn create_profile(
    state: &AppState,
    user: &AuthUser,
    payload: CreateProviderRequest,
) -> AppResult<ApiResponse<Provider>> {
    ensure_provider(user)?;

    if payload.business_name.trim().is_empty() {
        return Err(AppError::Validation("business name is required".into()));
    }
    if payload.latitude.is_some() != payload.longitude.is_some() {
        return Err(AppError::Validation(
            "latitude and longitude must be supplied together".into(),
        ));
    }

    let existing = Providers::find()
        .filter(ProviderCol::UserId.eq(user.user_id))
        .one(&state.orm)
        .await?;
    if existing.is_some() {
        return Err(AppError::BadRequest(
            "Provider profile already exists".into(),
        ));
    }

    let provider = ProviderActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user.user_id),
        business_name: Set(payload.business_name),
        description: Set(payload.description),
        service_area: Set(payload.service_area),
        latitude: Set(payload.latitude),
        longitude: Set(payload.longitude),
        service_radius_m: Set(payload.service_radius_m),
        rating: Set(0.0),
        review_count: Set(0),
        verified: Set(false),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "provider_create",
        "providers",
        Some(serde_json::json!({ "provider_id": provider.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Provider profile created",
        provider_from_entity(provider),
        None,
    ))
}

pub async fn update_profile(
    state: &AppState,
    user: &AuthUser,
    payload: UpdateProviderRequest,
) -> AppResult<ApiResponse<Provider>> {
    ensure_provider(user)?;
    let provider = find_by_user(state, user.user_id).await?;

    let latitude = payload.latitude.or(provider.latitude);
    let longitude = payload.longitude.or(provider.longitude);
    if latitude.is_some() != longitude.is_some() {
        return Err(AppError::Validation(
            "latitude and longitude must be supplied together".into(),
        ));
    }

    let mut active: ProviderActive = provider.into();
    if let Some(name) = payload.business_name {
        if name.trim().is_empty() {
            return Err(AppError::Validation("business name is required".into()));
        }
        active.business_name = Set(name);
    }
    if let Some(description) = payload.description {
        active.description = Set(Some(description));
    }
    if let Some(area) = payload.service_area {
        active.service_area = Set(Some(area));
    }
    if let Some(lat) = payload.latitude {
        active.latitude = Set(Some(lat));
    }
    if let Some(lng) = payload.longitude {
        active.longitude = Set(Some(lng));
    }
    if let Some(radius) = payload.service_radius_m {
        active.service_radius_m = Set(Some(radius));
    }
    let provider = active.update(&state.orm).await?;

    Ok(ApiResponse::success(
        "Provider profile updated",
        provider_from_entity(provider),
        None,
    ))
}

pub async fn get_provider(state: &AppState, id: Uuid) -> AppResult<ApiResponse<Provider>> {
    let provider = Providers::find_by_id(id).one(&state.orm).await?;
    match provider {
        Some(p) => Ok(ApiResponse::success("OK", provider_from_entity(p), None)),
        None => Err(AppError::NotFound),
    }
}

pub async fn my_profile(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<Provider>> {
    ensure_provider(user)?;
    let provider = find_by_user(state, user.user_id).await?;
    Ok(ApiResponse::success(
        "OK",
        provider_from_entity(provider),
        None,
    ))
}

/// List providers, optionally ranked by distance from (`lat`, `lng`) and
/// restricted to each provider's service radius.
pub async fn search(
    state: &AppState,
    query: ProviderSearchQuery,
) -> AppResult<ApiResponse<ProviderList>> {
    let (page, limit, offset) = query.pagination.normalize();

    let mut condition = Condition::all();
    if let Some(q) = query.q.as_ref().filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", q);
        condition = condition.add(
            Condition::any()
                .add(Expr::col(ProviderCol::BusinessName).ilike(pattern.clone()))
                .add(Expr::col(ProviderCol::ServiceArea).ilike(pattern)),
        );
    }
    if query.verified_only.unwrap_or(false) {
        condition = condition.add(ProviderCol::Verified.eq(true));
    }

    let providers: Vec<Provider> = Providers::find()
        .filter(condition)
        .order_by_desc(ProviderCol::Rating)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(provider_from_entity)
        .collect();

    let reference = match (query.lat, query.lng) {
        (Some(lat), Some(lng)) => Some(Point::new(lat, lng)),
        (None, None) => None,
        _ => {
            return Err(AppError::Validation(
                "lat and lng must be supplied together".into(),
            ));
        }
    };

    let items: Vec<ProviderWithDistance> = match reference {
        Some(reference) => {
            let providers = if query.within_radius.unwrap_or(false) {
                geo::filter_within_radius(providers, reference, query.radius_m)
            } else {
                providers
            };
            geo::rank_by_distance(providers, reference)
                .into_iter()
                .map(|(provider, distance)| {
                    let known = distance.is_finite();
                    ProviderWithDistance {
                        provider,
                        distance_m: known.then_some(distance),
                        distance_label: known.then(|| geo::format_distance(distance)),
                    }
                })
                .collect()
        }
        None => providers
            .into_iter()
            .map(|provider| ProviderWithDistance {
                provider,
                distance_m: None,
                distance_label: None,
            })
            .collect(),
    };

    let total = items.len() as i64;
    let items: Vec<ProviderWithDistance> = items
        .into_iter()
        .skip(offset as usize)
        .take(limit as usize)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "Providers",
        ProviderList { items },
        Some(meta),
    ))
}

async fn find_by_user(state: &AppState, user_id: Uuid) -> AppResult<ProviderModel> {
    let provider = Providers::find()
        .filter(ProviderCol::UserId.eq(user_id))
        .one(&state.orm)
        .await?;
    match provider {
        Some(p) => Ok(p),
        None => Err(AppError::NotFound),
    }
}

pub(crate) fn provider_from_entity(model: ProviderModel) -> Provider {
    Provider {
        id: model.id,
        user_id: model.user_id,
        business_name: model.business_name,
        description: model.description,
        service_area: model.service_area,
        latitude: model.latitude,
        longitude: model.longitude,
        service_radius_m: model.service_radius_m,
        rating: model.rating,
        review_count: model.review_count,
        verified: model.verified,
        created_at: model.created_at.with_timezone(&Utc),
    }
}
