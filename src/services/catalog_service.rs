use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use crate::{
    dto::catalog::{CreateServiceRequest, ServiceList, UpdateServiceRequest},
    entity::providers::{Column as ProviderCol, Entity as Providers},
    entity::services::{
        ActiveModel as ServiceActive, Column as ServiceCol, Entity as Services,
        Model as ServiceModel,
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_provider},
    models::Service,
    response::{ApiResponse, Meta},
    routes::params::ServiceListQuery,
    state::AppState,
};

/// Customer-facing listing for one provider: active services only.
pub async fn list_for_provider(
    state: &AppState,
    provider_id: Uuid,
    query: ServiceListQuery,
) -> AppResult<ApiResponse<ServiceList>> {
    let (page, limit, offset) = query.pagination.normalize();

    let mut condition = Condition::all()
        .add(ServiceCol::ProviderId.eq(provider_id))
        .add(ServiceCol::Active.eq(true));
    if let Some(category) = query.category.as_ref().filter(|s| !s.is_empty()) {
        condition = condition.add(ServiceCol::Category.eq(category.clone()));
    }

    let finder = Services::find()
        .filter(condition)
        .order_by_asc(ServiceCol::PriceCents);

    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(service_from_entity)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "Services",
        ServiceList { items },
        Some(meta),
    ))
}

pub async fn get_service(state: &AppState, id: Uuid) -> AppResult<ApiResponse<Service>> {
    let service = Services::find_by_id(id).one(&state.orm).await?;
    match service {
        Some(s) => Ok(ApiResponse::success("Service", service_from_entity(s), None)),
        None => Err(AppError::NotFound),
    }
}

pub async fn create_service(
    state: &AppState,
    user: &AuthUser,
    payload: CreateServiceRequest,
) -> AppResult<ApiResponse<Service>> {
    ensure_provider(user)?;
    let provider_id = own_provider_id(state, user).await?;

    if payload.name.trim().is_empty() {
        return Err(AppError::Validation("service name is required".into()));
    }
    if payload.price_cents <= 0 {
        return Err(AppError::Validation("price must be positive".into()));
    }

    let service = ServiceActive {
        id: Set(Uuid::new_v4()),
        provider_id: Set(provider_id),
        name: Set(payload.name),
        description: Set(payload.description),
        category: Set(payload.category.unwrap_or_else(|| "detailing".into())),
        price_cents: Set(payload.price_cents),
        duration: Set(payload.duration.unwrap_or_default()),
        active: Set(true),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    Ok(ApiResponse::success(
        "Service created",
        service_from_entity(service),
        None,
    ))
}

pub async fn update_service(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateServiceRequest,
) -> AppResult<ApiResponse<Service>> {
    ensure_provider(user)?;
    let provider_id = own_provider_id(state, user).await?;

    let service = Services::find_by_id(id).one(&state.orm).await?;
    let service = match service {
        Some(s) => s,
        None => return Err(AppError::NotFound),
    };
    if service.provider_id != provider_id {
        return Err(AppError::Forbidden);
    }

    if let Some(price) = payload.price_cents {
        if price <= 0 {
            return Err(AppError::Validation("price must be positive".into()));
        }
    }

    let mut active: ServiceActive = service.into();
    if let Some(name) = payload.name {
        active.name = Set(name);
    }
    if let Some(description) = payload.description {
        active.description = Set(Some(description));
    }
    if let Some(category) = payload.category {
        active.category = Set(category);
    }
    if let Some(price) = payload.price_cents {
        active.price_cents = Set(price);
    }
    if let Some(duration) = payload.duration {
        active.duration = Set(duration);
    }
    if let Some(active_flag) = payload.active {
        active.active = Set(active_flag);
    }
    let service = active.update(&state.orm).await?;

    Ok(ApiResponse::success(
        "Service updated",
        service_from_entity(service),
        None,
    ))
}

/// Deactivate rather than delete, so historical bookings keep their join.
pub async fn deactivate_service(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Service>> {
    update_service(
        state,
        user,
        id,
        UpdateServiceRequest {
            name: None,
            description: None,
            category: None,
            price_cents: None,
            duration: None,
            active: Some(false),
        },
    )
    .await
}

pub(crate) async fn own_provider_id(state: &AppState, user: &AuthUser) -> AppResult<Uuid> {
    let provider = Providers::find()
        .filter(ProviderCol::UserId.eq(user.user_id))
        .one(&state.orm)
        .await?;
    match provider {
        Some(p) => Ok(p.id),
        None => Err(AppError::BadRequest(
            "No provider profile for this account".into(),
        )),
    }
}

pub(crate) fn service_from_entity(model: ServiceModel) -> Service {
    Service {
        id: model.id,
        provider_id: model.provider_id,
        name: model.name,
        description: model.description,
        category: model.category,
        price_cents: model.price_cents,
        duration: model.duration,
        active: model.active,
        created_at: model.created_at.with_timezone(&Utc),
    }
}
