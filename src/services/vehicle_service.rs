use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set, SqlErr,
    TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::vehicles::{CreateVehicleRequest, UpdateVehicleRequest, VehicleList},
    entity::vehicles::{
        ActiveModel as VehicleActive, Column as VehicleCol, Entity as Vehicles,
        Model as VehicleModel,
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Vehicle, VehicleCategory},
    response::{ApiResponse, Meta},
    state::AppState,
};

pub async fn list_vehicles(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<VehicleList>> {
    let items = Vehicles::find()
        .filter(VehicleCol::OwnerId.eq(user.user_id))
        .order_by_desc(VehicleCol::IsDefault)
        .order_by_desc(VehicleCol::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(vehicle_from_entity)
        .collect();

    Ok(ApiResponse::success(
        "OK",
        VehicleList { items },
        Some(Meta::empty()),
    ))
}

pub async fn create_vehicle(
    state: &AppState,
    user: &AuthUser,
    payload: CreateVehicleRequest,
) -> AppResult<ApiResponse<Vehicle>> {
    if VehicleCategory::parse(&payload.category).is_none() {
        return Err(AppError::Validation(format!(
            "unknown vehicle category '{}'",
            payload.category
        )));
    }
    let next_year = chrono::Datelike::year(&Utc::now()) + 1;
    if payload.year < 1900 || payload.year > next_year {
        return Err(AppError::Validation("implausible vehicle year".into()));
    }

    let make_default = payload.set_default.unwrap_or(false);

    let txn = state.orm.begin().await?;

    if make_default {
        // Unset the previous default first; a partial unique index forbids
        // two defaults per owner.
        Vehicles::update_many()
            .col_expr(VehicleCol::IsDefault, Expr::value(false))
            .filter(VehicleCol::OwnerId.eq(user.user_id))
            .exec(&txn)
            .await?;
    }

    let vehicle = VehicleActive {
        id: Set(Uuid::new_v4()),
        owner_id: Set(user.user_id),
        make: Set(payload.make),
        model: Set(payload.model),
        year: Set(payload.year),
        color: Set(payload.color.unwrap_or_default()),
        license_plate: Set(payload.license_plate.unwrap_or_default()),
        category: Set(payload.category),
        is_default: Set(make_default),
        created_at: NotSet,
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "vehicle_create",
        "vehicles",
        Some(serde_json::json!({ "vehicle_id": vehicle.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Vehicle created",
        vehicle_from_entity(vehicle),
        None,
    ))
}

pub async fn update_vehicle(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateVehicleRequest,
) -> AppResult<ApiResponse<Vehicle>> {
    let vehicle = find_owned(state, user, id).await?;

    if let Some(category) = payload.category.as_deref() {
        if VehicleCategory::parse(category).is_none() {
            return Err(AppError::Validation(format!(
                "unknown vehicle category '{category}'"
            )));
        }
    }

    let mut active: VehicleActive = vehicle.into();
    if let Some(make) = payload.make {
        active.make = Set(make);
    }
    if let Some(model) = payload.model {
        active.model = Set(model);
    }
    if let Some(year) = payload.year {
        active.year = Set(year);
    }
    if let Some(color) = payload.color {
        active.color = Set(color);
    }
    if let Some(plate) = payload.license_plate {
        active.license_plate = Set(plate);
    }
    if let Some(category) = payload.category {
        active.category = Set(category);
    }
    let vehicle = active.update(&state.orm).await?;

    Ok(ApiResponse::success(
        "Vehicle updated",
        vehicle_from_entity(vehicle),
        None,
    ))
}

/// Make `id` the owner's sole default vehicle: unset every other default,
/// then set this one, in a single transaction.
pub async fn set_default(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Vehicle>> {
    let vehicle = find_owned(state, user, id).await?;

    let txn = state.orm.begin().await?;

    Vehicles::update_many()
        .col_expr(VehicleCol::IsDefault, Expr::value(false))
        .filter(VehicleCol::OwnerId.eq(user.user_id))
        .exec(&txn)
        .await?;

    let mut active: VehicleActive = vehicle.into();
    active.is_default = Set(true);
    let vehicle = active.update(&txn).await?;

    txn.commit().await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "vehicle_set_default",
        "vehicles",
        Some(serde_json::json!({ "vehicle_id": id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Default vehicle set",
        vehicle_from_entity(vehicle),
        None,
    ))
}

pub async fn delete_vehicle(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let vehicle = find_owned(state, user, id).await?;
    let vehicle: VehicleActive = vehicle.into();
    if let Err(err) = vehicle.delete(&state.orm).await {
        // Bookings keep a hard reference to their vehicle.
        if matches!(err.sql_err(), Some(SqlErr::ForeignKeyConstraintViolation(_))) {
            return Err(AppError::BadRequest(
                "Vehicle has bookings and cannot be deleted".into(),
            ));
        }
        return Err(err.into());
    }

    Ok(ApiResponse::success(
        "Vehicle deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

async fn find_owned(state: &AppState, user: &AuthUser, id: Uuid) -> AppResult<VehicleModel> {
    let vehicle = Vehicles::find_by_id(id).one(&state.orm).await?;
    let vehicle = match vehicle {
        Some(v) => v,
        None => return Err(AppError::NotFound),
    };
    if vehicle.owner_id != user.user_id {
        return Err(AppError::Forbidden);
    }
    Ok(vehicle)
}

pub(crate) fn vehicle_from_entity(model: VehicleModel) -> Vehicle {
    Vehicle {
        id: model.id,
        owner_id: model.owner_id,
        make: model.make,
        model: model.model,
        year: model.year,
        color: model.color,
        license_plate: model.license_plate,
        category: model.category,
        is_default: model.is_default,
        created_at: model.created_at.with_timezone(&Utc),
    }
}
