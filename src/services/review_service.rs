use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::reviews::{CreateReviewRequest, ReviewList, UpdateReviewRequest},
    entity::{
        bookings::Entity as Bookings,
        providers::{ActiveModel as ProviderActive, Entity as Providers},
        reviews::{
            ActiveModel as ReviewActive, Column as ReviewCol, Entity as Reviews,
            Model as ReviewModel,
        },
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_customer},
    models::{BookingStatus, Review},
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    state::AppState,
};

pub async fn create_review(
    state: &AppState,
    user: &AuthUser,
    payload: CreateReviewRequest,
) -> AppResult<ApiResponse<Review>> {
    ensure_customer(user)?;
    validate_rating(payload.rating)?;

    let booking = Bookings::find_by_id(payload.booking_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    if booking.customer_id != user.user_id {
        return Err(AppError::Forbidden);
    }
    if booking.status != BookingStatus::Completed.as_str() {
        return Err(AppError::BadRequest(
            "Only completed bookings can be reviewed".into(),
        ));
    }

    let existing = Reviews::find()
        .filter(ReviewCol::BookingId.eq(booking.id))
        .one(&state.orm)
        .await?;
    if existing.is_some() {
        return Err(AppError::BadRequest(
            "This booking already has a review".into(),
        ));
    }

    let txn = state.orm.begin().await?;

    let review = ReviewActive {
        id: Set(Uuid::new_v4()),
        booking_id: Set(booking.id),
        customer_id: Set(user.user_id),
        // Provider is denormalized from the booking, not taken from input.
        provider_id: Set(booking.provider_id),
        rating: Set(payload.rating),
        comment: Set(payload.comment),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&txn)
    .await?;

    recompute_provider_rating(&txn, booking.provider_id).await?;

    txn.commit().await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "review_create",
        "reviews",
        Some(serde_json::json!({ "review_id": review.id, "booking_id": booking.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Review created",
        review_from_entity(review),
        None,
    ))
}

pub async fn update_review(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateReviewRequest,
) -> AppResult<ApiResponse<Review>> {
    let review = find_owned(state, user, id).await?;

    if let Some(rating) = payload.rating {
        validate_rating(rating)?;
    }

    let provider_id = review.provider_id;
    let txn = state.orm.begin().await?;

    let mut active: ReviewActive = review.into();
    if let Some(rating) = payload.rating {
        active.rating = Set(rating);
    }
    if let Some(comment) = payload.comment {
        active.comment = Set(Some(comment));
    }
    active.updated_at = Set(Utc::now().into());
    let review = active.update(&txn).await?;

    recompute_provider_rating(&txn, provider_id).await?;

    txn.commit().await?;

    Ok(ApiResponse::success(
        "Review updated",
        review_from_entity(review),
        None,
    ))
}

pub async fn delete_review(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let review = find_owned(state, user, id).await?;
    let provider_id = review.provider_id;

    let txn = state.orm.begin().await?;

    let review: ReviewActive = review.into();
    review.delete(&txn).await?;

    recompute_provider_rating(&txn, provider_id).await?;

    txn.commit().await?;

    Ok(ApiResponse::success(
        "Review deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

pub async fn list_for_provider(
    state: &AppState,
    provider_id: Uuid,
    pagination: Pagination,
) -> AppResult<ApiResponse<ReviewList>> {
    let (page, limit, offset) = pagination.normalize();

    let finder = Reviews::find()
        .filter(ReviewCol::ProviderId.eq(provider_id))
        .order_by_desc(ReviewCol::CreatedAt);

    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(review_from_entity)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "Reviews",
        ReviewList { items },
        Some(meta),
    ))
}

/// The provider's rating is always `mean(review ratings)` rounded to two
/// decimals, recomputed inside the same transaction as the review write.
async fn recompute_provider_rating<C: ConnectionTrait>(
    conn: &C,
    provider_id: Uuid,
) -> AppResult<()> {
    let ratings: Vec<f64> = Reviews::find()
        .filter(ReviewCol::ProviderId.eq(provider_id))
        .all(conn)
        .await?
        .into_iter()
        .map(|r| r.rating)
        .collect();

    let count = ratings.len() as i32;
    let rating = if ratings.is_empty() {
        0.0
    } else {
        let mean = ratings.iter().sum::<f64>() / ratings.len() as f64;
        (mean * 100.0).round() / 100.0
    };

    let provider = Providers::find_by_id(provider_id)
        .one(conn)
        .await?
        .ok_or(AppError::NotFound)?;
    let mut active: ProviderActive = provider.into();
    active.rating = Set(rating);
    active.review_count = Set(count);
    active.update(conn).await?;

    Ok(())
}

fn validate_rating(rating: f64) -> AppResult<()> {
    if !(1.0..=5.0).contains(&rating) {
        return Err(AppError::Validation("rating must be between 1 and 5".into()));
    }
    Ok(())
}

async fn find_owned(state: &AppState, user: &AuthUser, id: Uuid) -> AppResult<ReviewModel> {
    let review = Reviews::find_by_id(id).one(&state.orm).await?;
    let review = match review {
        Some(r) => r,
        None => return Err(AppError::NotFound),
    };
    if review.customer_id != user.user_id {
        return Err(AppError::Forbidden);
    }
    Ok(review)
}

pub(crate) fn review_from_entity(model: ReviewModel) -> Review {
    Review {
        id: model.id,
        booking_id: model.booking_id,
        customer_id: model.customer_id,
        provider_id: model.provider_id,
        rating: model.rating,
        comment: model.comment,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}
