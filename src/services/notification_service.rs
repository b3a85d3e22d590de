use serde_json::Value;
use uuid::Uuid;

use crate::{
    db::DbPool,
    dto::notifications::{NotificationList, UnreadCount},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::Notification,
    response::{ApiResponse, Meta},
    routes::params::Pagination,
};

/// Insert a notification record for a user. Callers on the booking path
/// treat a failure here as non-fatal and only log it.
pub async fn create_notification(
    pool: &DbPool,
    user_id: Uuid,
    kind: &str,
    title: &str,
    body: &str,
    data: Option<Value>,
) -> AppResult<Notification> {
    let notification: Notification = sqlx::query_as(
        r#"
        INSERT INTO notifications (id, user_id, kind, title, body, data)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(kind)
    .bind(title)
    .bind(body)
    .bind(data)
    .fetch_one(pool)
    .await?;

    Ok(notification)
}

pub async fn list_notifications(
    pool: &DbPool,
    user: &AuthUser,
    pagination: Pagination,
) -> AppResult<ApiResponse<NotificationList>> {
    let (page, limit, offset) = pagination.normalize();
    let items = sqlx::query_as::<_, Notification>(
        r#"
        SELECT * FROM notifications
        WHERE user_id = $1
        ORDER BY created_at DESC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(user.user_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM notifications WHERE user_id = $1")
        .bind(user.user_id)
        .fetch_one(pool)
        .await?;

    let meta = Meta::new(page, limit, total.0);
    Ok(ApiResponse::success(
        "OK",
        NotificationList { items },
        Some(meta),
    ))
}

pub async fn unread_count(pool: &DbPool, user: &AuthUser) -> AppResult<ApiResponse<UnreadCount>> {
    let count: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND read = FALSE")
            .bind(user.user_id)
            .fetch_one(pool)
            .await?;

    Ok(ApiResponse::success(
        "OK",
        UnreadCount { unread: count.0 },
        Some(Meta::empty()),
    ))
}

pub async fn mark_read(
    pool: &DbPool,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Notification>> {
    let notification: Option<Notification> = sqlx::query_as(
        r#"
        UPDATE notifications SET read = TRUE
        WHERE id = $1 AND user_id = $2
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(user.user_id)
    .fetch_optional(pool)
    .await?;

    match notification {
        Some(n) => Ok(ApiResponse::success("Marked read", n, Some(Meta::empty()))),
        None => Err(AppError::NotFound),
    }
}

pub async fn mark_all_read(
    pool: &DbPool,
    user: &AuthUser,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let result = sqlx::query("UPDATE notifications SET read = TRUE WHERE user_id = $1")
        .bind(user.user_id)
        .execute(pool)
        .await?;

    Ok(ApiResponse::success(
        "Marked all read",
        serde_json::json!({ "updated": result.rows_affected() }),
        Some(Meta::empty()),
    ))
}
