use chrono::{DateTime, Utc};
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::Expr;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use sqlx::FromRow;
use uuid::Uuid;

use crate::{
    dto::chat::{MessageList, RoomList, RoomSummary, SendMessageRequest},
    entity::{
        bookings::Entity as Bookings,
        chat_messages::{
            ActiveModel as MessageActive, Column as MessageCol, Entity as ChatMessages,
            Model as MessageModel,
        },
        chat_rooms::{
            ActiveModel as RoomActive, Column as RoomCol, Entity as ChatRooms, Model as RoomModel,
        },
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ROLE_PROVIDER},
    models::{ChatMessage, ChatRoom, SenderRole},
    response::{ApiResponse, Meta},
    services::catalog_service,
    state::AppState,
};

/// Find or lazily create the chat room for a booking. Under concurrent
/// first access the unique constraint on `booking_id` decides the winner;
/// the loser's insert fails and we return the row that won.
pub async fn open_room(
    state: &AppState,
    user: &AuthUser,
    booking_id: Uuid,
) -> AppResult<ApiResponse<ChatRoom>> {
    let booking = Bookings::find_by_id(booking_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let is_customer = booking.customer_id == user.user_id;
    let is_provider = user.role == ROLE_PROVIDER
        && catalog_service::own_provider_id(state, user).await? == booking.provider_id;
    if !is_customer && !is_provider {
        return Err(AppError::Forbidden);
    }

    if let Some(room) = ChatRooms::find()
        .filter(RoomCol::BookingId.eq(booking_id))
        .one(&state.orm)
        .await?
    {
        return Ok(ApiResponse::success("OK", room_from_entity(room), None));
    }

    let insert = RoomActive {
        id: Set(Uuid::new_v4()),
        booking_id: Set(booking.id),
        customer_id: Set(booking.customer_id),
        provider_id: Set(booking.provider_id),
        active: Set(true),
        last_message_at: Set(None),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await;

    let room = match insert {
        Ok(room) => room,
        Err(err) => {
            // Most likely a concurrent create hit the unique constraint.
            match ChatRooms::find()
                .filter(RoomCol::BookingId.eq(booking_id))
                .one(&state.orm)
                .await?
            {
                Some(room) => room,
                None => return Err(err.into()),
            }
        }
    };

    Ok(ApiResponse::success(
        "Room ready",
        room_from_entity(room),
        None,
    ))
}

#[derive(FromRow)]
struct RoomRow {
    id: Uuid,
    booking_id: Uuid,
    customer_id: Uuid,
    provider_id: Uuid,
    active: bool,
    last_message_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    last_message: Option<String>,
    unread_count: i64,
}

/// The caller's rooms with a preview of the latest message and the count of
/// unread messages written by the counterpart.
pub async fn list_rooms(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<RoomList>> {
    let provider_id = if user.role == ROLE_PROVIDER {
        match catalog_service::own_provider_id(state, user).await {
            Ok(id) => Some(id),
            Err(AppError::BadRequest(_)) => None,
            Err(err) => return Err(err),
        }
    } else {
        None
    };

    let rows = sqlx::query_as::<_, RoomRow>(
        r#"
        SELECT r.*,
               lm.body AS last_message,
               (SELECT COUNT(*) FROM chat_messages m
                WHERE m.room_id = r.id AND m.read = FALSE AND m.sender_id <> $1) AS unread_count
        FROM chat_rooms r
        LEFT JOIN LATERAL (
            SELECT body FROM chat_messages m2
            WHERE m2.room_id = r.id
            ORDER BY m2.created_at DESC
            LIMIT 1
        ) lm ON TRUE
        WHERE r.customer_id = $1 OR r.provider_id = $2
        ORDER BY r.last_message_at DESC NULLS LAST, r.created_at DESC
        "#,
    )
    .bind(user.user_id)
    .bind(provider_id.unwrap_or(Uuid::nil()))
    .fetch_all(&state.pool)
    .await?;

    let items = rows
        .into_iter()
        .map(|row| RoomSummary {
            room: ChatRoom {
                id: row.id,
                booking_id: row.booking_id,
                customer_id: row.customer_id,
                provider_id: row.provider_id,
                active: row.active,
                last_message_at: row.last_message_at,
                created_at: row.created_at,
            },
            last_message: row.last_message,
            unread_count: row.unread_count,
        })
        .collect();

    Ok(ApiResponse::success(
        "Rooms",
        RoomList { items },
        Some(Meta::empty()),
    ))
}

pub async fn list_messages(
    state: &AppState,
    user: &AuthUser,
    room_id: Uuid,
) -> AppResult<ApiResponse<MessageList>> {
    let _room = find_room_for_participant(state, user, room_id).await?;

    let items = ChatMessages::find()
        .filter(MessageCol::RoomId.eq(room_id))
        .order_by_asc(MessageCol::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(message_from_entity)
        .collect::<AppResult<Vec<_>>>()?;

    Ok(ApiResponse::success(
        "Messages",
        MessageList { items },
        Some(Meta::empty()),
    ))
}

pub async fn send_message(
    state: &AppState,
    user: &AuthUser,
    room_id: Uuid,
    payload: SendMessageRequest,
) -> AppResult<ApiResponse<ChatMessage>> {
    if payload.body.trim().is_empty() && payload.image_urls.as_deref().unwrap_or(&[]).is_empty() {
        return Err(AppError::Validation("message is empty".into()));
    }

    let room = find_room_for_participant(state, user, room_id).await?;
    let sender_role = SenderRole::parse(&user.role)
        .ok_or_else(|| AppError::BadRequest("Unknown sender role".into()))?;

    let image_urls = payload
        .image_urls
        .filter(|urls| !urls.is_empty())
        .map(serde_json::to_value)
        .transpose()
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e)))?;

    let message = MessageActive {
        id: Set(Uuid::new_v4()),
        room_id: Set(room.id),
        sender_id: Set(user.user_id),
        sender_role: Set(sender_role.as_str().into()),
        body: Set(payload.body),
        image_urls: Set(image_urls),
        read: Set(false),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    // Room ordering in the inbox follows the latest message.
    let mut room_active: RoomActive = room.into();
    room_active.last_message_at = Set(Some(message.created_at));
    room_active.update(&state.orm).await?;

    let message = message_from_entity(message)?;
    state.chat.publish(&message).await;

    Ok(ApiResponse::success("Sent", message, None))
}

/// Flip read=true on everything in the room the caller did not write.
pub async fn mark_read(
    state: &AppState,
    user: &AuthUser,
    room_id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let _room = find_room_for_participant(state, user, room_id).await?;

    let result = ChatMessages::update_many()
        .col_expr(MessageCol::Read, Expr::value(true))
        .filter(MessageCol::RoomId.eq(room_id))
        .filter(MessageCol::SenderId.ne(user.user_id))
        .filter(MessageCol::Read.eq(false))
        .exec(&state.orm)
        .await?;

    Ok(ApiResponse::success(
        "Marked read",
        serde_json::json!({ "updated": result.rows_affected }),
        Some(Meta::empty()),
    ))
}

pub(crate) async fn find_room_for_participant(
    state: &AppState,
    user: &AuthUser,
    room_id: Uuid,
) -> AppResult<RoomModel> {
    let room = ChatRooms::find_by_id(room_id).one(&state.orm).await?;
    let room = match room {
        Some(r) => r,
        None => return Err(AppError::NotFound),
    };

    if room.customer_id == user.user_id {
        return Ok(room);
    }
    if user.role == ROLE_PROVIDER {
        let provider_id = catalog_service::own_provider_id(state, user).await?;
        if room.provider_id == provider_id {
            return Ok(room);
        }
    }
    Err(AppError::Forbidden)
}

pub(crate) fn room_from_entity(model: RoomModel) -> ChatRoom {
    ChatRoom {
        id: model.id,
        booking_id: model.booking_id,
        customer_id: model.customer_id,
        provider_id: model.provider_id,
        active: model.active,
        last_message_at: model.last_message_at.map(|t| t.with_timezone(&Utc)),
        created_at: model.created_at.with_timezone(&Utc),
    }
}

pub(crate) fn message_from_entity(model: MessageModel) -> AppResult<ChatMessage> {
    let image_urls = match model.image_urls {
        Some(value) => serde_json::from_value(value)
            .map_err(|e| AppError::Internal(anyhow::anyhow!(e)))?,
        None => Vec::new(),
    };
    let sender_role = SenderRole::parse(&model.sender_role).ok_or_else(|| {
        AppError::Internal(anyhow::anyhow!(
            "unknown sender role '{}'",
            model.sender_role
        ))
    })?;

    Ok(ChatMessage {
        id: model.id,
        room_id: model.room_id,
        sender_id: model.sender_id,
        sender_role,
        body: model.body,
        image_urls,
        read: model.read,
        created_at: model.created_at.with_timezone(&Utc),
    })
}
