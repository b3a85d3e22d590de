use std::convert::Infallible;

use axum::{
    Json, Router,
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, post},
};
use futures::Stream;
use tokio_stream::{StreamExt, wrappers::BroadcastStream};
use uuid::Uuid;

use crate::{
    dto::chat::{MessageList, OpenRoomRequest, RoomList, SendMessageRequest},
    error::AppResult,
    middleware::auth::AuthUser,
    models::{ChatMessage, ChatRoom},
    response::ApiResponse,
    services::chat_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/rooms", get(list_rooms).post(open_room))
        .route("/rooms/{id}/messages", get(list_messages).post(send_message))
        .route("/rooms/{id}/read", post(mark_read))
        .route("/rooms/{id}/events", get(room_events))
}

#[utoipa::path(
    post,
    path = "/api/chat/rooms",
    request_body = OpenRoomRequest,
    tag = "Chat"
)]
pub async fn open_room(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<OpenRoomRequest>,
) -> AppResult<Json<ApiResponse<ChatRoom>>> {
    let resp = chat_service::open_room(&state, &user, payload.booking_id).await?;
    Ok(Json(resp))
}

#[utoipa::path(get, path = "/api/chat/rooms", tag = "Chat")]
pub async fn list_rooms(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<RoomList>>> {
    let resp = chat_service::list_rooms(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(get, path = "/api/chat/rooms/{id}/messages", tag = "Chat")]
pub async fn list_messages(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<MessageList>>> {
    let resp = chat_service::list_messages(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/chat/rooms/{id}/messages",
    request_body = SendMessageRequest,
    tag = "Chat"
)]
pub async fn send_message(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<SendMessageRequest>,
) -> AppResult<Json<ApiResponse<ChatMessage>>> {
    let resp = chat_service::send_message(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(post, path = "/api/chat/rooms/{id}/read", tag = "Chat")]
pub async fn mark_read(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = chat_service::mark_read(&state, &user, id).await?;
    Ok(Json(resp))
}

/// Server-sent events feed of new messages in a room. Closing the response
/// stream is the unsubscribe.
#[utoipa::path(get, path = "/api/chat/rooms/{id}/events", tag = "Chat")]
pub async fn room_events(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    chat_service::find_room_for_participant(&state, &user, id).await?;

    let rx = state.chat.subscribe(id).await;
    let stream = BroadcastStream::new(rx).filter_map(|msg| {
        // Lagged receivers skip missed messages rather than erroring out.
        let message = msg.ok()?;
        let event = Event::default().event("message").json_data(&message).ok()?;
        Some(Ok::<_, Infallible>(event))
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
