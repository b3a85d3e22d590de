use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{ChatMessage, ChatRoom};

#[derive(Debug, Deserialize, ToSchema)]
pub struct OpenRoomRequest {
    pub booking_id: Uuid,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SendMessageRequest {
    pub body: String,
    pub image_urls: Option<Vec<String>>,
}

/// A room as it appears in the caller's inbox: last-message preview plus the
/// count of unread messages authored by the counterpart.
#[derive(Debug, Serialize, ToSchema)]
pub struct RoomSummary {
    #[serde(flatten)]
    pub room: ChatRoom,
    pub last_message: Option<String>,
    pub unread_count: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RoomList {
    pub items: Vec<RoomSummary>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MessageList {
    pub items: Vec<ChatMessage>,
}
