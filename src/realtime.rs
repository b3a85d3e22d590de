//! In-process fanout for chat: one broadcast channel per room, created on
//! first use and dropped when the room has no more subscribers and the next
//! publish finds none.

use std::collections::HashMap;

use tokio::sync::{RwLock, broadcast};
use uuid::Uuid;

use crate::models::ChatMessage;

const ROOM_CHANNEL_CAPACITY: usize = 128;

#[derive(Default)]
pub struct ChatHub {
    rooms: RwLock<HashMap<Uuid, broadcast::Sender<ChatMessage>>>,
}

impl ChatHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to a room's message feed. The receiver lags (and skips)
    /// rather than block a slow consumer.
    pub async fn subscribe(&self, room_id: Uuid) -> broadcast::Receiver<ChatMessage> {
        let mut rooms = self.rooms.write().await;
        rooms
            .entry(room_id)
            .or_insert_with(|| broadcast::channel(ROOM_CHANNEL_CAPACITY).0)
            .subscribe()
    }

    /// Publish a new message to whoever is listening. Lack of subscribers is
    /// not an error.
    pub async fn publish(&self, message: &ChatMessage) {
        let mut rooms = self.rooms.write().await;
        if let Some(tx) = rooms.get(&message.room_id) {
            if tx.send(message.clone()).is_err() {
                // Every receiver is gone; drop the channel.
                rooms.remove(&message.room_id);
            }
        }
    }
}
