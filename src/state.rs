use std::sync::Arc;

use crate::{
    db::{DbPool, OrmConn},
    realtime::ChatHub,
};

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub orm: OrmConn,
    pub chat: Arc<ChatHub>,
}

impl AppState {
    pub fn new(pool: DbPool, orm: OrmConn) -> Self {
        Self {
            pool,
            orm,
            chat: Arc::new(ChatHub::new()),
        }
    }
}
