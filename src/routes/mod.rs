use axum::Router;

use crate::state::AppState;

pub mod auth;
pub mod bookings;
pub mod catalog;
pub mod chat;
pub mod doc;
pub mod health;
pub mod notifications;
pub mod params;
pub mod providers;
pub mod reviews;
pub mod vehicles;

// Build the API router without binding state; it will be provided at the top level.
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/vehicles", vehicles::router())
        .nest("/providers", providers::router())
        .nest("/services", catalog::router())
        .nest("/bookings", bookings::router())
        .nest("/reviews", reviews::router())
        .nest("/chat", chat::router())
        .nest("/notifications", notifications::router())
}
