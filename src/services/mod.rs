pub mod auth_service;
pub mod booking_service;
pub mod catalog_service;
pub mod chat_service;
pub mod notification_service;
pub mod provider_service;
pub mod review_service;
pub mod vehicle_service;
