pub mod auth;
pub mod bookings;
pub mod catalog;
pub mod chat;
pub mod notifications;
pub mod providers;
pub mod reviews;
pub mod vehicles;
