pub mod audit_logs;
pub mod bookings;
pub mod chat_messages;
pub mod chat_rooms;
pub mod notifications;
pub mod providers;
pub mod reviews;
pub mod services;
pub mod users;
pub mod vehicles;

pub use audit_logs::Entity as AuditLogs;
pub use bookings::Entity as Bookings;
pub use chat_messages::Entity as ChatMessages;
pub use chat_rooms::Entity as ChatRooms;
pub use notifications::Entity as Notifications;
pub use providers::Entity as Providers;
pub use reviews::Entity as Reviews;
pub use services::Entity as Services;
pub use users::Entity as Users;
pub use vehicles::Entity as Vehicles;
