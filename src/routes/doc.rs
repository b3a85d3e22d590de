use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    draft::{AddOnSelection, BookingDraft, LocationSelection, PriceQuote, ServiceSelection},
    dto::{
        bookings::{AvailabilityResponse, BookingList, BookingSummary, CreateBookingRequest, TimeSlot, UpdateBookingStatusRequest},
        catalog::{CreateServiceRequest, ServiceList, UpdateServiceRequest},
        chat::{MessageList, OpenRoomRequest, RoomList, RoomSummary, SendMessageRequest},
        notifications::{NotificationList, UnreadCount},
        providers::{CreateProviderRequest, ProviderList, ProviderWithDistance, UpdateProviderRequest},
        reviews::{CreateReviewRequest, ReviewList, UpdateReviewRequest},
        vehicles::{CreateVehicleRequest, UpdateVehicleRequest, VehicleList},
    },
    models::{
        Booking, BookingStatus, ChatMessage, ChatRoom, Notification, Provider, Review,
        SenderRole, Service, User, Vehicle, VehicleCategory,
    },
    response::{ApiResponse, Meta},
    routes::{auth, bookings, catalog, chat, health, notifications, params, providers, reviews, vehicles},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::login,
        auth::register,
        vehicles::list_vehicles,
        vehicles::create_vehicle,
        vehicles::update_vehicle,
        vehicles::set_default_vehicle,
        vehicles::delete_vehicle,
        providers::search_providers,
        providers::create_profile,
        providers::my_profile,
        providers::update_profile,
        providers::get_provider,
        providers::list_provider_reviews,
        catalog::list_provider_services,
        catalog::get_service,
        catalog::create_service,
        catalog::update_service,
        catalog::deactivate_service,
        bookings::create_booking,
        bookings::list_my_bookings,
        bookings::list_provider_bookings,
        bookings::availability,
        bookings::get_booking,
        bookings::update_status,
        bookings::cancel_booking,
        bookings::delete_booking,
        reviews::create_review,
        reviews::update_review,
        reviews::delete_review,
        chat::open_room,
        chat::list_rooms,
        chat::list_messages,
        chat::send_message,
        chat::mark_read,
        chat::room_events,
        notifications::list_notifications,
        notifications::unread_count,
        notifications::mark_read,
        notifications::mark_all_read
    ),
    components(
        schemas(
            User,
            Provider,
            Service,
            Vehicle,
            Booking,
            Review,
            ChatRoom,
            ChatMessage,
            Notification,
            BookingStatus,
            VehicleCategory,
            SenderRole,
            BookingDraft,
            ServiceSelection,
            AddOnSelection,
            LocationSelection,
            PriceQuote,
            CreateBookingRequest,
            UpdateBookingStatusRequest,
            BookingSummary,
            BookingList,
            TimeSlot,
            AvailabilityResponse,
            CreateServiceRequest,
            UpdateServiceRequest,
            ServiceList,
            OpenRoomRequest,
            SendMessageRequest,
            RoomSummary,
            RoomList,
            MessageList,
            NotificationList,
            UnreadCount,
            CreateProviderRequest,
            UpdateProviderRequest,
            ProviderWithDistance,
            ProviderList,
            CreateReviewRequest,
            UpdateReviewRequest,
            ReviewList,
            CreateVehicleRequest,
            UpdateVehicleRequest,
            VehicleList,
            params::Pagination,
            params::ProviderSearchQuery,
            params::ServiceListQuery,
            params::BookingListQuery,
            params::AvailabilityQuery,
            Meta,
            ApiResponse<Booking>,
            ApiResponse<BookingList>,
            ApiResponse<ProviderList>,
            ApiResponse<VehicleList>,
            ApiResponse<ServiceList>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Authentication endpoints"),
        (name = "Vehicles", description = "Customer vehicle endpoints"),
        (name = "Providers", description = "Provider discovery and profile endpoints"),
        (name = "Services", description = "Detailing service catalog endpoints"),
        (name = "Bookings", description = "Booking lifecycle endpoints"),
        (name = "Reviews", description = "Review endpoints"),
        (name = "Chat", description = "Booking chat endpoints"),
        (name = "Notifications", description = "Notification endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
