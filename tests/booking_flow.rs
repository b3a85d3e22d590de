use chrono::{Duration, Utc};
use detailing_booking_api::{
    db::{create_orm_conn, create_pool, run_migrations},
    dto::{
        bookings::CreateBookingRequest,
        chat::SendMessageRequest,
        providers::{CreateProviderRequest, UpdateProviderRequest},
        reviews::CreateReviewRequest,
        vehicles::CreateVehicleRequest,
    },
    entity::{
        bookings::ActiveModel as BookingActive, bookings::Entity as Bookings,
        chat_rooms::Entity as ChatRooms, providers::ActiveModel as ProviderActive,
        providers::Entity as Providers, reviews::Entity as Reviews,
        services::ActiveModel as ServiceActive, users::ActiveModel as UserActive,
        vehicles::Entity as Vehicles,
    },
    error::AppError,
    middleware::auth::AuthUser,
    models::BookingStatus,
    services::{
        booking_service, chat_service, notification_service, provider_service, review_service,
        vehicle_service,
    },
    state::AppState,
};
use sea_orm::ActiveValue::NotSet;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, ModelTrait, QueryFilter, Set,
    Statement,
};
use uuid::Uuid;

// Integration flow: customer books a detailing service, the provider walks it
// through its lifecycle, the customer reviews it and chats with the provider.
#[tokio::test]
async fn booking_review_and_chat_flow() -> anyhow::Result<()> {
    // Allow skipping when no DB is configured in the environment.
    let database_url = match std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!(
                "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration flow tests."
            );
            return Ok(());
        }
    };

    let state = setup_state(&database_url).await?;

    let customer_id = create_user(&state, "customer", "ann@example.com", "Ann Carter").await?;
    let provider_user_id = create_user(&state, "provider", "pro@example.com", "Shine & Go").await?;

    let provider = ProviderActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(provider_user_id),
        business_name: Set("Shine & Go Detailing".into()),
        description: Set(None),
        service_area: Set(Some("Midtown".into())),
        latitude: Set(Some(40.7580)),
        longitude: Set(Some(-73.9855)),
        service_radius_m: Set(Some(15_000.0)),
        rating: Set(0.0),
        review_count: Set(0),
        verified: Set(true),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    let service = ServiceActive {
        id: Set(Uuid::new_v4()),
        provider_id: Set(provider.id),
        name: Set("Full Exterior Wash".into()),
        description: Set(None),
        category: Set("exterior".into()),
        price_cents: Set(4999),
        duration: Set("60 min".into()),
        active: Set(true),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    let customer = AuthUser {
        user_id: customer_id,
        role: "customer".into(),
    };
    let provider_auth = AuthUser {
        user_id: provider_user_id,
        role: "provider".into(),
    };

    // Two vehicles created as default in turn: only the latest stays default.
    let first_vehicle = vehicle_service::create_vehicle(
        &state,
        &customer,
        vehicle_request("Honda", "Civic", "sedan"),
    )
    .await?
    .data
    .unwrap();
    assert!(first_vehicle.is_default);

    let second_vehicle = vehicle_service::create_vehicle(
        &state,
        &customer,
        vehicle_request("Ford", "F-150", "truck"),
    )
    .await?
    .data
    .unwrap();

    let defaults = Vehicles::find()
        .filter(detailing_booking_api::entity::vehicles::Column::OwnerId.eq(customer_id))
        .filter(detailing_booking_api::entity::vehicles::Column::IsDefault.eq(true))
        .all(&state.orm)
        .await?;
    assert_eq!(defaults.len(), 1);
    assert_eq!(defaults[0].id, second_vehicle.id);

    // Book the wash for next week.
    let scheduled_at = Utc::now() + Duration::days(7);
    let booking = booking_service::create_booking(
        &state,
        &customer,
        CreateBookingRequest {
            provider_id: provider.id,
            service_id: service.id,
            vehicle_id: second_vehicle.id,
            scheduled_at,
            address: "12 Riverside Drive".into(),
            latitude: Some(40.76),
            longitude: Some(-73.98),
            total_cents: 4999,
            notes: None,
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(booking.status, BookingStatus::Pending);
    assert_eq!(booking.total_cents, 4999);

    // The provider was notified of the new request.
    let unread = notification_service::unread_count(&state.pool, &provider_auth)
        .await?
        .data
        .unwrap();
    assert_eq!(unread.unread, 1);

    // Skipping straight to completed is rejected.
    let skipped = booking_service::update_status(
        &state,
        &provider_auth,
        booking.id,
        BookingStatus::Completed,
    )
    .await;
    assert!(matches!(
        skipped,
        Err(AppError::IllegalTransition {
            from: BookingStatus::Pending,
            to: BookingStatus::Completed,
        })
    ));

    // The customer may cancel but never advance the booking.
    let advanced = booking_service::update_status(
        &state,
        &customer,
        booking.id,
        BookingStatus::Confirmed,
    )
    .await;
    assert!(matches!(advanced, Err(AppError::Forbidden)));

    // Even when the requested status is also out of order, the customer gets
    // Forbidden rather than a response that reveals the lifecycle state.
    let out_of_order = booking_service::update_status(
        &state,
        &customer,
        booking.id,
        BookingStatus::Completed,
    )
    .await;
    assert!(matches!(out_of_order, Err(AppError::Forbidden)));

    // Forward path, one step at a time.
    for next in [
        BookingStatus::Confirmed,
        BookingStatus::InProgress,
        BookingStatus::Completed,
    ] {
        let updated = booking_service::update_status(&state, &provider_auth, booking.id, next)
            .await?
            .data
            .unwrap();
        assert_eq!(updated.status, next);
    }

    // A completed booking can be reviewed exactly once.
    review_service::create_review(
        &state,
        &customer,
        CreateReviewRequest {
            booking_id: booking.id,
            rating: 5.0,
            comment: Some("Spotless".into()),
        },
    )
    .await?;

    let duplicate = review_service::create_review(
        &state,
        &customer,
        CreateReviewRequest {
            booking_id: booking.id,
            rating: 4.0,
            comment: None,
        },
    )
    .await;
    assert!(matches!(duplicate, Err(AppError::BadRequest(_))));

    // Two more completed bookings rated 4 and 3 bring the mean to 4.00.
    for rating in [4.0, 3.0] {
        let extra = seed_completed_booking(
            &state,
            customer_id,
            provider.id,
            service.id,
            first_vehicle.id,
        )
        .await?;
        review_service::create_review(
            &state,
            &customer,
            CreateReviewRequest {
                booking_id: extra,
                rating,
                comment: None,
            },
        )
        .await?;
    }

    let refreshed = Providers::find_by_id(provider.id)
        .one(&state.orm)
        .await?
        .unwrap();
    assert_eq!(refreshed.rating, 4.0);
    assert_eq!(refreshed.review_count, 3);

    // A fourth review of 2 pulls it to 3.50, rounded to two decimals.
    let fourth =
        seed_completed_booking(&state, customer_id, provider.id, service.id, first_vehicle.id)
            .await?;
    review_service::create_review(
        &state,
        &customer,
        CreateReviewRequest {
            booking_id: fourth,
            rating: 2.0,
            comment: None,
        },
    )
    .await?;
    let refreshed = Providers::find_by_id(provider.id)
        .one(&state.orm)
        .await?
        .unwrap();
    assert_eq!(refreshed.rating, 3.5);

    // Chat: the room is created lazily and reopening returns the same room.
    let room = chat_service::open_room(&state, &customer, booking.id)
        .await?
        .data
        .unwrap();
    let reopened = chat_service::open_room(&state, &provider_auth, booking.id)
        .await?
        .data
        .unwrap();
    assert_eq!(room.id, reopened.id);

    // The booking's entity relations resolve to its review and chat room.
    let booking_row = Bookings::find_by_id(booking.id)
        .one(&state.orm)
        .await?
        .unwrap();
    let related_review = booking_row.find_related(Reviews).one(&state.orm).await?;
    assert_eq!(related_review.unwrap().rating, 5.0);
    let related_room = booking_row.find_related(ChatRooms).one(&state.orm).await?;
    assert_eq!(related_room.unwrap().id, room.id);

    for body in ["On my way", "Be there in 10", "Arrived"] {
        chat_service::send_message(
            &state,
            &provider_auth,
            room.id,
            SendMessageRequest {
                body: body.into(),
                image_urls: None,
            },
        )
        .await?;
    }

    // The customer sees three unread messages; reading clears their count
    // without touching the provider's side.
    let rooms = chat_service::list_rooms(&state, &customer).await?.data.unwrap();
    assert_eq!(rooms.items.len(), 1);
    assert_eq!(rooms.items[0].unread_count, 3);
    assert_eq!(rooms.items[0].last_message.as_deref(), Some("Arrived"));

    chat_service::mark_read(&state, &customer, room.id).await?;
    let rooms = chat_service::list_rooms(&state, &customer).await?.data.unwrap();
    assert_eq!(rooms.items[0].unread_count, 0);

    let provider_rooms = chat_service::list_rooms(&state, &provider_auth)
        .await?
        .data
        .unwrap();
    assert_eq!(provider_rooms.items[0].unread_count, 0);

    // A provider account that has not created its profile yet simply has no
    // rooms; listing must not error out.
    let solo_user_id = create_user(&state, "provider", "solo@example.com", "Solo Detail").await?;
    let solo = AuthUser {
        user_id: solo_user_id,
        role: "provider".into(),
    };
    let no_rooms = chat_service::list_rooms(&state, &solo).await?.data.unwrap();
    assert!(no_rooms.items.is_empty());

    // Coordinates stay a pair on update: with none stored, a lone latitude is
    // rejected, and supplying both succeeds.
    provider_service::create_profile(
        &state,
        &solo,
        CreateProviderRequest {
            business_name: "Solo Detail".into(),
            description: None,
            service_area: None,
            latitude: None,
            longitude: None,
            service_radius_m: None,
        },
    )
    .await?;
    let lone_latitude = provider_service::update_profile(
        &state,
        &solo,
        UpdateProviderRequest {
            business_name: None,
            description: None,
            service_area: None,
            latitude: Some(40.7),
            longitude: None,
            service_radius_m: None,
        },
    )
    .await;
    assert!(matches!(lone_latitude, Err(AppError::Validation(_))));

    let located = provider_service::update_profile(
        &state,
        &solo,
        UpdateProviderRequest {
            business_name: None,
            description: None,
            service_area: None,
            latitude: Some(40.7),
            longitude: Some(-74.0),
            service_radius_m: None,
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(located.latitude, Some(40.7));
    assert_eq!(located.longitude, Some(-74.0));

    // Once both are stored, either coordinate may be nudged on its own.
    let nudged = provider_service::update_profile(
        &state,
        &solo,
        UpdateProviderRequest {
            business_name: None,
            description: None,
            service_area: None,
            latitude: Some(40.71),
            longitude: None,
            service_radius_m: None,
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(nudged.latitude, Some(40.71));
    assert_eq!(nudged.longitude, Some(-74.0));

    // A failing notification write must not block the status change itself.
    let pending = booking_service::create_booking(
        &state,
        &customer,
        CreateBookingRequest {
            provider_id: provider.id,
            service_id: service.id,
            vehicle_id: second_vehicle.id,
            scheduled_at: Utc::now() + Duration::days(14),
            address: "12 Riverside Drive".into(),
            latitude: None,
            longitude: None,
            total_cents: 4999,
            notes: None,
        },
    )
    .await?
    .data
    .unwrap();

    sqlx::query("ALTER TABLE notifications RENAME TO notifications_hidden")
        .execute(&state.pool)
        .await?;
    let confirmed = booking_service::update_status(
        &state,
        &provider_auth,
        pending.id,
        BookingStatus::Confirmed,
    )
    .await;
    sqlx::query("ALTER TABLE notifications_hidden RENAME TO notifications")
        .execute(&state.pool)
        .await?;

    assert_eq!(
        confirmed?.data.unwrap().status,
        BookingStatus::Confirmed
    );

    // A vehicle referenced by bookings cannot be deleted; a fresh one can.
    let blocked = vehicle_service::delete_vehicle(&state, &customer, second_vehicle.id).await;
    assert!(matches!(blocked, Err(AppError::BadRequest(_))));

    let spare = vehicle_service::create_vehicle(
        &state,
        &customer,
        vehicle_request("Mazda", "3", "sedan"),
    )
    .await?
    .data
    .unwrap();
    vehicle_service::delete_vehicle(&state, &customer, spare.id).await?;
    assert!(
        Vehicles::find_by_id(spare.id)
            .one(&state.orm)
            .await?
            .is_none()
    );

    Ok(())
}

async fn setup_state(database_url: &str) -> anyhow::Result<AppState> {
    let pool = create_pool(database_url).await?;
    let orm = create_orm_conn(database_url).await?;
    run_migrations(&orm).await?;

    // Clean tables between runs
    let backend = orm.get_database_backend();
    orm.execute(Statement::from_string(
        backend,
        "TRUNCATE TABLE audit_logs, notifications, chat_messages, chat_rooms, reviews, bookings, services, providers, vehicles, users RESTART IDENTITY CASCADE",
    ))
    .await?;

    Ok(AppState::new(pool, orm))
}

async fn create_user(
    state: &AppState,
    role: &str,
    email: &str,
    full_name: &str,
) -> anyhow::Result<Uuid> {
    let user = UserActive {
        id: Set(Uuid::new_v4()),
        email: Set(email.to_string()),
        password_hash: Set("dummy".into()),
        full_name: Set(full_name.to_string()),
        role: Set(role.into()),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    Ok(user.id)
}

fn vehicle_request(make: &str, model: &str, category: &str) -> CreateVehicleRequest {
    CreateVehicleRequest {
        make: make.into(),
        model: model.into(),
        year: 2022,
        color: Some("black".into()),
        license_plate: None,
        category: category.into(),
        set_default: Some(true),
    }
}

async fn seed_completed_booking(
    state: &AppState,
    customer_id: Uuid,
    provider_id: Uuid,
    service_id: Uuid,
    vehicle_id: Uuid,
) -> anyhow::Result<Uuid> {
    let booking = BookingActive {
        id: Set(Uuid::new_v4()),
        customer_id: Set(customer_id),
        provider_id: Set(provider_id),
        service_id: Set(service_id),
        vehicle_id: Set(vehicle_id),
        scheduled_at: Set((Utc::now() - Duration::days(1)).into()),
        address: Set("12 Riverside Drive".into()),
        latitude: Set(None),
        longitude: Set(None),
        status: Set(BookingStatus::Completed.as_str().into()),
        total_cents: Set(4999),
        notes: Set(None),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    Ok(booking.id)
}
