use argon2::{
    Argon2, PasswordHasher,
    password_hash::{SaltString, rand_core::OsRng},
};
use detailing_booking_api::{
    config::AppConfig,
    db::{create_orm_conn, create_pool, run_migrations},
};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database_url).await?;
    let orm = create_orm_conn(&config.database_url).await?;
    run_migrations(&orm).await?;

    let customer_id = ensure_user(&pool, "customer@example.com", "customer123", "customer").await?;
    let provider_user_id = ensure_user(&pool, "detailer@example.com", "detailer123", "provider").await?;
    let provider_id = ensure_provider(&pool, provider_user_id).await?;
    seed_services(&pool, provider_id).await?;
    seed_vehicle(&pool, customer_id).await?;

    println!("Seed completed. Customer: {customer_id}, Provider: {provider_id}");
    Ok(())
}

async fn ensure_user(
    pool: &sqlx::PgPool,
    email: &str,
    password: &str,
    role: &str,
) -> anyhow::Result<Uuid> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!(e.to_string()))?
        .to_string();

    let row: Option<(Uuid,)> = sqlx::query_as(
        r#"
        INSERT INTO users (id, email, password_hash, full_name, role)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (email) DO UPDATE SET role = EXCLUDED.role
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(email)
    .bind(password_hash)
    .bind(email.split('@').next().unwrap_or("user"))
    .bind(role)
    .fetch_optional(pool)
    .await?;

    let user_id = match row {
        Some((id,)) => id,
        None => {
            let existing: (Uuid,) = sqlx::query_as("SELECT id FROM users WHERE email = $1")
                .bind(email)
                .fetch_one(pool)
                .await?;
            existing.0
        }
    };

    println!("Ensured user {email} (role={role})");
    Ok(user_id)
}

async fn ensure_provider(pool: &sqlx::PgPool, user_id: Uuid) -> anyhow::Result<Uuid> {
    let row: Option<(Uuid,)> = sqlx::query_as(
        r#"
        INSERT INTO providers (id, user_id, business_name, description, service_area,
                               latitude, longitude, service_radius_m, verified)
        VALUES ($1, $2, 'Shine & Go Mobile Detailing', 'Full-service mobile detailing',
                'Downtown and surroundings', 40.7580, -73.9855, 15000, TRUE)
        ON CONFLICT (user_id) DO NOTHING
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    let provider_id = match row {
        Some((id,)) => id,
        None => {
            let existing: (Uuid,) = sqlx::query_as("SELECT id FROM providers WHERE user_id = $1")
                .bind(user_id)
                .fetch_one(pool)
                .await?;
            existing.0
        }
    };

    println!("Ensured provider profile {provider_id}");
    Ok(provider_id)
}

async fn seed_services(pool: &sqlx::PgPool, provider_id: Uuid) -> anyhow::Result<()> {
    let services = vec![
        ("Express Wash", "Exterior hand wash and dry", "wash", 2999, "45 min"),
        ("Full Detail", "Interior and exterior detail", "detail", 14999, "3 hours"),
        ("Interior Deep Clean", "Seats, carpets, vents", "interior", 8999, "2 hours"),
        ("Ceramic Coating", "Long-term paint protection", "protection", 49999, "1 day"),
    ];

    for (name, desc, category, price_cents, duration) in services {
        sqlx::query(
            r#"
            INSERT INTO services (id, provider_id, name, description, category, price_cents, duration)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(provider_id)
        .bind(name)
        .bind(desc)
        .bind(category)
        .bind(price_cents as i64)
        .bind(duration)
        .execute(pool)
        .await?;
    }

    println!("Seeded services");
    Ok(())
}

async fn seed_vehicle(pool: &sqlx::PgPool, owner_id: Uuid) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO vehicles (id, owner_id, make, model, year, color, license_plate, category, is_default)
        VALUES ($1, $2, 'Toyota', 'Camry', 2021, 'Silver', 'ABC-1234', 'sedan', TRUE)
        ON CONFLICT DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(owner_id)
    .execute(pool)
    .await?;

    println!("Seeded vehicle");
    Ok(())
}
