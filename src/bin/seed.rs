//! Seeds the development database: the guest account and the built-in
//! voice styles. Safe to run repeatedly.

use bcrypt::{hash, DEFAULT_COST};
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

const GUEST_CREDITS: i32 = 1_000_000;

const VOICE_STYLES: &[(&str, &str, &str, &str)] = &[
    (
        "Narrator",
        "en",
        "american",
        "Deep, authoritative narration voice",
    ),
    (
        "Energetic",
        "en",
        "american",
        "Upbeat, high-energy voice for lively characters",
    ),
    (
        "Soft",
        "en",
        "british",
        "Gentle, calm voice for quiet scenes",
    ),
    (
        "Clear",
        "en",
        "american",
        "Clear and articulate voice for explanations",
    ),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let db_url = std::env::var("DATABASE_URL")?;
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&db_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    // Guest account, reachable with the fixed guest token.
    let guest_id = Uuid::nil();
    let password_hash = hash("guest-password", DEFAULT_COST)?;
    sqlx::query(
        "INSERT INTO users (id, email, password_hash, name, subscription_tier, credits_balance)
         VALUES ($1, $2, $3, $4, 'free', $5)
         ON CONFLICT (id) DO NOTHING",
    )
    .bind(guest_id)
    .bind("guest@example.com")
    .bind(&password_hash)
    .bind("Guest User")
    .bind(GUEST_CREDITS)
    .execute(&pool)
    .await?;
    tracing::info!("Guest user ready");

    for (name, language, accent, description) in VOICE_STYLES {
        let exists: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM voice_styles WHERE name = $1")
                .bind(name)
                .fetch_optional(&pool)
                .await?;

        if exists.is_none() {
            sqlx::query(
                "INSERT INTO voice_styles (name, language, accent, description)
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(name)
            .bind(language)
            .bind(accent)
            .bind(description)
            .execute(&pool)
            .await?;
            tracing::info!(name, "Voice style created");
        }
    }

    tracing::info!("Seed complete");
    Ok(())
}
