use axum::{Extension, Router};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

mod db;
mod elevenlabs_client;
mod error;
mod handlers;
mod jobs;
mod middleware;
mod models;
mod openai_client;
mod replicate_client;
mod services;
mod stability_client;

// Shared state: database pool, optional provider clients, and the job runner.
// Each provider client is None when its API key is not configured; every
// consumer falls back to placeholder output in that case.
pub struct AppState {
    pub db_pool: sqlx::PgPool,
    pub openai_client: Option<openai_client::OpenAiClient>,
    pub stability_client: Option<stability_client::StabilityClient>,
    pub elevenlabs_client: Option<elevenlabs_client::ElevenLabsClient>,
    pub replicate_client: Option<replicate_client::ReplicateClient>,
    pub job_runner: jobs::SharedJobRunner,
}

#[tokio::main]
async fn main() {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    init_logging().expect("Failed to initialize logging");

    // Create the database connection pool (runs migrations on startup)
    let db_pool = db::create_pool()
        .await
        .expect("Failed to create database pool.");

    // Initialize OpenAI client if API key is provided
    let openai_client = match std::env::var("OPENAI_API_KEY").ok() {
        Some(api_key) if !api_key.is_empty() => {
            tracing::info!("Initializing OpenAI script analysis client...");
            Some(openai_client::OpenAiClient::new(api_key))
        }
        _ => {
            tracing::warn!("OPENAI_API_KEY not found. Script analysis will use the heuristic fallback.");
            None
        }
    };

    // Initialize Stability AI client if API key is provided
    let stability_client = match std::env::var("STABILITY_API_KEY").ok() {
        Some(api_key) if !api_key.is_empty() => {
            tracing::info!("Initializing Stability AI image client...");
            Some(stability_client::StabilityClient::new(api_key))
        }
        _ => {
            tracing::warn!("STABILITY_API_KEY not found. Image generation will use placeholders.");
            None
        }
    };

    // Initialize Eleven Labs client if API key is provided
    let elevenlabs_client = match std::env::var("ELEVEN_LABS_API_KEY").ok() {
        Some(api_key) if !api_key.is_empty() => {
            tracing::info!("Initializing Eleven Labs TTS client...");
            Some(elevenlabs_client::ElevenLabsClient::new(api_key))
        }
        _ => {
            tracing::warn!("ELEVEN_LABS_API_KEY not found. Voice audio will use placeholders.");
            None
        }
    };

    // Initialize Replicate client if API token is provided
    let replicate_client = match std::env::var("REPLICATE_API_TOKEN").ok() {
        Some(api_token) if !api_token.is_empty() => {
            tracing::info!("Initializing Replicate animation client...");
            Some(replicate_client::ReplicateClient::new(api_token))
        }
        _ => {
            tracing::warn!("REPLICATE_API_TOKEN not found. Scene animation will use placeholders.");
            None
        }
    };

    // Initialize the job runner for background render jobs
    let job_runner = Arc::new(jobs::JobRunner::new());
    tracing::info!("Job runner initialized for background rendering");

    let shared_state = Arc::new(AppState {
        db_pool,
        openai_client,
        stability_client,
        elevenlabs_client,
        replicate_client,
        job_runner,
    });

    // Build our application with all routes and shared state
    let app = Router::new()
        .merge(handlers::auth::auth_routes())
        .merge(handlers::projects::project_routes())
        .merge(handlers::characters::character_routes())
        .merge(handlers::scenes::scene_routes())
        .merge(handlers::render::render_routes())
        .merge(handlers::generation::generation_routes())
        .merge(handlers::billing::billing_routes())
        .merge(handlers::notifications::notification_routes())
        .merge(handlers::voices::voice_routes())
        .route("/health", axum::routing::get(health))
        .route("/api/status", axum::routing::get(api_status))
        .layer(axum::middleware::from_fn(
            middleware::logging::request_logging_middleware,
        ))
        .layer(CorsLayer::permissive())
        .layer(Extension(shared_state.clone()));

    let port = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(3000);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
        .await
        .expect("Failed to bind server address");
    tracing::info!(
        "listening on {}",
        listener.local_addr().expect("listener has no local addr")
    );
    axum::serve(listener, app)
        .await
        .expect("Server error");
}

// Production-grade logging configuration
fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cfg!(debug_assertions) {
            "debug,storyreel=trace,sqlx=info,reqwest=info,hyper=info,tower=info".to_string()
        } else {
            "info,storyreel=info,sqlx=warn,reqwest=warn,hyper=warn,tower=warn".to_string()
        }
    });

    let env_filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&log_level))?;

    // JSON logging for production, human-readable for development
    let fmt_layer = if std::env::var("LOG_FORMAT").as_deref() == Ok("json") {
        fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .with_target(true)
            .with_thread_ids(true)
            .with_thread_names(true)
            .boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_thread_names(false)
            .with_file(true)
            .with_line_number(true)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::info!("StoryReel starting up...");
    tracing::info!("Version: {}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        "Build mode: {}",
        if cfg!(debug_assertions) { "development" } else { "production" }
    );
    tracing::info!("Log level: {}", log_level);

    Ok(())
}

async fn health() -> axum::response::Json<serde_json::Value> {
    axum::response::Json(serde_json::json!({
        "status": "ok",
        "timestamp": chrono::Utc::now(),
    }))
}

// API Status endpoint
async fn api_status(
    Extension(state): Extension<Arc<AppState>>,
) -> axum::response::Json<serde_json::Value> {
    use serde_json::json;

    let db_status = match sqlx::query("SELECT 1").fetch_one(&state.db_pool).await {
        Ok(_) => "healthy",
        Err(_) => "unhealthy",
    };

    let openai_status = if state.openai_client.is_some() { "configured" } else { "not_configured" };
    let stability_status = if state.stability_client.is_some() { "configured" } else { "not_configured" };
    let elevenlabs_status = if state.elevenlabs_client.is_some() { "configured" } else { "not_configured" };
    let replicate_status = if state.replicate_client.is_some() { "configured" } else { "not_configured" };

    axum::response::Json(json!({
        "status": "operational",
        "version": env!("CARGO_PKG_VERSION"),
        "active_render_jobs": state.job_runner.active_count().await,
        "services": {
            "database": db_status,
            "openai_script_analysis": openai_status,
            "stability_images": stability_status,
            "elevenlabs_audio": elevenlabs_status,
            "replicate_animation": replicate_status,
        },
        "endpoints": {
            "auth": "/api/auth/*",
            "projects": "/api/projects/*",
            "auto_video": "/api/auto-video/*",
            "render_jobs": "/api/render_jobs/*",
            "billing": "/api/billing/credits",
            "notifications": "/api/notifications",
            "voice_styles": "/api/voice_styles",
        }
    }))
}
