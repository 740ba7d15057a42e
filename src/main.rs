use axum::{
    routing::{get, post},
    Router,
};
use sqlx::sqlite::SqlitePool;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod auth;
mod state;

use knowledgebox_backend::config;
use knowledgebox_backend::db;
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "knowledgebox_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration / 加载配置
    let app_config = config::load_config().expect("Failed to load configuration");
    tracing::info!(
        "Server will listen on {}:{}",
        app_config.server.host,
        app_config.server.port
    );

    // Create data and media directories / 创建数据与媒体目录
    let data_dir = app_config.get_data_dir();
    if !data_dir.exists() {
        std::fs::create_dir_all(&data_dir)?;
        tracing::info!("Created data directory: {:?}", data_dir);
    }
    let media_dir = app_config.get_media_dir();
    if !media_dir.exists() {
        std::fs::create_dir_all(&media_dir)?;
        tracing::info!("Created media directory: {:?}", media_dir);
    }

    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| app_config.get_database_url());

    let pool = SqlitePool::connect(&database_url).await?;

    db::run_migrations(&pool).await?;

    // Secrets come from the environment, never from config.json
    let firebase_api_key = std::env::var("FIREBASE_API_KEY").unwrap_or_default();
    if firebase_api_key.is_empty() {
        tracing::warn!("FIREBASE_API_KEY not set, /api/verify will reject all tokens");
    }
    let gemini_api_key = std::env::var("GEMINI_API_KEY").unwrap_or_default();
    if gemini_api_key.is_empty() && !app_config.ai.fake_api {
        tracing::warn!("GEMINI_API_KEY not set, /api/ai/chat will report errors");
    }
    let chat_secret = std::env::var("CHAT_SECRET_KEY").unwrap_or_default();
    if chat_secret.is_empty() {
        tracing::warn!("CHAT_SECRET_KEY not set, /api/ai/chat will reject all requests");
    }

    let state = Arc::new(AppState {
        db: pool,
        token_cache: auth::TokenCache::new(app_config.auth.token_ttl_secs),
        verifier: Arc::new(auth::GoogleIdentityVerifier::new(firebase_api_key)),
        ai: knowledgebox_backend::ai::GeminiClient::new(
            gemini_api_key,
            app_config.ai.model.clone(),
        ),
        chat_secret,
    });

    let app = Router::new()
        .route("/api/health", get(api::server::health_check))
        .route("/collections/search", get(api::collections::search))
        .route("/collections/preview/:id", get(api::collections::preview))
        .route("/collections/download/:id", get(api::collections::download))
        .route("/collections/library", get(api::collections::library))
        .route("/sounds/download/:id", get(api::media::download_sound))
        .route("/images/download/:id", get(api::media::download_image))
        .route("/api/verify", get(api::verify::verify))
        .route("/api/ai/chat", post(api::chat::chat))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let bind_addr = app_config.get_bind_address();
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

    tracing::info!("Server running at http://{}", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
