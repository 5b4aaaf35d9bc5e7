mod auth;
mod cache;
mod config;
mod db;
mod error;
mod models;
mod routes;
mod services;
mod store;

use axum::http::{header, HeaderValue, Method};
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use config::Config;
use error::AppError;
use models::Role;
use routes::{create_router, AppState};

/// Promotes the configured admin account, if it has signed up.
fn promote_admin(state: &AppState) -> Result<(), AppError> {
    let Some(email) = state.config.admin_email.as_deref() else {
        return Ok(());
    };
    match state.repo.find_user_by_email(&email.to_lowercase())? {
        Some(user) if user.role == Role::Admin => {}
        Some(user) => {
            state.repo.set_role(&user.id, Role::Admin)?;
            tracing::info!(user_id = %user.id, "Promoted {email} to admin");
        }
        None => tracing::warn!("ADMIN_EMAIL {email} has no account yet"),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Load .env file (from repo root)
    dotenvy::from_filename("../../.env").ok();
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("bookdesk_server=debug,tower_http=debug")),
        )
        .init();

    let config = Config::from_env();
    let port = config.server_port;

    let pool = db::create_pool(&config.sqlite_path)?;
    tracing::info!("Database initialized at {}", config.sqlite_path);

    let state = AppState::new(pool, config.clone());
    promote_admin(&state)?;

    let origin = config
        .cors_origin
        .parse::<HeaderValue>()
        .map_err(|e| AppError::Internal(format!("Invalid CORS_ORIGIN: {e}")))?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::COOKIE])
        .allow_credentials(true);

    let app = create_router(state)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    let addr = format!("0.0.0.0:{port}");
    tracing::info!("bookdesk-server listening on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to bind {addr}: {e}")))?;

    axum::serve(listener, app)
        .await
        .map_err(|e| AppError::Internal(format!("Server failed: {e}")))
}
