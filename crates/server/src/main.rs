//! Socialx-rs server entry point.

use std::sync::Arc;
use std::time::Duration;

use axum::{Router, middleware};
use socialx_api::{health_router, middleware::AppState, router as api_router};
use socialx_common::Config;
use socialx_core::{RelationshipService, UserService};
use socialx_db::repositories::{FollowRequestRepository, FollowingRepository, UserRepository};
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Largest accepted request body. Every endpoint takes a small JSON object.
const MAX_BODY_BYTES: usize = 64 * 1024;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
///
/// On Unix systems, this listens for both SIGINT (Ctrl+C) and SIGTERM.
/// On Windows, this only listens for Ctrl+C.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received SIGINT, initiating graceful shutdown...");
        },
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}

/// Build the HTTP application around a ready state.
fn build_app(state: AppState) -> Router {
    Router::new()
        .merge(health_router())
        .nest("/api", api_router())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            socialx_api::middleware::auth_middleware,
        ))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration (also exports `.env` into the environment)
    let config = Config::load()?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "socialx=debug,tower_http=debug".into()),
        )
        .init();

    info!("Starting socialx-rs server...");

    // Connect to database
    let db = socialx_db::init(&config).await?;
    info!("Connected to database");

    // Run migrations
    info!("Running database migrations...");
    socialx_db::migrate(&db).await?;
    info!("Migrations completed");

    // Initialize repositories
    let db = Arc::new(db);
    let user_repo = UserRepository::new(Arc::clone(&db));
    let following_repo = FollowingRepository::new(Arc::clone(&db));
    let follow_request_repo = FollowRequestRepository::new(Arc::clone(&db));

    // Initialize services
    let user_service = UserService::new(
        user_repo.clone(),
        following_repo.clone(),
        config.relationships.max_page_size,
    );
    let relationship_service = RelationshipService::new(
        following_repo,
        follow_request_repo,
        user_repo,
        config.relationships.clone(),
    );

    info!(
        allow_request_after_resolution = config.relationships.allow_request_after_resolution,
        "Relationship policy loaded"
    );

    let state = AppState {
        user_service,
        relationship_service,
    };

    let app = build_app(state);

    // Start server with graceful shutdown
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}
