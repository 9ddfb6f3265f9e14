//! API endpoints.

mod auth;
mod following;
mod health;
mod users;

use axum::Router;

use crate::middleware::AppState;

/// Create the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(auth::router())
        .nest("/users", users::router())
        .nest("/following", following::router())
}

/// Liveness routes, mounted outside `/api`.
pub fn health_router() -> Router<AppState> {
    health::router()
}
