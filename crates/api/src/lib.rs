//! HTTP API layer for socialx-rs.
//!
//! - **Endpoints**: account, profile and relationship APIs (POST with JSON bodies)
//! - **Extractors**: authenticated user
//! - **Middleware**: bearer-token authentication
//!
//! Built on Axum 0.8 with Tower middleware stack.

pub mod endpoints;
pub mod extractors;
pub mod middleware;
pub mod response;

pub use endpoints::{health_router, router};
