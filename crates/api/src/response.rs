//! API response types.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// Standard API response wrapper: `{ "data": ... }`.
///
/// Errors never go through this type; `AppError` renders its own
/// `{ "error": { "code", "message" } }` body.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Create a success response.
    pub const fn ok(data: T) -> Self {
        Self { data }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// Body for operations that have nothing to return.
#[derive(Debug, Serialize)]
pub struct Done {
    pub ok: bool,
}

impl Done {
    /// A successful, empty result.
    #[must_use]
    pub const fn ok() -> ApiResponse<Self> {
        ApiResponse::ok(Self { ok: true })
    }
}
