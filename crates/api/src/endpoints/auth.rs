//! Authentication endpoints.

use axum::{Json, Router, extract::State, routing::post};
use serde::{Deserialize, Serialize};
use socialx_common::AppResult;
use socialx_core::CreateUserInput;

use crate::{
    extractors::AuthUser,
    middleware::AppState,
    response::{ApiResponse, Done},
};

/// Credentials response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialsResponse {
    pub id: String,
    pub username: String,
    pub token: String,
}

/// Create a new user account.
async fn signup(
    State(state): State<AppState>,
    Json(req): Json<CreateUserInput>,
) -> AppResult<ApiResponse<CredentialsResponse>> {
    let user = state.user_service.create(req).await?;

    Ok(ApiResponse::ok(CredentialsResponse {
        id: user.id,
        username: user.username,
        token: user.token.unwrap_or_default(),
    }))
}

/// Signin request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SigninRequest {
    /// Username or email address.
    #[serde(alias = "email")]
    pub username: String,
    pub password: String,
}

/// Sign in to an existing account.
async fn signin(
    State(state): State<AppState>,
    Json(req): Json<SigninRequest>,
) -> AppResult<ApiResponse<CredentialsResponse>> {
    let user = state
        .user_service
        .authenticate(&req.username, &req.password)
        .await?;

    tracing::info!(user_id = %user.id, "User signed in");

    Ok(ApiResponse::ok(CredentialsResponse {
        id: user.id,
        username: user.username,
        token: user.token.unwrap_or_default(),
    }))
}

/// Sign out (invalidate current token by regenerating).
async fn signout(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Done>> {
    state.user_service.regenerate_token(&user.id).await?;

    Ok(Done::ok())
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup))
        .route("/signin", post(signin))
        .route("/signout", post(signout))
}
