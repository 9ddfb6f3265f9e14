//! Users endpoints.

use axum::{Json, Router, extract::State, routing::post};
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use socialx_common::{AppError, AppResult};
use socialx_core::{UpdateUserInput, UserProfile, UserSummary};
use socialx_db::entities::user;

use crate::{
    extractors::AuthUser,
    middleware::AppState,
    response::{ApiResponse, Done},
};

/// The signed-in user's own account.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    pub id: String,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub bio: String,
    pub avatar_url: Option<String>,
    pub followers_count: i32,
    pub following_count: i32,
    pub created_at: DateTime<FixedOffset>,
}

impl From<user::Model> for MeResponse {
    fn from(user: user::Model) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            full_name: user.full_name,
            bio: user.bio,
            avatar_url: user.avatar_url,
            followers_count: user.followers_count,
            following_count: user.following_count,
            created_at: user.created_at,
        }
    }
}

/// Get current user.
async fn me(AuthUser(user): AuthUser) -> ApiResponse<MeResponse> {
    ApiResponse::ok(user.into())
}

/// Show user request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShowUserRequest {
    pub user_id: Option<String>,
    pub username: Option<String>,
}

/// Get a user's profile by ID or username.
async fn show(
    AuthUser(viewer): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<ShowUserRequest>,
) -> AppResult<ApiResponse<UserProfile>> {
    let target_id = match (req.user_id, req.username) {
        (Some(user_id), _) => user_id,
        (None, Some(username)) => state.user_service.get_by_username(&username).await?.id,
        (None, None) => {
            return Err(AppError::BadRequest(
                "Either userId or username is required".to_string(),
            ));
        }
    };

    let profile = state
        .user_service
        .get_profile(&viewer.id, &target_id)
        .await?;
    Ok(ApiResponse::ok(profile))
}

/// Update the current user's profile.
async fn update(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<UpdateUserInput>,
) -> AppResult<ApiResponse<MeResponse>> {
    let updated = state.user_service.update(&user.id, req).await?;
    Ok(ApiResponse::ok(updated.into()))
}

/// Delete the current user's account along with all of its relationships.
async fn delete(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Done>> {
    state
        .relationship_service
        .cascade_remove_user(&user.id)
        .await?;
    Ok(Done::ok())
}

/// Discovery request.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryRequest {
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

/// Users the current user might follow.
async fn discovery(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    req: Option<Json<DiscoveryRequest>>,
) -> AppResult<ApiResponse<Vec<UserSummary>>> {
    let req = req.map(|Json(r)| r).unwrap_or_default();
    let users = state
        .user_service
        .list_discoverable(&user.id, req.limit, req.offset)
        .await?;
    Ok(ApiResponse::ok(users))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/me", post(me))
        .route("/show", post(show))
        .route("/update", post(update))
        .route("/delete", post(delete))
        .route("/discovery", post(discovery))
}
