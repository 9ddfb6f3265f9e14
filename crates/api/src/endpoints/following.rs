//! Following endpoints.

use axum::{Json, Router, extract::State, routing::post};
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use socialx_common::AppResult;
use socialx_core::{FollowEntry, IncomingRequest, OutgoingRequest};
use socialx_db::entities::follow_request::{self, FollowRequestStatus};

use crate::{
    extractors::AuthUser,
    middleware::AppState,
    response::{ApiResponse, Done},
};

/// Request targeting another user.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserIdRequest {
    pub user_id: String,
}

/// Follow request response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowRequestResponse {
    pub id: String,
    pub from_user_id: String,
    pub to_user_id: String,
    pub status: FollowRequestStatus,
    pub created_at: DateTime<FixedOffset>,
    pub responded_at: Option<DateTime<FixedOffset>>,
}

impl From<follow_request::Model> for FollowRequestResponse {
    fn from(r: follow_request::Model) -> Self {
        Self {
            id: r.id,
            from_user_id: r.from_user_id,
            to_user_id: r.to_user_id,
            status: r.status,
            created_at: r.created_at,
            responded_at: r.responded_at,
        }
    }
}

/// Ask to follow a user.
async fn create_request(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<UserIdRequest>,
) -> AppResult<ApiResponse<FollowRequestResponse>> {
    let request = state
        .relationship_service
        .send_follow_request(&user.id, &req.user_id)
        .await?;

    Ok(ApiResponse::ok(request.into()))
}

/// Page request params.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRequest {
    pub limit: Option<u64>,
    pub until_id: Option<String>,
}

/// List received follow requests (pending).
async fn list_requests(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    req: Option<Json<PageRequest>>,
) -> AppResult<ApiResponse<Vec<IncomingRequest>>> {
    let req = req.map(|Json(r)| r).unwrap_or_default();
    let requests = state
        .relationship_service
        .list_incoming_requests(&user.id, req.limit, req.until_id.as_deref())
        .await?;

    Ok(ApiResponse::ok(requests))
}

/// List sent follow requests (pending).
async fn list_sent_requests(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    req: Option<Json<PageRequest>>,
) -> AppResult<ApiResponse<Vec<OutgoingRequest>>> {
    let req = req.map(|Json(r)| r).unwrap_or_default();
    let requests = state
        .relationship_service
        .list_sent_requests(&user.id, req.limit, req.until_id.as_deref())
        .await?;

    Ok(ApiResponse::ok(requests))
}

/// Respond request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RespondRequest {
    pub request_id: String,
    /// `"accepted"` or `"rejected"`.
    pub decision: String,
}

/// Accept or reject a follow request.
async fn respond(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<RespondRequest>,
) -> AppResult<ApiResponse<FollowRequestResponse>> {
    let request = state
        .relationship_service
        .respond_to_request(&req.request_id, &user.id, &req.decision)
        .await?;

    Ok(ApiResponse::ok(request.into()))
}

/// Cancel request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelRequest {
    pub request_id: String,
}

/// Withdraw a pending follow request.
async fn cancel(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<CancelRequest>,
) -> AppResult<ApiResponse<Done>> {
    state
        .relationship_service
        .cancel_request(&user.id, &req.request_id)
        .await?;
    Ok(Done::ok())
}

/// Unfollow a user.
async fn unfollow(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<UserIdRequest>,
) -> AppResult<ApiResponse<Done>> {
    state
        .relationship_service
        .unfollow(&user.id, &req.user_id)
        .await?;
    Ok(Done::ok())
}

/// List followers/following request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListRequest {
    pub user_id: String,
    pub limit: Option<u64>,
    pub until_id: Option<String>,
}

/// Get followers of a user.
async fn followers(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<ListRequest>,
) -> AppResult<ApiResponse<Vec<FollowEntry>>> {
    let followers = state
        .relationship_service
        .list_followers(&user.id, &req.user_id, req.limit, req.until_id.as_deref())
        .await?;

    Ok(ApiResponse::ok(followers))
}

/// Get users that a user is following.
async fn following(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<ListRequest>,
) -> AppResult<ApiResponse<Vec<FollowEntry>>> {
    let following = state
        .relationship_service
        .list_following(&user.id, &req.user_id, req.limit, req.until_id.as_deref())
        .await?;

    Ok(ApiResponse::ok(following))
}

/// Mutual follow response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MutualResponse {
    pub is_mutual: bool,
}

/// Whether the current user and another user follow each other.
async fn mutual(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<UserIdRequest>,
) -> AppResult<ApiResponse<MutualResponse>> {
    let is_mutual = state
        .relationship_service
        .compute_mutual_follow(&user.id, &req.user_id)
        .await?;

    Ok(ApiResponse::ok(MutualResponse { is_mutual }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/requests/create", post(create_request))
        .route("/requests/list", post(list_requests))
        .route("/requests/sent", post(list_sent_requests))
        .route("/requests/respond", post(respond))
        .route("/requests/cancel", post(cancel))
        .route("/delete", post(unfollow))
        .route("/followers", post(followers))
        .route("/following", post(following))
        .route("/mutual", post(mutual))
}
