//! API integration tests.
//!
//! These tests drive the router end to end over a mock database.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
    middleware,
};
use chrono::Utc;
use sea_orm::{DatabaseBackend, MockDatabase};
use serde_json::Value;
use socialx_api::{
    health_router,
    middleware::{AppState, auth_middleware},
    router as api_router,
};
use socialx_common::config::RelationshipConfig;
use socialx_core::{RelationshipService, UserService};
use socialx_db::{
    entities::{follow_request, following, user},
    repositories::{FollowRequestRepository, FollowingRepository, UserRepository},
};
use std::sync::Arc;
use tower::ServiceExt;

fn create_test_user(id: &str, username: &str) -> user::Model {
    user::Model {
        id: id.to_string(),
        username: username.to_string(),
        username_lower: username.to_lowercase(),
        email: format!("{username}@example.com"),
        full_name: format!("{username} test"),
        bio: String::new(),
        avatar_url: None,
        password: "$argon2id$placeholder".to_string(),
        token: Some(format!("token_{id}")),
        followers_count: 0,
        following_count: 0,
        created_at: Utc::now().into(),
        updated_at: None,
    }
}

/// Create test app state over one shared mock database.
fn create_test_state(db: MockDatabase) -> AppState {
    let db = Arc::new(db.into_connection());

    let user_repo = UserRepository::new(Arc::clone(&db));
    let following_repo = FollowingRepository::new(Arc::clone(&db));
    let follow_request_repo = FollowRequestRepository::new(Arc::clone(&db));

    AppState {
        user_service: UserService::new(user_repo.clone(), following_repo.clone(), 100),
        relationship_service: RelationshipService::new(
            following_repo,
            follow_request_repo,
            user_repo,
            RelationshipConfig::default(),
        ),
    }
}

fn create_test_router(db: MockDatabase) -> Router {
    let state = create_test_state(db);
    Router::new()
        .merge(health_router())
        .nest("/api", api_router())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .with_state(state)
}

fn empty_db() -> MockDatabase {
    MockDatabase::new(DatabaseBackend::Postgres)
}

/// Mock database whose first query resolves `token_user1` to alice.
fn authed_db() -> MockDatabase {
    empty_db().append_query_results([[create_test_user("user1", "alice")]])
}

fn post_empty(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .method("POST")
        .header("Authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap()
}

fn post_json(uri: &str, token: Option<&str>, body: &str) -> Request<Body> {
    let mut builder = Request::builder()
        .uri(uri)
        .method("POST")
        .header("Content-Type", "application/json");
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_healthz() {
    let app = create_test_router(empty_db());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/healthz")
                .method("GET")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["status"], "ok");
}

#[tokio::test]
async fn test_unknown_endpoint_returns_404() {
    let app = create_test_router(empty_db());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/nonexistent/endpoint")
                .method("GET")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_follow_request_requires_auth() {
    let app = create_test_router(empty_db());

    let response = app
        .oneshot(post_json(
            "/api/following/requests/create",
            None,
            r#"{"userId":"user2"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_signin_unknown_user() {
    let app = create_test_router(empty_db().append_query_results([Vec::<user::Model>::new()]));

    let response = app
        .oneshot(post_json(
            "/api/signin",
            None,
            r#"{"username":"nonexistent","password":"wrongpassword"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_signup_with_invalid_json_returns_error() {
    let app = create_test_router(empty_db());

    let response = app
        .oneshot(post_json("/api/signup", None, "{not json"))
        .await
        .unwrap();

    assert!(response.status().is_client_error());
}

#[tokio::test]
async fn test_follow_request_to_self_is_invalid() {
    let app = create_test_router(authed_db());

    let response = app
        .oneshot(post_json(
            "/api/following/requests/create",
            Some("token_user1"),
            r#"{"userId":"user1"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(response).await["error"]["code"],
        "INVALID_OPERATION"
    );
}

#[tokio::test]
async fn test_respond_with_unknown_decision() {
    let app = create_test_router(authed_db());

    let response = app
        .oneshot(post_json(
            "/api/following/requests/respond",
            Some("token_user1"),
            r#"{"requestId":"r1","decision":"maybe"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_followers_hidden_without_mutual_follow() {
    let db = authed_db()
        .append_query_results([[create_test_user("user2", "bob")]])
        .append_query_results([Vec::<following::Model>::new()])
        .append_query_results([Vec::<following::Model>::new()]);
    let app = create_test_router(db);

    let response = app
        .oneshot(post_json(
            "/api/following/followers",
            Some("token_user1"),
            r#"{"userId":"user2"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(json_body(response).await["error"]["code"], "FORBIDDEN");
}

#[tokio::test]
async fn test_discovery_lists_other_users() {
    let db = authed_db().append_query_results([[
        create_test_user("user3", "carol"),
        create_test_user("user2", "bob"),
    ]]);
    let app = create_test_router(db);

    let response = app
        .oneshot(post_json(
            "/api/users/discovery",
            Some("token_user1"),
            r#"{"limit":5}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    let users = body["data"].as_array().unwrap();
    assert_eq!(users.len(), 2);
    assert_eq!(users[0]["username"], "carol");
    assert!(users[0].get("email").is_none());
}

#[tokio::test]
async fn test_me_returns_current_user() {
    let app = create_test_router(authed_db());

    let response = app
        .oneshot(post_json("/api/users/me", Some("token_user1"), "{}"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["data"]["username"], "alice");
    assert!(body["data"].get("password").is_none());
}

#[tokio::test]
async fn test_list_requests_without_body_uses_defaults() {
    let db = authed_db().append_query_results([Vec::<follow_request::Model>::new()]);
    let app = create_test_router(db);

    let response = app
        .oneshot(post_empty("/api/following/requests/list", "token_user1"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_discovery_without_body_uses_defaults() {
    let db = authed_db().append_query_results([[create_test_user("user2", "bob")]]);
    let app = create_test_router(db);

    let response = app
        .oneshot(post_empty("/api/users/discovery", "token_user1"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["data"][0]["username"], "bob");
}
