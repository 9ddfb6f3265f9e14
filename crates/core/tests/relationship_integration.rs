//! Relationship service tests against a live database.
//!
//! These tests require a running `PostgreSQL` instance.
//! Run with: `cargo test -p socialx-core --test relationship_integration -- --ignored`

#![allow(clippy::unwrap_used)]

use socialx_common::{AppError, config::RelationshipConfig};
use socialx_core::{CreateUserInput, RelationshipService, UserService};
use socialx_db::{
    repositories::{FollowRequestRepository, FollowingRepository, UserRepository},
    test_utils::TestDatabase,
};

fn signup(username: &str) -> CreateUserInput {
    CreateUserInput {
        username: username.to_string(),
        email: format!("{username}@example.com"),
        full_name: username.to_string(),
        password: "correct horse battery".to_string(),
    }
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_concurrent_requests_between_pair_yield_one_pending() {
    let db = TestDatabase::create_unique().await.unwrap();

    {
        let users = UserService::new(
            UserRepository::new(db.connection()),
            FollowingRepository::new(db.connection()),
            100,
        );
        let service = RelationshipService::new(
            FollowingRepository::new(db.connection()),
            FollowRequestRepository::new(db.connection()),
            UserRepository::new(db.connection()),
            RelationshipConfig::default(),
        );

        let alice = users.create(signup("alice")).await.unwrap();
        let bob = users.create(signup("bob")).await.unwrap();

        let (forward, reverse) = tokio::join!(
            service.send_follow_request(&alice.id, &bob.id),
            service.send_follow_request(&bob.id, &alice.id),
        );

        let outcomes = [forward, reverse];
        assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(
            outcomes
                .iter()
                .any(|r| matches!(r, Err(AppError::Conflict(_))))
        );

        // The same direction again also collides with the pending request.
        let repeated = service.send_follow_request(&alice.id, &bob.id).await;
        assert!(matches!(repeated, Err(AppError::Conflict(_))));
    }

    db.drop_database().await.unwrap();
}
