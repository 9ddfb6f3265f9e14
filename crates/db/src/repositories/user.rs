//! User repository.

use std::sync::Arc;

use crate::entities::{FollowRequest, Following, User, follow_request, following, user};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, TransactionTrait,
    sea_query::{Expr, Query},
};
use socialx_common::{AppError, AppResult};

/// User repository for database operations.
#[derive(Clone)]
pub struct UserRepository {
    db: Arc<DatabaseConnection>,
}

impl UserRepository {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a user by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<user::Model>> {
        User::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(AppError::from)
    }

    /// Find a user by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<user::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::UserNotFound(id.to_string()))
    }

    /// Find users by IDs.
    ///
    /// Result order follows the database, not `ids`.
    pub async fn find_by_ids(&self, ids: &[String]) -> AppResult<Vec<user::Model>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        User::find()
            .filter(user::Column::Id.is_in(ids.to_vec()))
            .all(self.db.as_ref())
            .await
            .map_err(AppError::from)
    }

    /// Find a user by username (case-insensitive).
    pub async fn find_by_username(&self, username: &str) -> AppResult<Option<user::Model>> {
        User::find()
            .filter(user::Column::UsernameLower.eq(username.to_lowercase()))
            .one(self.db.as_ref())
            .await
            .map_err(AppError::from)
    }

    /// Find a user by email address.
    pub async fn find_by_email(&self, email: &str) -> AppResult<Option<user::Model>> {
        User::find()
            .filter(user::Column::Email.eq(email))
            .one(self.db.as_ref())
            .await
            .map_err(AppError::from)
    }

    /// Find a user by token.
    pub async fn find_by_token(&self, token: &str) -> AppResult<Option<user::Model>> {
        User::find()
            .filter(user::Column::Token.eq(token))
            .one(self.db.as_ref())
            .await
            .map_err(AppError::from)
    }

    /// Create a new user.
    pub async fn create(&self, model: user::ActiveModel) -> AppResult<user::Model> {
        model.insert(self.db.as_ref()).await.map_err(AppError::from)
    }

    /// Update a user.
    pub async fn update(&self, model: user::ActiveModel) -> AppResult<user::Model> {
        model.update(self.db.as_ref()).await.map_err(AppError::from)
    }

    /// Every user except `viewer_id`, newest account first.
    pub async fn find_discoverable(
        &self,
        viewer_id: &str,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<user::Model>> {
        User::find()
            .filter(user::Column::Id.ne(viewer_id))
            .order_by_desc(user::Column::CreatedAt)
            .order_by_desc(user::Column::Id)
            .offset(offset)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(AppError::from)
    }

    /// Delete a user together with every relationship touching them.
    ///
    /// Runs in one transaction: counterpart counters are decremented, edges in
    /// both directions and follow requests in both directions are removed, then
    /// the user row itself. Missing relationships are not an error; a missing
    /// user is `UserNotFound` and nothing is written.
    pub async fn delete_with_relationships(&self, user_id: &str) -> AppResult<()> {
        let txn = self.db.begin().await.map_err(AppError::from)?;

        // Users who followed the deleted account lose one `following`.
        User::update_many()
            .col_expr(
                user::Column::FollowingCount,
                Expr::cust("GREATEST(following_count - 1, 0)"),
            )
            .filter(
                user::Column::Id.in_subquery(
                    Query::select()
                        .column(following::Column::FollowerId)
                        .from(Following)
                        .and_where(following::Column::FolloweeId.eq(user_id))
                        .to_owned(),
                ),
            )
            .exec(&txn)
            .await
            .map_err(AppError::from)?;

        // Users the deleted account followed lose one `follower`.
        User::update_many()
            .col_expr(
                user::Column::FollowersCount,
                Expr::cust("GREATEST(followers_count - 1, 0)"),
            )
            .filter(
                user::Column::Id.in_subquery(
                    Query::select()
                        .column(following::Column::FolloweeId)
                        .from(Following)
                        .and_where(following::Column::FollowerId.eq(user_id))
                        .to_owned(),
                ),
            )
            .exec(&txn)
            .await
            .map_err(AppError::from)?;

        Following::delete_many()
            .filter(
                Condition::any()
                    .add(following::Column::FollowerId.eq(user_id))
                    .add(following::Column::FolloweeId.eq(user_id)),
            )
            .exec(&txn)
            .await
            .map_err(AppError::from)?;

        FollowRequest::delete_many()
            .filter(
                Condition::any()
                    .add(follow_request::Column::FromUserId.eq(user_id))
                    .add(follow_request::Column::ToUserId.eq(user_id)),
            )
            .exec(&txn)
            .await
            .map_err(AppError::from)?;

        let deleted = User::delete_by_id(user_id)
            .exec(&txn)
            .await
            .map_err(AppError::from)?;

        if deleted.rows_affected == 0 {
            // Dropping the transaction rolls back the counter updates.
            return Err(AppError::UserNotFound(user_id.to_string()));
        }

        txn.commit().await.map_err(AppError::from)?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn create_test_user(id: &str, username: &str) -> user::Model {
        user::Model {
            id: id.to_string(),
            username: username.to_string(),
            username_lower: username.to_lowercase(),
            email: format!("{username}@example.com"),
            full_name: "Test User".to_string(),
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

    fn exec(rows_affected: u64) -> MockExecResult {
        MockExecResult {
            last_insert_id: 0,
            rows_affected,
        }
    }

    #[tokio::test]
    async fn test_find_by_id_found() {
        let user = create_test_user("user1", "alice");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[user.clone()]])
                .into_connection(),
        );

        let repo = UserRepository::new(db);
        let result = repo.find_by_id("user1").await.unwrap();

        assert_eq!(result.unwrap().username, "alice");
    }

    #[tokio::test]
    async fn test_get_by_id_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<user::Model>::new()])
                .into_connection(),
        );

        let repo = UserRepository::new(db);
        let result = repo.get_by_id("missing").await;

        assert!(matches!(result, Err(AppError::UserNotFound(id)) if id == "missing"));
    }

    #[tokio::test]
    async fn test_find_by_ids_empty_skips_query() {
        // No results appended: a query would fail.
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());

        let repo = UserRepository::new(db);
        let result = repo.find_by_ids(&[]).await.unwrap();

        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn test_find_discoverable() {
        let u2 = create_test_user("user2", "bob");
        let u3 = create_test_user("user3", "carol");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[u3, u2]])
                .into_connection(),
        );

        let repo = UserRepository::new(db);
        let result = repo.find_discoverable("user1", 20, 0).await.unwrap();

        assert_eq!(result.len(), 2);
        assert!(result.iter().all(|u| u.id != "user1"));
    }

    #[tokio::test]
    async fn test_delete_with_relationships_commits() {
        // 2 followers, 1 followee, 3 edges, 1 request, then the user row.
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([exec(2), exec(1), exec(3), exec(1), exec(1)])
                .into_connection(),
        );

        let repo = UserRepository::new(db);
        repo.delete_with_relationships("user1").await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_with_relationships_without_relationships() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([exec(0), exec(0), exec(0), exec(0), exec(1)])
                .into_connection(),
        );

        let repo = UserRepository::new(db);
        assert!(repo.delete_with_relationships("loner").await.is_ok());
    }

    #[tokio::test]
    async fn test_delete_with_relationships_missing_user() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([exec(0), exec(0), exec(0), exec(0), exec(0)])
                .into_connection(),
        );

        let repo = UserRepository::new(db);
        let result = repo.delete_with_relationships("ghost").await;

        assert!(matches!(result, Err(AppError::UserNotFound(_))));
    }
}
