//! Following repository (the edge store).

use std::sync::Arc;

use crate::entities::{Following, User, following, user};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
    sea_query::{Expr, OnConflict},
};
use socialx_common::{AppError, AppResult};

/// Following repository for database operations.
#[derive(Clone)]
pub struct FollowingRepository {
    db: Arc<DatabaseConnection>,
}

impl FollowingRepository {
    /// Create a new following repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a following relationship by follower and followee.
    pub async fn find_by_pair(
        &self,
        follower_id: &str,
        followee_id: &str,
    ) -> AppResult<Option<following::Model>> {
        Following::find()
            .filter(following::Column::FollowerId.eq(follower_id))
            .filter(following::Column::FolloweeId.eq(followee_id))
            .one(self.db.as_ref())
            .await
            .map_err(AppError::from)
    }

    /// Check if a user is following another user.
    pub async fn is_following(&self, follower_id: &str, followee_id: &str) -> AppResult<bool> {
        Ok(self.find_by_pair(follower_id, followee_id).await?.is_some())
    }

    /// Ensure `follower_id` follows `followee_id`.
    ///
    /// Idempotent: returns `false` and leaves the counters alone when the edge
    /// already exists.
    pub async fn apply_follow(
        &self,
        id: &str,
        follower_id: &str,
        followee_id: &str,
    ) -> AppResult<bool> {
        let txn = self.db.begin().await.map_err(AppError::from)?;
        let inserted = insert_edge(&txn, id, follower_id, followee_id)
            .await
            .map_err(AppError::from)?;
        txn.commit().await.map_err(AppError::from)?;
        Ok(inserted)
    }

    /// Remove the edge `follower_id -> followee_id` and decrement both counters
    /// in one transaction.
    ///
    /// Returns `false` (and writes nothing) if there was no such edge.
    pub async fn remove_follow(&self, follower_id: &str, followee_id: &str) -> AppResult<bool> {
        let txn = self.db.begin().await.map_err(AppError::from)?;

        let deleted = Following::delete_many()
            .filter(following::Column::FollowerId.eq(follower_id))
            .filter(following::Column::FolloweeId.eq(followee_id))
            .exec(&txn)
            .await
            .map_err(AppError::from)?;

        if deleted.rows_affected == 0 {
            return Ok(false);
        }

        adjust_follow_counts(&txn, follower_id, followee_id, false)
            .await
            .map_err(AppError::from)?;
        txn.commit().await.map_err(AppError::from)?;
        Ok(true)
    }

    /// Get users that a user is following (paginated, newest edge first).
    pub async fn find_following(
        &self,
        user_id: &str,
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Vec<following::Model>> {
        let mut query = Following::find()
            .filter(following::Column::FollowerId.eq(user_id))
            .order_by_desc(following::Column::Id);

        if let Some(id) = until_id {
            query = query.filter(following::Column::Id.lt(id));
        }

        query
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(AppError::from)
    }

    /// Get users that are following a user (paginated, newest edge first).
    pub async fn find_followers(
        &self,
        user_id: &str,
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Vec<following::Model>> {
        let mut query = Following::find()
            .filter(following::Column::FolloweeId.eq(user_id))
            .order_by_desc(following::Column::Id);

        if let Some(id) = until_id {
            query = query.filter(following::Column::Id.lt(id));
        }

        query
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(AppError::from)
    }

    /// Count following of a user.
    pub async fn count_following(&self, user_id: &str) -> AppResult<u64> {
        Following::find()
            .filter(following::Column::FollowerId.eq(user_id))
            .count(self.db.as_ref())
            .await
            .map_err(AppError::from)
    }
}

/// Insert an edge unless it already exists, bumping both counters when a row
/// was actually written. Runs on whatever connection or transaction it is given.
pub(crate) async fn insert_edge<C: ConnectionTrait>(
    conn: &C,
    id: &str,
    follower_id: &str,
    followee_id: &str,
) -> Result<bool, DbErr> {
    let model = following::ActiveModel {
        id: Set(id.to_string()),
        follower_id: Set(follower_id.to_string()),
        followee_id: Set(followee_id.to_string()),
        created_at: Set(chrono::Utc::now().into()),
    };

    let inserted = Following::insert(model)
        .on_conflict(
            OnConflict::columns([following::Column::FollowerId, following::Column::FolloweeId])
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(conn)
        .await?;

    if inserted == 0 {
        return Ok(false);
    }

    adjust_follow_counts(conn, follower_id, followee_id, true).await?;
    Ok(true)
}

/// Move `follower.following_count` and `followee.followers_count` up or
/// down by one. Decrements never go below zero.
async fn adjust_follow_counts<C: ConnectionTrait>(
    conn: &C,
    follower_id: &str,
    followee_id: &str,
    increment: bool,
) -> Result<(), DbErr> {
    let (following_expr, followers_expr) = if increment {
        (
            Expr::col(user::Column::FollowingCount).add(1),
            Expr::col(user::Column::FollowersCount).add(1),
        )
    } else {
        (
            Expr::cust("GREATEST(following_count - 1, 0)"),
            Expr::cust("GREATEST(followers_count - 1, 0)"),
        )
    };

    User::update_many()
        .col_expr(user::Column::FollowingCount, following_expr)
        .filter(user::Column::Id.eq(follower_id))
        .exec(conn)
        .await?;

    User::update_many()
        .col_expr(user::Column::FollowersCount, followers_expr)
        .filter(user::Column::Id.eq(followee_id))
        .exec(conn)
        .await?;

    Ok(())
}
