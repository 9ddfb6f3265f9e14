//! Follow request repository (the request ledger).

use std::sync::Arc;

use crate::entities::{
    FollowRequest,
    follow_request::{self, FollowRequestStatus},
};
use crate::repositories::following::insert_edge;
use sea_orm::{
    ActiveEnum, ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, TransactionTrait, sea_query::Expr,
};
use socialx_common::{AppError, AppResult, IdGenerator};

/// Follow request repository for database operations.
#[derive(Clone)]
pub struct FollowRequestRepository {
    db: Arc<DatabaseConnection>,
}

impl FollowRequestRepository {
    /// Create a new follow request repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a follow request by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<follow_request::Model>> {
        FollowRequest::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(AppError::from)
    }

    /// Find the pending request between two users, in either direction.
    pub async fn find_pending_between(
        &self,
        a: &str,
        b: &str,
    ) -> AppResult<Option<follow_request::Model>> {
        FollowRequest::find()
            .filter(follow_request::Column::OpenPairKey.eq(IdGenerator::pair_key(a, b)))
            .one(self.db.as_ref())
            .await
            .map_err(AppError::from)
    }

    /// Find any request ever recorded between two users, in either direction
    /// and with any status.
    pub async fn find_any_between(
        &self,
        a: &str,
        b: &str,
    ) -> AppResult<Option<follow_request::Model>> {
        FollowRequest::find()
            .filter(
                Condition::any()
                    .add(
                        Condition::all()
                            .add(follow_request::Column::FromUserId.eq(a))
                            .add(follow_request::Column::ToUserId.eq(b)),
                    )
                    .add(
                        Condition::all()
                            .add(follow_request::Column::FromUserId.eq(b))
                            .add(follow_request::Column::ToUserId.eq(a)),
                    ),
            )
            .one(self.db.as_ref())
            .await
            .map_err(AppError::from)
    }

    /// Create a new follow request.
    pub async fn create(
        &self,
        model: follow_request::ActiveModel,
    ) -> AppResult<follow_request::Model> {
        model.insert(self.db.as_ref()).await.map_err(AppError::from)
    }

    /// Get pending follow requests addressed to a user (paginated, newest first).
    pub async fn find_received_pending(
        &self,
        user_id: &str,
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Vec<follow_request::Model>> {
        let mut query = FollowRequest::find()
            .filter(follow_request::Column::ToUserId.eq(user_id))
            .filter(follow_request::Column::Status.eq(FollowRequestStatus::Pending))
            .order_by_desc(follow_request::Column::Id);

        if let Some(id) = until_id {
            query = query.filter(follow_request::Column::Id.lt(id));
        }

        query
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(AppError::from)
    }

    /// Get pending follow requests sent by a user (paginated, newest first).
    pub async fn find_sent_pending(
        &self,
        user_id: &str,
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Vec<follow_request::Model>> {
        let mut query = FollowRequest::find()
            .filter(follow_request::Column::FromUserId.eq(user_id))
            .filter(follow_request::Column::Status.eq(FollowRequestStatus::Pending))
            .order_by_desc(follow_request::Column::Id);

        if let Some(id) = until_id {
            query = query.filter(follow_request::Column::Id.lt(id));
        }

        query
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(AppError::from)
    }

    /// Delete a request that is still pending and was sent by `from_user_id`.
    ///
    /// Returns `false` when no such row exists (already resolved, or not
    /// the sender's).
    pub async fn delete_pending(&self, id: &str, from_user_id: &str) -> AppResult<bool> {
        let result = FollowRequest::delete_many()
            .filter(follow_request::Column::Id.eq(id))
            .filter(follow_request::Column::FromUserId.eq(from_user_id))
            .filter(follow_request::Column::Status.eq(FollowRequestStatus::Pending))
            .exec(self.db.as_ref())
            .await
            .map_err(AppError::from)?;

        Ok(result.rows_affected > 0)
    }

    /// Move a pending request to `status`, in one transaction.
    ///
    /// The status flip is conditional on the row still being pending; if
    /// another responder won the race nothing is written and `Conflict` is
    /// returned. On `Accepted` the edge `from -> to` is inserted (with id
    /// `edge_id`) and the counters bumped before commit.
    pub async fn resolve(
        &self,
        request: &follow_request::Model,
        status: FollowRequestStatus,
        edge_id: &str,
    ) -> AppResult<follow_request::Model> {
        if !status.is_terminal() {
            return Err(AppError::InvalidOperation(
                "a request can only be resolved to accepted or rejected".to_string(),
            ));
        }

        let responded_at: sea_orm::prelude::DateTimeWithTimeZone = chrono::Utc::now().into();
        let txn = self.db.begin().await.map_err(AppError::from)?;

        let updated = FollowRequest::update_many()
            .col_expr(follow_request::Column::Status, Expr::value(status.to_value()))
            .col_expr(
                follow_request::Column::OpenPairKey,
                Expr::value(Option::<String>::None),
            )
            .col_expr(follow_request::Column::RespondedAt, Expr::value(responded_at))
            .filter(follow_request::Column::Id.eq(&request.id))
            .filter(follow_request::Column::Status.eq(FollowRequestStatus::Pending))
            .exec(&txn)
            .await
            .map_err(AppError::from)?;

        if updated.rows_affected == 0 {
            return Err(AppError::Conflict(format!(
                "Follow request {} has already been resolved",
                request.id
            )));
        }

        if status == FollowRequestStatus::Accepted {
            insert_edge(&txn, edge_id, &request.from_user_id, &request.to_user_id)
                .await
                .map_err(AppError::from)?;
        }

        txn.commit().await.map_err(AppError::from)?;

        Ok(follow_request::Model {
            status,
            open_pair_key: None,
            responded_at: Some(responded_at),
            ..request.clone()
        })
    }
}
