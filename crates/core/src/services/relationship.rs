//! Relationship service: follow requests, follow edges and list visibility.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset};
use sea_orm::Set;
use serde::Serialize;
use socialx_common::{AppError, AppResult, IdGenerator, config::RelationshipConfig};
use socialx_db::{
    entities::{
        follow_request::{self, FollowRequestStatus},
        following,
    },
    repositories::{FollowRequestRepository, FollowingRepository, UserRepository},
};

use crate::pagination::{RELATIONSHIP_DEFAULT_LIMIT, clamp_limit};
use crate::services::user::UserSummary;

/// A recipient's answer to a follow request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowDecision {
    Accepted,
    Rejected,
}

impl FromStr for FollowDecision {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "accepted" => Ok(Self::Accepted),
            "rejected" => Ok(Self::Rejected),
            other => Err(AppError::InvalidOperation(format!(
                "Unknown decision '{other}', expected 'accepted' or 'rejected'"
            ))),
        }
    }
}

impl From<FollowDecision> for FollowRequestStatus {
    fn from(decision: FollowDecision) -> Self {
        match decision {
            FollowDecision::Accepted => Self::Accepted,
            FollowDecision::Rejected => Self::Rejected,
        }
    }
}

/// Which of a user's lists is being viewed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    Followers,
    Following,
}

impl fmt::Display for ListKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Followers => f.write_str("followers"),
            Self::Following => f.write_str("following"),
        }
    }
}

/// Outcome of the list visibility check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// The viewer is looking at their own list.
    Own,
    /// Viewer and target follow each other.
    Mutual,
    /// Neither of the above.
    Hidden,
}

impl Visibility {
    /// Whether the list may be shown.
    #[must_use]
    pub const fn is_allowed(self) -> bool {
        !matches!(self, Self::Hidden)
    }
}

/// A pending request addressed to the viewer, with the requester's profile.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomingRequest {
    pub id: String,
    pub created_at: DateTime<FixedOffset>,
    pub requester: UserSummary,
}

/// A pending request sent by the viewer, with the recipient's profile.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutgoingRequest {
    pub id: String,
    pub created_at: DateTime<FixedOffset>,
    pub recipient: UserSummary,
}

/// One row of a followers or following list.
///
/// `id` is the edge id and serves as the `untilId` cursor for the next page.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowEntry {
    pub id: String,
    pub created_at: DateTime<FixedOffset>,
    pub user: UserSummary,
}

/// Relationship service for business logic.
#[derive(Clone)]
pub struct RelationshipService {
    following_repo: FollowingRepository,
    follow_request_repo: FollowRequestRepository,
    user_repo: UserRepository,
    config: RelationshipConfig,
    id_gen: IdGenerator,
}

impl RelationshipService {
    /// Create a new relationship service.
    #[must_use]
    pub const fn new(
        following_repo: FollowingRepository,
        follow_request_repo: FollowRequestRepository,
        user_repo: UserRepository,
        config: RelationshipConfig,
    ) -> Self {
        Self {
            following_repo,
            follow_request_repo,
            user_repo,
            config,
            id_gen: IdGenerator::new(),
        }
    }

    // ==================== Request ledger ====================

    /// Ask to follow `to_user_id`.
    ///
    /// Checks run in order and the first failure wins: not yourself, target
    /// exists, not already following, no blocking request between the pair.
    /// Which existing requests block depends on
    /// [`RelationshipConfig::allow_request_after_resolution`].
    pub async fn send_follow_request(
        &self,
        from_user_id: &str,
        to_user_id: &str,
    ) -> AppResult<follow_request::Model> {
        if from_user_id == to_user_id {
            return Err(AppError::InvalidOperation(
                "Cannot follow yourself".to_string(),
            ));
        }

        self.user_repo.get_by_id(to_user_id).await?;

        if self
            .following_repo
            .is_following(from_user_id, to_user_id)
            .await?
        {
            return Err(AppError::Conflict("Already following".to_string()));
        }

        let blocking = if self.config.allow_request_after_resolution {
            self.follow_request_repo
                .find_pending_between(from_user_id, to_user_id)
                .await?
        } else {
            self.follow_request_repo
                .find_any_between(from_user_id, to_user_id)
                .await?
        };

        if let Some(existing) = blocking {
            return Err(AppError::Conflict(format!(
                "A follow request already exists between these users ({})",
                existing.id
            )));
        }

        let model = follow_request::ActiveModel {
            id: Set(self.id_gen.generate()),
            from_user_id: Set(from_user_id.to_string()),
            to_user_id: Set(to_user_id.to_string()),
            status: Set(FollowRequestStatus::Pending),
            open_pair_key: Set(Some(IdGenerator::pair_key(from_user_id, to_user_id))),
            created_at: Set(chrono::Utc::now().into()),
            responded_at: Set(None),
        };

        match self.follow_request_repo.create(model).await {
            Ok(request) => {
                tracing::info!(
                    request_id = %request.id,
                    from_user_id = %from_user_id,
                    to_user_id = %to_user_id,
                    "Follow request sent"
                );
                Ok(request)
            }
            Err(AppError::Conflict(detail)) => {
                tracing::warn!(
                    from_user_id = %from_user_id,
                    to_user_id = %to_user_id,
                    detail = %detail,
                    "Concurrent follow request rejected by pair index"
                );
                Err(AppError::Conflict(
                    "A follow request already exists between these users".to_string(),
                ))
            }
            Err(e) => Err(e),
        }
    }

    /// Accept or reject a request addressed to `responder_id`.
    ///
    /// `decision` must be `"accepted"` or `"rejected"`. Accepting makes the
    /// requester follow the responder; the status change and the edge are
    /// written in one transaction.
    pub async fn respond_to_request(
        &self,
        request_id: &str,
        responder_id: &str,
        decision: &str,
    ) -> AppResult<follow_request::Model> {
        let decision: FollowDecision = decision.parse()?;

        let request = self
            .follow_request_repo
            .find_by_id(request_id)
            .await?
            .filter(|r| r.to_user_id == responder_id)
            .ok_or_else(|| AppError::FollowRequestNotFound(request_id.to_string()))?;

        if request.status.is_terminal() {
            return Err(AppError::Conflict(format!(
                "Follow request {request_id} is not pending"
            )));
        }

        let resolved = self
            .follow_request_repo
            .resolve(&request, decision.into(), &self.id_gen.generate())
            .await
            .inspect_err(|e| {
                if matches!(e, AppError::Conflict(_)) {
                    tracing::warn!(request_id = %request_id, "Follow request resolved concurrently");
                }
            })?;

        tracing::info!(
            request_id = %request_id,
            from_user_id = %resolved.from_user_id,
            to_user_id = %resolved.to_user_id,
            status = ?resolved.status,
            "Follow request resolved"
        );

        Ok(resolved)
    }

    /// Withdraw a pending request the caller sent. The record is deleted.
    pub async fn cancel_request(&self, from_user_id: &str, request_id: &str) -> AppResult<()> {
        let request = self
            .follow_request_repo
            .find_by_id(request_id)
            .await?
            .filter(|r| r.from_user_id == from_user_id)
            .ok_or_else(|| AppError::FollowRequestNotFound(request_id.to_string()))?;

        if request.status.is_terminal()
            || !self
                .follow_request_repo
                .delete_pending(request_id, from_user_id)
                .await?
        {
            return Err(AppError::Conflict(format!(
                "Follow request {request_id} is not pending"
            )));
        }

        tracing::info!(request_id = %request_id, from_user_id = %from_user_id, "Follow request cancelled");
        Ok(())
    }

    /// Pending requests addressed to `user_id`, newest first.
    pub async fn list_incoming_requests(
        &self,
        user_id: &str,
        limit: Option<u64>,
        until_id: Option<&str>,
    ) -> AppResult<Vec<IncomingRequest>> {
        let limit = clamp_limit(limit, RELATIONSHIP_DEFAULT_LIMIT, self.config.max_page_size);
        let requests = self
            .follow_request_repo
            .find_received_pending(user_id, limit, until_id)
            .await?;

        let profiles = self
            .summaries(requests.iter().map(|r| r.from_user_id.clone()).collect())
            .await?;

        Ok(requests
            .into_iter()
            .filter_map(|r| {
                let requester = profiles.get(&r.from_user_id)?.clone();
                Some(IncomingRequest {
                    id: r.id,
                    created_at: r.created_at,
                    requester,
                })
            })
            .collect())
    }

    /// Pending requests sent by `user_id`, newest first.
    pub async fn list_sent_requests(
        &self,
        user_id: &str,
        limit: Option<u64>,
        until_id: Option<&str>,
    ) -> AppResult<Vec<OutgoingRequest>> {
        let limit = clamp_limit(limit, RELATIONSHIP_DEFAULT_LIMIT, self.config.max_page_size);
        let requests = self
            .follow_request_repo
            .find_sent_pending(user_id, limit, until_id)
            .await?;

        let profiles = self
            .summaries(requests.iter().map(|r| r.to_user_id.clone()).collect())
            .await?;

        Ok(requests
            .into_iter()
            .filter_map(|r| {
                let recipient = profiles.get(&r.to_user_id)?.clone();
                Some(OutgoingRequest {
                    id: r.id,
                    created_at: r.created_at,
                    recipient,
                })
            })
            .collect())
    }

    // ==================== Edge store ====================

    /// Make `follower_id` follow `followee_id` if it does not already.
    ///
    /// Returns whether a new edge was created.
    pub async fn apply_follow(&self, follower_id: &str, followee_id: &str) -> AppResult<bool> {
        if follower_id == followee_id {
            return Err(AppError::InvalidOperation(
                "Cannot follow yourself".to_string(),
            ));
        }

        self.following_repo
            .apply_follow(&self.id_gen.generate(), follower_id, followee_id)
            .await
    }

    /// Stop following a user.
    pub async fn unfollow(&self, follower_id: &str, followee_id: &str) -> AppResult<()> {
        if follower_id == followee_id {
            return Err(AppError::InvalidOperation(
                "Cannot unfollow yourself".to_string(),
            ));
        }

        if !self
            .following_repo
            .is_following(follower_id, followee_id)
            .await?
        {
            return Err(AppError::Conflict("Not following".to_string()));
        }

        if !self
            .following_repo
            .remove_follow(follower_id, followee_id)
            .await?
        {
            tracing::warn!(follower_id = %follower_id, followee_id = %followee_id, "Edge removed concurrently");
            return Err(AppError::Conflict("Not following".to_string()));
        }

        tracing::info!(follower_id = %follower_id, followee_id = %followee_id, "Unfollowed");
        Ok(())
    }

    /// Delete a user and every edge and request that touches them.
    pub async fn cascade_remove_user(&self, user_id: &str) -> AppResult<()> {
        self.user_repo.delete_with_relationships(user_id).await?;
        tracing::info!(user_id = %user_id, "User and relationships removed");
        Ok(())
    }

    /// Whether `follower_id` follows `followee_id`.
    pub async fn is_following(&self, follower_id: &str, followee_id: &str) -> AppResult<bool> {
        self.following_repo
            .is_following(follower_id, followee_id)
            .await
    }

    // ==================== Visibility gate ====================

    /// Whether `a` and `b` follow each other. Each direction is looked up on
    /// its own.
    pub async fn compute_mutual_follow(&self, a: &str, b: &str) -> AppResult<bool> {
        let a_follows_b = self.following_repo.is_following(a, b).await?;
        let b_follows_a = self.following_repo.is_following(b, a).await?;
        Ok(a_follows_b && b_follows_a)
    }

    /// How `viewer_id` relates to `target_id` for the purpose of list viewing.
    pub async fn list_visibility(&self, viewer_id: &str, target_id: &str) -> AppResult<Visibility> {
        if viewer_id == target_id {
            return Ok(Visibility::Own);
        }

        if self.compute_mutual_follow(viewer_id, target_id).await? {
            Ok(Visibility::Mutual)
        } else {
            Ok(Visibility::Hidden)
        }
    }

    /// Allow a list view or fail with `Forbidden`.
    pub async fn authorize_list_view(
        &self,
        viewer_id: &str,
        target_id: &str,
        kind: ListKind,
    ) -> AppResult<Visibility> {
        let visibility = self.list_visibility(viewer_id, target_id).await?;

        if !visibility.is_allowed() {
            tracing::debug!(viewer_id = %viewer_id, target_id = %target_id, kind = %kind, "List view denied");
            return Err(AppError::Forbidden(format!(
                "Only mutual followers can see this user's {kind}"
            )));
        }

        Ok(visibility)
    }

    /// Followers of `target_id`, if `viewer_id` may see them.
    pub async fn list_followers(
        &self,
        viewer_id: &str,
        target_id: &str,
        limit: Option<u64>,
        until_id: Option<&str>,
    ) -> AppResult<Vec<FollowEntry>> {
        self.user_repo.get_by_id(target_id).await?;
        self.authorize_list_view(viewer_id, target_id, ListKind::Followers)
            .await?;

        let limit = clamp_limit(limit, RELATIONSHIP_DEFAULT_LIMIT, self.config.max_page_size);
        let edges = self
            .following_repo
            .find_followers(target_id, limit, until_id)
            .await?;

        self.compose_entries(edges, |edge| &edge.follower_id).await
    }

    /// Users `target_id` follows, if `viewer_id` may see them.
    pub async fn list_following(
        &self,
        viewer_id: &str,
        target_id: &str,
        limit: Option<u64>,
        until_id: Option<&str>,
    ) -> AppResult<Vec<FollowEntry>> {
        self.user_repo.get_by_id(target_id).await?;
        self.authorize_list_view(viewer_id, target_id, ListKind::Following)
            .await?;

        let limit = clamp_limit(limit, RELATIONSHIP_DEFAULT_LIMIT, self.config.max_page_size);
        let edges = self
            .following_repo
            .find_following(target_id, limit, until_id)
            .await?;

        self.compose_entries(edges, |edge| &edge.followee_id).await
    }

    // ==================== Read-side composition ====================

    async fn summaries(&self, ids: Vec<String>) -> AppResult<HashMap<String, UserSummary>> {
        let users = self.user_repo.find_by_ids(&ids).await?;
        Ok(users
            .iter()
            .map(|u| (u.id.clone(), UserSummary::from(u)))
            .collect())
    }

    /// Join edges to the user on the far side, keeping edge order.
    async fn compose_entries<F>(
        &self,
        edges: Vec<following::Model>,
        other_side: F,
    ) -> AppResult<Vec<FollowEntry>>
    where
        F: Fn(&following::Model) -> &String,
    {
        let profiles = self
            .summaries(edges.iter().map(|e| other_side(e).clone()).collect())
            .await?;

        Ok(edges
            .iter()
            .filter_map(|edge| {
                let user = profiles.get(other_side(edge))?.clone();
                Some(FollowEntry {
                    id: edge.id.clone(),
                    created_at: edge.created_at,
                    user,
                })
            })
            .collect())
    }
}
