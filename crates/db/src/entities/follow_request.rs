//! Follow request entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Lifecycle state of a follow request.
///
/// `Pending` moves exactly once to `Accepted` or `Rejected`; both are terminal.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum FollowRequestStatus {
    #[sea_orm(string_value = "pending")]
    #[default]
    Pending,
    #[sea_orm(string_value = "accepted")]
    Accepted,
    #[sea_orm(string_value = "rejected")]
    Rejected,
}

impl FollowRequestStatus {
    /// Whether the request can no longer change state.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "follow_request")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// The user who sent the follow request
    pub from_user_id: String,

    /// The user who received the follow request
    pub to_user_id: String,

    pub status: FollowRequestStatus,

    /// Canonical unordered pair key while the request is pending, NULL once
    /// resolved. Unique, so at most one pending request exists per pair.
    #[sea_orm(unique, nullable)]
    #[serde(skip_serializing)]
    pub open_pair_key: Option<String>,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub responded_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::FromUserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    FromUser,

    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::ToUserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    ToUser,
}

impl ActiveModelBehavior for ActiveModel {}
