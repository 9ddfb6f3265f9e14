//! User entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Public handle
    #[sea_orm(unique)]
    pub username: String,

    pub username_lower: String,

    #[sea_orm(unique)]
    pub email: String,

    /// Display name
    pub full_name: String,

    /// Profile description
    #[sea_orm(column_type = "Text")]
    pub bio: String,

    /// Avatar URL
    #[sea_orm(nullable)]
    pub avatar_url: Option<String>,

    /// Argon2 password hash (PHC string)
    #[serde(skip_serializing)]
    pub password: String,

    /// Bearer token
    #[sea_orm(unique, nullable)]
    #[serde(skip_serializing)]
    pub token: Option<String>,

    /// Followers count (denormalized)
    #[sea_orm(default_value = 0)]
    pub followers_count: i32,

    /// Following count (denormalized)
    #[sea_orm(default_value = 0)]
    pub following_count: i32,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
