//! User service.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{DateTime, FixedOffset};
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use socialx_common::{AppError, AppResult, IdGenerator};
use socialx_db::{
    entities::user,
    repositories::{FollowingRepository, UserRepository},
};
use validator::{Validate, ValidationError};

use crate::pagination::{DISCOVERY_DEFAULT_LIMIT, clamp_limit};

/// User service for business logic.
#[derive(Clone)]
pub struct UserService {
    user_repo: UserRepository,
    following_repo: FollowingRepository,
    id_gen: IdGenerator,
    max_page_size: u64,
}

/// Input for creating a new user.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserInput {
    #[validate(
        length(min = 1, max = 64),
        custom(function = "validate_username")
    )]
    pub username: String,

    #[validate(email)]
    pub email: String,

    #[validate(length(min = 1, max = 256))]
    pub full_name: String,

    #[validate(length(min = 8, max = 128))]
    pub password: String,
}

/// Input for updating a user.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserInput {
    #[validate(length(min = 1, max = 256))]
    pub full_name: Option<String>,

    #[validate(length(max = 2048))]
    pub bio: Option<String>,

    #[validate(url)]
    pub avatar_url: Option<String>,
}

/// Public projection of a user: what other users may see in listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: String,
    pub username: String,
    pub full_name: String,
    pub avatar_url: Option<String>,
}

impl From<&user::Model> for UserSummary {
    fn from(user: &user::Model) -> Self {
        Self {
            id: user.id.clone(),
            username: user.username.clone(),
            full_name: user.full_name.clone(),
            avatar_url: user.avatar_url.clone(),
        }
    }
}

/// A user's profile as seen by a particular viewer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(flatten)]
    pub summary: UserSummary,
    pub bio: String,
    pub followers_count: i32,
    pub following_count: i32,
    pub created_at: DateTime<FixedOffset>,
    pub is_own_profile: bool,
    /// The viewer follows this user.
    pub is_following: bool,
    /// This user follows the viewer.
    pub is_followed_by: bool,
}

impl UserService {
    /// Create a new user service.
    #[must_use]
    pub const fn new(
        user_repo: UserRepository,
        following_repo: FollowingRepository,
        max_page_size: u64,
    ) -> Self {
        Self {
            user_repo,
            following_repo,
            id_gen: IdGenerator::new(),
            max_page_size,
        }
    }

    /// Create a new user.
    pub async fn create(&self, input: CreateUserInput) -> AppResult<user::Model> {
        input.validate()?;

        if self
            .user_repo
            .find_by_username(&input.username)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict("Username already taken".to_string()));
        }

        if self.user_repo.find_by_email(&input.email).await?.is_some() {
            return Err(AppError::Conflict("Email already registered".to_string()));
        }

        let password_hash = hash_password(&input.password)?;

        let user_model = user::ActiveModel {
            id: Set(self.id_gen.generate()),
            username: Set(input.username.clone()),
            username_lower: Set(input.username.to_lowercase()),
            email: Set(input.email),
            full_name: Set(input.full_name),
            bio: Set(String::new()),
            avatar_url: Set(None),
            password: Set(password_hash),
            token: Set(Some(self.id_gen.generate_token())),
            followers_count: Set(0),
            following_count: Set(0),
            created_at: Set(chrono::Utc::now().into()),
            updated_at: Set(None),
        };

        let user = self.user_repo.create(user_model).await?;
        tracing::info!(user_id = %user.id, username = %user.username, "User created");
        Ok(user)
    }

    /// Get a user by username (case-insensitive).
    pub async fn get_by_username(&self, username: &str) -> AppResult<user::Model> {
        self.user_repo
            .find_by_username(username)
            .await?
            .ok_or_else(|| AppError::UserNotFound(username.to_string()))
    }

    /// Authenticate a user by token.
    pub async fn authenticate_by_token(&self, token: &str) -> AppResult<user::Model> {
        self.user_repo
            .find_by_token(token)
            .await?
            .ok_or(AppError::Unauthorized)
    }

    /// Authenticate a user by username or email, and password.
    pub async fn authenticate(&self, identifier: &str, password: &str) -> AppResult<user::Model> {
        let user = if identifier.contains('@') {
            self.user_repo.find_by_email(identifier).await?
        } else {
            self.user_repo.find_by_username(identifier).await?
        }
        .ok_or(AppError::Unauthorized)?;

        if !verify_password(password, &user.password)? {
            return Err(AppError::Unauthorized);
        }

        Ok(user)
    }

    /// Regenerate a user's authentication token.
    pub async fn regenerate_token(&self, user_id: &str) -> AppResult<String> {
        let user = self.user_repo.get_by_id(user_id).await?;
        let new_token = self.id_gen.generate_token();

        let mut active: user::ActiveModel = user.into();
        active.token = Set(Some(new_token.clone()));
        active.updated_at = Set(Some(chrono::Utc::now().into()));

        self.user_repo.update(active).await?;
        Ok(new_token)
    }

    /// Update a user's profile fields.
    pub async fn update(&self, id: &str, input: UpdateUserInput) -> AppResult<user::Model> {
        input.validate()?;

        let user = self.user_repo.get_by_id(id).await?;
        let mut active: user::ActiveModel = user.into();

        if let Some(full_name) = input.full_name {
            active.full_name = Set(full_name);
        }
        if let Some(bio) = input.bio {
            active.bio = Set(bio);
        }
        if let Some(avatar_url) = input.avatar_url {
            active.avatar_url = Set(Some(avatar_url));
        }
        active.updated_at = Set(Some(chrono::Utc::now().into()));

        self.user_repo.update(active).await
    }

    /// Profile of `target_id` as seen by `viewer_id`.
    pub async fn get_profile(&self, viewer_id: &str, target_id: &str) -> AppResult<UserProfile> {
        let user = self.user_repo.get_by_id(target_id).await?;
        let is_own_profile = viewer_id == target_id;

        let (is_following, is_followed_by) = if is_own_profile {
            (false, false)
        } else {
            (
                self.following_repo
                    .is_following(viewer_id, target_id)
                    .await?,
                self.following_repo
                    .is_following(target_id, viewer_id)
                    .await?,
            )
        };

        Ok(UserProfile {
            summary: UserSummary::from(&user),
            bio: user.bio,
            followers_count: user.followers_count,
            following_count: user.following_count,
            created_at: user.created_at,
            is_own_profile,
            is_following,
            is_followed_by,
        })
    }

    /// Users `viewer_id` might follow: everyone but themselves, newest first.
    pub async fn list_discoverable(
        &self,
        viewer_id: &str,
        limit: Option<u64>,
        offset: Option<u64>,
    ) -> AppResult<Vec<UserSummary>> {
        let limit = clamp_limit(limit, DISCOVERY_DEFAULT_LIMIT, self.max_page_size);
        let users = self
            .user_repo
            .find_discoverable(viewer_id, limit, offset.unwrap_or(0))
            .await?;

        tracing::debug!(viewer_id = %viewer_id, count = users.len(), "Listed discoverable users");
        Ok(users.iter().map(UserSummary::from).collect())
    }
}

/// Usernames are ASCII letters, digits and `_`. An `@` would make sign-in
/// treat the name as an email address.
fn validate_username(username: &str) -> Result<(), ValidationError> {
    if username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        Ok(())
    } else {
        Err(ValidationError::new("username_chars"))
    }
}

/// Hash a password using Argon2.
fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {e}")))
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|e| AppError::Internal(format!("Invalid hash: {e}")))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}
