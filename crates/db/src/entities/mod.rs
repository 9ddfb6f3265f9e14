//! Database entities.

pub mod follow_request;
pub mod following;
pub mod user;

pub use follow_request::Entity as FollowRequest;
pub use following::Entity as Following;
pub use user::Entity as User;
