//! Repositories over the relationship graph tables.

mod follow_request;
mod following;
mod user;

pub use follow_request::FollowRequestRepository;
pub use following::FollowingRepository;
pub use user::UserRepository;
