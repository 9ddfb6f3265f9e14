//! Business logic services.

#![allow(missing_docs)]

pub mod relationship;
pub mod user;

pub use relationship::{
    FollowDecision, FollowEntry, IncomingRequest, ListKind, OutgoingRequest, RelationshipService,
    Visibility,
};
pub use user::{CreateUserInput, UpdateUserInput, UserProfile, UserService, UserSummary};
