//! Core business logic for socialx-rs.
//!
//! The relationship graph (follow requests, follow edges and who may see
//! whose lists) lives in [`RelationshipService`]; accounts, profiles and
//! discovery in [`UserService`].

pub mod pagination;
pub mod services;

pub use services::*;
