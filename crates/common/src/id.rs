//! ID generation utilities.

use ulid::Ulid;
use uuid::Uuid;

/// ID generator for entities.
#[derive(Debug, Clone, Default)]
pub struct IdGenerator {
    _private: (),
}

impl IdGenerator {
    /// Create a new ID generator.
    #[must_use]
    pub const fn new() -> Self {
        Self { _private: () }
    }

    /// Generate a new ULID-based ID.
    ///
    /// IDs sort lexicographically by creation millisecond. Two IDs minted in
    /// the same millisecond compare by their random part, so listings ordered
    /// by ID only follow creation order at millisecond granularity.
    #[must_use]
    pub fn generate(&self) -> String {
        Ulid::new().to_string().to_lowercase()
    }

    /// Generate an opaque bearer token (random UUID v4, no time component).
    #[must_use]
    pub fn generate_token(&self) -> String {
        Uuid::new_v4().simple().to_string()
    }

    /// Canonical key of an unordered user pair.
    ///
    /// `pair_key(a, b) == pair_key(b, a)`; used to index follow requests so that
    /// a request from A to B and one from B to A collide.
    #[must_use]
    pub fn pair_key(a: &str, b: &str) -> String {
        if a <= b {
            format!("{a}:{b}")
        } else {
            format!("{b}:{a}")
        }
    }
}
