//! Page-size handling shared by listing operations.

/// Default page size for follower, following and request listings.
pub const RELATIONSHIP_DEFAULT_LIMIT: u64 = 10;

/// Default page size for discovery.
pub const DISCOVERY_DEFAULT_LIMIT: u64 = 20;

/// Resolve a requested page size: `default` when absent, otherwise clamped
/// to `1..=max`.
#[must_use]
pub fn clamp_limit(requested: Option<u64>, default: u64, max: u64) -> u64 {
    requested.unwrap_or(default).clamp(1, max.max(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_limit() {
        assert_eq!(clamp_limit(None, 10, 100), 10);
        assert_eq!(clamp_limit(Some(0), 10, 100), 1);
        assert_eq!(clamp_limit(Some(500), 10, 100), 100);
        assert_eq!(clamp_limit(Some(42), 10, 100), 42);
    }
}
