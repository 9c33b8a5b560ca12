//! Stored Element

use std::time::Duration;
use tokio::time::Instant;
use uuid::Uuid;

/// Longest lifetime a TTL can grant (~100 years); larger TTLs are clamped
pub const MAX_TTL: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// Deadline `ttl` after `now`, clamped to `MAX_TTL`
pub fn deadline_after(now: Instant, ttl: Duration) -> Instant {
    now + ttl.min(MAX_TTL)
}

/// A stored message with its deadline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub key: Uuid,
    pub message: String,
    pub expires: Instant,
}

impl Element {
    pub fn new(key: Uuid, message: String, expires: Instant) -> Self {
        Self {
            key,
            message,
            expires,
        }
    }

    /// Whether the deadline lies strictly before `now`
    #[inline]
    pub fn is_expired(&self, now: Instant) -> bool {
        self.expires < now
    }

    /// Ordering key for the by-expiry view
    #[inline]
    pub(crate) fn expiry_key(&self) -> (Instant, Uuid) {
        (self.expires, self.key)
    }
}
