//! Expiry Index
//!
//! The two views over the live element set: a hashmap by key holding the
//! elements, and an ordered set of `(expires, key)` pairs. Not synchronized;
//! callers hold the store lock around every call.

use hashbrown::HashMap;
use std::collections::BTreeSet;
use std::time::Duration;
use tokio::time::Instant;
use uuid::Uuid;

use super::element::Element;

/// Result of a successful read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Viewed {
    pub message: String,
    /// The read tightened the deadline
    pub shortened: bool,
}

/// Dual-indexed expiring element set
#[derive(Debug, Default)]
pub struct ExpiryIndex {
    by_key: HashMap<Uuid, Element>,
    by_expiry: BTreeSet<(Instant, Uuid)>,
}

impl ExpiryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new element. Returns false, leaving the existing element
    /// untouched, if the key is already present.
    pub fn insert(&mut self, key: Uuid, message: String, expires: Instant) -> bool {
        if self.by_key.contains_key(&key) {
            return false;
        }

        let element = Element::new(key, message, expires);
        self.by_expiry.insert(element.expiry_key());
        self.by_key.insert(key, element);
        true
    }

    /// Read a message, capping its deadline at `now + window`.
    ///
    /// Deadlines are only ever moved earlier. An element already past its
    /// deadline is reported absent but left for the sweeper. A window too
    /// large to add to `now` imposes no cap.
    pub fn read(&mut self, key: &Uuid, now: Instant, window: Duration) -> Option<Viewed> {
        let element = self.by_key.get_mut(key)?;
        if element.is_expired(now) {
            return None;
        }

        let capped = now.checked_add(window).filter(|c| element.expires > *c);
        let shortened = capped.is_some();
        if let Some(capped) = capped {
            // Stale ordered entry must go before the new one lands.
            self.by_expiry.remove(&element.expiry_key());
            element.expires = capped;
            self.by_expiry.insert(element.expiry_key());
        }

        Some(Viewed {
            message: element.message.clone(),
            shortened,
        })
    }

    /// Current deadline of a key
    pub fn expires_at(&self, key: &Uuid) -> Option<Instant> {
        self.by_key.get(key).map(|e| e.expires)
    }

    /// Earliest deadline in the index
    pub fn next_deadline(&self) -> Option<Instant> {
        self.by_expiry.first().map(|(expires, _)| *expires)
    }

    /// Remove every element whose deadline lies strictly before `now`,
    /// returns count of removed elements
    pub fn drain_expired(&mut self, now: Instant) -> usize {
        let mut removed = 0;
        while let Some(&(expires, key)) = self.by_expiry.first() {
            if expires >= now {
                break;
            }
            self.by_expiry.pop_first();
            self.by_key.remove(&key);
            removed += 1;
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }

    /// Both views describe the same set of (key, expires) pairs
    #[cfg(test)]
    pub(crate) fn is_consistent(&self) -> bool {
        self.by_key.len() == self.by_expiry.len()
            && self
                .by_key
                .values()
                .all(|e| self.by_expiry.contains(&e.expiry_key()))
    }
}
