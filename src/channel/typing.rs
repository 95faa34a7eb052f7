//! Who is typing, with per-user expiry.
//!
//! Each `typing` event (re)arms a deadline for that user; the latest event
//! wins. The owner polls [`TypingSet::expire`] when [`TypingSet::next_deadline`]
//! passes, so no per-user timers exist.

use std::collections::BTreeMap;
use std::time::Duration;

use tokio::time::Instant;

pub const DEFAULT_TYPING_TTL: Duration = Duration::from_millis(3000);

#[derive(Debug, Clone)]
pub struct TypingSet {
    deadlines: BTreeMap<String, Instant>,
    ttl: Duration,
}

impl Default for TypingSet {
    fn default() -> Self {
        Self::new(DEFAULT_TYPING_TTL)
    }
}

impl TypingSet {
    pub fn new(ttl: Duration) -> Self {
        Self {
            deadlines: BTreeMap::new(),
            ttl,
        }
    }

    /// Marks `username` as typing until `now + ttl`. Returns true if newly added.
    pub fn insert(&mut self, username: &str, now: Instant) -> bool {
        self.deadlines
            .insert(username.to_string(), now + self.ttl)
            .is_none()
    }

    /// Drops every user whose deadline is at or before `now`; returns who left.
    pub fn expire(&mut self, now: Instant) -> Vec<String> {
        let expired: Vec<String> = self
            .deadlines
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|(user, _)| user.clone())
            .collect();
        for user in &expired {
            self.deadlines.remove(user);
        }
        expired
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.deadlines.values().min().copied()
    }

    pub fn contains(&self, username: &str) -> bool {
        self.deadlines.contains_key(username)
    }

    /// Current members, sorted by name.
    pub fn users(&self) -> Vec<String> {
        self.deadlines.keys().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.deadlines.is_empty()
    }

    pub fn clear(&mut self) {
        self.deadlines.clear();
    }
}
