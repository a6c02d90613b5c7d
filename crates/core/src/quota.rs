use std::collections::HashMap;
use std::sync::Mutex;

/// Process-lifetime joke counters keyed by user id.
///
/// One instance is shared by every session, so all sessions belonging to the
/// same user see the same count. Counts are never decremented and do not
/// survive a restart.
#[derive(Debug, Default)]
pub struct UserJokeCounters {
    counts: Mutex<HashMap<String, u32>>,
}

impl UserJokeCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ensure a counter entry exists for the user, starting at 0.
    pub fn register(&self, user_id: &str) {
        let mut counts = self.lock();
        counts.entry(user_id.to_string()).or_insert(0);
    }

    /// Current count for the user; 0 for a user never seen before.
    pub fn get(&self, user_id: &str) -> u32 {
        let counts = self.lock();
        counts.get(user_id).copied().unwrap_or(0)
    }

    /// Increment the user's count and return the new value.
    pub fn increment(&self, user_id: &str) -> u32 {
        let mut counts = self.lock();
        let count = counts.entry(user_id.to_string()).or_insert(0);
        *count += 1;
        *count
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, u32>> {
        // Poisoning cannot corrupt the map; recover the guard.
        self.counts.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_user_counts_as_zero() {
        let counters = UserJokeCounters::new();
        assert_eq!(counters.get("nobody"), 0);
    }

    #[test]
    fn increment_returns_the_new_count() {
        let counters = UserJokeCounters::new();
        assert_eq!(counters.increment("alice"), 1);
        assert_eq!(counters.increment("alice"), 2);
        assert_eq!(counters.get("alice"), 2);
        assert_eq!(counters.get("bob"), 0);
    }

    #[test]
    fn register_does_not_reset_an_existing_count() {
        let counters = UserJokeCounters::new();
        counters.increment("alice");
        counters.register("alice");
        assert_eq!(counters.get("alice"), 1);
        counters.register("bob");
        assert_eq!(counters.get("bob"), 0);
    }
}
