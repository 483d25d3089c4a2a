//! Subscription Tracking
//!
//! Records which token addresses have an active subscribe intent. The
//! transport client replays the set after every reconnect, so subscriptions
//! survive connection loss without the caller doing anything.
//!
//! # Design
//!
//! Insertion order is preserved so replay happens in the order the caller
//! subscribed. Intents dropped while disconnected are never recorded here;
//! only subscriptions that reached the wire are replayed.

use parking_lot::RwLock;

/// Insertion-ordered set of subscribed token addresses.
#[derive(Debug, Default)]
pub struct SubscriptionSet {
    tokens: RwLock<Vec<String>>,
}

impl SubscriptionSet {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a subscription. Returns `false` if the address was already
    /// tracked.
    pub fn insert(&self, token: &str) -> bool {
        let mut tokens = self.tokens.write();
        if tokens.iter().any(|t| t == token) {
            return false;
        }
        tokens.push(token.to_string());
        true
    }

    /// Drop a subscription. Returns `false` if the address was not tracked.
    pub fn remove(&self, token: &str) -> bool {
        let mut tokens = self.tokens.write();
        let before = tokens.len();
        tokens.retain(|t| t != token);
        tokens.len() < before
    }

    /// Check whether an address is tracked.
    #[must_use]
    pub fn contains(&self, token: &str) -> bool {
        self.tokens.read().iter().any(|t| t == token)
    }

    /// Tracked addresses in subscription order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<String> {
        self.tokens.read().clone()
    }

    /// Number of tracked addresses.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.read().len()
    }

    /// Check whether nothing is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.read().is_empty()
    }

    /// Forget every tracked address.
    pub fn clear(&self) {
        self.tokens.write().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_deduplicates() {
        let set = SubscriptionSet::new();
        assert!(set.insert("0xa"));
        assert!(set.insert("0xb"));
        assert!(!set.insert("0xa"));

        assert_eq!(set.len(), 2);
        assert!(set.contains("0xa"));
    }

    #[test]
    fn test_remove_untracked_is_noop() {
        let set = SubscriptionSet::new();
        set.insert("0xa");

        assert!(!set.remove("0xb"));
        assert!(set.remove("0xa"));
        assert!(set.is_empty());
    }

    #[test]
    fn test_snapshot_preserves_subscription_order() {
        let set = SubscriptionSet::new();
        set.insert("0xc");
        set.insert("0xa");
        set.insert("0xb");
        set.remove("0xa");
        set.insert("0xa");

        assert_eq!(set.snapshot(), vec!["0xc", "0xb", "0xa"]);
    }

    #[test]
    fn test_clear_forgets_everything() {
        let set = SubscriptionSet::new();
        set.insert("0xa");
        set.insert("0xb");
        set.clear();

        assert!(set.is_empty());
        assert!(!set.contains("0xa"));
    }
}
