//! Bounded Message Log
//!
//! Retains the most recent stream frames for inspection. The log is a
//! fixed-capacity FIFO: once full, appending a new entry evicts the oldest
//! one, so a snapshot is always the newest entries in arrival order.

use std::collections::VecDeque;

use parking_lot::RwLock;

/// Number of entries retained when no capacity is configured.
pub const DEFAULT_LOG_CAPACITY: usize = 100;

/// Fixed-capacity insertion-ordered log with front-first eviction.
///
/// Writers and readers share the log behind a lock, so it can be handed
/// to the transport client and observers as an `Arc<MessageLog<T>>`.
#[derive(Debug)]
pub struct MessageLog<T> {
    capacity: usize,
    entries: RwLock<VecDeque<T>>,
}

impl<T> MessageLog<T> {
    /// Create a log retaining at most `capacity` entries.
    ///
    /// A capacity of zero is treated as one so the log always holds the
    /// latest entry.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: RwLock::new(VecDeque::with_capacity(capacity)),
        }
    }

    /// Append an entry, evicting the oldest one if the log is full.
    pub fn append(&self, entry: T) {
        let mut entries = self.entries.write();
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    /// Number of retained entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Check whether the log is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Maximum number of retained entries.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Discard all retained entries.
    pub fn clear(&self) {
        self.entries.write().clear();
    }
}

impl<T: Clone> MessageLog<T> {
    /// Copy of the retained entries, oldest first.
    #[must_use]
    pub fn snapshot(&self) -> Vec<T> {
        self.entries.read().iter().cloned().collect()
    }

    /// Most recently appended entry, if any.
    #[must_use]
    pub fn latest(&self) -> Option<T> {
        self.entries.read().back().cloned()
    }
}

impl<T> Default for MessageLog<T> {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_CAPACITY)
    }
}
