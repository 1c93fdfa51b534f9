//! Subscriber types for the reactive system.
//!
//! A Subscriber is one unit of work that must re-run when any property it
//! read during its evaluation pass changes. View watchers are the stock
//! implementation; applications can plug in their own.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Unique identifier for a subscriber.
///
/// Dependency sets remember the id next to each captured reference so a
/// subscriber can be unsubscribed by id, and so a dangling entry can still be
/// named in an error after its subscriber is gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

impl SubscriberId {
    /// Generate a new unique subscriber ID.
    ///
    /// Uses an atomic counter to ensure uniqueness across threads.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Anything that can be captured by a dependency set and re-run on change.
///
/// `update` is called synchronously, once per qualifying write, for every
/// time the subscriber was captured by the written property. It may read
/// and write reactive state.
pub trait Subscriber: Send + Sync {
    /// The subscriber's unique ID.
    fn id(&self) -> SubscriberId;

    /// The re-run entry point.
    fn update(&self);

    /// Disposed subscribers are never captured or notified again.
    fn is_disposed(&self) -> bool {
        false
    }
}
