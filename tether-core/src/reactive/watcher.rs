//! Watcher Implementation
//!
//! A Watcher is the stock [`Subscriber`]: one unit of view work that re-runs
//! when any property it read changes.
//!
//! # Lifecycle
//!
//! 1. Construction (`new` / `with_update`) pins the watcher as the active
//!    subscriber on the current thread. Construction reads nothing.
//!
//! 2. The caller performs the evaluation pass right away, reading every
//!    property whose later changes should re-run the watcher. Reads are
//!    attributed to the pinned watcher until something else is pinned.
//!
//! 3. Each qualifying write to a captured property calls `update()`.
//!
//! Pinning has no restore. Code that needs nested or interleaved passes uses
//! `evaluate` (or `scoped`), which attributes reads only for the duration of
//! a closure and then restores the previous subscriber.
//!
//! # Disposal
//!
//! `dispose()` ends the lifecycle: the watcher stops running, is no longer
//! captured, and is removed from each dependency set the next time that set
//! notifies.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use super::context::ActiveSubscriber;
use super::subscriber::{Subscriber, SubscriberId};

type UpdateFn = Box<dyn Fn() + Send + Sync>;

/// A subscriber that re-runs view work when its dependencies change.
///
/// # Example
///
/// ```rust
/// use serde_json::json;
/// use tether_core::reactive::{observe, Watcher};
///
/// let data = observe(&json!({ "test": "I am test." })).unwrap();
///
/// let watcher = Watcher::new();
/// println!("render~ {}", data.get("test").unwrap());
///
/// data.set("test", json!("hello,world")).unwrap();
/// assert_eq!(watcher.update_count(), 1);
/// ```
pub struct Watcher {
    id: SubscriberId,

    /// Replacement for the default "view updated" effect.
    on_update: Option<UpdateFn>,

    disposed: AtomicBool,

    /// Number of times `update` has run.
    update_count: AtomicUsize,
}

impl Watcher {
    /// Create a watcher and pin it as the active subscriber.
    ///
    /// Its `update` logs "view updated".
    pub fn new() -> Arc<Self> {
        Self::pinned(None)
    }

    /// Create a watcher running `on_update` on every notification and pin it
    /// as the active subscriber.
    pub fn with_update<F>(on_update: F) -> Arc<Self>
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self::pinned(Some(Box::new(on_update)))
    }

    /// Create a watcher without pinning it and run `pass` as its evaluation
    /// pass inside a scoped context.
    pub fn scoped<F, P>(on_update: F, pass: P) -> Arc<Self>
    where
        F: Fn() + Send + Sync + 'static,
        P: FnOnce(),
    {
        let watcher = Arc::new(Self::build(Some(Box::new(on_update))));
        watcher.evaluate(pass);
        watcher
    }

    fn build(on_update: Option<UpdateFn>) -> Self {
        Self {
            id: SubscriberId::new(),
            on_update,
            disposed: AtomicBool::new(false),
            update_count: AtomicUsize::new(0),
        }
    }

    fn pinned(on_update: Option<UpdateFn>) -> Arc<Self> {
        let watcher = Arc::new(Self::build(on_update));
        ActiveSubscriber::set(watcher.clone());
        watcher
    }

    /// Run `pass` with reads attributed to this watcher, then restore
    /// whatever was active before.
    pub fn evaluate<R>(self: &Arc<Self>, pass: impl FnOnce() -> R) -> R {
        let _scope = ActiveSubscriber::enter(self.clone());
        pass()
    }

    /// Get the watcher's unique ID.
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Dispose of the watcher.
    ///
    /// After disposal, the watcher will not run or be captured again.
    pub fn dispose(&self) {
        if !self.disposed.swap(true, Ordering::SeqCst) {
            tracing::debug!(subscriber = %self.id, "watcher disposed");
        }
    }

    /// Check if the watcher has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    /// Get the number of times the watcher has run.
    pub fn update_count(&self) -> usize {
        self.update_count.load(Ordering::SeqCst)
    }
}

impl Subscriber for Watcher {
    fn id(&self) -> SubscriberId {
        self.id
    }

    fn update(&self) {
        if self.is_disposed() {
            return;
        }
        self.update_count.fetch_add(1, Ordering::SeqCst);

        match &self.on_update {
            Some(on_update) => on_update(),
            None => tracing::info!(subscriber = %self.id, "view updated"),
        }
    }

    fn is_disposed(&self) -> bool {
        Watcher::is_disposed(self)
    }
}

impl std::fmt::Debug for Watcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Watcher")
            .field("id", &self.id)
            .field("update_count", &self.update_count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
