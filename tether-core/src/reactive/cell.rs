//! Reactive Cell
//!
//! A `ReactiveCell` is one tracked property: a value plus the dependency set
//! of everything that has read it.
//!
//! # How Cells Work
//!
//! 1. `get()` captures the active subscriber (if any) into the cell's `Dep`,
//!    then returns a clone of the value.
//!
//! 2. `set()` compares the new value with the stored one using the cell's
//!    equality function (`PartialEq` unless built with `with_equals`).
//!    Equal values are a no-op. Anything else is stored first and then every captured
//!    subscriber is notified, so a subscriber reading the cell from inside
//!    `update()` sees the new value.
//!
//! 3. The value lock is released before notifying. Subscribers may read and
//!    write the same cell re-entrantly.
//!
//! # Sharing
//!
//! Cells are handles. Clones share the value and the dependency set, so the
//! owning object and any code holding a clone observe the same property.

use std::fmt::{self, Debug};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Serialize, Serializer};

use super::dep::Dep;
use crate::error::Result;

/// Decides whether a write is a no-op: `equals(stored, incoming)`.
pub type EqualsFn<T> = fn(&T, &T) -> bool;

/// `PartialEq` equality, the default for new cells.
pub fn default_equals<T: PartialEq>(a: &T, b: &T) -> bool {
    a == b
}

struct CellInner<T> {
    value: RwLock<T>,
    dep: Dep,
    equals: EqualsFn<T>,
}

/// A reactive property holding a value of type `T`.
///
/// # Type Parameters
///
/// - `T`: the stored value. The cell's [`EqualsFn`] decides which writes
///   are no-ops.
///
/// # Example
///
/// ```rust
/// use tether_core::reactive::{ReactiveCell, Watcher};
///
/// let title = ReactiveCell::new(String::from("draft"));
///
/// let watcher = Watcher::with_update(|| println!("title changed"));
/// title.get(); // evaluation pass: captures `watcher`
///
/// title.set("final".into()).unwrap(); // prints "title changed"
/// assert_eq!(title.get_untracked(), "final");
/// assert_eq!(watcher.update_count(), 1);
/// ```
pub struct ReactiveCell<T> {
    inner: Arc<CellInner<T>>,
}

impl<T> ReactiveCell<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    /// Create a new cell with a fresh, empty dependency set.
    pub fn new(value: T) -> Self {
        Self::with_equals(value, default_equals::<T>)
    }

    /// Create a new cell whose no-op check uses `equals` instead of
    /// `PartialEq`.
    pub fn with_equals(value: T, equals: EqualsFn<T>) -> Self {
        Self {
            inner: Arc::new(CellInner {
                value: RwLock::new(value),
                dep: Dep::new(),
                equals,
            }),
        }
    }

    /// The cell's ID, shared with its dependency set.
    pub fn id(&self) -> u64 {
        self.inner.dep.id()
    }

    /// Get the current value, capturing the active subscriber.
    pub fn get(&self) -> T {
        self.inner.dep.depend();
        self.inner.value.read().clone()
    }

    /// Get the current value without capturing anything.
    pub fn get_untracked(&self) -> T {
        self.inner.value.read().clone()
    }

    /// Borrow the current value, capturing the active subscriber.
    ///
    /// The read lock is held while `f` runs; `f` must not write this cell.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.inner.dep.depend();
        f(&self.inner.value.read())
    }

    /// Store `value` and notify subscribers, unless the cell's equality
    /// function says it matches the current value.
    pub fn set(&self, value: T) -> Result<()> {
        {
            let mut current = self.inner.value.write();
            if (self.inner.equals)(&*current, &value) {
                tracing::debug!(cell = self.id(), "write matches stored value, skipping");
                return Ok(());
            }
            *current = value;
        }

        self.inner.dep.notify()
    }

    /// Compute a new value from the current one and `set` it.
    pub fn update<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&T) -> T,
    {
        let next = {
            let current = self.inner.value.read();
            f(&*current)
        };
        self.set(next)
    }

    /// The cell's dependency set.
    pub fn dep(&self) -> &Dep {
        &self.inner.dep
    }

    /// Number of captured entries, duplicates included.
    pub fn subscriber_count(&self) -> usize {
        self.inner.dep.len()
    }
}

impl<T> Clone for ReactiveCell<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Debug for ReactiveCell<T>
where
    T: Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReactiveCell")
            .field("id", &self.inner.dep.id())
            .field("value", &*self.inner.value.read())
            .field("subscriber_count", &self.inner.dep.len())
            .finish()
    }
}

/// Serializes the current value. Serializing never captures.
impl<T> Serialize for ReactiveCell<T>
where
    T: Serialize,
{
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.inner.value.read().serialize(serializer)
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::{ActiveSubscriber, Watcher};
    use std::sync::atomic::{AtomicI32, Ordering};

    #[test]
    fn cell_get_and_set() {
        let cell = ReactiveCell::new(0);
        assert_eq!(cell.get(), 0);

        cell.set(42).unwrap();
        assert_eq!(cell.get(), 42);
    }

    #[test]
    fn cell_update() {
        let cell = ReactiveCell::new(10);
        cell.update(|v| v + 5).unwrap();
        assert_eq!(cell.get(), 15);
    }

    #[test]
    fn read_captures_once_per_read() {
        let cell = ReactiveCell::new("a");
        let watcher = Watcher::scoped(|| {}, || {
            cell.get();
            cell.get();
            cell.with(|v| v.len());
        });

        assert_eq!(cell.dep().subscriber_ids(), vec![watcher.id(); 3]);
    }

    #[test]
    fn untracked_read_captures_nothing() {
        let cell = ReactiveCell::new(1);
        let _watcher = Watcher::new();

        cell.get_untracked();
        assert_eq!(cell.subscriber_count(), 0);

        ActiveSubscriber::clear();
    }

    #[test]
    fn equal_write_is_a_noop() {
        let cell = ReactiveCell::new(7);
        let watcher = Watcher::scoped(|| {}, || {
            cell.get();
        });

        cell.set(7).unwrap();
        assert_eq!(watcher.update_count(), 0);
    }

    #[test]
    fn write_stores_before_notifying() {
        let cell = ReactiveCell::new(String::from("before"));
        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));

        let watcher = {
            let cell = cell.clone();
            let seen = seen.clone();
            let reader = cell.clone();
            Watcher::scoped(
                move || seen.lock().push(reader.get_untracked()),
                move || {
                    cell.get();
                },
            )
        };

        cell.set("after".into()).unwrap();
        assert_eq!(*seen.lock(), vec!["after".to_string()]);
        assert_eq!(watcher.update_count(), 1);
    }

    #[test]
    fn equality_compares_against_last_written_value() {
        let cell = ReactiveCell::new(1);
        let watcher = Watcher::scoped(|| {}, || {
            cell.get();
        });

        cell.set(2).unwrap();
        cell.set(2).unwrap();
        cell.set(1).unwrap();

        assert_eq!(watcher.update_count(), 2);
    }

    #[test]
    fn reentrant_read_inside_update_does_not_deadlock() {
        let cell = ReactiveCell::new(0);
        let observed = Arc::new(AtomicI32::new(-1));

        let watcher = {
            let reader = cell.clone();
            let observed = observed.clone();
            Watcher::scoped(
                move || observed.store(reader.get(), Ordering::SeqCst),
                || {
                    cell.get();
                },
            )
        };

        cell.set(5).unwrap();
        assert_eq!(observed.load(Ordering::SeqCst), 5);
        assert_eq!(watcher.update_count(), 1);
    }

    #[test]
    fn custom_equality_decides_noop_writes() {
        fn same_length(a: &String, b: &String) -> bool {
            a.len() == b.len()
        }

        let cell = ReactiveCell::with_equals(String::from("abc"), same_length);
        let watcher = Watcher::scoped(|| {}, || {
            cell.get();
        });

        cell.set("xyz".into()).unwrap();
        assert_eq!(watcher.update_count(), 0);
        assert_eq!(cell.get_untracked(), "abc");

        cell.set("abcd".into()).unwrap();
        assert_eq!(watcher.update_count(), 1);
    }

    #[test]
    fn cell_clone_shares_state() {
        let cell1 = ReactiveCell::new(0);
        let cell2 = cell1.clone();

        cell1.set(42).unwrap();
        assert_eq!(cell2.get(), 42);
        assert_eq!(cell1.id(), cell2.id());
    }

    #[test]
    fn cell_ids_are_unique() {
        let c1 = ReactiveCell::new(0);
        let c2 = ReactiveCell::new(0);
        assert_ne!(c1.id(), c2.id());
    }

    #[test]
    fn cell_serializes_current_value() {
        let cell = ReactiveCell::new(vec![1, 2, 3]);
        let json = serde_json::to_string(&cell).unwrap();
        assert_eq!(json, "[1,2,3]");
    }
}
