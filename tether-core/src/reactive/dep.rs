//! Dependency Set
//!
//! A `Dep` holds the subscribers interested in one observed property. Reads
//! append the active subscriber; writes replay `update()` on every entry.
//!
//! Entries are kept in registration order and are not de-duplicated: a
//! subscriber that reads the same property three times during one
//! evaluation pass is captured, and later notified, three times.
//!
//! # Memory
//!
//! Entries hold `Weak` references. The application owns its subscribers; a
//! dependency set never keeps one alive. Dropping a subscriber without
//! disposing it leaves a dangling entry, which `notify` reports as
//! [`ReactiveError::NullSubscriber`].

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use smallvec::SmallVec;

use super::context::ActiveSubscriber;
use super::subscriber::{Subscriber, SubscriberId};
use crate::error::{ReactiveError, Result};

/// Counter for generating unique dependency-set IDs.
static DEP_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

fn next_dep_id() -> u64 {
    DEP_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

#[derive(Clone)]
struct Entry {
    id: SubscriberId,
    subscriber: Weak<dyn Subscriber>,
}

type Entries = SmallVec<[Entry; 4]>;

/// The subscribers of one reactive property.
pub struct Dep {
    id: u64,
    subs: Mutex<Entries>,
}

impl Dep {
    /// Create an empty dependency set.
    pub fn new() -> Self {
        Self {
            id: next_dep_id(),
            subs: Mutex::new(SmallVec::new()),
        }
    }

    /// Get the dependency set's unique ID.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Append `subscriber` unconditionally.
    pub fn add_sub(&self, subscriber: &Arc<dyn Subscriber>) {
        let id = subscriber.id();
        self.subs.lock().push(Entry {
            id,
            subscriber: Arc::downgrade(subscriber),
        });
        tracing::trace!(dep = self.id, subscriber = %id, "captured subscriber");
    }

    /// Capture the active subscriber, if there is one.
    ///
    /// Reads outside any evaluation pass record nothing, as do reads by a
    /// subscriber that has been disposed.
    pub fn depend(&self) {
        let Some(active) = ActiveSubscriber::current() else {
            return;
        };
        if active.is_disposed() {
            tracing::trace!(dep = self.id, subscriber = %active.id(), "skipped disposed subscriber");
            return;
        }
        self.add_sub(&active);
    }

    /// Invoke `update()` on every stored subscriber, in registration order.
    ///
    /// The entry list is snapshotted first and no lock is held while a
    /// subscriber runs, so subscribers may read or write reactive state.
    /// Entries added during the fan-out are only seen by the next `notify`.
    ///
    /// Disposed subscribers are skipped and removed. A dangling entry stops
    /// the fan-out: earlier subscribers have run, later ones have not, and
    /// the error is returned to the writer.
    pub fn notify(&self) -> Result<()> {
        let snapshot: Entries = self.subs.lock().clone();
        if snapshot.is_empty() {
            return Ok(());
        }

        tracing::debug!(dep = self.id, subscribers = snapshot.len(), "notifying subscribers");

        let mut disposed: SmallVec<[SubscriberId; 4]> = SmallVec::new();
        let mut outcome = Ok(());

        for (position, entry) in snapshot.iter().enumerate() {
            match entry.subscriber.upgrade() {
                Some(subscriber) if subscriber.is_disposed() => disposed.push(entry.id),
                Some(subscriber) => subscriber.update(),
                None => {
                    tracing::warn!(
                        dep = self.id,
                        subscriber = %entry.id,
                        position,
                        "subscriber dropped before notification"
                    );
                    outcome = Err(ReactiveError::NullSubscriber {
                        id: entry.id,
                        position,
                    });
                    break;
                }
            }
        }

        if !disposed.is_empty() {
            self.subs.lock().retain(|e| !disposed.contains(&e.id));
        }

        outcome
    }

    /// Remove every entry for `id`. Returns how many were removed.
    pub fn remove_sub(&self, id: SubscriberId) -> usize {
        let mut subs = self.subs.lock();
        let before = subs.len();
        subs.retain(|e| e.id != id);
        before - subs.len()
    }

    /// Drop dangling and disposed entries. Returns how many were removed.
    pub fn prune(&self) -> usize {
        let mut subs = self.subs.lock();
        let before = subs.len();
        subs.retain(|e| {
            e.subscriber
                .upgrade()
                .is_some_and(|s| !s.is_disposed())
        });
        before - subs.len()
    }

    /// Number of entries, duplicates included.
    pub fn len(&self) -> usize {
        self.subs.lock().len()
    }

    /// Whether no subscriber has been captured.
    pub fn is_empty(&self) -> bool {
        self.subs.lock().is_empty()
    }

    /// Entry ids in registration order, duplicates included.
    pub fn subscriber_ids(&self) -> Vec<SubscriberId> {
        self.subs.lock().iter().map(|e| e.id).collect()
    }
}

impl Default for Dep {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Dep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dep")
            .field("id", &self.id)
            .field("subscribers", &self.subscriber_ids())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;

    type Log = Arc<std::sync::Mutex<Vec<SubscriberId>>>;

    struct Recorder {
        id: SubscriberId,
        log: Log,
        disposed: AtomicBool,
    }

    impl Recorder {
        fn new(log: &Log) -> Arc<dyn Subscriber> {
            Arc::new(Self {
                id: SubscriberId::new(),
                log: log.clone(),
                disposed: AtomicBool::new(false),
            })
        }
    }

    impl Subscriber for Recorder {
        fn id(&self) -> SubscriberId {
            self.id
        }

        fn update(&self) {
            self.log.lock().unwrap().push(self.id);
        }

        fn is_disposed(&self) -> bool {
            self.disposed.load(Ordering::SeqCst)
        }
    }

    fn log() -> Log {
        Arc::new(std::sync::Mutex::new(Vec::new()))
    }

    #[test]
    fn empty_dep_notifies_nothing() {
        let dep = Dep::new();
        assert!(dep.is_empty());
        assert_eq!(dep.notify(), Ok(()));
    }

    #[test]
    fn notify_runs_in_registration_order() {
        let log = log();
        let dep = Dep::new();
        let subs = [Recorder::new(&log), Recorder::new(&log), Recorder::new(&log)];
        for sub in &subs {
            dep.add_sub(sub);
        }

        dep.notify().unwrap();

        let expected: Vec<_> = subs.iter().map(|s| s.id()).collect();
        assert_eq!(*log.lock().unwrap(), expected);
    }

    #[test]
    fn duplicates_are_kept_and_notified() {
        let log = log();
        let dep = Dep::new();
        let sub = Recorder::new(&log);

        dep.add_sub(&sub);
        dep.add_sub(&sub);
        assert_eq!(dep.len(), 2);

        dep.notify().unwrap();
        assert_eq!(log.lock().unwrap().len(), 2);
    }

    #[test]
    fn depend_without_active_subscriber_is_noop() {
        let dep = Dep::new();
        dep.depend();
        assert!(dep.is_empty());
    }

    #[test]
    fn depend_captures_scoped_subscriber() {
        let log = log();
        let dep = Dep::new();
        let sub = Recorder::new(&log);

        {
            let _scope = ActiveSubscriber::enter(sub.clone());
            dep.depend();
        }
        dep.depend();

        assert_eq!(dep.subscriber_ids(), vec![sub.id()]);
    }

    #[test]
    fn remove_sub_drops_every_entry() {
        let log = log();
        let dep = Dep::new();
        let a = Recorder::new(&log);
        let b = Recorder::new(&log);
        dep.add_sub(&a);
        dep.add_sub(&b);
        dep.add_sub(&a);

        assert_eq!(dep.remove_sub(a.id()), 2);
        assert_eq!(dep.subscriber_ids(), vec![b.id()]);
        assert_eq!(dep.remove_sub(a.id()), 0);
    }

    #[test]
    fn dangling_subscriber_stops_fan_out() {
        let log = log();
        let dep = Dep::new();
        let first = Recorder::new(&log);
        let dropped = Recorder::new(&log);
        let last = Recorder::new(&log);
        let dropped_id = dropped.id();

        dep.add_sub(&first);
        dep.add_sub(&dropped);
        dep.add_sub(&last);
        drop(dropped);

        let err = dep.notify().unwrap_err();
        assert_eq!(
            err,
            ReactiveError::NullSubscriber {
                id: dropped_id,
                position: 1
            }
        );
        assert_eq!(*log.lock().unwrap(), vec![first.id()]);

        // Not recovered: the entry stays until pruned.
        assert_eq!(dep.len(), 3);
        assert_eq!(dep.prune(), 1);
        dep.notify().unwrap();
        assert_eq!(log.lock().unwrap().len(), 3);
    }

    #[test]
    fn disposed_subscribers_are_skipped_and_removed() {
        let log = log();
        let dep = Dep::new();
        let kept = Arc::new(Recorder {
            id: SubscriberId::new(),
            log: log.clone(),
            disposed: AtomicBool::new(false),
        });
        let gone = Arc::new(Recorder {
            id: SubscriberId::new(),
            log: log.clone(),
            disposed: AtomicBool::new(false),
        });
        let kept_dyn: Arc<dyn Subscriber> = kept.clone();
        let gone_dyn: Arc<dyn Subscriber> = gone.clone();
        dep.add_sub(&gone_dyn);
        dep.add_sub(&kept_dyn);

        gone.disposed.store(true, Ordering::SeqCst);
        dep.notify().unwrap();

        assert_eq!(*log.lock().unwrap(), vec![kept.id]);
        assert_eq!(dep.subscriber_ids(), vec![kept.id]);
    }

    #[test]
    fn capture_during_notify_waits_for_next_round() {
        struct Reader {
            id: SubscriberId,
            dep: Arc<Dep>,
            late: Arc<dyn Subscriber>,
        }

        impl Subscriber for Reader {
            fn id(&self) -> SubscriberId {
                self.id
            }

            fn update(&self) {
                self.dep.add_sub(&self.late);
            }
        }

        let log = log();
        let dep = Arc::new(Dep::new());
        let late = Recorder::new(&log);
        let reader: Arc<dyn Subscriber> = Arc::new(Reader {
            id: SubscriberId::new(),
            dep: dep.clone(),
            late: late.clone(),
        });
        dep.add_sub(&reader);

        dep.notify().unwrap();
        assert!(log.lock().unwrap().is_empty());
        assert_eq!(dep.subscriber_ids(), vec![reader.id(), late.id()]);

        dep.notify().unwrap();
        assert_eq!(*log.lock().unwrap(), vec![late.id()]);
    }
}
