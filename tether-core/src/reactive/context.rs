//! Active-Subscriber Context
//!
//! Every reactive read asks this module "who is running right now?" and
//! records the answer in the property's dependency set.
//!
//! # Implementation
//!
//! Each thread owns one slot with two layers:
//!
//! - a *pinned* subscriber, overwritten by [`ActiveSubscriber::set`] and never
//!   restored. Constructing a watcher pins it, and it stays pinned until the
//!   next construction or an explicit [`ActiveSubscriber::clear`]. Reads made
//!   after the evaluation pass has ended still attribute to it.
//! - a stack of *scoped* entries pushed by [`ActiveSubscriber::enter`] and
//!   removed when the returned guard drops. The innermost scope shadows the
//!   pinned subscriber, so nested evaluation passes restore the outer one.
//!   Guards normally drop in LIFO order; one dropped early removes only its
//!   own entry and leaves the scopes above it in place.
//!
//! Keeping the slot thread-local means two threads never see each other's
//! evaluation passes.

use std::cell::{Cell, RefCell};
use std::marker::PhantomData;
use std::sync::Arc;

use super::subscriber::{Subscriber, SubscriberId};

thread_local! {
    static ACTIVE: RefCell<Slot> = RefCell::new(Slot::default());
    static NEXT_TOKEN: Cell<u64> = const { Cell::new(0) };
}

/// `None` entries are untracked scopes.
type Scope = (u64, Option<Arc<dyn Subscriber>>);

#[derive(Default)]
struct Slot {
    pinned: Option<Arc<dyn Subscriber>>,
    scopes: Vec<Scope>,
}

impl Slot {
    fn current(&self) -> Option<Arc<dyn Subscriber>> {
        match self.scopes.last() {
            Some((_, scoped)) => scoped.clone(),
            None => self.pinned.clone(),
        }
    }

    fn remove(&mut self, token: u64) -> Option<Scope> {
        let position = self.scopes.iter().rposition(|(t, _)| *t == token)?;
        Some(self.scopes.remove(position))
    }
}

fn push_scope(subscriber: Option<Arc<dyn Subscriber>>) -> ActiveScope {
    let token = NEXT_TOKEN.with(|next| {
        let token = next.get();
        next.set(token.wrapping_add(1));
        token
    });
    let subscriber_id = subscriber.as_ref().map(|s| s.id());
    ACTIVE.with(|slot| slot.borrow_mut().scopes.push((token, subscriber)));
    ActiveScope {
        token,
        subscriber_id,
        _not_send: PhantomData,
    }
}

/// Handle to the per-thread active-subscriber register.
pub struct ActiveSubscriber;

impl ActiveSubscriber {
    /// Pin `subscriber` as the active one, replacing whatever was pinned.
    ///
    /// There is no restore: it stays active for every later read on this
    /// thread that is not inside a scope.
    pub fn set(subscriber: Arc<dyn Subscriber>) {
        let id = subscriber.id();
        let previous = ACTIVE.with(|slot| slot.borrow_mut().pinned.replace(subscriber));
        tracing::trace!(
            subscriber = %id,
            replaced = ?previous.as_ref().map(|p| p.id()),
            "pinned active subscriber"
        );
    }

    /// Empty the pinned slot, returning what it held.
    pub fn clear() -> Option<Arc<dyn Subscriber>> {
        ACTIVE.with(|slot| slot.borrow_mut().pinned.take())
    }

    /// The subscriber reads are currently attributed to, if any.
    pub fn current() -> Option<Arc<dyn Subscriber>> {
        ACTIVE.with(|slot| slot.borrow().current())
    }

    /// The id of [`ActiveSubscriber::current`].
    pub fn current_id() -> Option<SubscriberId> {
        Self::current().map(|s| s.id())
    }

    /// Whether a read right now would be captured.
    pub fn is_active() -> bool {
        ACTIVE.with(|slot| slot.borrow().current().is_some())
    }

    /// Enter a scoped evaluation pass for `subscriber`.
    ///
    /// While the guard lives, reads on this thread are attributed to
    /// `subscriber` unless a later scope shadows it. Dropping the guard
    /// removes this scope, even if the pass panics. Guards are meant to drop
    /// in reverse order of entry; dropping an outer guard first removes only
    /// the outer scope, and the inner one stays current.
    pub fn enter(subscriber: Arc<dyn Subscriber>) -> ActiveScope {
        push_scope(Some(subscriber))
    }

    /// Run `f` with tracking suspended, including any pinned subscriber.
    pub fn untracked<R>(f: impl FnOnce() -> R) -> R {
        let _scope = push_scope(None);
        f()
    }

    /// Depth of the scope stack on this thread.
    pub fn depth() -> usize {
        ACTIVE.with(|slot| slot.borrow().scopes.len())
    }
}

/// Guard returned by [`ActiveSubscriber::enter`]. Removes its scope on drop.
///
/// Scopes live on the thread that opened them, so the guard is not `Send`.
pub struct ActiveScope {
    token: u64,
    subscriber_id: Option<SubscriberId>,
    _not_send: PhantomData<*const ()>,
}

impl ActiveScope {
    /// The subscriber this scope attributes reads to.
    pub fn subscriber_id(&self) -> Option<SubscriberId> {
        self.subscriber_id
    }
}

impl Drop for ActiveScope {
    fn drop(&mut self) {
        // Release the borrow before the removed Arc is dropped: the last
        // reference to a subscriber may run user code in its destructor.
        let _removed = ACTIVE.with(|slot| slot.borrow_mut().remove(self.token));
    }
}
