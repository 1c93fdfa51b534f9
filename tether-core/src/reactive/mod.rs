//! Reactive Primitives
//!
//! This module implements the dependency-tracking core: reactive cells,
//! their dependency sets, the active-subscriber context, and watchers.
//!
//! # Concepts
//!
//! ## Cells and objects
//!
//! A [`ReactiveCell`] is one tracked property. Reading it records the active
//! subscriber in the cell's [`Dep`]; writing a different value notifies
//! every recorded subscriber. [`observe`] builds a [`ReactiveObject`], one
//! cell per key of a plain JSON object or array.
//!
//! ## Subscribers
//!
//! A [`Subscriber`] is a unit of work that re-runs on change. [`Watcher`] is
//! the stock one. Constructing a watcher makes it the active subscriber; the
//! reads that follow (its evaluation pass) decide what it depends on.
//!
//! ## The active subscriber
//!
//! [`ActiveSubscriber`] is a thread-local register consulted by every read.
//! It has a pinned slot (set on watcher construction, never restored) and a
//! stack of scopes for nested evaluation passes.
//!
//! # Implementation Notes
//!
//! Notification is synchronous: a write returns after every subscriber has
//! run, in the order the subscribers were captured.

mod cell;
mod context;
mod dep;
mod observer;
mod subscriber;
mod watcher;

pub use cell::{default_equals, EqualsFn, ReactiveCell};
pub use context::{ActiveScope, ActiveSubscriber};
pub use dep::Dep;
pub use observer::{define_reactive, loosely_equal, observe, ReactiveObject, Shape};
pub use subscriber::{Subscriber, SubscriberId};
pub use watcher::Watcher;
