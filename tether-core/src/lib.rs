//! Tether Core
//!
//! This crate provides the dependency-tracking core of the Tether reactive
//! data-binding layer. It implements:
//!
//! - Reactive properties with read-time dependency capture
//! - Per-property dependency sets with ordered, synchronous notification
//! - Shallow reactivity for plain JSON objects and arrays
//! - A thread-local active-subscriber context with scoped evaluation passes
//!
//! Deciding what a re-run actually does (re-rendering a view, for instance)
//! is left to the application, through [`reactive::Subscriber`].
//!
//! # Example
//!
//! ```rust
//! use serde_json::json;
//! use tether_core::reactive::{observe, Watcher};
//!
//! // Make the data reactive
//! let data = observe(&json!({ "count": 0 })).unwrap();
//!
//! // Create a watcher and run its evaluation pass
//! let watcher = Watcher::scoped(|| println!("count changed"), || {
//!     data.get("count");
//! });
//!
//! // Writing a new value re-runs the watcher
//! data.set("count", 5).unwrap();
//! assert_eq!(watcher.update_count(), 1);
//!
//! // Writing the same value does not
//! data.set("count", 5).unwrap();
//! assert_eq!(watcher.update_count(), 1);
//! ```

pub mod error;
pub mod reactive;

pub use error::{ReactiveError, Result};
