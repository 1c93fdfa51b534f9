//! Error types for the reactive core.

use thiserror::Error;

use crate::reactive::SubscriberId;

/// Errors raised by reactive writes.
///
/// Reads never fail. A write either completes every notification it fans out
/// or stops at the first failure and reports it to the writer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReactiveError {
    /// A dependency set still references a subscriber that was dropped
    /// without being disposed.
    #[error("subscriber {id} at position {position} was dropped before notification")]
    NullSubscriber {
        /// The id recorded when the subscriber was captured.
        id: SubscriberId,
        /// Index of the dangling entry in the dependency set.
        position: usize,
    },

    /// A write targeted a key that was never installed on the object.
    #[error("no reactive property named `{0}`")]
    UnknownProperty(String),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ReactiveError>;
