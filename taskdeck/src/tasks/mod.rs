//! Optimistic task state for one user.
//!
//! [`TaskStore`] owns the in-memory task list, applies every mutation
//! locally before the request is sent, and reconciles with the server
//! response afterwards: the server record replaces the optimistic one on
//! success, and a failed write is rolled back (create) or resynchronized
//! by a full refetch (update, delete, toggle).

pub mod pending;
pub mod store;

pub use pending::{CorrelationId, PendingWrite, PendingWrites};
pub use store::{StoreEvent, StoreSnapshot, TaskStore};

use taskdeck_proto::task::{TaskId, ValidationError};

use crate::api::RequestError;

/// Errors returned by [`TaskStore`] operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// Input was rejected before any request was sent.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The request failed; the text is also recorded as the store error.
    #[error(transparent)]
    Request(#[from] RequestError),

    /// The target is a provisional record whose create is still in flight.
    #[error("task {0} is not saved yet")]
    Provisional(TaskId),
}
