//! Pending-write buffer for optimistic task mutations.
//!
//! Each optimistic mutation registers a [`PendingWrite`] under a fresh
//! [`CorrelationId`] before its request is sent, and removes it when the
//! request resolves. Reconciliation looks the provisional record up through
//! this map, never by comparing timestamps.

use std::collections::HashMap;

use taskdeck_proto::task::TaskId;
use uuid::Uuid;

/// Client-generated identifier correlating an optimistic write with its
/// eventual server response. UUID v7, so ids sort by creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CorrelationId(Uuid);

impl CorrelationId {
    /// Creates a new time-ordered correlation id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An optimistic write awaiting its server response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingWrite {
    /// A provisional task was appended under `temp_id`.
    Create {
        /// Temporary id of the provisional record.
        temp_id: TaskId,
    },
    /// A task was patched in place.
    Update {
        /// The patched task.
        id: TaskId,
    },
    /// A task was removed locally.
    Delete {
        /// The removed task.
        id: TaskId,
    },
    /// A task's completion flag was flipped.
    Toggle {
        /// The toggled task.
        id: TaskId,
    },
}

impl PendingWrite {
    /// The task id the write touches.
    #[must_use]
    pub const fn task_id(&self) -> TaskId {
        match self {
            Self::Create { temp_id: id }
            | Self::Update { id }
            | Self::Delete { id }
            | Self::Toggle { id } => *id,
        }
    }
}

/// Map of in-flight optimistic writes.
#[derive(Debug, Default)]
pub struct PendingWrites {
    writes: HashMap<CorrelationId, PendingWrite>,
    next_temp_id: i64,
}

impl PendingWrites {
    /// Creates an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Hands out the next provisional id: `-1`, `-2`, …
    ///
    /// Provisional ids are never reused within one buffer.
    pub const fn next_temp_id(&mut self) -> TaskId {
        self.next_temp_id -= 1;
        TaskId::new(self.next_temp_id)
    }

    /// Registers a write under `id`.
    pub fn insert(&mut self, id: CorrelationId, write: PendingWrite) {
        self.writes.insert(id, write);
    }

    /// Removes and returns the write registered under `id`.
    pub fn remove(&mut self, id: &CorrelationId) -> Option<PendingWrite> {
        self.writes.remove(id)
    }

    /// Whether `id` is the temporary id of a create still in flight.
    #[must_use]
    pub fn is_provisional(&self, id: TaskId) -> bool {
        self.writes
            .values()
            .any(|w| matches!(w, PendingWrite::Create { temp_id } if *temp_id == id))
    }

    /// Whether a delete of `id` is still in flight.
    #[must_use]
    pub fn is_deleting(&self, id: TaskId) -> bool {
        self.writes
            .values()
            .any(|w| matches!(w, PendingWrite::Delete { .. }) && w.task_id() == id)
    }

    /// Number of writes in flight.
    #[must_use]
    pub fn len(&self) -> usize {
        self.writes.len()
    }

    /// Whether no writes are in flight.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    /// Drops every pending write.
    ///
    /// Responses for dropped writes find nothing to reconcile.
    pub fn clear(&mut self) {
        self.writes.clear();
    }
}
