//! The task store: optimistic CRUD over a [`TaskApi`].
//!
//! Operations take `&self` and never hold the state lock across an
//! `.await`, so overlapping calls interleave freely; the last response to
//! resolve wins. `loading` is derived from an in-flight counter, which
//! makes it `true` from the first call's entry until the last call's exit.
//!
//! Every response is tagged with the scope generation it was issued under.
//! Re-scoping to another user bumps the generation, and responses from the
//! old scope are dropped instead of being merged into the new list.

use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use taskdeck_proto::task::{CreateTaskInput, Task, TaskId, UpdateTaskInput};

use crate::api::{Operation, RequestError, TaskApi};

use super::StoreError;
use super::pending::{CorrelationId, PendingWrite, PendingWrites};

/// Point-in-time copy of the store's observable state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreSnapshot {
    /// User the store is scoped to.
    pub user_id: String,
    /// Tasks in display (creation) order, provisional records included.
    pub tasks: Vec<Task>,
    /// Whether any operation is in flight.
    pub loading: bool,
    /// Text of the most recent request failure, cleared when an operation starts.
    pub error: Option<String>,
    /// Number of optimistic writes awaiting a response.
    pub pending: usize,
}

/// Notifications for UI consumers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    /// The observable state changed.
    Changed(StoreSnapshot),
    /// A request failed.
    Failed {
        /// The call that failed.
        operation: Operation,
        /// Error text, also recorded as the store error.
        message: String,
    },
}

#[derive(Debug)]
struct StoreState {
    user_id: String,
    generation: u64,
    tasks: Vec<Task>,
    in_flight: usize,
    error: Option<String>,
    pending: PendingWrites,
}

impl StoreState {
    fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            user_id: self.user_id.clone(),
            tasks: self.tasks.clone(),
            loading: self.in_flight > 0,
            error: self.error.clone(),
            pending: self.pending.len(),
        }
    }

    fn position(&self, id: TaskId) -> Option<usize> {
        self.tasks.iter().position(|t| t.id == id)
    }

    fn task_mut(&mut self, id: TaskId) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| t.id == id)
    }

    /// Replaces the entry with the same id; absent ids are ignored.
    fn replace(&mut self, task: Task) {
        if let Some(slot) = self.task_mut(task.id) {
            *slot = task;
        }
    }

    /// Installs a server list, keeping provisional records of creates
    /// that are still in flight at the end. Tasks with a delete in flight
    /// stay removed.
    fn replace_all(&mut self, mut tasks: Vec<Task>) {
        let provisional: Vec<Task> = self
            .tasks
            .drain(..)
            .filter(|t| self.pending.is_provisional(t.id))
            .collect();
        tasks.retain(|t| !self.pending.is_deleting(t.id));
        tasks.sort_by_key(|t| t.created_at);
        tasks.extend(provisional);
        self.tasks = tasks;
    }

    /// Swaps the provisional record `temp_id` for the server record.
    ///
    /// A refetch may already have brought the server record in, in which
    /// case the provisional record is simply dropped.
    fn reconcile_create(&mut self, temp_id: TaskId, task: Task) {
        match (self.position(temp_id), self.position(task.id)) {
            (Some(i), None) => self.tasks[i] = task,
            (Some(i), Some(_)) => {
                self.tasks.remove(i);
                self.replace(task);
            }
            (None, Some(j)) => self.tasks[j] = task,
            (None, None) => self.tasks.push(task),
        }
    }
}

/// Marks one operation in flight; dropping it ends the operation.
struct InFlight<'a, A: TaskApi> {
    store: &'a TaskStore<A>,
    operation: Operation,
    user_id: String,
    generation: u64,
}

impl<A: TaskApi> Drop for InFlight<'_, A> {
    fn drop(&mut self) {
        self.store.finish();
    }
}

/// Registers one optimistic write. If it is dropped while the write is
/// still in the buffer, the write is abandoned.
struct Pending<'a, A: TaskApi> {
    store: &'a TaskStore<A>,
    correlation: CorrelationId,
}

impl<A: TaskApi> Drop for Pending<'_, A> {
    fn drop(&mut self) {
        self.store.abandon(self.correlation);
    }
}

/// Optimistic task list for one user.
///
/// Presentation code reads [`snapshot`](Self::snapshot) or listens on the
/// [`StoreEvent`] receiver returned by [`new`](Self::new); nothing outside
/// the store mutates the list.
pub struct TaskStore<A: TaskApi> {
    api: A,
    state: Mutex<StoreState>,
    event_tx: mpsc::Sender<StoreEvent>,
}

impl<A: TaskApi> TaskStore<A> {
    /// Creates an empty store scoped to `user_id`.
    ///
    /// Nothing is fetched until [`fetch`](Self::fetch) is called. Returns
    /// the store and a receiver for [`StoreEvent`]s; events are dropped
    /// when the channel is full or the receiver is gone.
    pub fn new(
        api: A,
        user_id: impl Into<String>,
        event_buffer: usize,
    ) -> (Self, mpsc::Receiver<StoreEvent>) {
        let (event_tx, event_rx) = mpsc::channel(event_buffer.max(1));
        let store = Self {
            api,
            state: Mutex::new(StoreState {
                user_id: user_id.into(),
                generation: 0,
                tasks: Vec::new(),
                in_flight: 0,
                error: None,
                pending: PendingWrites::new(),
            }),
            event_tx,
        };
        (store, event_rx)
    }

    /// User the store is currently scoped to.
    #[must_use]
    pub fn user_id(&self) -> String {
        self.state.lock().user_id.clone()
    }

    /// Tasks in display order.
    #[must_use]
    pub fn tasks(&self) -> Vec<Task> {
        self.state.lock().tasks.clone()
    }

    /// The task with `id`, if present locally.
    #[must_use]
    pub fn task(&self, id: TaskId) -> Option<Task> {
        self.state.lock().tasks.iter().find(|t| t.id == id).cloned()
    }

    /// Whether any operation is in flight.
    #[must_use]
    pub fn loading(&self) -> bool {
        self.state.lock().in_flight > 0
    }

    /// Text of the most recent request failure.
    #[must_use]
    pub fn error(&self) -> Option<String> {
        self.state.lock().error.clone()
    }

    /// Number of optimistic writes awaiting a response.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.state.lock().pending.len()
    }

    /// Whether `id` names a provisional record of an in-flight create.
    #[must_use]
    pub fn is_provisional(&self, id: TaskId) -> bool {
        self.state.lock().pending.is_provisional(id)
    }

    /// Copy of the full observable state.
    #[must_use]
    pub fn snapshot(&self) -> StoreSnapshot {
        self.state.lock().snapshot()
    }

    /// Re-scopes the store to `user_id` and refetches.
    ///
    /// The list, pending writes and error are discarded first. Responses to
    /// requests issued for the previous user are ignored when they arrive.
    /// Re-scoping to the current user does nothing.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Request`] if the refetch fails.
    pub async fn set_user(&self, user_id: impl Into<String>) -> Result<(), StoreError> {
        let user_id = user_id.into();
        let snapshot = {
            let mut state = self.state.lock();
            if state.user_id == user_id {
                return Ok(());
            }
            tracing::info!(from = %state.user_id, to = %user_id, "re-scoping task store");
            state.user_id = user_id;
            state.generation += 1;
            state.tasks.clear();
            state.pending.clear();
            state.error = None;
            state.snapshot()
        };
        self.emit(StoreEvent::Changed(snapshot));
        self.fetch().await
    }

    /// Replaces the local list with the server's list.
    ///
    /// On failure the previous list is left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Request`] if the request fails.
    pub async fn fetch(&self) -> Result<(), StoreError> {
        let op = self.begin(Operation::List);
        match self.api.list_tasks(&op.user_id).await {
            Ok(tasks) => {
                tracing::debug!(user_id = %op.user_id, count = tasks.len(), "fetched tasks");
                self.with_scope(&op, |s| s.replace_all(tasks));
                Ok(())
            }
            Err(e) => {
                self.fail(&op, &e);
                Err(e.into())
            }
        }
    }

    /// Creates a task optimistically.
    ///
    /// The input is trimmed and validated before anything else happens. A
    /// provisional record is appended at once and swapped for the server
    /// record when the request succeeds; on failure exactly that record is
    /// removed again.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Validation`] without touching state or the API,
    /// or [`StoreError::Request`] if the request fails.
    pub async fn create(&self, input: CreateTaskInput) -> Result<Task, StoreError> {
        let input = input.normalized();
        input.validate()?;

        let op = self.begin(Operation::Create);
        let pending = Pending {
            store: self,
            correlation: CorrelationId::new(),
        };
        let correlation = pending.correlation;
        let snapshot = {
            let mut state = self.state.lock();
            let temp_id = state.pending.next_temp_id();
            let now = Utc::now();
            state.tasks.push(Task {
                id: temp_id,
                user_id: op.user_id.clone(),
                title: input.title.clone(),
                description: input.description.clone(),
                completed: false,
                created_at: now,
                updated_at: now,
            });
            state
                .pending
                .insert(correlation, PendingWrite::Create { temp_id });
            state.snapshot()
        };
        self.emit(StoreEvent::Changed(snapshot));
        tracing::debug!(user_id = %op.user_id, %correlation, "optimistic create");

        let result = self.api.create_task(&op.user_id, &input).await;
        match result {
            Ok(task) => {
                let confirmed = task.clone();
                self.with_scope(&op, |s| {
                    if let Some(PendingWrite::Create { temp_id }) = s.pending.remove(&correlation)
                    {
                        s.reconcile_create(temp_id, confirmed);
                    }
                });
                tracing::info!(user_id = %op.user_id, task_id = %task.id, "task created");
                Ok(task)
            }
            Err(e) => {
                self.with_scope(&op, |s| {
                    if let Some(PendingWrite::Create { temp_id }) = s.pending.remove(&correlation)
                    {
                        s.tasks.retain(|t| t.id != temp_id);
                    }
                });
                self.fail(&op, &e);
                Err(e.into())
            }
        }
    }

    /// Patches a task optimistically with the fields present in `input`.
    ///
    /// On failure the local list is resynchronized by a full refetch.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Validation`] or [`StoreError::Provisional`]
    /// without touching state, or [`StoreError::Request`] if the request fails.
    pub async fn update(&self, id: TaskId, input: UpdateTaskInput) -> Result<Task, StoreError> {
        let input = input.normalized();
        input.validate()?;
        Self::ensure_confirmed(id)?;

        let op = self.begin(Operation::Update);
        let pending = self.optimistic(PendingWrite::Update { id }, |s| {
            if let Some(task) = s.task_mut(id) {
                task.apply_update(&input, Utc::now());
            }
        });
        tracing::debug!(
            user_id = %op.user_id,
            task_id = %id,
            correlation = %pending.correlation,
            "optimistic update"
        );

        let result = self.api.update_task(&op.user_id, id, &input).await;
        self.settle(&op, &pending, result).await
    }

    /// Removes a task optimistically.
    ///
    /// On failure the removed task is not reinserted; a full refetch
    /// restores whatever the server still holds.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Provisional`] without touching state, or
    /// [`StoreError::Request`] if the request fails.
    pub async fn delete(&self, id: TaskId) -> Result<(), StoreError> {
        Self::ensure_confirmed(id)?;

        let op = self.begin(Operation::Delete);
        let pending = self.optimistic(PendingWrite::Delete { id }, |s| {
            if let Some(i) = s.position(id) {
                s.tasks.remove(i);
            }
        });
        let correlation = pending.correlation;
        tracing::debug!(user_id = %op.user_id, task_id = %id, %correlation, "optimistic delete");

        match self.api.delete_task(&op.user_id, id).await {
            Ok(()) => {
                // A refetch that resolved meanwhile may have brought it back.
                self.with_scope(&op, |s| {
                    s.pending.remove(&correlation);
                    s.tasks.retain(|t| t.id != id);
                });
                tracing::info!(user_id = %op.user_id, task_id = %id, "task deleted");
                Ok(())
            }
            Err(e) => {
                self.with_scope(&op, |s| {
                    s.pending.remove(&correlation);
                });
                self.fail(&op, &e);
                self.resync(&op).await;
                Err(e.into())
            }
        }
    }

    /// Flips a task's completion flag optimistically.
    ///
    /// On failure the local list is resynchronized by a full refetch.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Provisional`] without touching state, or
    /// [`StoreError::Request`] if the request fails.
    pub async fn toggle_complete(&self, id: TaskId) -> Result<Task, StoreError> {
        Self::ensure_confirmed(id)?;

        let op = self.begin(Operation::Toggle);
        let pending = self.optimistic(PendingWrite::Toggle { id }, |s| {
            if let Some(task) = s.task_mut(id) {
                task.toggle(Utc::now());
            }
        });
        tracing::debug!(
            user_id = %op.user_id,
            task_id = %id,
            correlation = %pending.correlation,
            "optimistic toggle"
        );

        let result = self.api.toggle_complete(&op.user_id, id).await;
        self.settle(&op, &pending, result).await
    }

    // -----------------------------------------------------------------------
    // Internal helpers
    // -----------------------------------------------------------------------

    const fn ensure_confirmed(id: TaskId) -> Result<(), StoreError> {
        if id.is_provisional() {
            return Err(StoreError::Provisional(id));
        }
        Ok(())
    }

    fn emit(&self, event: StoreEvent) {
        let _ = self.event_tx.try_send(event);
    }

    fn begin(&self, operation: Operation) -> InFlight<'_, A> {
        let (user_id, generation, snapshot) = {
            let mut state = self.state.lock();
            state.in_flight += 1;
            state.error = None;
            (state.user_id.clone(), state.generation, state.snapshot())
        };
        self.emit(StoreEvent::Changed(snapshot));
        InFlight {
            store: self,
            operation,
            user_id,
            generation,
        }
    }

    fn finish(&self) {
        let snapshot = {
            let mut state = self.state.lock();
            state.in_flight = state.in_flight.saturating_sub(1);
            state.snapshot()
        };
        self.emit(StoreEvent::Changed(snapshot));
    }

    /// Registers a pending write, applies the optimistic step and notifies.
    fn optimistic(
        &self,
        write: PendingWrite,
        apply: impl FnOnce(&mut StoreState),
    ) -> Pending<'_, A> {
        let pending = Pending {
            store: self,
            correlation: CorrelationId::new(),
        };
        let snapshot = {
            let mut state = self.state.lock();
            apply(&mut state);
            state.pending.insert(pending.correlation, write);
            state.snapshot()
        };
        self.emit(StoreEvent::Changed(snapshot));
        pending
    }

    /// Drops a write that is still buffered, along with its provisional
    /// record if it is a create. Settled writes have already left the
    /// buffer, so this only acts when an operation's future is dropped.
    fn abandon(&self, correlation: CorrelationId) {
        let snapshot = {
            let mut state = self.state.lock();
            let Some(write) = state.pending.remove(&correlation) else {
                return;
            };
            tracing::debug!(%correlation, task_id = %write.task_id(), "abandoning unsettled write");
            if let PendingWrite::Create { temp_id } = write {
                state.tasks.retain(|t| t.id != temp_id);
            }
            state.snapshot()
        };
        self.emit(StoreEvent::Changed(snapshot));
    }

    /// Runs `f` on the state if the scope has not changed since `op` began.
    fn with_scope<R>(
        &self,
        op: &InFlight<'_, A>,
        f: impl FnOnce(&mut StoreState) -> R,
    ) -> Option<R> {
        let (result, snapshot) = {
            let mut state = self.state.lock();
            if state.generation != op.generation {
                tracing::debug!(
                    user_id = %op.user_id,
                    operation = %op.operation,
                    "dropping response from a previous scope"
                );
                return None;
            }
            let result = f(&mut state);
            (result, state.snapshot())
        };
        self.emit(StoreEvent::Changed(snapshot));
        Some(result)
    }

    fn fail(&self, op: &InFlight<'_, A>, error: &RequestError) {
        tracing::warn!(
            user_id = %op.user_id,
            operation = %op.operation,
            status = ?error.status,
            error = %error,
            "task request failed"
        );
        let recorded = self.with_scope(op, |s| s.error = Some(error.message.clone()));
        if recorded.is_some() {
            self.emit(StoreEvent::Failed {
                operation: op.operation,
                message: error.message.clone(),
            });
        }
    }

    /// Reconciles an update or toggle response.
    async fn settle(
        &self,
        op: &InFlight<'_, A>,
        pending: &Pending<'_, A>,
        result: Result<Task, RequestError>,
    ) -> Result<Task, StoreError> {
        let correlation = pending.correlation;
        match result {
            Ok(task) => {
                let confirmed = task.clone();
                self.with_scope(op, |s| {
                    s.pending.remove(&correlation);
                    s.replace(confirmed);
                });
                tracing::info!(
                    user_id = %op.user_id,
                    task_id = %task.id,
                    operation = %op.operation,
                    "task reconciled"
                );
                Ok(task)
            }
            Err(e) => {
                self.with_scope(op, |s| {
                    s.pending.remove(&correlation);
                });
                self.fail(op, &e);
                self.resync(op).await;
                Err(e.into())
            }
        }
    }

    /// Refetches after a failed write. Keeps the write's error text.
    async fn resync(&self, op: &InFlight<'_, A>) {
        match self.api.list_tasks(&op.user_id).await {
            Ok(tasks) => {
                tracing::debug!(user_id = %op.user_id, count = tasks.len(), "resynchronized tasks");
                self.with_scope(op, |s| s.replace_all(tasks));
            }
            Err(e) => {
                tracing::warn!(user_id = %op.user_id, error = %e, "resync after failed write failed");
            }
        }
    }
}
