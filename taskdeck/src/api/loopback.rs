//! Loopback task API for testing and offline use.
//!
//! [`LoopbackTaskApi`] keeps tasks in memory and answers like the remote
//! service: increasing server-assigned ids, per-user scoping, 404 for
//! unknown ids. Clones share the same state, so a test can hand one clone
//! to a [`TaskStore`](crate::tasks::TaskStore) and inspect through another.
//!
//! Two hooks make client behaviour observable:
//! - [`fail_next`](LoopbackTaskApi::fail_next) queues an error for the next call
//! - [`hold_next`](LoopbackTaskApi::hold_next) parks the next call until released

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::oneshot;

use taskdeck_proto::task::{CreateTaskInput, Task, TaskId, UpdateTaskInput};

use super::{Operation, RequestError, TaskApi};

/// A call received by the loopback server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiCall {
    /// Which endpoint was hit.
    pub operation: Operation,
    /// The user the call was scoped to.
    pub user_id: String,
    /// Target task, for per-task endpoints.
    pub task_id: Option<TaskId>,
}

#[derive(Debug, Default)]
struct LoopbackState {
    next_id: i64,
    tasks: Vec<Task>,
    failures: VecDeque<RequestError>,
    holds: VecDeque<oneshot::Receiver<()>>,
    calls: Vec<ApiCall>,
}

impl LoopbackState {
    fn find_mut(&mut self, user_id: &str, id: TaskId) -> Result<&mut Task, RequestError> {
        self.tasks
            .iter_mut()
            .find(|t| t.id == id && t.user_id == user_id)
            .ok_or_else(not_found)
    }
}

fn not_found() -> RequestError {
    RequestError::http(404, "Task not found")
}

/// In-process stand-in for the remote task service.
#[derive(Debug, Clone, Default)]
pub struct LoopbackTaskApi {
    state: Arc<Mutex<LoopbackState>>,
}

impl LoopbackTaskApi {
    /// Creates an empty server.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a task directly, bypassing the call log.
    pub fn seed(&self, user_id: &str, input: &CreateTaskInput) -> Task {
        let mut state = self.state.lock();
        Self::insert(&mut state, user_id, input)
    }

    /// Makes the next call fail with `error` instead of executing.
    pub fn fail_next(&self, error: RequestError) {
        self.state.lock().failures.push_back(error);
    }

    /// Parks the next call until the returned sender fires or is dropped.
    #[must_use]
    pub fn hold_next(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.state.lock().holds.push_back(rx);
        tx
    }

    /// Every call received so far, in arrival order.
    #[must_use]
    pub fn calls(&self) -> Vec<ApiCall> {
        self.state.lock().calls.clone()
    }

    /// Current server-side tasks of `user_id`, in creation order.
    #[must_use]
    pub fn tasks_of(&self, user_id: &str) -> Vec<Task> {
        self.state
            .lock()
            .tasks
            .iter()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect()
    }

    fn insert(state: &mut LoopbackState, user_id: &str, input: &CreateTaskInput) -> Task {
        state.next_id += 1;
        let now = Utc::now();
        let task = Task {
            id: TaskId::new(state.next_id),
            user_id: user_id.to_string(),
            title: input.title.clone(),
            description: input.description.clone(),
            completed: false,
            created_at: now,
            updated_at: now,
        };
        state.tasks.push(task.clone());
        task
    }

    /// Records the call, waits on a pending hold, then pops an injected failure.
    async fn enter(
        &self,
        operation: Operation,
        user_id: &str,
        task_id: Option<TaskId>,
    ) -> Result<(), RequestError> {
        let hold = {
            let mut state = self.state.lock();
            state.calls.push(ApiCall {
                operation,
                user_id: user_id.to_string(),
                task_id,
            });
            state.holds.pop_front()
        };
        if let Some(hold) = hold {
            // A dropped sender releases the call as well.
            let _ = hold.await;
        }
        match self.state.lock().failures.pop_front() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

impl TaskApi for LoopbackTaskApi {
    async fn list_tasks(&self, user_id: &str) -> Result<Vec<Task>, RequestError> {
        self.enter(Operation::List, user_id, None).await?;
        Ok(self.tasks_of(user_id))
    }

    async fn create_task(
        &self,
        user_id: &str,
        input: &CreateTaskInput,
    ) -> Result<Task, RequestError> {
        self.enter(Operation::Create, user_id, None).await?;
        let mut state = self.state.lock();
        Ok(Self::insert(&mut state, user_id, input))
    }

    async fn update_task(
        &self,
        user_id: &str,
        id: TaskId,
        input: &UpdateTaskInput,
    ) -> Result<Task, RequestError> {
        self.enter(Operation::Update, user_id, Some(id)).await?;
        let mut state = self.state.lock();
        let task = state.find_mut(user_id, id)?;
        task.apply_update(input, Utc::now());
        Ok(task.clone())
    }

    async fn delete_task(&self, user_id: &str, id: TaskId) -> Result<(), RequestError> {
        self.enter(Operation::Delete, user_id, Some(id)).await?;
        let mut state = self.state.lock();
        let before = state.tasks.len();
        state.tasks.retain(|t| !(t.id == id && t.user_id == user_id));
        if state.tasks.len() == before {
            return Err(not_found());
        }
        Ok(())
    }

    async fn toggle_complete(&self, user_id: &str, id: TaskId) -> Result<Task, RequestError> {
        self.enter(Operation::Toggle, user_id, Some(id)).await?;
        let mut state = self.state.lock();
        let task = state.find_mut(user_id, id)?;
        task.toggle(Utc::now());
        Ok(task.clone())
    }
}
