//! Task API abstraction for `Taskdeck`.
//!
//! Defines the [`TaskApi`] trait that every backend must satisfy.
//! Concrete implementations:
//! - [`http::HttpTaskApi`]: talks to the remote task service over HTTP
//! - [`loopback::LoopbackTaskApi`]: in-process fake server for tests and offline use
//!
//! Operations never retry and apply no timeout of their own; failures
//! reach the caller unchanged as [`RequestError`].

pub mod http;
pub mod loopback;

use std::fmt;

use taskdeck_proto::task::{CreateTaskInput, Task, TaskId, UpdateTaskInput};

/// A failed API request.
///
/// `status` is the HTTP status when a response was received, `None` for
/// transport failures (connection refused, DNS, aborted body). The
/// [`Display`](fmt::Display) form is the message alone, since that is what
/// the UI shows.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct RequestError {
    /// HTTP status code, if the server answered.
    pub status: Option<u16>,
    /// Server-provided or transport error text.
    pub message: String,
}

impl RequestError {
    /// An error for a response with the given status.
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            message: message.into(),
        }
    }

    /// An error raised before any response arrived.
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
        }
    }

    /// Whether the server reported the resource as missing.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self.status, Some(404))
    }
}

/// Which API call an event or log line refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// `GET /tasks`
    List,
    /// `POST /tasks`
    Create,
    /// `PATCH /tasks/{id}`
    Update,
    /// `DELETE /tasks/{id}`
    Delete,
    /// `PATCH /tasks/{id}/toggle`
    Toggle,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::List => write!(f, "fetch tasks"),
            Self::Create => write!(f, "create task"),
            Self::Update => write!(f, "update task"),
            Self::Delete => write!(f, "delete task"),
            Self::Toggle => write!(f, "toggle task completion"),
        }
    }
}

/// Async task API scoped by user id.
///
/// Every call names the user it acts for; implementations must never
/// return or touch tasks belonging to another user.
pub trait TaskApi: Send + Sync {
    /// Lists every task of `user_id`.
    fn list_tasks(
        &self,
        user_id: &str,
    ) -> impl std::future::Future<Output = Result<Vec<Task>, RequestError>> + Send;

    /// Creates a task and returns the server record.
    fn create_task(
        &self,
        user_id: &str,
        input: &CreateTaskInput,
    ) -> impl std::future::Future<Output = Result<Task, RequestError>> + Send;

    /// Applies a partial update and returns the server record.
    fn update_task(
        &self,
        user_id: &str,
        id: TaskId,
        input: &UpdateTaskInput,
    ) -> impl std::future::Future<Output = Result<Task, RequestError>> + Send;

    /// Deletes a task.
    fn delete_task(
        &self,
        user_id: &str,
        id: TaskId,
    ) -> impl std::future::Future<Output = Result<(), RequestError>> + Send;

    /// Flips a task's completion flag and returns the server record.
    fn toggle_complete(
        &self,
        user_id: &str,
        id: TaskId,
    ) -> impl std::future::Future<Output = Result<Task, RequestError>> + Send;
}
