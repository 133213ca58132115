//! Request bodies and the `{ success, data, message }` response envelope.

use serde::{Deserialize, Serialize};

use crate::task::{CreateTaskInput, Task, UpdateTaskInput};

/// Body of `POST /tasks`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    /// Owner of the new task.
    pub user_id: String,
    /// Task title.
    pub title: String,
    /// Optional description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl CreateTaskRequest {
    /// Builds the body from a user id and input.
    #[must_use]
    pub fn new(user_id: &str, input: &CreateTaskInput) -> Self {
        Self {
            user_id: user_id.to_string(),
            title: input.title.clone(),
            description: input.description.clone(),
        }
    }
}

/// Body of `PATCH /tasks/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskRequest {
    /// Owner of the task.
    pub user_id: String,
    /// New title, if changing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// New description, if changing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl UpdateTaskRequest {
    /// Builds the body from a user id and partial input.
    #[must_use]
    pub fn new(user_id: &str, input: &UpdateTaskInput) -> Self {
        Self {
            user_id: user_id.to_string(),
            title: input.title.clone(),
            description: input.description.clone(),
        }
    }
}

/// Body of `PATCH /tasks/{id}/toggle`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleTaskRequest {
    /// Owner of the task.
    pub user_id: String,
}

/// `data` of a single-task response: either the task or `{ "task": … }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TaskPayload {
    /// `{ "task": Task }`
    Wrapped {
        /// The task.
        task: Task,
    },
    /// A bare task object.
    Bare(Task),
}

impl TaskPayload {
    /// Unwraps the task.
    #[must_use]
    pub fn into_task(self) -> Task {
        match self {
            Self::Wrapped { task } | Self::Bare(task) => task,
        }
    }
}

/// `data` of a list response: either an array or `{ "tasks": [...] }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TaskListPayload {
    /// `{ "tasks": [...] }`, possibly with pagination alongside.
    Wrapped {
        /// The tasks.
        tasks: Vec<Task>,
    },
    /// A bare array.
    Bare(Vec<Task>),
}

impl TaskListPayload {
    /// Unwraps the task list.
    #[must_use]
    pub fn into_tasks(self) -> Vec<Task> {
        match self {
            Self::Wrapped { tasks } | Self::Bare(tasks) => tasks,
        }
    }
}

const fn success_default() -> bool {
    true
}

/// Response envelope shared by every endpoint.
///
/// Error texts are looked up in `message`, then `detail`, then `error`.
/// `detail` may be a string or structured JSON (framework validation
/// errors), so it is kept as a raw value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// Whether the server considers the call successful.
    #[serde(default = "success_default")]
    pub success: bool,
    /// Payload on success. Absent when the server sent none.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Human-readable message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Error detail.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<serde_json::Value>,
    /// Error text used by some server builds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    /// A successful response carrying `data`.
    pub const fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            detail: None,
            error: None,
        }
    }

    /// A failed response carrying `message`.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message.into()),
            detail: None,
            error: None,
        }
    }

    /// The error text the server supplied, if any.
    #[must_use]
    pub fn error_text(&self) -> Option<String> {
        let non_empty = |s: &String| !s.trim().is_empty();
        if let Some(message) = self.message.as_ref().filter(|s| non_empty(s)) {
            return Some(message.clone());
        }
        match &self.detail {
            Some(serde_json::Value::String(s)) if non_empty(s) => return Some(s.clone()),
            Some(serde_json::Value::Null | serde_json::Value::String(_)) | None => {}
            Some(other) => return Some(other.to_string()),
        }
        self.error.as_ref().filter(|s| non_empty(s)).cloned()
    }
}

/// An envelope whose payload is ignored, for decoding error bodies and
/// `DELETE` responses.
pub type EmptyResponse = ApiResponse<serde_json::Value>;
