//! Task model and input validation for the `Taskdeck` API.
//!
//! Tasks travel as camelCase JSON. Inputs are normalized (trimmed) by the
//! client before validation so the limits apply to what is actually sent.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum allowed task title length in characters.
pub const MAX_TITLE_LENGTH: usize = 200;

/// Maximum allowed task description length in characters.
pub const MAX_DESCRIPTION_LENGTH: usize = 1000;

/// Identifier of a task.
///
/// Server-assigned ids are positive. Negative ids are reserved for
/// provisional records that exist only on the client until the server
/// confirms a create.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(i64);

impl TaskId {
    /// Wraps a raw id.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the raw id.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }

    /// Whether this id belongs to a client-side provisional record.
    #[must_use]
    pub const fn is_provisional(self) -> bool {
        self.0 < 0
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for TaskId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}

/// A task owned by a single user.
///
/// Accepts snake_case field names on input as well, since some server
/// builds emit `user_id` / `created_at` / `updated_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Unique id within the user's task set.
    pub id: TaskId,
    /// Owner of the task.
    #[serde(alias = "user_id")]
    pub user_id: String,
    /// Non-empty title, at most [`MAX_TITLE_LENGTH`] characters.
    pub title: String,
    /// Optional description, at most [`MAX_DESCRIPTION_LENGTH`] characters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Completion flag.
    #[serde(default)]
    pub completed: bool,
    /// Creation time.
    #[serde(alias = "created_at")]
    pub created_at: DateTime<Utc>,
    /// Last modification time, never earlier than `created_at`.
    #[serde(alias = "updated_at")]
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Stamps a new modification time, clamped so `updated_at >= created_at`.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now.max(self.created_at);
    }

    /// Applies the fields present in `input` and stamps `updated_at`.
    ///
    /// Absent fields are left untouched.
    pub fn apply_update(&mut self, input: &UpdateTaskInput, now: DateTime<Utc>) {
        if let Some(title) = &input.title {
            self.title.clone_from(title);
        }
        if let Some(description) = &input.description {
            self.description = Some(description.clone());
        }
        self.touch(now);
    }

    /// Flips `completed` and stamps `updated_at`.
    pub fn toggle(&mut self, now: DateTime<Utc>) {
        self.completed = !self.completed;
        self.touch(now);
    }
}

/// Which input field a [`ValidationError`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TaskField {
    /// The title field.
    Title,
    /// The description field.
    Description,
}

/// Client-side validation failures for task input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Title is empty after trimming.
    #[error("Title is required")]
    TitleRequired,
    /// Title exceeds [`MAX_TITLE_LENGTH`].
    #[error("Title must be {max} characters or less")]
    TitleTooLong {
        /// Actual length in characters.
        len: usize,
        /// Maximum allowed length.
        max: usize,
    },
    /// Description exceeds [`MAX_DESCRIPTION_LENGTH`].
    #[error("Description must be {max} characters or less")]
    DescriptionTooLong {
        /// Actual length in characters.
        len: usize,
        /// Maximum allowed length.
        max: usize,
    },
}

impl ValidationError {
    /// The field this error is scoped to.
    #[must_use]
    pub const fn field(&self) -> TaskField {
        match self {
            Self::TitleRequired | Self::TitleTooLong { .. } => TaskField::Title,
            Self::DescriptionTooLong { .. } => TaskField::Description,
        }
    }
}

fn check_title(title: &str) -> Result<(), ValidationError> {
    if title.is_empty() {
        return Err(ValidationError::TitleRequired);
    }
    let len = title.chars().count();
    if len > MAX_TITLE_LENGTH {
        return Err(ValidationError::TitleTooLong {
            len,
            max: MAX_TITLE_LENGTH,
        });
    }
    Ok(())
}

fn check_description(description: &str) -> Result<(), ValidationError> {
    let len = description.chars().count();
    if len > MAX_DESCRIPTION_LENGTH {
        return Err(ValidationError::DescriptionTooLong {
            len,
            max: MAX_DESCRIPTION_LENGTH,
        });
    }
    Ok(())
}

/// Trims a description and drops it when nothing is left.
fn normalize_description(description: Option<&str>) -> Option<String> {
    description
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string)
}

/// Input for creating a task.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateTaskInput {
    /// Task title (required).
    pub title: String,
    /// Optional description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl CreateTaskInput {
    /// Creates an input with a title and no description.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Returns a copy with the title trimmed and a blank description removed.
    #[must_use]
    pub fn normalized(&self) -> Self {
        Self {
            title: self.title.trim().to_string(),
            description: normalize_description(self.description.as_deref()),
        }
    }

    /// Validates the input as it would be sent.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] found, title before description.
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_title(&self.title)?;
        if let Some(description) = &self.description {
            check_description(description)?;
        }
        Ok(())
    }

    /// Collects every validation error, one per field.
    #[must_use]
    pub fn errors(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        if let Err(e) = check_title(&self.title) {
            errors.push(e);
        }
        if let Some(Err(e)) = self.description.as_deref().map(check_description) {
            errors.push(e);
        }
        errors
    }
}

/// Partial update of a task. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateTaskInput {
    /// New title, if changing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// New description, if changing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl UpdateTaskInput {
    /// An update that only changes the title.
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            description: None,
        }
    }

    /// An update that only changes the description.
    pub fn description(description: impl Into<String>) -> Self {
        Self {
            title: None,
            description: Some(description.into()),
        }
    }

    /// Returns a copy with a trimmed title and blank description removed.
    #[must_use]
    pub fn normalized(&self) -> Self {
        Self {
            title: self.title.as_deref().map(|t| t.trim().to_string()),
            description: normalize_description(self.description.as_deref()),
        }
    }

    /// Whether the update changes nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none()
    }

    /// Validates the fields that are present.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] found, title before description.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(title) = &self.title {
            check_title(title)?;
        }
        if let Some(description) = &self.description {
            check_description(description)?;
        }
        Ok(())
    }
}
