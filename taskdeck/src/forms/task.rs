//! Create/edit form for a single task.

use taskdeck_proto::task::{CreateTaskInput, Task, TaskField, TaskId, UpdateTaskInput};

use super::FieldErrors;

/// Title and description as typed, plus per-field errors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskForm {
    title: String,
    description: String,
    editing: Option<TaskId>,
    errors: FieldErrors<TaskField>,
}

impl TaskForm {
    /// An empty form for a new task.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A form pre-filled from `task` for editing.
    #[must_use]
    pub fn for_task(task: &Task) -> Self {
        Self {
            title: task.title.clone(),
            description: task.description.clone().unwrap_or_default(),
            editing: Some(task.id),
            errors: FieldErrors::new(),
        }
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// The task being edited, or `None` for a new task.
    #[must_use]
    pub const fn editing(&self) -> Option<TaskId> {
        self.editing
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
        self.errors.clear(TaskField::Title);
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
        self.errors.clear(TaskField::Description);
    }

    #[must_use]
    pub const fn errors(&self) -> &FieldErrors<TaskField> {
        &self.errors
    }

    #[must_use]
    pub fn error(&self, field: TaskField) -> Option<&str> {
        self.errors.get(field)
    }

    /// Validates both fields, replacing the error map. Returns `true` if valid.
    pub fn validate(&mut self) -> bool {
        self.errors = FieldErrors::new();
        for error in self.input().errors() {
            self.errors.set(error.field(), error.to_string());
        }
        self.errors.is_empty()
    }

    /// Validates and returns the trimmed create input.
    ///
    /// # Errors
    ///
    /// Returns the field errors if validation fails; they stay on the form.
    pub fn submit(&mut self) -> Result<CreateTaskInput, FieldErrors<TaskField>> {
        if self.validate() {
            Ok(self.input())
        } else {
            Err(self.errors.clone())
        }
    }

    /// Validates and returns the update for the task being edited.
    ///
    /// The title is always sent. A blank description leaves the stored
    /// description unchanged.
    ///
    /// # Errors
    ///
    /// Returns the field errors if validation fails; they stay on the form.
    pub fn to_update(&mut self) -> Result<UpdateTaskInput, FieldErrors<TaskField>> {
        let input = self.submit()?;
        Ok(UpdateTaskInput {
            title: Some(input.title),
            description: input.description,
        })
    }

    fn input(&self) -> CreateTaskInput {
        CreateTaskInput::new(self.title.as_str())
            .with_description(self.description.as_str())
            .normalized()
    }
}
