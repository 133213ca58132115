//! Plain-text presentation of the task list.
//!
//! [`ListView::from_snapshot`] picks what the list area shows: a loading
//! indicator wins over an error, an error wins over the empty state, and
//! only then are the cards rendered.

use std::fmt::Write as _;

use taskdeck_proto::task::Task;

use crate::tasks::StoreSnapshot;

/// Shown when the user has no tasks.
pub const EMPTY_MESSAGE: &str = "You don't have any tasks. Add one to get started!";

/// What the list area displays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListView<'a> {
    Loading,
    Error(&'a str),
    Empty,
    Items(&'a [Task]),
}

impl<'a> ListView<'a> {
    #[must_use]
    pub fn from_snapshot(snapshot: &'a StoreSnapshot) -> Self {
        Self::new(&snapshot.tasks, snapshot.loading, snapshot.error.as_deref())
    }

    #[must_use]
    pub const fn new(tasks: &'a [Task], loading: bool, error: Option<&'a str>) -> Self {
        if loading {
            Self::Loading
        } else if let Some(message) = error {
            Self::Error(message)
        } else if tasks.is_empty() {
            Self::Empty
        } else {
            Self::Items(tasks)
        }
    }
}

/// One card: checkbox, id and title, then the description and last update.
#[must_use]
pub fn render_card(task: &Task) -> String {
    let checkbox = if task.completed { "[✓]" } else { "[ ]" };
    let mut card = format!("{checkbox} #{} {}", task.id, task.title);
    if let Some(description) = &task.description {
        let _ = write!(card, "\n      {description}");
    }
    let _ = write!(card, "\n      updated {}", task.updated_at.format("%Y-%m-%d"));
    card
}

/// Renders the whole list area.
#[must_use]
pub fn render_list(view: ListView<'_>) -> String {
    match view {
        ListView::Loading => "Loading tasks…".to_string(),
        ListView::Error(message) => format!("Error: {message}"),
        ListView::Empty => format!("No tasks yet\n{EMPTY_MESSAGE}"),
        ListView::Items(tasks) => tasks
            .iter()
            .map(render_card)
            .collect::<Vec<_>>()
            .join("\n"),
    }
}
