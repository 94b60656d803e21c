//! Derived data behind the board, calendar, timeline and dashboard.
//!
//! Views borrow from the board state and never mutate it.

pub mod calendar;
pub mod dashboard;
pub mod kanban;
pub mod timeline;

use crate::model::Task;

pub use calendar::{month_grid, CalendarMonth};
pub use dashboard::{dashboard, Dashboard};
pub use kanban::{kanban, Kanban, Swimlane};
pub use timeline::{timeline, Timeline};

/// Task filters shared by the list and board views. Empty filters match
/// everything.
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    /// Project id; an empty string selects unassigned tasks.
    pub project_id: Option<String>,
    /// Case-insensitive exact assignee.
    pub assignee: Option<String>,
    /// Case-insensitive substring of title or assignee.
    pub text: Option<String>,
}

impl TaskFilter {
    pub fn matches(&self, task: &Task) -> bool {
        if let Some(project_id) = &self.project_id {
            if &task.project_id != project_id {
                return false;
            }
        }
        if let Some(assignee) = self.assignee.as_deref().map(str::trim) {
            if !task.assignee.trim().eq_ignore_ascii_case(assignee) {
                return false;
            }
        }
        if let Some(text) = self.text.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            let needle = text.to_lowercase();
            let haystack = format!("{} {}", task.title, task.assignee).to_lowercase();
            if !haystack.contains(&needle) {
                return false;
            }
        }
        true
    }

    pub fn apply<'a>(&self, tasks: &'a [Task]) -> Vec<&'a Task> {
        tasks.iter().filter(|task| self.matches(task)).collect()
    }
}
