//! Folding edits and remote change events into local collections.
//!
//! Both optimistic local saves and inbound realtime events go through
//! [`upsert_by_id`], so the same record never appears twice. There is no
//! conflict detection: whichever change is applied last wins.

use serde::Serialize;

use crate::model::{Project, Task};

/// Records addressable by a unique id.
pub trait Identified {
    fn id(&self) -> &str;
}

impl Identified for Task {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Identified for Project {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Replace the record with the same id in place, or append it.
pub fn upsert_by_id<T: Identified>(list: &mut Vec<T>, item: T) -> Upsert {
    match list.iter().position(|existing| existing.id() == item.id()) {
        Some(index) => {
            list[index] = item;
            Upsert::Replaced(index)
        }
        None => {
            list.push(item);
            Upsert::Appended
        }
    }
}

/// Remove the record with `id`, if any.
pub fn remove_by_id<T: Identified>(list: &mut Vec<T>, id: &str) -> Option<T> {
    let index = list.iter().position(|existing| existing.id() == id)?;
    Some(list.remove(index))
}

pub fn find_by_id<'a, T: Identified>(list: &'a [T], id: &str) -> Option<&'a T> {
    list.iter().find(|existing| existing.id() == id)
}

/// Clear the project reference on every task pointing at `project_id`.
///
/// Returns the ids of the tasks that changed.
pub fn clear_project_refs(tasks: &mut [Task], project_id: &str) -> Vec<String> {
    let mut cleared = Vec::new();
    for task in tasks.iter_mut().filter(|task| task.project_id == project_id) {
        task.project_id.clear();
        cleared.push(task.id.clone());
    }
    cleared
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    Replaced(usize),
    Appended,
}

/// The in-process source of truth.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoardState {
    pub tasks: Vec<Task>,
    pub projects: Vec<Project>,
}

/// A single row-level change, local or remote.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordChange {
    UpsertTask(Task),
    DeleteTask(String),
    UpsertProject(Project),
    DeleteProject(String),
}

impl RecordChange {
    pub fn record_id(&self) -> &str {
        match self {
            RecordChange::UpsertTask(task) => &task.id,
            RecordChange::UpsertProject(project) => &project.id,
            RecordChange::DeleteTask(id) | RecordChange::DeleteProject(id) => id,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RecordChange::UpsertTask(_) => "task upserted",
            RecordChange::DeleteTask(_) => "task deleted",
            RecordChange::UpsertProject(_) => "project upserted",
            RecordChange::DeleteProject(_) => "project deleted",
        }
    }
}

/// What applying a change did to local state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Applied {
    pub inserted: usize,
    pub updated: usize,
    pub removed: usize,
    /// Tasks whose project reference was cleared by a project delete.
    pub detached_tasks: Vec<String>,
}

impl Applied {
    pub fn changed(&self) -> bool {
        self.inserted + self.updated + self.removed > 0 || !self.detached_tasks.is_empty()
    }

    fn record(&mut self, upsert: Upsert) {
        match upsert {
            Upsert::Replaced(_) => self.updated += 1,
            Upsert::Appended => self.inserted += 1,
        }
    }
}

/// Apply one change to the state.
pub fn apply_change(state: &mut BoardState, change: RecordChange) -> Applied {
    let mut applied = Applied::default();
    match change {
        RecordChange::UpsertTask(task) => applied.record(upsert_by_id(&mut state.tasks, task)),
        RecordChange::UpsertProject(project) => {
            applied.record(upsert_by_id(&mut state.projects, project))
        }
        RecordChange::DeleteTask(id) => {
            if remove_by_id(&mut state.tasks, &id).is_some() {
                applied.removed += 1;
            }
        }
        RecordChange::DeleteProject(id) => {
            if remove_by_id(&mut state.projects, &id).is_some() {
                applied.removed += 1;
            }
            applied.detached_tasks = clear_project_refs(&mut state.tasks, &id);
        }
    }
    applied
}
