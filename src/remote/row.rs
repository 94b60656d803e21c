//! Remote row shapes.
//!
//! Column names are snake_case on the backend and must stay that way; the
//! local shape is camelCase. Every row carries the owner's `user_id` so
//! row-level security can scope it.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::model::{Attachment, Comment, Priority, Project, Status, Task};

/// A local record's counterpart in a remote table.
pub trait RemoteRow: Serialize + DeserializeOwned + Send {
    const TABLE: &'static str;
    type Local;

    fn from_local(local: &Self::Local, user_id: &str, now: DateTime<Utc>) -> Self;
    fn into_local(self) -> Self::Local;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRow {
    pub id: String,
    #[serde(default)]
    pub project_id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub assignee: Option<String>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub status: Option<Status>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub estimate_hours: Option<f64>,
    #[serde(default)]
    pub attachments: Option<Vec<Attachment>>,
    #[serde(default)]
    pub comments: Option<Vec<Comment>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    /// Set by the server on insert.
    #[serde(default, skip_serializing)]
    pub created_at: Option<DateTime<Utc>>,
}

impl RemoteRow for TaskRow {
    const TABLE: &'static str = "tasks";
    type Local = Task;

    fn from_local(task: &Task, user_id: &str, now: DateTime<Utc>) -> Self {
        Self {
            id: task.id.clone(),
            project_id: non_empty(&task.project_id),
            title: task.title.clone(),
            assignee: Some(task.assignee.clone()),
            priority: Some(task.priority),
            status: Some(task.status),
            due_date: task.due_date,
            estimate_hours: Some(task.estimate_hours),
            attachments: Some(task.attachments.clone()),
            comments: Some(task.comments.clone()),
            user_id: Some(user_id.to_string()),
            updated_at: Some(now),
            created_at: None,
        }
    }

    fn into_local(self) -> Task {
        Task {
            id: self.id,
            project_id: self.project_id.unwrap_or_default(),
            title: self.title,
            assignee: self.assignee.unwrap_or_default(),
            priority: self.priority.unwrap_or_default(),
            status: self.status.unwrap_or_default(),
            due_date: self.due_date,
            estimate_hours: self.estimate_hours.unwrap_or(0.0),
            attachments: self.attachments.unwrap_or_default(),
            comments: self.comments.unwrap_or_default(),
            updated_at: self.updated_at.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRow {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub milestones: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing)]
    pub created_at: Option<DateTime<Utc>>,
}

impl RemoteRow for ProjectRow {
    const TABLE: &'static str = "projects";
    type Local = Project;

    fn from_local(project: &Project, user_id: &str, now: DateTime<Utc>) -> Self {
        Self {
            id: project.id.clone(),
            name: project.name.clone(),
            start_date: project.start_date,
            end_date: project.end_date,
            milestones: Some(project.milestones.clone()),
            user_id: Some(user_id.to_string()),
            updated_at: Some(now),
            created_at: None,
        }
    }

    fn into_local(self) -> Project {
        Project {
            id: self.id,
            name: self.name,
            start_date: self.start_date,
            end_date: self.end_date,
            milestones: self.milestones.unwrap_or_default(),
        }
    }
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}
