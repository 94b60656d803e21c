//! CSV export and JSON backup/restore.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{NotificationSettings, Project, Task};
use crate::reconcile;

/// CSV columns, in order.
pub const CSV_COLUMNS: [&str; 11] = [
    "id",
    "title",
    "project",
    "assignee",
    "priority",
    "status",
    "due_date",
    "estimate_hours",
    "attachments",
    "comments",
    "updated_at",
];

/// One header line plus one line per task. Project ids are shown by name.
pub fn tasks_to_csv(tasks: &[Task], projects: &[Project]) -> String {
    let mut out = CSV_COLUMNS.join(",");
    out.push('\n');
    for task in tasks {
        let project = reconcile::find_by_id(projects, &task.project_id)
            .map(|project| project.name.as_str())
            .unwrap_or("");
        let fields = [
            task.id.clone(),
            task.title.clone(),
            project.to_string(),
            task.assignee.clone(),
            task.priority.to_string(),
            task.status.to_string(),
            task.due_date.map(|d| d.to_string()).unwrap_or_default(),
            task.estimate_hours.to_string(),
            task.attachments.len().to_string(),
            task.comments.len().to_string(),
            task.updated_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        ];
        let line: Vec<String> = fields.iter().map(|field| csv_field(field)).collect();
        out.push_str(&line.join(","));
        out.push('\n');
    }
    out
}

/// Quote a field when it holds a delimiter, quote or line break.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Full local state as written by `export json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Backup {
    pub tasks: Vec<Task>,
    pub projects: Vec<Project>,
    #[serde(default)]
    pub settings: NotificationSettings,
    #[serde(default = "Utc::now")]
    pub exported_at: DateTime<Utc>,
}

impl Backup {
    pub fn new(tasks: &[Task], projects: &[Project], settings: &NotificationSettings) -> Self {
        Self {
            tasks: tasks.to_vec(),
            projects: projects.to_vec(),
            settings: settings.clone(),
            exported_at: Utc::now(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse a backup document. Any problem is an import error.
    pub fn parse(raw: &str) -> Result<Self> {
        let backup: Backup = serde_json::from_str(raw)
            .map_err(|err| Error::Import(format!("not a valid backup: {err}")))?;
        for task in &backup.tasks {
            task.validate()
                .map_err(|err| Error::Import(format!("task {}: {err}", task.id)))?;
        }
        for project in &backup.projects {
            project
                .validate()
                .map_err(|err| Error::Import(format!("project {}: {err}", project.id)))?;
        }
        Ok(backup)
    }
}
