//! Task, project and settings records.
//!
//! These are the locally persisted shapes (camelCase keys, display strings
//! for enums). The remote row shape lives in `remote::row`.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Error, Result};

/// Task priority.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ValueEnum)]
pub enum Priority {
    #[serde(alias = "low")]
    Low,
    #[default]
    #[serde(alias = "medium")]
    Medium,
    #[serde(alias = "high")]
    High,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::Low, Priority::Medium, Priority::High];

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "Low",
            Priority::Medium => "Medium",
            Priority::High => "High",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Task status. Every status can move to every other one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
pub enum Status {
    #[default]
    #[serde(alias = "todo")]
    Todo,
    #[serde(rename = "In Progress", alias = "InProgress", alias = "in_progress")]
    #[value(name = "in-progress")]
    InProgress,
    #[serde(alias = "blocked")]
    Blocked,
    #[serde(alias = "done")]
    Done,
}

impl Status {
    /// Lane order on the board.
    pub const ALL: [Status; 4] = [Status::Todo, Status::InProgress, Status::Blocked, Status::Done];

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Todo => "Todo",
            Status::InProgress => "In Progress",
            Status::Blocked => "Blocked",
            Status::Done => "Done",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = Error;

    fn from_str(raw: &str) -> Result<Self> {
        let normalized: String = raw
            .trim()
            .chars()
            .filter(|ch| !matches!(ch, ' ' | '-' | '_'))
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "todo" => Ok(Status::Todo),
            "inprogress" => Ok(Status::InProgress),
            "blocked" => Ok(Status::Blocked),
            "done" => Ok(Status::Done),
            _ => Err(Error::InvalidArgument(format!(
                "unknown status '{}' (expected todo|in-progress|blocked|done)",
                raw.trim()
            ))),
        }
    }
}

/// A file attached to a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub size: u64,
}

/// A comment on a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub body: String,
    #[serde(default, deserialize_with = "timestamp")]
    pub created_at: DateTime<Utc>,
}

impl Comment {
    pub fn new(author: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id: ulid::Ulid::new().to_string(),
            author: author.into(),
            body: body.into(),
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    /// Empty when the task is not assigned to a project.
    #[serde(default)]
    pub project_id: String,
    pub title: String,
    #[serde(default)]
    pub assignee: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub status: Status,
    #[serde(
        default,
        deserialize_with = "optional_date",
        skip_serializing_if = "Option::is_none"
    )]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub estimate_hours: f64,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(default, deserialize_with = "timestamp")]
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// A fresh task with a new id and default fields.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            project_id: String::new(),
            title: title.into(),
            assignee: String::new(),
            priority: Priority::default(),
            status: Status::default(),
            due_date: None,
            estimate_hours: 0.0,
            attachments: Vec::new(),
            comments: Vec::new(),
            updated_at: Utc::now(),
        }
    }

    /// Check the invariants that must hold at save time.
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(Error::Validation("task title cannot be empty".to_string()));
        }
        if !self.estimate_hours.is_finite() || self.estimate_hours < 0.0 {
            return Err(Error::Validation(format!(
                "estimate hours must be a non-negative number, got {}",
                self.estimate_hours
            )));
        }
        Ok(())
    }

    pub fn has_project(&self) -> bool {
        !self.project_id.is_empty()
    }

    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.status != Status::Done && self.due_date.map(|due| due < today).unwrap_or(false)
    }
}

/// Field edits applied to a task on create or save.
#[derive(Debug, Clone, Default)]
pub struct TaskDraft {
    pub title: Option<String>,
    pub project_id: Option<String>,
    pub assignee: Option<String>,
    pub priority: Option<Priority>,
    pub status: Option<Status>,
    /// `Some(None)` clears the due date.
    pub due_date: Option<Option<NaiveDate>>,
    pub estimate_hours: Option<f64>,
}

impl TaskDraft {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    pub fn apply_to(&self, task: &mut Task) {
        if let Some(title) = &self.title {
            task.title = title.trim().to_string();
        }
        if let Some(project_id) = &self.project_id {
            task.project_id = project_id.trim().to_string();
        }
        if let Some(assignee) = &self.assignee {
            task.assignee = assignee.trim().to_string();
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
        if let Some(status) = self.status {
            task.status = status;
        }
        if let Some(due_date) = self.due_date {
            task.due_date = due_date;
        }
        if let Some(hours) = self.estimate_hours {
            task.estimate_hours = hours;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub name: String,
    #[serde(
        default,
        deserialize_with = "optional_date",
        skip_serializing_if = "Option::is_none"
    )]
    pub start_date: Option<NaiveDate>,
    #[serde(
        default,
        deserialize_with = "optional_date",
        skip_serializing_if = "Option::is_none"
    )]
    pub end_date: Option<NaiveDate>,
    /// Newline-separated `YYYY-MM-DD - Title` lines.
    #[serde(default)]
    pub milestones: String,
}

impl Project {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
            start_date: None,
            end_date: None,
            milestones: String::new(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::Validation("project name cannot be empty".to_string()));
        }
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if end < start {
                return Err(Error::Validation(format!(
                    "project end date {end} is before start date {start}"
                )));
            }
        }
        Ok(())
    }

    /// Milestones with a parseable date and a title, in text order.
    pub fn parsed_milestones(&self) -> Vec<Milestone> {
        self.milestones.lines().filter_map(parse_milestone).collect()
    }
}

/// Field edits applied to a project on create or save.
#[derive(Debug, Clone, Default)]
pub struct ProjectDraft {
    pub name: Option<String>,
    pub start_date: Option<Option<NaiveDate>>,
    pub end_date: Option<Option<NaiveDate>>,
    pub milestones: Option<String>,
}

impl ProjectDraft {
    pub fn apply_to(&self, project: &mut Project) {
        if let Some(name) = &self.name {
            project.name = name.trim().to_string();
        }
        if let Some(start) = self.start_date {
            project.start_date = start;
        }
        if let Some(end) = self.end_date {
            project.end_date = end;
        }
        if let Some(milestones) = &self.milestones {
            project.milestones = milestones.clone();
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Milestone {
    pub date: NaiveDate,
    pub title: String,
}

/// Parse one `YYYY-MM-DD - Title` line.
pub fn parse_milestone(line: &str) -> Option<Milestone> {
    let line = line.trim();
    let date_part = line.get(..10)?;
    let date = NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()?;
    let rest = line[10..].trim_start().strip_prefix('-')?;
    let title = rest.trim();
    if title.is_empty() {
        return None;
    }
    Some(Milestone {
        date,
        title: title.to_string(),
    })
}

/// Locally stored notification destinations. Unset fields fall back to
/// the deployment defaults from config.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_slack: Option<String>,
}

/// Generate a fresh record id.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Parse a `YYYY-MM-DD` argument.
pub fn parse_date(label: &str, raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|err| {
        Error::InvalidArgument(format!("invalid {label} '{}': {err}", raw.trim()))
    })
}

/// Accepts `YYYY-MM-DD`, a full RFC 3339 timestamp, an empty string, or null.
fn optional_date<'de, D>(deserializer: D) -> std::result::Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .or_else(|_| DateTime::parse_from_rfc3339(value).map(|at| at.date_naive()))
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("invalid date '{value}'"))),
    }
}

/// Accepts an RFC 3339 string or epoch milliseconds.
fn timestamp<'de, D>(deserializer: D) -> std::result::Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Millis(i64),
        Text(String),
    }

    match Option::<Raw>::deserialize(deserializer)? {
        None => Ok(DateTime::<Utc>::default()),
        Some(Raw::Millis(ms)) => DateTime::<Utc>::from_timestamp_millis(ms)
            .ok_or_else(|| serde::de::Error::custom(format!("timestamp out of range: {ms}"))),
        Some(Raw::Text(text)) => DateTime::parse_from_rfc3339(text.trim())
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom),
    }
}
