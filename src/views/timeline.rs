//! Gantt-style timeline: one row per project.

use chrono::NaiveDate;
use serde::Serialize;

use crate::model::{Milestone, Project, Status, Task};

#[derive(Debug, Clone, Serialize)]
pub struct TimelineTask {
    pub id: String,
    pub title: String,
    pub due_date: NaiveDate,
    pub status: Status,
}

#[derive(Debug, Clone, Serialize)]
pub struct TimelineRow {
    pub project_id: String,
    pub name: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub milestones: Vec<Milestone>,
    pub tasks: Vec<TimelineTask>,
}

impl TimelineRow {
    /// Bar length in days, inclusive. `None` without both dates.
    pub fn span_days(&self) -> Option<i64> {
        match (self.start_date, self.end_date) {
            (Some(start), Some(end)) => Some((end - start).num_days() + 1),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Timeline {
    /// Earliest and latest date across bars, milestones and due dates.
    pub range: Option<(NaiveDate, NaiveDate)>,
    pub rows: Vec<TimelineRow>,
}

pub fn timeline(projects: &[Project], tasks: &[Task]) -> Timeline {
    let rows: Vec<TimelineRow> = projects
        .iter()
        .map(|project| {
            let mut dated: Vec<TimelineTask> = tasks
                .iter()
                .filter(|task| task.project_id == project.id)
                .filter_map(|task| {
                    task.due_date.map(|due_date| TimelineTask {
                        id: task.id.clone(),
                        title: task.title.clone(),
                        due_date,
                        status: task.status,
                    })
                })
                .collect();
            dated.sort_by_key(|task| task.due_date);
            TimelineRow {
                project_id: project.id.clone(),
                name: project.name.clone(),
                start_date: project.start_date,
                end_date: project.end_date,
                milestones: project.parsed_milestones(),
                tasks: dated,
            }
        })
        .collect();

    let dates = rows.iter().flat_map(|row| {
        row.start_date
            .into_iter()
            .chain(row.end_date)
            .chain(row.milestones.iter().map(|m| m.date))
            .chain(row.tasks.iter().map(|t| t.due_date))
    });
    let range = dates.fold(None, |range: Option<(NaiveDate, NaiveDate)>, date| match range {
        None => Some((date, date)),
        Some((lo, hi)) => Some((lo.min(date), hi.max(date))),
    });

    Timeline { range, rows }
}
