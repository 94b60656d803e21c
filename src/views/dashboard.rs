//! Dashboard numbers.

use chrono::{Duration, NaiveDate};
use serde::Serialize;

use crate::model::{Project, Status, Task};

/// Days ahead counted as "due soon".
pub const DUE_SOON_DAYS: i64 = 7;

#[derive(Debug, Clone, Serialize)]
pub struct StatusCount {
    pub status: Status,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct DueTask {
    pub id: String,
    pub title: String,
    pub due_date: NaiveDate,
    pub status: Status,
    pub project: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectProgress {
    pub project_id: String,
    pub name: String,
    pub total: usize,
    pub done: usize,
    /// 0.0 ..= 1.0, zero for empty projects.
    pub ratio: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub today: NaiveDate,
    pub total: usize,
    pub by_status: Vec<StatusCount>,
    pub completion: f64,
    pub estimate_hours_total: f64,
    pub estimate_hours_open: f64,
    pub overdue: Vec<DueTask>,
    pub due_soon: Vec<DueTask>,
    pub projects: Vec<ProjectProgress>,
}

/// Compute the dashboard as of `today`.
pub fn dashboard(tasks: &[Task], projects: &[Project], today: NaiveDate) -> Dashboard {
    let total = tasks.len();
    let by_status = Status::ALL
        .iter()
        .map(|&status| StatusCount {
            status,
            count: tasks.iter().filter(|task| task.status == status).count(),
        })
        .collect();
    let done = tasks.iter().filter(|task| task.status == Status::Done).count();

    let estimate_hours_total: f64 = tasks.iter().map(|task| task.estimate_hours).sum();
    let estimate_hours_open: f64 = tasks
        .iter()
        .filter(|task| task.status != Status::Done)
        .map(|task| task.estimate_hours)
        .sum();

    // None past the end of the calendar: everything left is due soon.
    let horizon = today.checked_add_signed(Duration::days(DUE_SOON_DAYS));
    let mut overdue = Vec::new();
    let mut due_soon = Vec::new();
    for task in tasks {
        let Some(due_date) = task.due_date else { continue };
        if task.status == Status::Done {
            continue;
        }
        let entry = || DueTask {
            id: task.id.clone(),
            title: task.title.clone(),
            due_date,
            status: task.status,
            project: project_name(projects, &task.project_id),
        };
        if task.is_overdue(today) {
            overdue.push(entry());
        } else if horizon.map_or(true, |horizon| due_date <= horizon) {
            due_soon.push(entry());
        }
    }
    overdue.sort_by_key(|task| task.due_date);
    due_soon.sort_by_key(|task| task.due_date);

    let projects = projects
        .iter()
        .map(|project| {
            let mine: Vec<&Task> = tasks.iter().filter(|t| t.project_id == project.id).collect();
            let done = mine.iter().filter(|t| t.status == Status::Done).count();
            ProjectProgress {
                project_id: project.id.clone(),
                name: project.name.clone(),
                total: mine.len(),
                done,
                ratio: ratio(done, mine.len()),
            }
        })
        .collect();

    Dashboard {
        today,
        total,
        by_status,
        completion: ratio(done, total),
        estimate_hours_total,
        estimate_hours_open,
        overdue,
        due_soon,
        projects,
    }
}

fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

fn project_name(projects: &[Project], id: &str) -> String {
    projects
        .iter()
        .find(|project| project.id == id)
        .map(|project| project.name.clone())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn due(title: &str, on: NaiveDate, status: Status) -> Task {
        let mut task = Task::new(title);
        task.due_date = Some(on);
        task.status = status;
        task
    }

    #[test]
    fn due_soon_near_the_last_representable_day() {
        let today = NaiveDate::MAX - Duration::days(2);
        let tasks = vec![due("End of time", NaiveDate::MAX, Status::Todo)];
        let view = dashboard(&tasks, &[], today);
        assert!(view.overdue.is_empty());
        assert_eq!(view.due_soon.len(), 1);
    }

    #[test]
    fn overdue_needs_past_due_and_not_done() {
        let today = date(2024, 1, 2);
        let tasks = vec![
            due("Design mock", date(2024, 1, 1), Status::Todo),
            due("Shipped", date(2023, 12, 1), Status::Done),
            due("Today", today, Status::InProgress),
        ];
        let view = dashboard(&tasks, &[], today);
        assert_eq!(view.overdue.len(), 1);
        assert_eq!(view.overdue[0].title, "Design mock");
        assert_eq!(view.due_soon.len(), 1);
        assert_eq!(view.due_soon[0].title, "Today");
    }

    #[test]
    fn not_overdue_on_the_due_date() {
        let tasks = vec![due("Design mock", date(2024, 1, 1), Status::Todo)];
        assert!(dashboard(&tasks, &[], date(2024, 1, 1)).overdue.is_empty());
    }

    #[test]
    fn due_soon_window_is_seven_days() {
        let today = date(2024, 3, 1);
        let tasks = vec![
            due("in seven", date(2024, 3, 8), Status::Todo),
            due("in eight", date(2024, 3, 9), Status::Todo),
        ];
        let view = dashboard(&tasks, &[], today);
        let titles: Vec<_> = view.due_soon.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["in seven"]);
    }

    #[test]
    fn totals_hours_and_progress() {
        let project = Project::new("Website");
        let mut a = Task::new("a");
        a.project_id = project.id.clone();
        a.estimate_hours = 3.0;
        a.status = Status::Done;
        let mut b = Task::new("b");
        b.project_id = project.id.clone();
        b.estimate_hours = 1.5;

        let view = dashboard(&[a, b], &[project], date(2024, 1, 1));
        assert_eq!(view.total, 2);
        assert_eq!(view.completion, 0.5);
        assert_eq!(view.estimate_hours_total, 4.5);
        assert_eq!(view.estimate_hours_open, 1.5);
        assert_eq!(view.projects[0].done, 1);
        assert_eq!(view.projects[0].ratio, 0.5);
        let done = view.by_status.iter().find(|c| c.status == Status::Done).unwrap();
        assert_eq!(done.count, 1);
    }

    #[test]
    fn empty_board_has_zero_completion() {
        let view = dashboard(&[], &[], date(2024, 1, 1));
        assert_eq!(view.completion, 0.0);
        assert!(view.overdue.is_empty());
    }
}
