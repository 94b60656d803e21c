//! Kanban columns, one per status, optionally split into swimlanes.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::model::{Priority, Project, Status, Task};
use crate::reconcile;
use crate::views::TaskFilter;

/// Secondary grouping inside each status column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Swimlane {
    Project,
    Assignee,
    Priority,
}

#[derive(Debug, Clone, Serialize)]
pub struct Card {
    pub id: String,
    pub title: String,
    pub assignee: String,
    pub priority: Priority,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<chrono::NaiveDate>,
    pub project: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Lane {
    pub label: String,
    pub cards: Vec<Card>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Column {
    pub status: Status,
    pub count: usize,
    /// A single unnamed lane when no swimlane grouping is requested.
    pub lanes: Vec<Lane>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Kanban {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub swimlane: Option<Swimlane>,
    pub columns: Vec<Column>,
}

impl Kanban {
    pub fn column(&self, status: Status) -> Option<&Column> {
        self.columns.iter().find(|column| column.status == status)
    }
}

/// Build the board. Cards keep the stored task order within each lane.
pub fn kanban(
    tasks: &[Task],
    projects: &[Project],
    filter: &TaskFilter,
    swimlane: Option<Swimlane>,
) -> Kanban {
    let visible = filter.apply(tasks);
    let columns = Status::ALL
        .iter()
        .map(|&status| {
            let in_column: Vec<&Task> = visible
                .iter()
                .copied()
                .filter(|task| task.status == status)
                .collect();
            let count = in_column.len();
            let lanes = match swimlane {
                None => vec![Lane {
                    label: String::new(),
                    cards: in_column.iter().map(|task| card(task, projects)).collect(),
                }],
                Some(axis) => group(&in_column, projects, axis),
            };
            Column {
                status,
                count,
                lanes,
            }
        })
        .collect();
    Kanban { swimlane, columns }
}

fn group(tasks: &[&Task], projects: &[Project], axis: Swimlane) -> Vec<Lane> {
    // Keyed by sort order, then label.
    let mut lanes: BTreeMap<(u8, String), Vec<Card>> = BTreeMap::new();
    for task in tasks {
        let key = match axis {
            Swimlane::Project => {
                let name = project_name(&task.project_id, projects);
                if name.is_empty() {
                    (1, "No project".to_string())
                } else {
                    (0, name.to_string())
                }
            }
            Swimlane::Assignee => match task.assignee.trim() {
                "" => (1, "Unassigned".to_string()),
                name => (0, name.to_string()),
            },
            Swimlane::Priority => {
                let rank = match task.priority {
                    Priority::High => 0,
                    Priority::Medium => 1,
                    Priority::Low => 2,
                };
                (rank, task.priority.to_string())
            }
        };
        lanes.entry(key).or_default().push(card(task, projects));
    }
    lanes
        .into_iter()
        .map(|((_, label), cards)| Lane { label, cards })
        .collect()
}

fn card(task: &Task, projects: &[Project]) -> Card {
    Card {
        id: task.id.clone(),
        title: task.title.clone(),
        assignee: task.assignee.clone(),
        priority: task.priority,
        due_date: task.due_date,
        project: project_name(&task.project_id, projects).to_string(),
    }
}

fn project_name<'a>(project_id: &str, projects: &'a [Project]) -> &'a str {
    reconcile::find_by_id(projects, project_id)
        .map(|project| project.name.as_str())
        .unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(title: &str, status: Status, assignee: &str, priority: Priority) -> Task {
        let mut task = Task::new(title);
        task.status = status;
        task.assignee = assignee.to_string();
        task.priority = priority;
        task
    }

    #[test]
    fn columns_follow_status_order() {
        let tasks = vec![
            task("a", Status::Done, "", Priority::Low),
            task("b", Status::Todo, "", Priority::Low),
        ];
        let board = kanban(&tasks, &[], &TaskFilter::default(), None);
        let order: Vec<Status> = board.columns.iter().map(|c| c.status).collect();
        assert_eq!(order, Status::ALL.to_vec());
        assert_eq!(board.column(Status::Todo).unwrap().lanes[0].cards[0].title, "b");
        assert_eq!(board.column(Status::Blocked).unwrap().count, 0);
    }

    #[test]
    fn assignee_lanes_put_unassigned_last() {
        let tasks = vec![
            task("a", Status::Todo, "", Priority::Low),
            task("b", Status::Todo, "Zed", Priority::Low),
            task("c", Status::Todo, "Ana", Priority::Low),
        ];
        let board = kanban(&tasks, &[], &TaskFilter::default(), Some(Swimlane::Assignee));
        let labels: Vec<_> = board.columns[0]
            .lanes
            .iter()
            .map(|lane| lane.label.as_str())
            .collect();
        assert_eq!(labels, vec!["Ana", "Zed", "Unassigned"]);
    }

    #[test]
    fn priority_lanes_run_high_to_low() {
        let tasks = vec![
            task("a", Status::InProgress, "", Priority::Low),
            task("b", Status::InProgress, "", Priority::High),
        ];
        let board = kanban(&tasks, &[], &TaskFilter::default(), Some(Swimlane::Priority));
        let column = board.column(Status::InProgress).unwrap();
        assert_eq!(column.lanes[0].label, "High");
        assert_eq!(column.lanes[1].label, "Low");
    }

    #[test]
    fn project_lanes_use_names() {
        let project = Project::new("Website");
        let mut linked = task("a", Status::Todo, "", Priority::Medium);
        linked.project_id = project.id.clone();
        let tasks = vec![linked, task("b", Status::Todo, "", Priority::Medium)];
        let board = kanban(&tasks, &[project], &TaskFilter::default(), Some(Swimlane::Project));
        let labels: Vec<_> = board.columns[0].lanes.iter().map(|l| l.label.clone()).collect();
        assert_eq!(labels, vec!["Website", "No project"]);
        assert_eq!(board.columns[0].lanes[0].cards[0].project, "Website");
    }
}
