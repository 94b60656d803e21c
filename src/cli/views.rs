//! Read-only view commands: board, calendar, timeline, dashboard.

use chrono::{Datelike, Local, NaiveDate};

use crate::cli::{load_context, GlobalArgs};
use crate::error::Result;
use crate::model::parse_date;
use crate::output::{emit_success, HumanOutput};
use crate::views::calendar::parse_month;
use crate::views::{dashboard, kanban, month_grid, timeline, Swimlane, TaskFilter};

pub struct BoardOptions {
    pub project: Option<String>,
    pub assignee: Option<String>,
    pub search: Option<String>,
    pub swimlane: Option<Swimlane>,
    pub global: GlobalArgs,
}

pub struct CalendarOptions {
    pub month: Option<String>,
    pub global: GlobalArgs,
}

pub struct DashboardOptions {
    pub today: Option<String>,
    pub global: GlobalArgs,
}

pub fn run_board(options: BoardOptions) -> Result<()> {
    let ctx = load_context(options.global)?;
    let (board, warnings) = ctx.open_board();

    let project_id = match options.project.as_deref().map(str::trim) {
        None => None,
        Some("") => Some(String::new()),
        Some(key) => Some(board.resolve_project(key)?.id.clone()),
    };
    let filter = TaskFilter {
        project_id,
        assignee: options.assignee,
        text: options.search,
    };
    let view = kanban(board.tasks(), board.projects(), &filter, options.swimlane);

    let mut human = HumanOutput::new("Board");
    human.extend_warnings(warnings);
    for column in &view.columns {
        human.push_summary(column.status.to_string(), column.count.to_string());
    }
    for column in &view.columns {
        for lane in &column.lanes {
            for card in &lane.cards {
                let lane_label = if lane.label.is_empty() {
                    String::new()
                } else {
                    format!(" / {}", lane.label)
                };
                let mut line = format!("[{}{}] {} {}", column.status, lane_label, card.id, card.title);
                if !card.assignee.is_empty() {
                    line.push_str(&format!(" @{}", card.assignee));
                }
                if let Some(due) = card.due_date {
                    line.push_str(&format!(" due {due}"));
                }
                human.push_detail(line);
            }
        }
    }

    emit_success(ctx.output, "board", &view, Some(&human))
}

pub fn run_calendar(options: CalendarOptions) -> Result<()> {
    let (year, month) = match options.month.as_deref() {
        Some(raw) => parse_month(raw)?,
        None => {
            let today = Local::now().date_naive();
            (today.year(), today.month())
        }
    };
    let ctx = load_context(options.global)?;
    let (board, warnings) = ctx.open_board();
    let view = month_grid(board.tasks(), year, month)?;

    let mut human = HumanOutput::new(format!("Calendar {year}-{month:02}"));
    human.extend_warnings(warnings);
    for day in view.weeks.iter().flatten() {
        if !day.in_month {
            continue;
        }
        for task in &day.tasks {
            human.push_detail(format!("{} [{}] {}", day.date, task.status, task.title));
        }
    }
    let due_this_month: usize = view
        .weeks
        .iter()
        .flatten()
        .filter(|day| day.in_month)
        .map(|day| day.tasks.len())
        .sum();
    human.push_summary("Due this month", due_this_month.to_string());

    emit_success(ctx.output, "calendar", &view, Some(&human))
}

pub fn run_timeline(global: GlobalArgs) -> Result<()> {
    let ctx = load_context(global)?;
    let (board, warnings) = ctx.open_board();
    let view = timeline(board.projects(), board.tasks());

    let mut human = HumanOutput::new("Timeline");
    human.extend_warnings(warnings);
    if let Some((start, end)) = view.range {
        human.push_summary("Range", format!("{start} .. {end}"));
    }
    for row in &view.rows {
        let bar = match (row.start_date, row.end_date, row.span_days()) {
            (Some(start), Some(end), Some(days)) => format!("{start} .. {end} ({days} days)"),
            (Some(start), None, _) => format!("from {start}"),
            (None, Some(end), _) => format!("until {end}"),
            _ => "undated".to_string(),
        };
        human.push_detail(format!("{}: {bar}", row.name));
        for milestone in &row.milestones {
            human.push_detail(format!("  milestone {} {}", milestone.date, milestone.title));
        }
        for task in &row.tasks {
            human.push_detail(format!("  due {} [{}] {}", task.due_date, task.status, task.title));
        }
    }
    if view.rows.is_empty() {
        human.push_next_step("taskdeck project new <name> --start <date> --end <date>");
    }

    emit_success(ctx.output, "timeline", &view, Some(&human))
}

pub fn run_dashboard(options: DashboardOptions) -> Result<()> {
    let today: NaiveDate = match options.today.as_deref() {
        Some(raw) => parse_date("today", raw)?,
        None => Local::now().date_naive(),
    };
    let ctx = load_context(options.global)?;
    let (board, warnings) = ctx.open_board();
    let view = dashboard(board.tasks(), board.projects(), today);

    let mut human = HumanOutput::new(format!("Dashboard {today}"));
    human.extend_warnings(warnings);
    human.push_summary("Tasks", view.total.to_string());
    for count in &view.by_status {
        human.push_summary(count.status.to_string(), count.count.to_string());
    }
    human.push_summary("Completion", format!("{:.0}%", view.completion * 100.0));
    human.push_summary(
        "Estimate",
        format!("{}h open of {}h", view.estimate_hours_open, view.estimate_hours_total),
    );
    for task in &view.overdue {
        human.push_detail(format!("overdue {} {}", task.due_date, task.title));
    }
    for task in &view.due_soon {
        human.push_detail(format!("due soon {} {}", task.due_date, task.title));
    }
    for project in &view.projects {
        human.push_detail(format!(
            "{}: {}/{} done ({:.0}%)",
            project.name,
            project.done,
            project.total,
            project.ratio * 100.0
        ));
    }

    emit_success(ctx.output, "dashboard", &view, Some(&human))
}
