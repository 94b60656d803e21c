//! taskdeck project command implementations.

use serde::Serialize;

use crate::cli::{load_context, GlobalArgs};
use crate::error::Result;
use crate::model::{parse_date, parse_milestone, Project, ProjectDraft};
use crate::output::{emit_success, HumanOutput};

pub struct NewOptions {
    pub name: String,
    pub start: Option<String>,
    pub end: Option<String>,
    pub milestones: Vec<String>,
    pub global: GlobalArgs,
}

pub struct EditOptions {
    pub id: String,
    pub name: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
    pub milestones: Vec<String>,
    pub clear_milestones: bool,
    pub global: GlobalArgs,
}

pub struct DeleteOptions {
    pub id: String,
    pub global: GlobalArgs,
}

#[derive(Serialize)]
struct DeleteReport {
    project: Project,
    detached_tasks: Vec<String>,
}

#[derive(Serialize)]
struct ProjectEntry {
    #[serde(flatten)]
    project: Project,
    tasks: usize,
}

#[derive(Serialize)]
struct ListReport {
    total: usize,
    projects: Vec<ProjectEntry>,
}

pub async fn run_new(options: NewOptions) -> Result<()> {
    let mut ctx = load_context(options.global)?;
    let (mut board, mut warnings) = ctx.open_board();

    warnings.extend(unparsed_milestones(&options.milestones));
    let draft = ProjectDraft {
        name: Some(options.name),
        start_date: parse_optional_date("start date", options.start.as_deref())?,
        end_date: parse_optional_date("end date", options.end.as_deref())?,
        milestones: Some(options.milestones.join("\n")),
    };
    let committed = board.save_project(None, &draft)?;

    let mut human = HumanOutput::new(format!("Created project {}", committed.record.name));
    human.extend_warnings(warnings);
    push_project_summary(&mut human, &committed.record);
    human.push_next_step(format!(
        "taskdeck task new <title> --project {}",
        committed.record.id
    ));
    ctx.run_effects(&board, committed.effects, &mut human).await;

    emit_success(ctx.output, "project new", &committed.record, Some(&human))
}

pub async fn run_edit(options: EditOptions) -> Result<()> {
    let mut ctx = load_context(options.global)?;
    let (mut board, mut warnings) = ctx.open_board();

    let id = board.resolve_project(&options.id)?.id.clone();
    warnings.extend(unparsed_milestones(&options.milestones));
    let milestones = if options.clear_milestones {
        Some(String::new())
    } else if options.milestones.is_empty() {
        None
    } else {
        Some(options.milestones.join("\n"))
    };
    let draft = ProjectDraft {
        name: options.name,
        start_date: parse_optional_date("start date", options.start.as_deref())?,
        end_date: parse_optional_date("end date", options.end.as_deref())?,
        milestones,
    };
    let committed = board.save_project(Some(&id), &draft)?;

    let mut human = HumanOutput::new(format!("Updated project {}", committed.record.name));
    human.extend_warnings(warnings);
    push_project_summary(&mut human, &committed.record);
    ctx.run_effects(&board, committed.effects, &mut human).await;

    emit_success(ctx.output, "project edit", &committed.record, Some(&human))
}

pub async fn run_delete(options: DeleteOptions) -> Result<()> {
    let mut ctx = load_context(options.global)?;
    let (mut board, warnings) = ctx.open_board();

    let id = board.resolve_project(&options.id)?.id.clone();
    let detached_tasks: Vec<String> = board
        .tasks()
        .iter()
        .filter(|task| task.project_id == id)
        .map(|task| task.id.clone())
        .collect();
    let committed = board.delete_project(&id)?;

    let mut human = HumanOutput::new(format!("Deleted project {}", committed.record.name));
    human.extend_warnings(warnings);
    human.push_summary("ID", committed.record.id.clone());
    human.push_summary("Tasks unassigned", detached_tasks.len().to_string());
    ctx.run_effects(&board, committed.effects, &mut human).await;

    let report = DeleteReport {
        project: committed.record,
        detached_tasks,
    };
    emit_success(ctx.output, "project delete", &report, Some(&human))
}

pub fn run_list(global: GlobalArgs) -> Result<()> {
    let ctx = load_context(global)?;
    let (board, warnings) = ctx.open_board();

    let projects: Vec<ProjectEntry> = board
        .projects()
        .iter()
        .map(|project| ProjectEntry {
            tasks: board
                .tasks()
                .iter()
                .filter(|task| task.project_id == project.id)
                .count(),
            project: project.clone(),
        })
        .collect();

    let mut human = HumanOutput::new(format!("Projects ({})", projects.len()));
    human.extend_warnings(warnings);
    for entry in &projects {
        let mut line = format!("{} {} ({} tasks)", entry.project.id, entry.project.name, entry.tasks);
        if let (Some(start), Some(end)) = (entry.project.start_date, entry.project.end_date) {
            line.push_str(&format!(" {start} .. {end}"));
        }
        human.push_detail(line);
    }
    if projects.is_empty() {
        human.push_next_step("taskdeck project new <name>");
    }

    let report = ListReport {
        total: projects.len(),
        projects,
    };
    emit_success(ctx.output, "project list", &report, Some(&human))
}

/// Date flag; an empty value clears the date.
fn parse_optional_date(
    label: &str,
    raw: Option<&str>,
) -> Result<Option<Option<chrono::NaiveDate>>> {
    match raw.map(str::trim) {
        None => Ok(None),
        Some("") => Ok(Some(None)),
        Some(date) => Ok(Some(Some(parse_date(label, date)?))),
    }
}

/// Milestone lines are kept verbatim but only well-formed ones render.
fn unparsed_milestones(lines: &[String]) -> Vec<String> {
    lines
        .iter()
        .filter(|line| parse_milestone(line).is_none())
        .map(|line| format!("milestone '{line}' is not `YYYY-MM-DD - Title` and will not be shown"))
        .collect()
}

fn push_project_summary(human: &mut HumanOutput, project: &Project) {
    human.push_summary("ID", project.id.clone());
    human.push_summary("Name", project.name.clone());
    if let Some(start) = project.start_date {
        human.push_summary("Start", start.to_string());
    }
    if let Some(end) = project.end_date {
        human.push_summary("End", end.to_string());
    }
    for milestone in project.parsed_milestones() {
        human.push_detail(format!("{} {}", milestone.date, milestone.title));
    }
}
