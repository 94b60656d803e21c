//! taskdeck task command implementations.

use std::path::PathBuf;

use serde::Serialize;

use crate::board::{inline_attachment, Board};
use crate::cli::{load_context, GlobalArgs};
use crate::error::{Error, Result};
use crate::model::{parse_date, Priority, Status, Task, TaskDraft};
use crate::output::{emit_success, HumanOutput};
use crate::views::TaskFilter;

pub struct NewOptions {
    pub title: String,
    pub project: Option<String>,
    pub assignee: Option<String>,
    pub priority: Option<Priority>,
    pub status: Option<Status>,
    pub due: Option<String>,
    pub estimate: Option<f64>,
    pub global: GlobalArgs,
}

pub struct EditOptions {
    pub id: String,
    pub title: Option<String>,
    pub project: Option<String>,
    pub assignee: Option<String>,
    pub priority: Option<Priority>,
    pub status: Option<Status>,
    pub due: Option<String>,
    pub estimate: Option<f64>,
    pub global: GlobalArgs,
}

pub struct MoveOptions {
    pub id: String,
    pub status: String,
    pub global: GlobalArgs,
}

pub struct DeleteOptions {
    pub id: String,
    pub global: GlobalArgs,
}

pub struct CommentOptions {
    pub id: String,
    pub body: String,
    pub global: GlobalArgs,
}

pub struct AttachOptions {
    pub id: String,
    pub file: PathBuf,
    pub name: Option<String>,
    pub global: GlobalArgs,
}

pub struct ListOptions {
    pub project: Option<String>,
    pub assignee: Option<String>,
    pub status: Option<Status>,
    pub search: Option<String>,
    pub global: GlobalArgs,
}

pub struct ShowOptions {
    pub id: String,
    pub global: GlobalArgs,
}

#[derive(Serialize)]
struct MoveReport {
    task: Task,
    from: Status,
    to: Status,
    changed: bool,
}

#[derive(Serialize)]
struct ListReport {
    total: usize,
    tasks: Vec<Task>,
}

pub async fn run_new(options: NewOptions) -> Result<()> {
    let mut ctx = load_context(options.global)?;
    let (mut board, warnings) = ctx.open_board();

    let draft = TaskDraft {
        title: Some(options.title),
        project_id: resolve_project_arg(&board, options.project.as_deref())?,
        assignee: options.assignee,
        priority: options.priority,
        status: options.status,
        due_date: parse_due_arg(options.due.as_deref())?,
        estimate_hours: options.estimate,
    };
    let committed = board.new_task(&draft)?;

    let mut human = HumanOutput::new(format!("Created task {}", committed.record.title));
    human.extend_warnings(warnings);
    push_task_summary(&mut human, &board, &committed.record);
    human.push_next_step(format!("taskdeck task show {}", committed.record.id));
    ctx.run_effects(&board, committed.effects, &mut human).await;

    emit_success(ctx.output, "task new", &committed.record, Some(&human))
}

pub async fn run_edit(options: EditOptions) -> Result<()> {
    let mut ctx = load_context(options.global)?;
    let (mut board, warnings) = ctx.open_board();

    let draft = TaskDraft {
        title: options.title,
        project_id: resolve_project_arg(&board, options.project.as_deref())?,
        assignee: options.assignee,
        priority: options.priority,
        status: options.status,
        due_date: parse_due_arg(options.due.as_deref())?,
        estimate_hours: options.estimate,
    };
    let committed = board.save_task(&options.id, &draft)?;

    let mut human = HumanOutput::new(format!("Updated task {}", committed.record.title));
    human.extend_warnings(warnings);
    push_task_summary(&mut human, &board, &committed.record);
    ctx.run_effects(&board, committed.effects, &mut human).await;

    emit_success(ctx.output, "task edit", &committed.record, Some(&human))
}

pub async fn run_move(options: MoveOptions) -> Result<()> {
    let status: Status = options.status.parse()?;
    let mut ctx = load_context(options.global)?;
    let (mut board, warnings) = ctx.open_board();

    let from = board.task(&options.id)?.status;
    let committed = board.move_task(&options.id, status)?;
    let changed = !committed.effects.is_empty();

    let header = if changed {
        format!("Moved {} to {}", committed.record.title, status)
    } else {
        format!("{} is already {}", committed.record.title, status)
    };
    let mut human = HumanOutput::new(header);
    human.extend_warnings(warnings);
    human.push_summary("ID", committed.record.id.clone());
    human.push_summary("From", from.to_string());
    human.push_summary("To", status.to_string());
    ctx.run_effects(&board, committed.effects, &mut human).await;

    let report = MoveReport {
        task: committed.record,
        from,
        to: status,
        changed,
    };
    emit_success(ctx.output, "task move", &report, Some(&human))
}

pub async fn run_delete(options: DeleteOptions) -> Result<()> {
    let mut ctx = load_context(options.global)?;
    let (mut board, warnings) = ctx.open_board();

    let committed = board.delete_task(&options.id)?;

    let mut human = HumanOutput::new(format!("Deleted task {}", committed.record.title));
    human.extend_warnings(warnings);
    human.push_summary("ID", committed.record.id.clone());
    ctx.run_effects(&board, committed.effects, &mut human).await;

    emit_success(ctx.output, "task delete", &committed.record, Some(&human))
}

pub async fn run_comment(options: CommentOptions) -> Result<()> {
    let mut ctx = load_context(options.global)?;
    let (mut board, warnings) = ctx.open_board();

    let author = ctx.author();
    let committed = board.add_comment(&options.id, &author, &options.body)?;

    let mut human = HumanOutput::new(format!("Commented on {}", committed.record.title));
    human.extend_warnings(warnings);
    if let Some(comment) = committed.record.comments.last() {
        human.push_summary("Author", comment.author.clone());
        human.push_summary("Comment", comment.body.clone());
    }
    human.push_summary("Comments", committed.record.comments.len().to_string());
    ctx.run_effects(&board, committed.effects, &mut human).await;

    emit_success(ctx.output, "task comment", &committed.record, Some(&human))
}

pub async fn run_attach(options: AttachOptions) -> Result<()> {
    let mut ctx = load_context(options.global)?;
    let (mut board, warnings) = ctx.open_board();
    board.task(&options.id)?;

    let bytes = std::fs::read(&options.file).map_err(|err| {
        Error::InvalidArgument(format!("cannot read {}: {err}", options.file.display()))
    })?;
    let name = match options.name {
        Some(name) if !name.trim().is_empty() => name.trim().to_string(),
        _ => options
            .file
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| {
                Error::InvalidArgument(format!("{} has no file name", options.file.display()))
            })?,
    };

    let mut human_warnings = warnings;
    let attachment = match ctx.sync_remote().await {
        Some(client) => client.upload(&name, bytes).await?,
        None => {
            human_warnings.push("not signed in; attachment stored inline".to_string());
            inline_attachment(&name, &bytes)
        }
    };
    let committed = board.add_attachment(&options.id, attachment)?;

    let mut human = HumanOutput::new(format!("Attached {name} to {}", committed.record.title));
    human.extend_warnings(human_warnings);
    if let Some(attachment) = committed.record.attachments.last() {
        human.push_summary("Name", attachment.name.clone());
        human.push_summary("Size", format!("{} bytes", attachment.size));
        if !attachment.url.starts_with("data:") {
            human.push_summary("URL", attachment.url.clone());
        }
    }
    ctx.run_effects(&board, committed.effects, &mut human).await;

    emit_success(ctx.output, "task attach", &committed.record, Some(&human))
}

pub fn run_list(options: ListOptions) -> Result<()> {
    let ctx = load_context(options.global)?;
    let (board, warnings) = ctx.open_board();

    let filter = TaskFilter {
        project_id: resolve_project_arg(&board, options.project.as_deref())?,
        assignee: options.assignee,
        text: options.search,
    };
    let tasks: Vec<Task> = filter
        .apply(board.tasks())
        .into_iter()
        .filter(|task| options.status.map(|s| task.status == s).unwrap_or(true))
        .cloned()
        .collect();

    let mut human = HumanOutput::new(format!("Tasks ({})", tasks.len()));
    human.extend_warnings(warnings);
    for task in &tasks {
        human.push_detail(task_line(&board, task));
    }
    if board.tasks().is_empty() {
        human.push_next_step("taskdeck task new <title>");
    }

    let report = ListReport {
        total: tasks.len(),
        tasks,
    };
    emit_success(ctx.output, "task list", &report, Some(&human))
}

pub fn run_show(options: ShowOptions) -> Result<()> {
    let ctx = load_context(options.global)?;
    let (board, warnings) = ctx.open_board();
    let task = board.task(&options.id)?.clone();

    let mut human = HumanOutput::new(task.title.clone());
    human.extend_warnings(warnings);
    push_task_summary(&mut human, &board, &task);
    human.push_summary("Updated", task.updated_at.to_rfc3339());
    for attachment in &task.attachments {
        human.push_detail(format!("attachment {} ({} bytes)", attachment.name, attachment.size));
    }
    for comment in &task.comments {
        human.push_detail(format!(
            "{} {}: {}",
            comment.created_at.format("%Y-%m-%d %H:%M"),
            comment.author,
            comment.body
        ));
    }

    emit_success(ctx.output, "task show", &task, Some(&human))
}

/// `--project` value to a project id. An empty value means unassigned.
fn resolve_project_arg(board: &Board, raw: Option<&str>) -> Result<Option<String>> {
    match raw.map(str::trim) {
        None => Ok(None),
        Some("") => Ok(Some(String::new())),
        Some(key) => Ok(Some(board.resolve_project(key)?.id.clone())),
    }
}

/// `--due` value; an empty value clears the date.
fn parse_due_arg(raw: Option<&str>) -> Result<Option<Option<chrono::NaiveDate>>> {
    match raw.map(str::trim) {
        None => Ok(None),
        Some("") => Ok(Some(None)),
        Some(date) => Ok(Some(Some(parse_date("due date", date)?))),
    }
}

fn push_task_summary(human: &mut HumanOutput, board: &Board, task: &Task) {
    human.push_summary("ID", task.id.clone());
    human.push_summary("Status", task.status.to_string());
    human.push_summary("Priority", task.priority.to_string());
    let project = board.project_name(&task.project_id);
    if !project.is_empty() {
        human.push_summary("Project", project.to_string());
    }
    if !task.assignee.is_empty() {
        human.push_summary("Assignee", task.assignee.clone());
    }
    if let Some(due) = task.due_date {
        human.push_summary("Due", due.to_string());
    }
    if task.estimate_hours > 0.0 {
        human.push_summary("Estimate", format!("{}h", task.estimate_hours));
    }
}

fn task_line(board: &Board, task: &Task) -> String {
    let mut line = format!("{} [{}] {}", task.id, task.status, task.title);
    let project = board.project_name(&task.project_id);
    if !project.is_empty() {
        line.push_str(&format!(" ({project})"));
    }
    if !task.assignee.is_empty() {
        line.push_str(&format!(" @{}", task.assignee));
    }
    if let Some(due) = task.due_date {
        line.push_str(&format!(" due {due}"));
    }
    line
}
