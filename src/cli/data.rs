//! Export, import and migrate commands.

use std::path::PathBuf;

use serde::Serialize;

use crate::board::Board;
use crate::cli::{load_context, open_warnings, GlobalArgs};
use crate::error::{Error, Result};
use crate::export::{tasks_to_csv, Backup};
use crate::output::{emit_raw, emit_success, HumanOutput};

#[derive(Serialize)]
struct ExportReport {
    format: &'static str,
    path: String,
    tasks: usize,
    projects: usize,
}

#[derive(Serialize)]
struct ImportReport {
    tasks: usize,
    projects: usize,
}

pub fn run_export_csv(output: Option<PathBuf>, global: GlobalArgs) -> Result<()> {
    let ctx = load_context(global)?;
    let (board, warnings) = ctx.open_board();
    let csv = tasks_to_csv(board.tasks(), board.projects());
    finish_export(&ctx, &board, warnings, "csv", &csv, output)
}

pub fn run_export_json(output: Option<PathBuf>, global: GlobalArgs) -> Result<()> {
    let ctx = load_context(global)?;
    let (board, warnings) = ctx.open_board();
    let backup = Backup::new(board.tasks(), board.projects(), board.settings());
    let json = backup.to_json()?;
    finish_export(&ctx, &board, warnings, "json", &json, output)
}

/// Without `--output` the document itself goes to stdout.
fn finish_export(
    ctx: &crate::cli::Context,
    board: &Board,
    warnings: Vec<String>,
    format: &'static str,
    content: &str,
    output: Option<PathBuf>,
) -> Result<()> {
    let Some(path) = output else {
        for warning in &warnings {
            tracing::warn!("{warning}");
        }
        emit_raw(ctx.output, content);
        return Ok(());
    };

    let mut body = content.to_string();
    if !body.ends_with('\n') {
        body.push('\n');
    }
    std::fs::write(&path, body)?;

    let report = ExportReport {
        format,
        path: path.display().to_string(),
        tasks: board.tasks().len(),
        projects: board.projects().len(),
    };
    let mut human = HumanOutput::new(format!("Exported {format} to {}", report.path));
    human.extend_warnings(warnings);
    human.push_summary("Tasks", report.tasks.to_string());
    human.push_summary("Projects", report.projects.to_string());
    emit_success(ctx.output, &format!("export {format}"), &report, Some(&human))
}

pub fn run_import(file: PathBuf, global: GlobalArgs) -> Result<()> {
    let raw = std::fs::read_to_string(&file)
        .map_err(|err| Error::Import(format!("cannot read {}: {err}", file.display())))?;
    let backup = Backup::parse(&raw)?;

    let ctx = load_context(global)?;
    let (mut board, warnings) = ctx.open_board();
    board
        .restore(backup.tasks, backup.projects, backup.settings)
        .map_err(|err| Error::Import(err.to_string()))?;

    let report = ImportReport {
        tasks: board.tasks().len(),
        projects: board.projects().len(),
    };
    let mut human = HumanOutput::new(format!("Imported {}", file.display()));
    human.extend_warnings(warnings);
    human.push_summary("Tasks", report.tasks.to_string());
    human.push_summary("Projects", report.projects.to_string());
    human.push_summary("Backup from", backup.exported_at.to_rfc3339());
    if ctx.session.is_some() {
        human.push_next_step("taskdeck sync push");
    }
    emit_success(ctx.output, "import", &report, Some(&human))
}

pub fn run_migrate(global: GlobalArgs) -> Result<()> {
    let ctx = load_context(global)?;
    let (_board, report) = Board::open(ctx.store.clone());

    let migration = &report.migration;
    let header = if migration.migrated {
        format!(
            "Migrated data from schema {} to {}",
            migration.from_version, migration.to_version
        )
    } else {
        format!("Data already at schema {}", migration.to_version)
    };
    let mut human = HumanOutput::new(header);
    human.extend_warnings(open_warnings(&report));
    human.push_summary("Tasks rewritten", migration.tasks_rewritten.to_string());
    human.push_summary("Records dropped", migration.records_dropped.to_string());
    human.push_summary("Records skipped", report.skipped.len().to_string());
    emit_success(ctx.output, "migrate", &report, Some(&human))
}
