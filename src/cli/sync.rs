//! Remote sync commands: pull, push and the realtime watch loop.

use serde::Serialize;

use crate::board::MergeSummary;
use crate::cli::{load_context, GlobalArgs};
use crate::error::{Error, Result};
use crate::output::{emit_success, HumanOutput};
use crate::reconcile::RecordChange;

#[derive(Serialize)]
struct PushReport {
    synced: usize,
    failed: Vec<String>,
}

#[derive(Serialize)]
struct WatchEvent<'a> {
    change: &'static str,
    id: &'a str,
    inserted: usize,
    updated: usize,
    removed: usize,
    detached_tasks: usize,
}

#[derive(Serialize)]
struct WatchReport {
    applied: usize,
}

pub async fn run_pull(global: GlobalArgs) -> Result<()> {
    let mut ctx = load_context(global)?;
    let client = ctx.signed_in().await?;
    let (mut board, warnings) = ctx.open_board();

    let projects = client.list_projects().await?;
    let tasks = client.list_tasks().await?;
    let summary: MergeSummary = board.merge_remote(tasks, projects);

    let mut human = HumanOutput::new("Pulled remote records");
    human.extend_warnings(warnings);
    human.push_summary(
        "Tasks",
        format!("{} new, {} updated", summary.tasks_inserted, summary.tasks_updated),
    );
    human.push_summary(
        "Projects",
        format!(
            "{} new, {} updated",
            summary.projects_inserted, summary.projects_updated
        ),
    );
    emit_success(ctx.output, "sync pull", &summary, Some(&human))
}

pub async fn run_push(global: GlobalArgs) -> Result<()> {
    let mut ctx = load_context(global)?;
    ctx.signed_in().await?;
    let (board, warnings) = ctx.open_board();

    let effects = board.push_all();
    let mut human = HumanOutput::new("Pushed local records");
    human.extend_warnings(warnings);
    let drained = ctx.run_effects(&board, effects, &mut human).await;
    human.push_summary("Synced", drained.synced.to_string());
    if !drained.sync_failures.is_empty() {
        human.push_summary("Failed", drained.sync_failures.len().to_string());
    }

    let report = PushReport {
        synced: drained.synced,
        failed: drained.sync_failures,
    };
    emit_success(ctx.output, "sync push", &report, Some(&human))
}

/// Follow the change feed until it closes, ctrl-c, or `limit` changes.
pub async fn run_watch(limit: Option<usize>, global: GlobalArgs) -> Result<()> {
    let mut ctx = load_context(global)?;
    let client = ctx.signed_in().await?;
    let (mut board, warnings) = ctx.open_board();
    for warning in &warnings {
        tracing::warn!("{warning}");
    }

    let mut subscription = client.subscribe().await?;
    if !ctx.output.json && !ctx.output.quiet {
        println!("Watching for remote changes (ctrl-c to stop)");
    }

    let mut applied = 0usize;
    loop {
        if limit.is_some_and(|limit| applied >= limit) {
            break;
        }
        let change = tokio::select! {
            change = subscription.changes.recv() => change,
            _ = tokio::signal::ctrl_c() => break,
        };
        let Some(change) = change else { break };
        applied += 1;
        print_change(&ctx, &mut board, change)?;
    }

    drop(subscription.changes);
    let outcome = subscription
        .handle
        .await
        .map_err(|err| Error::Realtime(format!("watch task failed: {err}")))?;
    if let Err(err) = outcome {
        if limit.map_or(true, |limit| applied < limit) {
            return Err(err);
        }
        tracing::debug!(error = %err, "feed closed after limit");
    }

    let mut human = HumanOutput::new("Stopped watching");
    human.push_summary("Changes applied", applied.to_string());
    if ctx.output.json {
        // Changes were already streamed as JSON lines.
        return Ok(());
    }
    emit_success(ctx.output, "watch", &WatchReport { applied }, Some(&human))
}

fn print_change(
    ctx: &crate::cli::Context,
    board: &mut crate::board::Board,
    change: RecordChange,
) -> Result<()> {
    let label = change.label();
    let id = change.record_id().to_string();
    let result = board.apply_remote_change(change)?;

    if ctx.output.json {
        let event = WatchEvent {
            change: label,
            id: &id,
            inserted: result.inserted,
            updated: result.updated,
            removed: result.removed,
            detached_tasks: result.detached_tasks.len(),
        };
        println!("{}", serde_json::to_string(&event)?);
    } else if !ctx.output.quiet {
        let mut line = format!("{label} {id}");
        if !result.changed() {
            line.push_str(" (no change)");
        }
        if !result.detached_tasks.is_empty() {
            line.push_str(&format!(", {} tasks unassigned", result.detached_tasks.len()));
        }
        println!("{line}");
    }
    Ok(())
}
