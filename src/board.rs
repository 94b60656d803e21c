//! The board: the single writable copy of tasks, projects and settings.
//!
//! Every user action is a method here. Each one validates, commits to
//! memory, persists the touched keys and returns the side effects it wants
//! run afterwards (remote mirror ops and notices). A validation error
//! leaves the board untouched.

use base64::Engine as _;
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::migrate::{self, MigrationReport};
use crate::model::{
    Attachment, Comment, NotificationSettings, Project, ProjectDraft, Status, Task, TaskDraft,
};
use crate::notify::Notice;
use crate::reconcile::{self, Applied, BoardState, RecordChange};
use crate::storage::{LocalStore, NOTIFY_SETTINGS_KEY, PROJECTS_KEY, TASKS_KEY};
use crate::sync::{Effect, SyncOp};

/// A stored record that could not be decoded and was left out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedRecord {
    pub key: &'static str,
    pub index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub reason: String,
}

/// What happened while opening the board.
#[derive(Debug, Clone, Serialize)]
pub struct OpenReport {
    pub migration: MigrationReport,
    pub skipped: Vec<SkippedRecord>,
}

/// A committed change and the effects it requests.
#[derive(Debug, Clone)]
pub struct Committed<T> {
    pub record: T,
    pub effects: Vec<Effect>,
}

impl<T> Committed<T> {
    fn new(record: T, effects: Vec<Effect>) -> Self {
        Self { record, effects }
    }
}

/// Result of folding a remote snapshot into the board.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MergeSummary {
    pub tasks_inserted: usize,
    pub tasks_updated: usize,
    pub projects_inserted: usize,
    pub projects_updated: usize,
}

#[derive(Debug)]
pub struct Board {
    store: LocalStore,
    state: BoardState,
    settings: NotificationSettings,
}

impl Board {
    /// Migrate stored data, then decode it record by record.
    pub fn open(store: LocalStore) -> (Self, OpenReport) {
        let migrated = migrate::run(&store);
        let mut skipped = Vec::new();

        let mut state = BoardState::default();
        for task in decode_records::<Task>(TASKS_KEY, migrated.tasks, &mut skipped) {
            reconcile::upsert_by_id(&mut state.tasks, task);
        }
        for project in decode_records::<Project>(PROJECTS_KEY, migrated.projects, &mut skipped) {
            reconcile::upsert_by_id(&mut state.projects, project);
        }
        let settings = store.load(NOTIFY_SETTINGS_KEY, NotificationSettings::default());

        if !skipped.is_empty() {
            tracing::warn!(count = skipped.len(), "skipped undecodable stored records");
        }
        tracing::debug!(
            tasks = state.tasks.len(),
            projects = state.projects.len(),
            "opened board"
        );

        let board = Self {
            store,
            state,
            settings,
        };
        let report = OpenReport {
            migration: migrated.report,
            skipped,
        };
        (board, report)
    }

    pub fn state(&self) -> &BoardState {
        &self.state
    }

    pub fn tasks(&self) -> &[Task] {
        &self.state.tasks
    }

    pub fn projects(&self) -> &[Project] {
        &self.state.projects
    }

    pub fn settings(&self) -> &NotificationSettings {
        &self.settings
    }

    pub fn task(&self, id: &str) -> Result<&Task> {
        reconcile::find_by_id(&self.state.tasks, id).ok_or_else(|| Error::task_not_found(id))
    }

    pub fn project(&self, id: &str) -> Result<&Project> {
        reconcile::find_by_id(&self.state.projects, id).ok_or_else(|| Error::project_not_found(id))
    }

    /// Project name for display, or empty when unassigned or dangling.
    pub fn project_name(&self, project_id: &str) -> &str {
        reconcile::find_by_id(&self.state.projects, project_id)
            .map(|project| project.name.as_str())
            .unwrap_or("")
    }

    /// Resolve a project by exact id, then by case-insensitive name.
    pub fn resolve_project(&self, key: &str) -> Result<&Project> {
        let key = key.trim();
        if let Some(project) = reconcile::find_by_id(&self.state.projects, key) {
            return Ok(project);
        }
        let matches: Vec<&Project> = self
            .state
            .projects
            .iter()
            .filter(|project| project.name.eq_ignore_ascii_case(key))
            .collect();
        match matches.as_slice() {
            [project] => Ok(project),
            [] => Err(Error::project_not_found(key)),
            _ => Err(Error::InvalidArgument(format!(
                "project name '{key}' is ambiguous; use the id"
            ))),
        }
    }

    /// Create a task from `draft`.
    pub fn new_task(&mut self, draft: &TaskDraft) -> Result<Committed<Task>> {
        let mut task = Task::new("");
        draft.apply_to(&mut task);
        self.check_task(&task, draft)?;
        task.updated_at = Utc::now();

        reconcile::upsert_by_id(&mut self.state.tasks, task.clone());
        self.persist_tasks();
        tracing::debug!(id = %task.id, "created task");
        Ok(Committed::new(
            task.clone(),
            vec![Effect::Sync(SyncOp::UpsertTask(task))],
        ))
    }

    /// Apply `draft` to an existing task. A status change here counts as a
    /// transition.
    pub fn save_task(&mut self, id: &str, draft: &TaskDraft) -> Result<Committed<Task>> {
        let before = self.task(id)?.clone();
        let mut task = before.clone();
        draft.apply_to(&mut task);
        self.check_task(&task, draft)?;
        task.updated_at = Utc::now();

        reconcile::upsert_by_id(&mut self.state.tasks, task.clone());
        self.persist_tasks();

        let mut effects = vec![Effect::Sync(SyncOp::UpsertTask(task.clone()))];
        if before.status != task.status {
            effects.push(Effect::Notify(status_notice(&task, before.status)));
        }
        Ok(Committed::new(task, effects))
    }

    pub fn delete_task(&mut self, id: &str) -> Result<Committed<Task>> {
        let removed =
            reconcile::remove_by_id(&mut self.state.tasks, id).ok_or_else(|| Error::task_not_found(id))?;
        self.persist_tasks();
        tracing::debug!(id, "deleted task");
        Ok(Committed::new(
            removed,
            vec![Effect::Sync(SyncOp::DeleteTask(id.to_string()))],
        ))
    }

    /// Change a task's status. Moving to the current status does nothing.
    pub fn move_task(&mut self, id: &str, status: Status) -> Result<Committed<Task>> {
        let current = self.task(id)?;
        if current.status == status {
            return Ok(Committed::new(current.clone(), Vec::new()));
        }
        let from = current.status;
        let mut task = current.clone();
        task.status = status;
        task.updated_at = Utc::now();

        reconcile::upsert_by_id(&mut self.state.tasks, task.clone());
        self.persist_tasks();
        tracing::debug!(id, %from, to = %status, "moved task");

        let notice = status_notice(&task, from);
        Ok(Committed::new(
            task.clone(),
            vec![Effect::Sync(SyncOp::UpsertTask(task)), Effect::Notify(notice)],
        ))
    }

    pub fn add_comment(&mut self, id: &str, author: &str, body: &str) -> Result<Committed<Task>> {
        let body = body.trim();
        if body.is_empty() {
            return Err(Error::Validation("comment body cannot be empty".to_string()));
        }
        let author = match author.trim() {
            "" => "anonymous",
            other => other,
        };
        let mut task = self.task(id)?.clone();
        task.comments.push(Comment::new(author, body));
        task.updated_at = Utc::now();

        reconcile::upsert_by_id(&mut self.state.tasks, task.clone());
        self.persist_tasks();
        Ok(Committed::new(
            task.clone(),
            vec![Effect::Sync(SyncOp::UpsertTask(task))],
        ))
    }

    pub fn add_attachment(&mut self, id: &str, attachment: Attachment) -> Result<Committed<Task>> {
        if attachment.name.trim().is_empty() || attachment.url.trim().is_empty() {
            return Err(Error::Validation(
                "attachment needs a name and a url".to_string(),
            ));
        }
        let mut task = self.task(id)?.clone();
        task.attachments.push(attachment);
        task.updated_at = Utc::now();

        reconcile::upsert_by_id(&mut self.state.tasks, task.clone());
        self.persist_tasks();
        Ok(Committed::new(
            task.clone(),
            vec![Effect::Sync(SyncOp::UpsertTask(task))],
        ))
    }

    /// Create (`id == None`) or update a project.
    pub fn save_project(&mut self, id: Option<&str>, draft: &ProjectDraft) -> Result<Committed<Project>> {
        let mut project = match id {
            Some(id) => self.project(id)?.clone(),
            None => Project::new(""),
        };
        draft.apply_to(&mut project);
        project.validate()?;

        reconcile::upsert_by_id(&mut self.state.projects, project.clone());
        self.persist_projects();
        tracing::debug!(id = %project.id, "saved project");
        Ok(Committed::new(
            project.clone(),
            vec![Effect::Sync(SyncOp::UpsertProject(project))],
        ))
    }

    /// Remove a project and detach its tasks. Tasks are kept.
    pub fn delete_project(&mut self, id: &str) -> Result<Committed<Project>> {
        let removed = reconcile::remove_by_id(&mut self.state.projects, id)
            .ok_or_else(|| Error::project_not_found(id))?;
        let detached = reconcile::clear_project_refs(&mut self.state.tasks, id);
        let now = Utc::now();
        let mut effects = vec![Effect::Sync(SyncOp::DeleteProject(id.to_string()))];
        for task in self
            .state
            .tasks
            .iter_mut()
            .filter(|task| detached.contains(&task.id))
        {
            task.updated_at = now;
            effects.push(Effect::Sync(SyncOp::UpsertTask(task.clone())));
        }

        self.persist_projects();
        if !detached.is_empty() {
            self.persist_tasks();
        }
        tracing::debug!(id, detached = detached.len(), "deleted project");
        Ok(Committed::new(removed, effects))
    }

    /// Replace the stored notification destinations. Blank values unset.
    pub fn update_settings(&mut self, settings: NotificationSettings) -> NotificationSettings {
        let clean = |value: Option<String>| {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        self.settings = NotificationSettings {
            default_email: clean(settings.default_email),
            default_slack: clean(settings.default_slack),
        };
        self.store.save(NOTIFY_SETTINGS_KEY, &self.settings);
        self.settings.clone()
    }

    /// Fold an inbound remote change into the board and persist it.
    ///
    /// The touched documents are re-read under their locks first, so
    /// records written by other processes since [`Board::open`] survive.
    /// Project changes lock `projects` before `tasks`.
    pub fn apply_remote_change(&mut self, change: RecordChange) -> Result<Applied> {
        let label = change.label();
        let id = change.record_id().to_string();
        let store = &self.store;
        let state = &mut self.state;

        let applied = match change {
            RecordChange::UpsertTask(_) | RecordChange::DeleteTask(_) => {
                store.update(TASKS_KEY, empty_list(), |tasks| {
                    state.tasks = reload(TASKS_KEY, tasks);
                    let applied = reconcile::apply_change(state, change);
                    *tasks = serde_json::to_value(&state.tasks)?;
                    Ok::<_, Error>(applied)
                })??
            }
            RecordChange::UpsertProject(_) | RecordChange::DeleteProject(_) => {
                store.update(PROJECTS_KEY, empty_list(), |projects| {
                    state.projects = reload(PROJECTS_KEY, projects);
                    let applied = store.update(TASKS_KEY, empty_list(), |tasks| {
                        state.tasks = reload(TASKS_KEY, tasks);
                        let applied = reconcile::apply_change(state, change);
                        *tasks = serde_json::to_value(&state.tasks)?;
                        Ok::<_, Error>(applied)
                    })??;
                    *projects = serde_json::to_value(&state.projects)?;
                    Ok::<_, Error>(applied)
                })??
            }
        };
        tracing::debug!(change = label, %id, changed = applied.changed(), "applied remote change");
        Ok(applied)
    }

    /// Fold a full remote snapshot in by id. Local-only records are kept.
    pub fn merge_remote(&mut self, tasks: Vec<Task>, projects: Vec<Project>) -> MergeSummary {
        let mut summary = MergeSummary::default();
        for project in projects {
            match reconcile::upsert_by_id(&mut self.state.projects, project) {
                reconcile::Upsert::Appended => summary.projects_inserted += 1,
                reconcile::Upsert::Replaced(_) => summary.projects_updated += 1,
            }
        }
        for task in tasks {
            match reconcile::upsert_by_id(&mut self.state.tasks, task) {
                reconcile::Upsert::Appended => summary.tasks_inserted += 1,
                reconcile::Upsert::Replaced(_) => summary.tasks_updated += 1,
            }
        }
        self.persist_projects();
        self.persist_tasks();
        summary
    }

    /// Every record as an upsert, for a full push to the remote.
    pub fn push_all(&self) -> Vec<Effect> {
        let projects = self
            .state
            .projects
            .iter()
            .cloned()
            .map(|project| Effect::Sync(SyncOp::UpsertProject(project)));
        let tasks = self
            .state
            .tasks
            .iter()
            .cloned()
            .map(|task| Effect::Sync(SyncOp::UpsertTask(task)));
        projects.chain(tasks).collect()
    }

    /// Replace everything with a backup's contents.
    pub fn restore(
        &mut self,
        tasks: Vec<Task>,
        projects: Vec<Project>,
        settings: NotificationSettings,
    ) -> Result<()> {
        let mut next = BoardState::default();
        for project in projects {
            project.validate()?;
            reconcile::upsert_by_id(&mut next.projects, project);
        }
        for task in tasks {
            task.validate()?;
            reconcile::upsert_by_id(&mut next.tasks, task);
        }

        self.state = next;
        self.settings = settings;
        self.persist_projects();
        self.persist_tasks();
        self.store.save(NOTIFY_SETTINGS_KEY, &self.settings);
        Ok(())
    }

    /// A project reference is only checked when `draft` sets it, so tasks
    /// synced in with a project this board has never seen stay editable.
    fn check_task(&self, task: &Task, draft: &TaskDraft) -> Result<()> {
        task.validate()?;
        let sets_project = draft.project_id.is_some() && task.has_project();
        if sets_project && reconcile::find_by_id(&self.state.projects, &task.project_id).is_none() {
            return Err(Error::project_not_found(&task.project_id));
        }
        Ok(())
    }

    fn persist_tasks(&self) {
        self.store.save(TASKS_KEY, &self.state.tasks);
    }

    fn persist_projects(&self) {
        self.store.save(PROJECTS_KEY, &self.state.projects);
    }
}

fn status_notice(task: &Task, from: Status) -> Notice {
    Notice::StatusChanged {
        task_id: task.id.clone(),
        title: task.title.clone(),
        from,
        to: task.status,
    }
}

fn empty_list() -> Value {
    Value::Array(Vec::new())
}

/// Decode a freshly read collection, collapsing duplicate ids.
fn reload<T>(key: &'static str, raw: &mut Value) -> Vec<T>
where
    T: serde::de::DeserializeOwned + reconcile::Identified,
{
    let mut skipped = Vec::new();
    let mut records = Vec::new();
    for record in decode_records::<T>(key, migrate::coerce_array(Some(raw.take())), &mut skipped) {
        reconcile::upsert_by_id(&mut records, record);
    }
    if !skipped.is_empty() {
        tracing::warn!(key, count = skipped.len(), "dropping undecodable stored records");
    }
    records
}

fn decode_records<T: serde::de::DeserializeOwned>(
    key: &'static str,
    values: Vec<Value>,
    skipped: &mut Vec<SkippedRecord>,
) -> Vec<T> {
    let mut records = Vec::with_capacity(values.len());
    for (index, value) in values.into_iter().enumerate() {
        let id = value.get("id").and_then(Value::as_str).map(str::to_string);
        match serde_json::from_value::<T>(value) {
            Ok(record) => records.push(record),
            Err(err) => skipped.push(SkippedRecord {
                key,
                index,
                id,
                reason: err.to_string(),
            }),
        }
    }
    records
}

/// Attachment held inline as a `data:` URL, for use while signed out.
pub fn inline_attachment(name: &str, bytes: &[u8]) -> Attachment {
    let mime = crate::remote::client::content_type_for(name);
    let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
    Attachment {
        name: name.to_string(),
        url: format!("data:{mime};base64,{encoded}"),
        size: bytes.len() as u64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrate::CURRENT_SCHEMA_VERSION;
    use crate::model::Priority;
    use crate::storage::SCHEMA_VERSION_KEY;
    use chrono::NaiveDate;
    use serde_json::json;
    use tempfile::TempDir;

    fn board() -> (TempDir, Board) {
        let temp = TempDir::new().unwrap();
        let (board, _) = Board::open(LocalStore::for_root(temp.path()));
        (temp, board)
    }

    fn reopen(temp: &TempDir) -> Board {
        Board::open(LocalStore::for_root(temp.path())).0
    }

    fn notices(effects: &[Effect]) -> Vec<&Notice> {
        effects.iter().filter_map(Effect::notice).collect()
    }

    #[test]
    fn blank_title_is_rejected_without_changes() {
        let (temp, mut board) = board();
        board.new_task(&TaskDraft::titled("Keep me")).unwrap();
        let before = board.tasks().to_vec();

        let err = board.new_task(&TaskDraft::titled("   ")).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(board.tasks(), before.as_slice());

        let id = before[0].id.clone();
        assert!(board.save_task(&id, &TaskDraft::titled("")).is_err());
        assert_eq!(board.tasks(), before.as_slice());
        assert_eq!(reopen(&temp).tasks(), before.as_slice());
    }

    #[test]
    fn negative_estimate_is_rejected() {
        let (_temp, mut board) = board();
        let draft = TaskDraft {
            estimate_hours: Some(-1.0),
            ..TaskDraft::titled("x")
        };
        assert!(board.new_task(&draft).is_err());
        assert!(board.tasks().is_empty());
    }

    #[test]
    fn unknown_project_reference_is_rejected() {
        let (_temp, mut board) = board();
        let draft = TaskDraft {
            project_id: Some("nope".to_string()),
            ..TaskDraft::titled("x")
        };
        assert!(matches!(board.new_task(&draft), Err(Error::NotFound { .. })));
    }

    #[test]
    fn move_todo_to_done_fires_one_notice() {
        let (_temp, mut board) = board();
        let created = board.new_task(&TaskDraft::titled("Ship")).unwrap().record;
        let before = created.updated_at;
        std::thread::sleep(std::time::Duration::from_millis(5));

        let moved = board.move_task(&created.id, Status::Done).unwrap();
        assert_eq!(moved.record.status, Status::Done);
        assert!(moved.record.updated_at > before);

        let sent = notices(&moved.effects);
        assert_eq!(sent.len(), 1);
        assert_eq!(
            sent[0],
            &Notice::StatusChanged {
                task_id: created.id.clone(),
                title: "Ship".to_string(),
                from: Status::Todo,
                to: Status::Done,
            }
        );
    }

    #[test]
    fn moving_to_same_status_is_a_no_op() {
        let (_temp, mut board) = board();
        let created = board.new_task(&TaskDraft::titled("Idle")).unwrap().record;
        let moved = board.move_task(&created.id, Status::Todo).unwrap();
        assert!(moved.effects.is_empty());
        assert_eq!(moved.record.updated_at, created.updated_at);
    }

    #[test]
    fn status_change_through_save_notifies() {
        let (_temp, mut board) = board();
        let created = board.new_task(&TaskDraft::titled("Edit me")).unwrap().record;
        let draft = TaskDraft {
            status: Some(Status::Blocked),
            priority: Some(Priority::High),
            ..TaskDraft::default()
        };
        let saved = board.save_task(&created.id, &draft).unwrap();
        assert_eq!(notices(&saved.effects).len(), 1);

        let again = board
            .save_task(&created.id, &TaskDraft::titled("Renamed"))
            .unwrap();
        assert!(notices(&again.effects).is_empty());
        assert_eq!(board.task(&created.id).unwrap().title, "Renamed");
    }

    #[test]
    fn deleting_project_detaches_tasks() {
        let (temp, mut board) = board();
        let project = board
            .save_project(
                None,
                &ProjectDraft {
                    name: Some("Website".to_string()),
                    ..ProjectDraft::default()
                },
            )
            .unwrap()
            .record;
        let linked = board
            .new_task(&TaskDraft {
                project_id: Some(project.id.clone()),
                ..TaskDraft::titled("Design mock")
            })
            .unwrap()
            .record;
        board.new_task(&TaskDraft::titled("Loose")).unwrap();

        let deleted = board.delete_project(&project.id).unwrap();
        assert_eq!(deleted.record.id, project.id);
        assert!(board.projects().is_empty());
        assert_eq!(board.tasks().len(), 2);
        assert_eq!(board.task(&linked.id).unwrap().project_id, "");
        assert_eq!(deleted.effects.len(), 2);

        let reopened = reopen(&temp);
        assert_eq!(reopened.tasks().len(), 2);
        assert!(reopened.tasks().iter().all(|t| t.project_id.is_empty()));
    }

    #[test]
    fn comments_and_attachments_append_in_order() {
        let (_temp, mut board) = board();
        let id = board.new_task(&TaskDraft::titled("Doc")).unwrap().record.id;
        board.add_comment(&id, "ana", "first").unwrap();
        board.add_comment(&id, "", "second").unwrap();
        assert!(board.add_comment(&id, "ana", "  ").is_err());
        board
            .add_attachment(&id, inline_attachment("a.txt", b"hello"))
            .unwrap();

        let task = board.task(&id).unwrap();
        let bodies: Vec<_> = task.comments.iter().map(|c| c.body.as_str()).collect();
        assert_eq!(bodies, vec!["first", "second"]);
        assert_eq!(task.comments[1].author, "anonymous");
        assert_eq!(task.attachments[0].url, "data:text/plain;base64,aGVsbG8=");
        assert_eq!(task.attachments[0].size, 5);
    }

    #[test]
    fn open_migrates_legacy_data_and_skips_bad_records() {
        let temp = TempDir::new().unwrap();
        let store = LocalStore::for_root(temp.path());
        store.save(
            TASKS_KEY,
            &json!([
                {"id": "a", "title": "Legacy"},
                {"id": "b", "title": "Numeric project", "projectId": 7},
                {"id": "c", "title": "Bad status", "status": "Someday"},
                "garbage"
            ]),
        );

        let (board, report) = Board::open(store.clone());
        assert!(report.migration.migrated);
        assert_eq!(board.tasks().len(), 2);
        assert!(board.tasks().iter().all(|t| t.project_id.is_empty()));
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].id.as_deref(), Some("c"));
        assert_eq!(
            store.load_raw(SCHEMA_VERSION_KEY),
            Some(json!(CURRENT_SCHEMA_VERSION))
        );

        let (_, second) = Board::open(store);
        assert!(!second.migration.migrated);
    }

    #[test]
    fn remote_changes_fold_by_id() {
        let (temp, mut board) = board();
        let local = board.new_task(&TaskDraft::titled("Local")).unwrap().record;

        let mut remote = local.clone();
        remote.title = "Edited elsewhere".to_string();
        let applied = board
            .apply_remote_change(RecordChange::UpsertTask(remote.clone()))
            .unwrap();
        assert_eq!(applied.updated, 1);
        let again = board.apply_remote_change(RecordChange::UpsertTask(remote)).unwrap();
        assert_eq!(again.updated, 1);
        assert_eq!(board.tasks().len(), 1);
        assert_eq!(reopen(&temp).tasks()[0].title, "Edited elsewhere");

        let gone = board
            .apply_remote_change(RecordChange::DeleteTask(local.id.clone()))
            .unwrap();
        assert_eq!(gone.removed, 1);
        assert!(board.tasks().is_empty());
    }

    #[test]
    fn remote_changes_keep_records_saved_by_another_board() {
        let temp = TempDir::new().unwrap();
        let (mut watcher, _) = Board::open(LocalStore::for_root(temp.path()));
        let (mut editor, _) = Board::open(LocalStore::for_root(temp.path()));

        let local = editor.new_task(&TaskDraft::titled("Created locally")).unwrap().record;
        let project = editor
            .save_project(
                None,
                &ProjectDraft {
                    name: Some("Website".to_string()),
                    ..ProjectDraft::default()
                },
            )
            .unwrap()
            .record;

        let remote = Task::new("From remote");
        watcher
            .apply_remote_change(RecordChange::UpsertTask(remote.clone()))
            .unwrap();
        assert!(watcher.task(&local.id).is_ok());

        let mut incoming = Project::new("Mobile");
        incoming.id = "p-remote".to_string();
        watcher
            .apply_remote_change(RecordChange::UpsertProject(incoming))
            .unwrap();

        let reopened = reopen(&temp);
        let mut titles: Vec<_> = reopened.tasks().iter().map(|t| t.title.as_str()).collect();
        titles.sort();
        assert_eq!(titles, vec!["Created locally", "From remote"]);
        assert!(reopened.project(&project.id).is_ok());
        assert!(reopened.project("p-remote").is_ok());

        editor.delete_task(&local.id).unwrap();
        watcher
            .apply_remote_change(RecordChange::DeleteTask("unknown".to_string()))
            .unwrap();
        let ids: Vec<_> = reopen(&temp).tasks().iter().map(|t| t.id.clone()).collect();
        assert_eq!(ids, vec![remote.id]);
    }

    #[test]
    fn tasks_with_unknown_projects_stay_editable() {
        let (_temp, mut board) = board();
        let mut pulled = Task::new("Pulled");
        pulled.project_id = "p-missing".to_string();
        board.merge_remote(vec![pulled.clone()], Vec::new());

        let saved = board.save_task(&pulled.id, &TaskDraft::titled("Renamed")).unwrap();
        assert_eq!(saved.record.title, "Renamed");
        assert_eq!(saved.record.project_id, "p-missing");

        let retarget = TaskDraft {
            project_id: Some("p-other".to_string()),
            ..TaskDraft::default()
        };
        assert!(matches!(
            board.save_task(&pulled.id, &retarget),
            Err(Error::NotFound { kind: "project", .. })
        ));
    }

    #[test]
    fn merge_keeps_local_only_records() {
        let (_temp, mut board) = board();
        board.new_task(&TaskDraft::titled("Local only")).unwrap();
        let summary = board.merge_remote(vec![Task::new("From remote")], vec![Project::new("P")]);
        assert_eq!(summary.tasks_inserted, 1);
        assert_eq!(summary.projects_inserted, 1);
        assert_eq!(board.tasks().len(), 2);
        assert_eq!(board.push_all().len(), 3);
    }

    #[test]
    fn restore_replaces_everything_or_nothing() {
        let (_temp, mut board) = board();
        board.new_task(&TaskDraft::titled("Old")).unwrap();
        let before = board.state().clone();

        let mut invalid = Task::new("");
        invalid.title = " ".to_string();
        assert!(board
            .restore(vec![invalid], Vec::new(), NotificationSettings::default())
            .is_err());
        assert_eq!(board.state(), &before);

        let replacement = Task::new("New");
        board
            .restore(vec![replacement.clone()], Vec::new(), NotificationSettings::default())
            .unwrap();
        assert_eq!(board.tasks(), &[replacement]);
    }

    #[test]
    fn settings_blank_values_are_unset() {
        let (temp, mut board) = board();
        board.update_settings(NotificationSettings {
            default_email: Some(" me@example.com ".to_string()),
            default_slack: Some("  ".to_string()),
        });
        let reopened = reopen(&temp);
        assert_eq!(reopened.settings().default_email.as_deref(), Some("me@example.com"));
        assert_eq!(reopened.settings().default_slack, None);
    }

    #[test]
    fn resolve_project_by_name_or_id() {
        let (_temp, mut board) = board();
        let draft = ProjectDraft {
            name: Some("Website".to_string()),
            start_date: Some(NaiveDate::from_ymd_opt(2024, 1, 1)),
            ..ProjectDraft::default()
        };
        let project = board.save_project(None, &draft).unwrap().record;
        assert_eq!(board.resolve_project("website").unwrap().id, project.id);
        assert_eq!(board.resolve_project(&project.id).unwrap().name, "Website");
        assert!(board.resolve_project("nope").is_err());
    }
}
