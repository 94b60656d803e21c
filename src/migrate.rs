//! Schema migration for locally persisted records.
//!
//! The stored `schema_version` counter gates each step; a missing counter
//! means version 1. Migration works on raw JSON so it can repair records
//! the typed model would reject.

use serde::Serialize;
use serde_json::Value;

use crate::storage::{LocalStore, PROJECTS_KEY, SCHEMA_VERSION_KEY, TASKS_KEY};

/// Schema version written by this build
pub const CURRENT_SCHEMA_VERSION: u32 = 2;

const LEGACY_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize)]
pub struct MigrationReport {
    pub from_version: u32,
    pub to_version: u32,
    pub migrated: bool,
    pub tasks_rewritten: usize,
    pub records_dropped: usize,
}

/// Records after migration, still untyped.
#[derive(Debug, Clone)]
pub struct MigratedRecords {
    pub tasks: Vec<Value>,
    pub projects: Vec<Value>,
    pub report: MigrationReport,
}

/// Coerce a stored value into an array of records.
pub fn coerce_array(value: Option<Value>) -> Vec<Value> {
    match value {
        Some(Value::Array(items)) => items,
        Some(other) => {
            tracing::warn!(kind = value_kind(&other), "stored collection is not an array, ignoring");
            Vec::new()
        }
        None => Vec::new(),
    }
}

/// Migrate in-memory records from `version` to the current schema.
///
/// Inputs at or above the current version come back untouched.
pub fn migrate_records(version: u32, tasks: Vec<Value>, projects: Vec<Value>) -> MigratedRecords {
    if version >= CURRENT_SCHEMA_VERSION {
        return MigratedRecords {
            tasks,
            projects,
            report: MigrationReport {
                from_version: version,
                to_version: version,
                migrated: false,
                tasks_rewritten: 0,
                records_dropped: 0,
            },
        };
    }

    let before = tasks.len();
    let mut rewritten = 0;
    let tasks: Vec<Value> = tasks
        .into_iter()
        .filter_map(|record| match record {
            Value::Object(mut fields) => {
                let needs_fix = !matches!(fields.get("projectId"), Some(Value::String(_)));
                if needs_fix {
                    fields.insert("projectId".to_string(), Value::String(String::new()));
                    rewritten += 1;
                }
                Some(Value::Object(fields))
            }
            other => {
                tracing::warn!(kind = value_kind(&other), "dropping non-object task record");
                None
            }
        })
        .collect();
    let dropped = before - tasks.len();

    MigratedRecords {
        tasks,
        projects,
        report: MigrationReport {
            from_version: version,
            to_version: CURRENT_SCHEMA_VERSION,
            migrated: true,
            tasks_rewritten: rewritten,
            records_dropped: dropped,
        },
    }
}

/// Stored schema version, defaulting to the legacy version.
pub fn stored_version(store: &LocalStore) -> u32 {
    match store.load_raw(SCHEMA_VERSION_KEY) {
        Some(Value::Number(n)) => n
            .as_u64()
            .and_then(|v| u32::try_from(v).ok())
            .unwrap_or(LEGACY_SCHEMA_VERSION),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(LEGACY_SCHEMA_VERSION),
        _ => LEGACY_SCHEMA_VERSION,
    }
}

/// Load stored records and migrate them, persisting the result once.
pub fn run(store: &LocalStore) -> MigratedRecords {
    let version = stored_version(store);
    let tasks = coerce_array(store.load_raw(TASKS_KEY));
    let projects = coerce_array(store.load_raw(PROJECTS_KEY));

    let migrated = migrate_records(version, tasks, projects);
    if migrated.report.migrated {
        store.save(TASKS_KEY, &migrated.tasks);
        store.save(SCHEMA_VERSION_KEY, &CURRENT_SCHEMA_VERSION);
        tracing::debug!(
            from = migrated.report.from_version,
            to = migrated.report.to_version,
            rewritten = migrated.report.tasks_rewritten,
            "migrated local schema"
        );
    }
    migrated
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
