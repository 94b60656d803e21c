//! Local key-value persistence for taskdeck
//!
//! Every key is one JSON document in the data directory:
//!
//! ```text
//! <root>/data/
//!   tasks.json              # Task records
//!   projects.json           # Project records
//!   notify_settings.json    # Notification destination overrides
//!   schema_version.json     # Integer schema counter
//!   session.json            # Remote auth session, when signed in
//! ```
//!
//! Reads come in two flavors: [`LocalStore::load`] never fails and falls
//! back to a default, [`LocalStore::decode`] reports a typed error.
//! [`LocalStore::save`] logs and drops write failures.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};

use crate::error::{Error, Result};
use crate::lock::{self, DocumentLock};

/// Name of the data directory under the root
pub const DATA_DIR: &str = "data";

pub const TASKS_KEY: &str = "tasks";
pub const PROJECTS_KEY: &str = "projects";
pub const NOTIFY_SETTINGS_KEY: &str = "notify_settings";
pub const SCHEMA_VERSION_KEY: &str = "schema_version";
pub const SESSION_KEY: &str = "session";

/// Storage handle for one data directory
#[derive(Debug, Clone)]
pub struct LocalStore {
    data_dir: PathBuf,
}

impl LocalStore {
    /// Store rooted at `root`, keeping documents in `root/data`.
    pub fn for_root(root: &Path) -> Self {
        Self::new(root.join(DATA_DIR))
    }

    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Path of the document backing `key`
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.data_dir.join(format!("{key}.json"))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.path_for(key).exists()
    }

    /// Read `key`, or `fallback` when it is missing or unparsable.
    pub fn load<T: DeserializeOwned>(&self, key: &str, fallback: T) -> T {
        match self.decode(key) {
            Ok(Some(value)) => value,
            Ok(None) => fallback,
            Err(err) => {
                tracing::warn!(key, error = %err, "stored value unreadable, using fallback");
                fallback
            }
        }
    }

    /// Read `key` as raw JSON. Missing or unparsable documents give `None`.
    pub fn load_raw(&self, key: &str) -> Option<serde_json::Value> {
        self.load(key, None)
    }

    /// Read and decode `key`, reporting why it could not be decoded.
    pub fn decode<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        let bytes = lock::read_document(&path)?;
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|err| Error::Decode {
                key: key.to_string(),
                message: err.to_string(),
            })
    }

    /// Write `key`, surfacing failures.
    pub fn try_save<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let json = serde_json::to_vec_pretty(value)?;
        lock::write_document(&self.path_for(key), &json)
    }

    /// Write `key`. Failures are logged and otherwise ignored.
    pub fn save<T: Serialize + ?Sized>(&self, key: &str, value: &T) {
        if let Err(err) = self.try_save(key, value) {
            tracing::warn!(key, error = %err, "failed to persist value");
        }
    }

    /// Read `key`, change it with `apply` and write it back, all under the
    /// document lock. Writes another process made since this one last read
    /// are seen by `apply` and kept. A missing or unparsable document
    /// starts from `fallback`.
    pub fn update<T, R>(&self, key: &str, fallback: T, apply: impl FnOnce(&mut T) -> R) -> Result<R>
    where
        T: Serialize + DeserializeOwned,
    {
        let path = self.path_for(key);
        let _guard = DocumentLock::acquire(lock::lock_path_for(&path), lock::LOCK_TIMEOUT)?;
        let mut value = match fs::read(&path) {
            Ok(bytes) => match serde_json::from_slice(&bytes) {
                Ok(value) => value,
                Err(err) => {
                    tracing::warn!(key, error = %err, "stored value unreadable, rewriting");
                    fallback
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => fallback,
            Err(err) => return Err(err.into()),
        };
        let outcome = apply(&mut value);
        lock::replace_file(&path, &serde_json::to_vec_pretty(&value)?)?;
        Ok(outcome)
    }

    /// Delete `key` if present.
    pub fn remove(&self, key: &str) -> Result<()> {
        let path = self.path_for(key);
        if path.exists() {
            fs::remove_file(&path)?;
        }
        let lock_path = lock::lock_path_for(&path);
        if lock_path.exists() {
            let _ = fs::remove_file(lock_path);
        }
        Ok(())
    }
}
