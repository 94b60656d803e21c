//! Advisory locking and crash-safe replacement of data documents
//!
//! A `watch` session and a one-shot edit can run against the same data
//! directory. Each document `tasks.json` is guarded by `tasks.json.lock`;
//! writes go to a temp file in the same directory which is then persisted
//! over the target, so a reader sees either the old or the new document.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use fs2::FileExt;
use tempfile::NamedTempFile;

use crate::error::{Error, Result};

/// How long document reads and writes wait for a competing process.
pub const LOCK_TIMEOUT: Duration = Duration::from_secs(5);

const POLL: Duration = Duration::from_millis(25);

/// Exclusive hold on a `.lock` file, released on drop.
#[derive(Debug)]
pub struct DocumentLock {
    handle: File,
    path: PathBuf,
}

impl DocumentLock {
    /// Block until the lock is ours or `timeout` passes.
    pub fn acquire(path: impl Into<PathBuf>, timeout: Duration) -> Result<Self> {
        let path = path.into();
        let handle = open_lock_file(&path)?;
        let deadline = Instant::now() + timeout;

        while !take(&handle)? {
            if Instant::now() >= deadline {
                return Err(Error::LockFailed(path));
            }
            thread::sleep(POLL);
        }
        Ok(Self { handle, path })
    }

    /// Take the lock only if nobody holds it right now.
    #[cfg(test)]
    fn try_acquire(path: impl Into<PathBuf>) -> Result<Option<Self>> {
        let path = path.into();
        let handle = open_lock_file(&path)?;
        if take(&handle)? {
            Ok(Some(Self { handle, path }))
        } else {
            Ok(None)
        }
    }

    #[cfg(test)]
    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for DocumentLock {
    fn drop(&mut self) {
        if let Err(err) = self.handle.unlock() {
            tracing::debug!(path = %self.path.display(), error = %err, "unlock failed");
        }
    }
}

/// `Ok(false)` means another holder has the lock.
fn take(handle: &File) -> Result<bool> {
    match handle.try_lock_exclusive() {
        Ok(()) => Ok(true),
        Err(err) if contended(&err) => Ok(false),
        Err(err) => Err(err.into()),
    }
}

fn contended(err: &io::Error) -> bool {
    // Windows: ERROR_SHARING_VIOLATION / ERROR_LOCK_VIOLATION
    err.kind() == io::ErrorKind::WouldBlock
        || (cfg!(windows) && matches!(err.raw_os_error(), Some(32 | 33)))
}

fn open_lock_file(path: &Path) -> Result<File> {
    ensure_parent(path)?;
    let file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .read(true)
        .write(true)
        .open(path)?;
    Ok(file)
}

fn ensure_parent(path: &Path) -> Result<()> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => Ok(fs::create_dir_all(dir)?),
        _ => Ok(()),
    }
}

/// Sibling lock file for a document: `tasks.json` -> `tasks.json.lock`.
pub fn lock_path_for(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".lock");
    PathBuf::from(name)
}

/// Replace `path` with `contents`. Callers that race other processes
/// should hold the document lock; see [`write_document`].
pub fn replace_file(path: &Path, contents: &[u8]) -> Result<()> {
    ensure_parent(path)?;
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut staged = NamedTempFile::new_in(dir)?;
    staged.write_all(contents)?;
    staged.as_file().sync_all()?;
    staged.persist(path).map_err(|err| Error::Io(err.error))?;
    Ok(())
}

/// Lock, then replace the document at `path`.
pub fn write_document(path: &Path, contents: &[u8]) -> Result<()> {
    let _guard = DocumentLock::acquire(lock_path_for(path), LOCK_TIMEOUT)?;
    replace_file(path, contents)
}

/// Lock, then read the document at `path`.
pub fn read_document(path: &Path) -> Result<Vec<u8>> {
    let _guard = DocumentLock::acquire(lock_path_for(path), LOCK_TIMEOUT)?;
    Ok(fs::read(path)?)
}
