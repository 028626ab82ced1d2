//! Per-root serialization of dependency staging.
//!
//! A root counts as staged only once its staging directory carries the
//! [`STAGED_MARKER`] file, written after the copy command succeeded. A
//! directory without the marker is leftover from a failed or killed copy and
//! is removed before staging again. With more than one worker two jobs may
//! share a root, so the check and the copy run under that root's lock.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

pub const STAGING_DIR_NAME: &str = ".callgraph-deps";
pub const STAGED_MARKER: &str = ".complete";

pub fn staging_dir(root: &Path) -> PathBuf {
    root.join(STAGING_DIR_NAME)
}

pub fn is_staged(target: &Path) -> bool {
    target.join(STAGED_MARKER).is_file()
}

/// Records a finished copy into `target`, creating the directory if the
/// copy left nothing behind.
pub fn mark_staged(target: &Path) -> io::Result<()> {
    std::fs::create_dir_all(target)?;
    std::fs::write(target.join(STAGED_MARKER), b"")
}

/// Removes whatever an unfinished copy left in `target`.
pub fn discard_partial(target: &Path) -> io::Result<()> {
    match std::fs::remove_dir_all(target) {
        Err(err) if err.kind() != io::ErrorKind::NotFound => Err(err),
        _ => Ok(()),
    }
}

/// Exclusion glob that keeps staged jars out of discovery.
pub fn staging_exclusion() -> String {
    format!("**/{STAGING_DIR_NAME}/**")
}

#[derive(Debug, Default)]
pub struct StagingLocks {
    roots: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl StagingLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the lock for `root`, creating it on first use.
    pub fn lock_for(&self, root: &Path) -> Arc<Mutex<()>> {
        let mut roots = self
            .roots
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(roots.entry(root.to_path_buf()).or_default())
    }

    pub fn len(&self) -> usize {
        self.roots
            .lock()
            .map(|roots| roots.len())
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Locks `lock`, recovering from a poisoned mutex since it guards no data.
pub fn acquire(lock: &Mutex<()>) -> MutexGuard<'_, ()> {
    lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
