//! Atomic file write helpers.
//!
//! Uses a temp file + rename pattern so readers only ever see the previous or
//! the new contents. On Windows, rename-over-existing fails, so the old file is
//! moved to a `.prev` sibling first and restored if the second rename fails.

use std::ffi::OsString;
#[cfg(unix)]
use std::fs::File;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
#[cfg(unix)]
use tracing::debug;

#[derive(Debug, Clone, Copy)]
pub struct AtomicWriteOptions {
    /// File sync policy for the temp file before persisting.
    pub file_sync: FileSyncPolicy,
    /// Parent directory sync policy after the file has been persisted.
    pub parent_dir_sync: ParentDirSyncPolicy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileSyncPolicy {
    SyncAll,
    SkipSync,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentDirSyncPolicy {
    SyncBestEffort,
    SkipSync,
}

impl Default for AtomicWriteOptions {
    fn default() -> Self {
        Self {
            file_sync: FileSyncPolicy::SyncAll,
            parent_dir_sync: ParentDirSyncPolicy::SyncBestEffort,
        }
    }
}

/// `path` with `suffix` appended to its file name (`cfg.json` -> `cfg.json.bak`).
#[must_use]
pub fn sibling_with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path
        .file_name()
        .map_or_else(OsString::new, ToOwned::to_owned);
    name.push(suffix);
    path.with_file_name(name)
}

fn parent_or_cwd(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

/// Create the directory that will hold `path` if it is missing.
pub fn ensure_parent_dir(path: &Path) -> io::Result<()> {
    fs::create_dir_all(parent_or_cwd(path))
}

/// Move a file that could not be parsed out of the way.
///
/// The file is renamed to its `.bak` sibling, replacing any earlier backup, so
/// its bytes are kept for inspection. Returns the backup path.
pub fn quarantine(path: &Path) -> io::Result<PathBuf> {
    let backup = sibling_with_suffix(path, ".bak");
    if backup.exists() {
        fs::remove_file(&backup)?;
    }
    fs::rename(path, &backup)?;
    tracing::warn!(
        path = %path.display(),
        backup = %backup.display(),
        "Moved unreadable file aside"
    );
    Ok(backup)
}

pub fn atomic_write_with_options(
    path: impl AsRef<Path>,
    bytes: &[u8],
    options: AtomicWriteOptions,
) -> io::Result<()> {
    let path = path.as_ref();
    let parent = parent_or_cwd(path);

    let mut tmp = NamedTempFile::new_in(parent)?;
    tmp.write_all(bytes)?;
    if matches!(options.file_sync, FileSyncPolicy::SyncAll) {
        tmp.as_file().sync_all()?;
    }

    if let Err(err) = tmp.persist(path) {
        if !path.exists() {
            return Err(err.error);
        }
        // Windows fallback: move the old file aside, then retry.
        let previous = sibling_with_suffix(path, ".prev");
        let _ = fs::remove_file(&previous);
        fs::rename(path, &previous)?;

        if let Err(rename_err) = err.file.persist(path) {
            let _ = fs::rename(&previous, path);
            return Err(rename_err.error);
        }
        if let Err(e) = fs::remove_file(&previous) {
            tracing::warn!(
                path = %previous.display(),
                "Failed to remove .prev after atomic write: {e}"
            );
        }
    }

    if matches!(options.parent_dir_sync, ParentDirSyncPolicy::SyncBestEffort) {
        best_effort_sync_parent_dir(parent);
    }

    Ok(())
}

#[cfg(unix)]
fn best_effort_sync_parent_dir(parent: &Path) {
    if let Err(e) = File::open(parent).and_then(|d| d.sync_all()) {
        debug!(path = %parent.display(), "Parent directory sync_all failed (best-effort): {e}");
    }
}

// Directory handles cannot be synced without extra flags on Windows.
#[cfg(not(unix))]
fn best_effort_sync_parent_dir(_parent: &Path) {}
