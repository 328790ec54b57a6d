//! Atomic env-file writer.
//!
//! ## `persist` protocol
//!
//! 1. Read the existing file (if any) and render the full replacement:
//!    tracked keys updated in place, every other line preserved.
//! 2. Skip the write entirely when the rendered content matches disk.
//! 3. Back up the prior content to `<path>.<timestamp>` when enabled.
//! 4. Write to `<path>.flagsync.tmp`, then rename into place (atomic on
//!    POSIX) so concurrent readers never observe a partial update.
//! 5. Restrict permissions to owner read/write, best-effort.

use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::Local;
use flagsync_core::types::Snapshot;

use crate::error::{io_err, SyncError};

const TMP_SUFFIX: &str = ".flagsync.tmp";

/// Outcome of a persist call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteResult {
    /// File was written (content changed or did not previously exist).
    Written { path: PathBuf },
    /// File was skipped — rendered content matches what is on disk.
    Unchanged { path: PathBuf },
}

/// Persist `snapshot` into the env file at `path`.
///
/// Keys already present in the file but absent from the snapshot are
/// left untouched, as are comments and blank lines. Values are written
/// unquoted. Backup failures are logged and never block the write.
pub fn persist(
    path: &Path,
    snapshot: &Snapshot,
    backup_enabled: bool,
) -> Result<WriteResult, SyncError> {
    let existing = match std::fs::read_to_string(path) {
        Ok(content) => Some(content),
        Err(err) if err.kind() == ErrorKind::NotFound => None,
        Err(err) => return Err(io_err(path, err)),
    };

    let updated = render(existing.as_deref(), snapshot);
    if existing.as_deref() == Some(updated.as_str()) {
        tracing::debug!(path = %path.display(), "env file already up to date");
        return Ok(WriteResult::Unchanged {
            path: path.to_path_buf(),
        });
    }

    if backup_enabled && existing.is_some() {
        if let Err(err) = backup(path) {
            tracing::warn!(
                path = %path.display(),
                error = %err,
                "env file backup failed; continuing with write",
            );
        }
    }

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
        }
    }

    let tmp = PathBuf::from(format!("{}{TMP_SUFFIX}", path.display()));
    std::fs::write(&tmp, &updated).map_err(|e| io_err(&tmp, e))?;
    if let Err(err) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(io_err(path, err));
    }

    restrict_permissions(path);

    tracing::info!(path = %path.display(), keys = snapshot.len(), "env file updated");
    Ok(WriteResult::Written {
        path: path.to_path_buf(),
    })
}

/// Render the full replacement content for the env file.
///
/// Assignment lines whose key is tracked get the snapshot value; every
/// other line passes through verbatim. Tracked keys not present yet are
/// appended at the end in tracked order.
fn render(existing: Option<&str>, snapshot: &Snapshot) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut updated: HashSet<&str> = HashSet::new();

    if let Some(existing) = existing {
        for line in existing.lines() {
            if let Some(key) = assignment_key(line) {
                if let Some(value) = snapshot.get(key) {
                    lines.push(format!("{key}={value}"));
                    updated.insert(key);
                    continue;
                }
            }
            lines.push(line.to_string());
        }
    }

    for (key, value) in snapshot.iter() {
        if !updated.contains(key.as_str()) {
            lines.push(format!("{key}={value}"));
        }
    }

    if lines.is_empty() {
        String::new()
    } else {
        format!("{}\n", lines.join("\n"))
    }
}

/// Key of a `KEY=value` line, or `None` for comments and anything that
/// is not a plain assignment.
fn assignment_key(line: &str) -> Option<&str> {
    let trimmed = line.trim_start();
    if trimmed.starts_with('#') {
        return None;
    }
    let (key, _) = trimmed.split_once('=')?;
    let key = key.trim();
    if key.is_empty() || key.contains(char::is_whitespace) {
        return None;
    }
    Some(key)
}

/// Copy `path` to `<path>.<YYYYMMDD-HHMMSS>` before a write.
///
/// A `-N` suffix disambiguates same-second collisions; a backup is
/// never overwritten. Backups are never pruned automatically.
fn backup(path: &Path) -> Result<PathBuf, SyncError> {
    let stamp = Local::now().format("%Y%m%d-%H%M%S");
    let base = format!("{}.{stamp}", path.display());
    let mut candidate = PathBuf::from(&base);
    let mut suffix = 1u32;
    while candidate.exists() {
        candidate = PathBuf::from(format!("{base}-{suffix}"));
        suffix += 1;
    }
    std::fs::copy(path, &candidate).map_err(|e| io_err(&candidate, e))?;
    tracing::info!(
        from = %path.display(),
        to = %candidate.display(),
        "backed up env file",
    );
    Ok(candidate)
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    if let Err(err) = std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)) {
        tracing::debug!(
            path = %path.display(),
            error = %err,
            "could not set env file permissions to 0600",
        );
    }
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) {}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
