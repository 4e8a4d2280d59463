//! Crash-safe JSON snapshot files.
//!
//! # Responsibility
//! - Write a snapshot as temp file -> fsync -> backup copy -> rename.
//! - Load a snapshot through the primary -> backup -> default chain.
//!
//! # Invariants
//! - The destination is never opened for writing; it is only replaced by
//!   rename, so it always holds either the old or the complete new bytes.
//! - Loading never fails; each fallback step is logged.

use log::{error, info, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;
use uuid::Uuid;

pub type PersistResult<T> = Result<T, PersistError>;

/// Durable write failure.
#[derive(Debug)]
pub enum PersistError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Serialize(serde_json::Error),
}

impl Display for PersistError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "i/o error on `{}`: {source}", path.display()),
            Self::Serialize(err) => write!(f, "failed to serialize snapshot: {err}"),
        }
    }
}

impl Error for PersistError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Serialize(err) => Some(err),
        }
    }
}

impl From<serde_json::Error> for PersistError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialize(value)
    }
}

/// Where a loaded snapshot came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadSource {
    Primary,
    Backup,
    Default,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Loaded<T> {
    pub value: T,
    pub source: LoadSource,
}

/// `<file>.bak` next to `path`.
pub fn backup_path(path: &Path) -> PathBuf {
    sibling_with_suffix(path, "bak")
}

fn temp_path(path: &Path) -> PathBuf {
    sibling_with_suffix(path, &format!("{}.tmp", Uuid::new_v4().simple()))
}

fn sibling_with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    name.push(".");
    name.push(suffix);
    path.with_file_name(name)
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> PersistError + '_ {
    move |source| PersistError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Serializes `value` and atomically replaces `path` with it.
///
/// # Side effects
/// - Creates the parent directory when missing.
/// - Copies an existing destination to `<file>.bak` before the rename.
/// - Emits `snapshot_write` events with duration and status.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T, label: &str) -> PersistResult<()> {
    let started_at = Instant::now();
    let result = write_json_atomic_inner(path, value);
    match &result {
        Ok(bytes) => info!(
            "event=snapshot_write module=repo status=ok snapshot={} bytes={} duration_ms={}",
            label,
            bytes,
            started_at.elapsed().as_millis()
        ),
        Err(err) => error!(
            "event=snapshot_write module=repo status=error snapshot={} duration_ms={} error={}",
            label,
            started_at.elapsed().as_millis(),
            err
        ),
    }
    result.map(|_| ())
}

fn write_json_atomic_inner<T: Serialize>(path: &Path, value: &T) -> PersistResult<usize> {
    let bytes = serde_json::to_vec_pretty(value)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_error(parent))?;
    }

    let tmp = temp_path(path);
    if let Err(err) = write_synced(&tmp, &bytes) {
        let _ = fs::remove_file(&tmp);
        return Err(err);
    }

    if path.exists() {
        let backup = backup_path(path);
        if let Err(source) = fs::copy(path, &backup) {
            let _ = fs::remove_file(&tmp);
            return Err(PersistError::Io {
                path: backup,
                source,
            });
        }
    }

    if let Err(source) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(PersistError::Io {
            path: path.to_path_buf(),
            source,
        });
    }
    sync_parent_dir(path);
    Ok(bytes.len())
}

fn write_synced(path: &Path, bytes: &[u8]) -> PersistResult<()> {
    let mut file = File::create(path).map_err(io_error(path))?;
    file.write_all(bytes).map_err(io_error(path))?;
    file.sync_all().map_err(io_error(path))?;
    Ok(())
}

#[cfg(unix)]
fn sync_parent_dir(path: &Path) {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if let Ok(dir) = File::open(parent) {
            let _ = dir.sync_all();
        }
    }
}

#[cfg(not(unix))]
fn sync_parent_dir(_path: &Path) {}

/// Loads `path`, falling back to its backup and then to `T::default()`.
pub fn load_json_with_fallback<T>(path: &Path, label: &str) -> Loaded<T>
where
    T: DeserializeOwned + Default,
{
    match read_json(path) {
        Ok(value) => {
            info!(
                "event=snapshot_load module=repo status=ok snapshot={} source=primary",
                label
            );
            return Loaded {
                value,
                source: LoadSource::Primary,
            };
        }
        Err(reason) => warn!(
            "event=snapshot_load module=repo status=fallback snapshot={} source=primary reason={}",
            label, reason
        ),
    }

    let backup = backup_path(path);
    match read_json(&backup) {
        Ok(value) => {
            warn!(
                "event=snapshot_load module=repo status=ok snapshot={} source=backup",
                label
            );
            return Loaded {
                value,
                source: LoadSource::Backup,
            };
        }
        Err(reason) => warn!(
            "event=snapshot_load module=repo status=fallback snapshot={} source=backup reason={}",
            label, reason
        ),
    }

    warn!(
        "event=snapshot_load module=repo status=ok snapshot={} source=default",
        label
    );
    Loaded {
        value: T::default(),
        source: LoadSource::Default,
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, String> {
    let text = fs::read_to_string(path).map_err(|err| match err.kind() {
        std::io::ErrorKind::NotFound => "missing".to_string(),
        _ => format!("unreadable:{}", err.kind()),
    })?;
    serde_json::from_str(&text).map_err(|err| format!("unparsable:line{}", err.line()))
}

#[cfg(test)]
mod tests {
    use super::backup_path;
    use std::path::Path;

    #[test]
    fn backup_path_appends_suffix() {
        assert_eq!(
            backup_path(Path::new("/data/chores.json")),
            Path::new("/data/chores.json.bak")
        );
    }
}
