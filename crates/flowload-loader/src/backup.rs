//! Backup of reject files and logs after a non-clean load
//!
//! SQL*Loader writes rejected rows to `*.bad` files next to the control file.
//! After a partial or failed load these, and the loader log, are moved to the
//! backup directory as `<YYYYMMDDHHMMSS><original name>` for later analysis.
//!
//! Renames are plain filesystem renames: a crash in the middle can leave some
//! artifacts moved and others not.

use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Extension of SQL*Loader reject files
pub const BAD_FILE_EXTENSION: &str = "bad";

/// Local time as `YYYYMMDDHHMMSS`, e.g. `20070120162316`
pub fn timestamp_prefix() -> String {
    chrono::Local::now().format("%Y%m%d%H%M%S").to_string()
}

/// What a backup moved, and what it could not
#[derive(Debug, Default)]
pub struct BackupOutcome {
    /// New paths, reject files first
    pub moved: Vec<PathBuf>,
    /// Artifacts left in place (or an unreadable `ctl_dir`) with the cause
    pub failed: Vec<(PathBuf, io::Error)>,
}

impl BackupOutcome {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// `path: error` for every failure, comma separated
    pub fn failure_summary(&self) -> String {
        self.failed
            .iter()
            .map(|(path, e)| format!("{}: {}", path.display(), e))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Move `*.bad` files of `ctl_dir`, then `log_file` if present, into
/// `backup_dir` with `prefix` prepended to their names.
///
/// Every artifact is attempted; one failed move does not stop the others.
/// Nothing to move is not an error.
pub fn backup_artifacts(
    ctl_dir: &Path,
    backup_dir: &Path,
    log_file: &Path,
    prefix: &str,
) -> BackupOutcome {
    let mut outcome = BackupOutcome::default();

    let mut bad_files: Vec<PathBuf> = match std::fs::read_dir(ctl_dir) {
        Ok(entries) => entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| is_bad_file(path))
            .collect(),
        Err(e) => {
            outcome.failed.push((ctl_dir.to_path_buf(), e));
            Vec::new()
        }
    };
    bad_files.sort();

    if log_file.is_file() {
        bad_files.push(log_file.to_path_buf());
    }

    for artifact in bad_files {
        match move_with_prefix(&artifact, backup_dir, prefix) {
            Ok(target) => outcome.moved.push(target),
            Err(e) => outcome.failed.push((artifact, e)),
        }
    }

    outcome
}

/// A regular file named `<something>.bad`
fn is_bad_file(path: &Path) -> bool {
    let has_stem = path
        .file_stem()
        .map(|stem| !stem.is_empty())
        .unwrap_or(false);

    has_stem
        && path.extension().map(|ext| ext == BAD_FILE_EXTENSION).unwrap_or(false)
        && path.is_file()
}

fn move_with_prefix(source: &Path, backup_dir: &Path, prefix: &str) -> io::Result<PathBuf> {
    let name = source.file_name().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("no file name in {}", source.display()),
        )
    })?;

    let mut target_name = std::ffi::OsString::from(prefix);
    target_name.push(name);
    let target = backup_dir.join(target_name);

    std::fs::rename(source, &target)?;
    debug!(from = %source.display(), to = %target.display(), "Backed up loader artifact");

    Ok(target)
}
