//! Single-instance guard backed by a pid file
//!
//! The pid file lists one pid per line, one line per running instance.
//! [`PidFile::acquire`] prunes pids that are no longer alive, refuses to start
//! when `max_instances` live instances are already listed (unless forced) and
//! appends the own pid. Dropping the guard takes the own pid out again and
//! deletes the file once it is empty.

use crate::error::{CliError, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug)]
pub struct PidFile {
    path: PathBuf,
    pid: u32,
}

impl PidFile {
    /// Register the current process in `path`
    pub fn acquire(path: impl Into<PathBuf>, force: bool, max_instances: usize) -> Result<Self> {
        let path = path.into();
        let pid = std::process::id();

        let listed = read_pids(&path)?;
        let mut alive: Vec<u32> = listed
            .iter()
            .copied()
            .filter(|&p| p != pid && is_alive(p))
            .collect();
        alive.sort_unstable();
        alive.dedup();

        if listed.len() != alive.len() {
            debug!(
                path = %path.display(),
                pruned = listed.len() - alive.len(),
                "Pruned stale pids"
            );
        }

        if alive.len() >= max_instances {
            let pids = alive
                .iter()
                .map(u32::to_string)
                .collect::<Vec<_>>()
                .join(", ");

            if !force {
                return Err(CliError::AlreadyRunning {
                    path: path.display().to_string(),
                    pids,
                });
            }
            warn!(pids = %pids, "Other instance(s) still running, continuing because devmode is set");
        }

        alive.push(pid);
        write_pids(&path, &alive)?;
        debug!(path = %path.display(), pid, "Pid file acquired");

        Ok(Self { path, pid })
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    fn release(&self) -> std::io::Result<()> {
        let remaining: Vec<u32> = read_pids(&self.path)?
            .into_iter()
            .filter(|&p| p != self.pid)
            .collect();

        if remaining.is_empty() {
            match std::fs::remove_file(&self.path) {
                Err(e) if e.kind() != std::io::ErrorKind::NotFound => return Err(e),
                _ => {}
            }
        } else {
            write_pids(&self.path, &remaining)?;
        }

        Ok(())
    }
}

impl Drop for PidFile {
    fn drop(&mut self) {
        match self.release() {
            Ok(()) => debug!(path = %self.path.display(), "Pid file released"),
            Err(e) => warn!(path = %self.path.display(), error = %e, "Failed to release pid file"),
        }
    }
}

/// Pids listed in `path`; a missing file lists none, unparsable lines are ignored
fn read_pids(path: &Path) -> std::io::Result<Vec<u32>> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };

    Ok(content
        .lines()
        .filter_map(|line| line.trim().parse().ok())
        .collect())
}

fn write_pids(path: &Path, pids: &[u32]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let content: String = pids.iter().map(|p| format!("{}\n", p)).collect();
    std::fs::write(path, content)
}

#[cfg(target_os = "linux")]
fn is_alive(pid: u32) -> bool {
    Path::new("/proc").join(pid.to_string()).exists()
}

/// Without procfs every listed pid counts as running
#[cfg(not(target_os = "linux"))]
fn is_alive(_pid: u32) -> bool {
    true
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_acquire_and_release() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("var").join("flowload.pid");

        {
            let guard = PidFile::acquire(&path, false, 1).unwrap();
            assert_eq!(guard.pid(), std::process::id());
            assert_eq!(read_pids(&path).unwrap(), vec![std::process::id()]);
        }

        assert!(!path.exists());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_live_instance_blocks_acquisition() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flowload.pid");
        let parent = std::os::unix::process::parent_id();
        fs::write(&path, format!("{}\n", parent)).unwrap();

        let err = PidFile::acquire(&path, false, 1).unwrap_err();
        assert!(matches!(err, CliError::AlreadyRunning { .. }));
        assert_eq!(read_pids(&path).unwrap(), vec![parent]);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_force_and_max_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flowload.pid");
        let parent = std::os::unix::process::parent_id();
        fs::write(&path, format!("{}\n", parent)).unwrap();

        {
            let _forced = PidFile::acquire(&path, true, 1).unwrap();
            assert_eq!(read_pids(&path).unwrap(), vec![parent, std::process::id()]);
        }
        assert_eq!(read_pids(&path).unwrap(), vec![parent]);

        let _second = PidFile::acquire(&path, false, 2).unwrap();
        assert_eq!(read_pids(&path).unwrap().len(), 2);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_repeated_pids_count_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flowload.pid");
        let parent = std::os::unix::process::parent_id();
        fs::write(&path, format!("1\n{}\n1\n", parent)).unwrap();

        let mut expected = vec![1, parent];
        expected.sort_unstable();
        expected.dedup();

        let _guard = PidFile::acquire(&path, false, expected.len() + 1).unwrap();
        expected.push(std::process::id());
        assert_eq!(read_pids(&path).unwrap(), expected);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_stale_pids_are_pruned() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flowload.pid");
        fs::write(&path, "999999999\nnot-a-pid\n").unwrap();

        let _guard = PidFile::acquire(&path, false, 1).unwrap();
        assert_eq!(read_pids(&path).unwrap(), vec![std::process::id()]);
    }
}
