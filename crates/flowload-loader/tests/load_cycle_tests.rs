//! End-to-end load cycles against a stand-in loader binary
//!
//! The fake `sqlldr` is a shell script that replays a scenario staged next to
//! the control file:
//!
//! - `scenario.log` is copied to the `log=` path (no file: no log)
//! - `scenario.rejects` is copied to `rejected.bad`
//! - `scenario.rc` holds the exit code (default 0)
//!
//! Every run also records its arguments in `args.txt`.
#![cfg(unix)]
#![allow(clippy::unwrap_used, clippy::expect_used)]

use flowload_common::Severity;
use flowload_loader::{Database, ExitCodeTable, LoadJob, Loader, LoaderConfig};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tempfile::TempDir;

const FAKE_SQLLDR: &str = r#"#!/bin/sh
for arg in "$@"; do
    case "$arg" in
        log=*) log="${arg#log=}" ;;
        control=*) control="${arg#control=}" ;;
    esac
done
dir=$(dirname "$control")
printf '%s\n' "$@" > "$dir/args.txt"
[ -f "$dir/scenario.log" ] && cp "$dir/scenario.log" "$log"
[ -f "$dir/scenario.rejects" ] && cp "$dir/scenario.rejects" "$dir/rejected.bad"
exit "$(cat "$dir/scenario.rc" 2>/dev/null || echo 0)"
"#;

/// Written once, before any test spawns a process, so no test ever execs a
/// script another thread still holds open for writing.
fn fake_sqlldr() -> &'static Path {
    static BIN: OnceLock<(TempDir, PathBuf)> = OnceLock::new();
    let (_, path) = BIN.get_or_init(|| {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sqlldr");
        fs::write(&path, FAKE_SQLLDR).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        (dir, path)
    });
    path
}

struct Fixture {
    ctl_dir: TempDir,
    log_dir: TempDir,
    backup_dir: TempDir,
    loader: Loader,
}

impl Fixture {
    fn new(max_error_count: u64) -> Self {
        let ctl_dir = TempDir::new().unwrap();
        let log_dir = TempDir::new().unwrap();
        let backup_dir = TempDir::new().unwrap();

        let config = LoaderConfig::new(
            fake_sqlldr(),
            log_dir.path(),
            ctl_dir.path(),
            backup_dir.path(),
        )
        .with_max_error_count(max_error_count)
        .with_exit_table(ExitCodeTable::Posix);

        Self {
            loader: Loader::new(config).unwrap(),
            ctl_dir,
            log_dir,
            backup_dir,
        }
    }

    fn stage(&self, rc: i32, log: Option<&str>, rejects: Option<&str>) {
        fs::write(self.ctl_dir.path().join("scenario.rc"), rc.to_string()).unwrap();
        if let Some(log) = log {
            fs::write(self.ctl_dir.path().join("scenario.log"), log).unwrap();
        }
        if let Some(rejects) = rejects {
            fs::write(self.ctl_dir.path().join("scenario.rejects"), rejects).unwrap();
        }
    }

    fn backups(&self) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(self.backup_dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    fn log_file(&self) -> PathBuf {
        self.log_dir.path().join("sqlldr.xdr.log")
    }
}

fn job() -> LoadJob {
    let db = Database::new("vqsd", "toto", "poipoi", "VQSD").unwrap();
    LoadJob::builder("xdr", db, "VQS_LOADTABLE_TDM")
        .delimiter('|')
        .field_names(["call_id", "dt_start", "report_date"])
        .files(["/data/xdr_001", "/data/xdr_002"])
        .build()
        .unwrap()
}

fn unix_log(read: u64, rejected: u64) -> String {
    format!(
        "Total logical records skipped:          0\n\
         Total logical records read:     {}\n\
         Total logical records rejected: {}\n\
         Total logical records discarded:        0\n",
        read, rejected
    )
}

/// Backup names are `<14 digit timestamp><original name>`
fn assert_backed_up(names: &[String], original: &str) {
    assert!(
        names.iter().any(|n| n.len() == 14 + original.len()
            && n.ends_with(original)
            && n[..14].chars().all(|c| c.is_ascii_digit())),
        "{} not in backups {:?}",
        original,
        names
    );
}

#[test]
fn test_successful_load() {
    let fx = Fixture::new(10);
    fx.stage(0, Some(unix_log(100, 0).as_str()), None);

    let report = fx.loader.load(&job()).unwrap();

    assert_eq!(report.num_loaded, 100);
    assert!(report.message().starts_with("xdr: loaded 100 rows in "));
    assert!(report.message().ends_with(" into VQS_LOADTABLE_TDM, load successful"));
    assert!(fx.backups().is_empty());
    assert!(fx.log_file().exists());
}

#[test]
fn test_command_line_and_control_file() {
    let fx = Fixture::new(10);
    fx.stage(0, Some(unix_log(1, 0).as_str()), None);

    fx.loader.load(&job()).unwrap();

    let ctl_file = fx.ctl_dir.path().join("sqlldr.xdr.ctl");
    let args = fs::read_to_string(fx.ctl_dir.path().join("args.txt")).unwrap();
    let args: Vec<&str> = args.lines().collect();
    assert_eq!(args[0], "toto/poipoi@VQSD");
    assert_eq!(args[1], "direct=false");
    assert_eq!(args[2], format!("log={}", fx.log_file().display()));
    assert_eq!(args[3], format!("control={}", ctl_file.display()));
    assert_eq!(&args[4..], &["errors=1000000", "silent=header"]);

    let ctl = fs::read_to_string(ctl_file).unwrap();
    let infiles: Vec<&str> = ctl.lines().filter(|l| l.starts_with("INFILE")).collect();
    assert_eq!(infiles, vec!["INFILE \"/data/xdr_001\"", "INFILE \"/data/xdr_002\""]);
}

#[test]
fn test_partial_load_within_tolerance() {
    let fx = Fixture::new(10);
    fx.stage(2, Some(unix_log(100, 5).as_str()), Some("7|broken\n"));

    let err = fx.loader.load(&job()).unwrap_err();

    assert_eq!(err.severity(), Severity::Warning);
    assert!(err.message().ends_with("partial load, discarded: 5"));
    let backups = fx.backups();
    assert_backed_up(&backups, "rejected.bad");
    assert_backed_up(&backups, "sqlldr.xdr.log");
    assert!(!fx.log_file().exists());
}

#[test]
fn test_partial_load_too_many_discards() {
    let fx = Fixture::new(10);
    fx.stage(2, Some(unix_log(100, 50).as_str()), Some("7|broken\n"));

    let err = fx.loader.load(&job()).unwrap_err();

    assert_eq!(err.severity(), Severity::Critical);
    assert!(err.message().ends_with("partial load, too many discards: 50!"));
    assert_eq!(fx.backups().len(), 2);
}

#[test]
fn test_missing_log_is_critical_regardless_of_exit() {
    let fx = Fixture::new(10);
    fx.stage(0, None, Some("1|x\n"));

    let err = fx.loader.load(&job()).unwrap_err();

    assert_eq!(err.severity(), Severity::Critical);
    assert_eq!(err.message(), "xdr: load failed: SUCCESS");
    let backups = fx.backups();
    assert_eq!(backups.len(), 1);
    assert_backed_up(&backups, "rejected.bad");
}

#[test]
fn test_unknown_exit_code_with_error_text() {
    let fx = Fixture::new(10);
    fx.stage(
        99,
        Some("SQL*Loader-500: Unable to open file (/data/xdr_001)\n"),
        None,
    );

    let err = fx.loader.load(&job()).unwrap_err();

    assert_eq!(err.severity(), Severity::Critical);
    assert!(err.message().contains("load failed (Unknown (99)), SQL*Loader-500: Unable to open file"));
    assert_backed_up(&fx.backups(), "sqlldr.xdr.log");
}

#[test]
fn test_fatal_exit() {
    let fx = Fixture::new(10);
    fx.stage(3, Some("ORA-01017: invalid username/password; logon denied\n"), None);

    let err = fx.loader.load(&job()).unwrap_err();

    assert!(err
        .message()
        .ends_with("load failed (FATAL), ORA-01017: invalid username/password; logon denied"));
}

#[test]
fn test_cycles_do_not_share_state() {
    let fx = Fixture::new(10);
    fx.stage(0, Some(unix_log(3, 0).as_str()), None);
    fx.loader.load(&job()).unwrap();

    let db = Database::new("other", "scott", "tiger", "ORCL").unwrap();
    let second = LoadJob::builder("cdr", db, "CDR_TABLE")
        .field_names(["id"])
        .files(["/data/cdr_001"])
        .build()
        .unwrap();
    fx.loader.load(&second).unwrap();

    let ctl = fs::read_to_string(fx.ctl_dir.path().join("sqlldr.cdr.ctl")).unwrap();
    assert!(ctl.contains("INTO TABLE CDR_TABLE TRUNCATE"));
    assert!(!ctl.contains("xdr_001"));
    let args = fs::read_to_string(fx.ctl_dir.path().join("args.txt")).unwrap();
    assert!(args.starts_with("scott/tiger@ORCL\n"));
}
