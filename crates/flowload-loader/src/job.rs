//! Per-cycle load inputs
//!
//! A [`LoadJob`] carries everything that changes from one flow to the next.
//! The [`crate::Loader`] itself only holds fixed paths and limits, so nothing
//! from a previous flow can leak into the next cycle.

use crate::database::Database;
use crate::error::{LoaderError, Result};
use std::path::{Path, PathBuf};

/// Default field separator when a job does not set one
pub const DEFAULT_DELIMITER: char = ';';

/// One load cycle: which files go into which table, and how
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadJob {
    suffix: String,
    database: Database,
    delimiter: char,
    loadtable: String,
    field_names: Vec<String>,
    files: Vec<PathBuf>,
}

impl LoadJob {
    /// Start a job for `suffix` (usually the flow name)
    pub fn builder(
        suffix: impl Into<String>,
        database: Database,
        loadtable: impl Into<String>,
    ) -> LoadJobBuilder {
        LoadJobBuilder {
            suffix: suffix.into(),
            database,
            delimiter: DEFAULT_DELIMITER,
            loadtable: loadtable.into(),
            field_names: Vec::new(),
            files: Vec::new(),
        }
    }

    /// Identifies the cycle in messages and in the control/log file names
    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    pub fn delimiter(&self) -> char {
        self.delimiter
    }

    pub fn loadtable(&self) -> &str {
        &self.loadtable
    }

    pub fn field_names(&self) -> &[String] {
        &self.field_names
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// `<ctl_dir>/sqlldr.<suffix>.ctl`
    pub fn ctl_file(&self, ctl_dir: &Path) -> PathBuf {
        ctl_dir.join(format!("sqlldr.{}.ctl", self.suffix))
    }

    /// `<log_dir>/sqlldr.<suffix>.log`
    pub fn log_file(&self, log_dir: &Path) -> PathBuf {
        log_dir.join(format!("sqlldr.{}.log", self.suffix))
    }
}

/// Builder for LoadJob
#[derive(Debug, Clone)]
pub struct LoadJobBuilder {
    suffix: String,
    database: Database,
    delimiter: char,
    loadtable: String,
    field_names: Vec<String>,
    files: Vec<PathBuf>,
}

impl LoadJobBuilder {
    pub fn delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Field names in input-column order
    pub fn field_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.field_names = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn add_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.files.push(path.into());
        self
    }

    /// Append files, keeping their order
    pub fn files<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.files.extend(paths.into_iter().map(Into::into));
        self
    }

    pub fn build(self) -> Result<LoadJob> {
        if self.suffix.is_empty() {
            return Err(LoaderError::invalid_job(&self.suffix, "suffix cannot be empty"));
        }

        // The suffix ends up in file names
        if self.suffix.contains(|c: char| c == '/' || c == '\\') {
            return Err(LoaderError::invalid_job(
                &self.suffix,
                "suffix cannot contain path separators",
            ));
        }

        if self.loadtable.trim().is_empty() {
            return Err(LoaderError::invalid_job(&self.suffix, "load table cannot be empty"));
        }

        if self.field_names.is_empty() {
            return Err(LoaderError::invalid_job(&self.suffix, "field list cannot be empty"));
        }

        if let Some(blank) = self.field_names.iter().position(|f| f.trim().is_empty()) {
            return Err(LoaderError::invalid_job(
                &self.suffix,
                format!("field #{} has an empty name", blank + 1),
            ));
        }

        // Paths are written verbatim between double quotes in the control file
        for file in &self.files {
            match file.to_str() {
                None => {
                    return Err(LoaderError::invalid_job(
                        &self.suffix,
                        format!("input file {} is not valid UTF-8", file.display()),
                    ))
                }
                Some(path) if path.contains(|c: char| c == '"' || c == '\n' || c == '\r') => {
                    return Err(LoaderError::invalid_job(
                        &self.suffix,
                        format!("input file {:?} contains a quote or line break", path),
                    ))
                }
                Some(_) => {}
            }
        }

        Ok(LoadJob {
            suffix: self.suffix,
            database: self.database,
            delimiter: self.delimiter,
            loadtable: self.loadtable,
            field_names: self.field_names,
            files: self.files,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn db() -> Database {
        Database::new("vqsd", "toto", "poipoi", "VQSD").unwrap()
    }

    #[test]
    fn test_builder_defaults_and_paths() {
        let job = LoadJob::builder("xdr", db(), "VQS_LOADTABLE_TDM")
            .field_names(["a", "b"])
            .add_file("/data/xdr_1")
            .files(["/data/xdr_2", "/data/xdr_3"])
            .build()
            .unwrap();

        assert_eq!(job.delimiter(), DEFAULT_DELIMITER);
        assert_eq!(job.files().len(), 3);
        assert_eq!(job.files()[0], PathBuf::from("/data/xdr_1"));
        assert_eq!(
            job.ctl_file(Path::new("/srv/var")),
            PathBuf::from("/srv/var/sqlldr.xdr.ctl")
        );
        assert_eq!(
            job.log_file(Path::new("/srv/log")),
            PathBuf::from("/srv/log/sqlldr.xdr.log")
        );
    }

    #[test]
    fn test_builder_validation() {
        assert!(LoadJob::builder("xdr", db(), "T").build().is_err());
        assert!(LoadJob::builder("", db(), "T").field_names(["a"]).build().is_err());
        assert!(LoadJob::builder("a/b", db(), "T").field_names(["a"]).build().is_err());
        assert!(LoadJob::builder("xdr", db(), " ").field_names(["a"]).build().is_err());
        assert!(LoadJob::builder("xdr", db(), "T").field_names(["a", ""]).build().is_err());
    }

    #[test]
    fn test_builder_rejects_unquotable_paths() {
        let build = |file: PathBuf| {
            LoadJob::builder("xdr", db(), "T")
                .field_names(["a"])
                .add_file(file)
                .build()
        };

        assert!(matches!(
            build(PathBuf::from("/data/xdr\"1\"")),
            Err(LoaderError::InvalidJob { .. })
        ));
        assert!(build(PathBuf::from("/data/xdr\n1")).is_err());
        assert!(build(PathBuf::from("/data/xdr 1")).is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn test_builder_rejects_non_utf8_paths() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let file = Path::new("/data").join(OsStr::from_bytes(b"xdr_\xff"));
        let err = LoadJob::builder("xdr", db(), "T")
            .field_names(["a"])
            .add_file(file)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("not valid UTF-8"));
    }
}
