//! Flows: a directory of matching files loaded into one table
//!
//! A [`Flow`] is built once from configuration. Each run re-scans its input
//! folder with [`Flow::list_files`]; the cached list is handed to the loader
//! by [`Flow::load`] and dropped afterwards.

use crate::error::{CliError, Result};
use flowload_common::LoadError;
use flowload_loader::{Database, LoadJob, LoadReport, Loader, LoaderError};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::info;

/// Order in which matched files are loaded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileOrder {
    /// Lexicographic by path
    #[default]
    Name,
    /// Oldest modification time first, ties by path
    Modified,
}

/// Everything needed to build a [`Flow`]
#[derive(Debug, Clone)]
pub struct FlowDefinition {
    pub name: String,
    pub delimiter: char,
    pub input_folder: PathBuf,
    pub file_pattern: String,
    pub loadtable: String,
    pub database: Database,
    pub field_names: Vec<String>,
    pub sort: FileOrder,
}

#[derive(Debug, Clone)]
pub struct Flow {
    name: String,
    delimiter: char,
    input_folder: PathBuf,
    file_pattern: Regex,
    loadtable: String,
    database: Database,
    field_names: Vec<String>,
    sort: FileOrder,
    files: Vec<PathBuf>,
}

impl Flow {
    pub fn new(def: FlowDefinition) -> Result<Self> {
        let file_pattern = Regex::new(&def.file_pattern).map_err(|e| {
            CliError::config(format!(
                "flow '{}': invalid file_pattern '{}': {}",
                def.name, def.file_pattern, e
            ))
        })?;

        if def.field_names.is_empty() {
            return Err(CliError::config(format!(
                "flow '{}': field_names cannot be empty",
                def.name
            )));
        }

        if def.loadtable.trim().is_empty() {
            return Err(CliError::config(format!(
                "flow '{}': loadtable cannot be empty",
                def.name
            )));
        }

        Ok(Self {
            name: def.name,
            delimiter: def.delimiter,
            input_folder: def.input_folder,
            file_pattern,
            loadtable: def.loadtable,
            database: def.database,
            field_names: def.field_names,
            sort: def.sort,
            files: Vec::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn input_folder(&self) -> &Path {
        &self.input_folder
    }

    pub fn loadtable(&self) -> &str {
        &self.loadtable
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    pub fn field_names(&self) -> &[String] {
        &self.field_names
    }

    /// Files found by the last scan
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Replace the cached file list with the regular files of the input
    /// folder whose name matches the pattern anywhere.
    pub fn list_files(&mut self) -> std::io::Result<usize> {
        let mut found: Vec<(PathBuf, SystemTime)> = Vec::new();

        for entry in std::fs::read_dir(&self.input_folder)? {
            let entry = entry?;
            let name = entry.file_name();
            if !self.file_pattern.is_match(&name.to_string_lossy()) {
                continue;
            }

            // Follows symlinks; a dangling link is skipped
            let path = entry.path();
            let metadata = match std::fs::metadata(&path) {
                Ok(metadata) => metadata,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e),
            };
            if !metadata.is_file() {
                continue;
            }

            let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
            found.push((path, modified));
        }

        match self.sort {
            FileOrder::Name => found.sort_by(|a, b| a.0.cmp(&b.0)),
            FileOrder::Modified => found.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0))),
        }

        self.files = found.into_iter().map(|(path, _)| path).collect();
        info!("{}: found {} file(s) to load", self.name, self.files.len());

        Ok(self.files.len())
    }

    /// Load job for the currently cached files
    pub fn to_job(&self) -> std::result::Result<LoadJob, LoaderError> {
        LoadJob::builder(&self.name, self.database.clone(), &self.loadtable)
            .delimiter(self.delimiter)
            .field_names(self.field_names.iter().cloned())
            .files(self.files.iter().cloned())
            .build()
    }

    /// Load the cached files with `loader`; the cache is emptied either way
    pub fn load(&mut self, loader: &Loader) -> std::result::Result<LoadReport, LoadError> {
        let job = self.to_job();
        self.files.clear();

        let job = job.map_err(|e| LoadError::critical(&self.name, format!("{}: {}", self.name, e)))?;
        loader.load(&job)
    }
}
