//! Configuration file handling
//!
//! A run is driven by one TOML file:
//!
//! ```toml
//! [global]
//! screenlog = true
//! logging_lev = "info"
//! active_flows = ["xdr"]
//! sqlldr_max_error = 10
//!
//! [paths]
//! base_dir = "/srv/flowload"
//!
//! [databases.vqsd]
//! user = "toto"
//! pwd = "poipoi"
//! sid = "VQSD"
//!
//! [flows.xdr]
//! delimiter = "|"
//! file_pattern = '^xdr_\d+$'
//! loadtable = "VQS_LOADTABLE_TDM"
//! database = "vqsd"
//! field_names = "call_id, dt_start, report_date"
//! ```
//!
//! The file is read into raw serde structs first and then validated into
//! [`Config`]. Unknown keys are rejected.

use crate::error::{CliError, Result};
use crate::flow::{FileOrder, Flow, FlowDefinition};
use flowload_common::logging::{LogConfig, LogLevel, LogOutput};
use flowload_loader::{Database, FieldRules, LoaderConfig, DEFAULT_DELIMITER};
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

/// Name of the pid file inside `var_dir`
pub const PID_FILE_NAME: &str = "flowload.pid";

pub const DEFAULT_MAX_INSTANCES: usize = 1;

// ============================================================================
// Raw file layout
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    global: RawGlobal,
    #[serde(default)]
    paths: RawPaths,
    #[serde(default)]
    fields: FieldRules,
    #[serde(default)]
    databases: BTreeMap<String, RawDatabase>,
    #[serde(default)]
    flows: BTreeMap<String, RawFlow>,
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawGlobal {
    devmode: bool,
    screenlog: bool,
    logging_lev: Option<String>,
    active_flows: NameList,
    sqlldr_max_error: u64,
    max_instances: usize,
    stop_on_critical: bool,
}

impl Default for RawGlobal {
    fn default() -> Self {
        Self {
            devmode: false,
            screenlog: false,
            logging_lev: None,
            active_flows: NameList::default(),
            sqlldr_max_error: 0,
            max_instances: DEFAULT_MAX_INSTANCES,
            stop_on_critical: false,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawPaths {
    base_dir: Option<PathBuf>,
    log_dir: Option<PathBuf>,
    var_dir: Option<PathBuf>,
    data_dir: Option<PathBuf>,
    sqlldr_bin: Option<PathBuf>,
    sqlldr_log_dir: Option<PathBuf>,
    sqlldr_ctl_dir: Option<PathBuf>,
    sqlldr_backup_dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawDatabase {
    user: String,
    pwd: String,
    sid: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawFlow {
    delimiter: Option<String>,
    file_pattern: String,
    loadtable: String,
    database: String,
    field_names: NameList,
    input_folder: Option<PathBuf>,
    #[serde(default)]
    sort: FileOrder,
}

/// A list of names, written either as a TOML array or as `"a, b, c"`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum NameList {
    List(Vec<String>),
    Csv(String),
}

impl Default for NameList {
    fn default() -> Self {
        NameList::List(Vec::new())
    }
}

impl NameList {
    fn into_names(self) -> Vec<String> {
        let names = match self {
            NameList::List(names) => names,
            NameList::Csv(text) => text.split(',').map(str::to_string).collect(),
        };

        names
            .into_iter()
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .collect()
    }
}

// ============================================================================
// Validated configuration
// ============================================================================

/// Run-wide switches from `[global]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalConfig {
    /// Take the pid file even when other instances are alive
    pub devmode: bool,
    /// Log to the console as well as to the log file
    pub screenlog: bool,
    pub logging_lev: LogLevel,
    /// Flow names in processing order
    pub active_flows: Vec<String>,
    pub sqlldr_max_error: u64,
    pub max_instances: usize,
    pub stop_on_critical: bool,
}

/// Resolved absolute locations from `[paths]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathsConfig {
    pub base_dir: PathBuf,
    pub log_dir: PathBuf,
    pub var_dir: PathBuf,
    pub data_dir: PathBuf,
    pub sqlldr_bin: PathBuf,
    pub sqlldr_log_dir: PathBuf,
    pub sqlldr_ctl_dir: PathBuf,
    pub sqlldr_backup_dir: PathBuf,
    pub pid_file: PathBuf,
}

impl PathsConfig {
    fn resolve(raw: RawPaths, config_file: &Path) -> Self {
        let config_dir = config_file.parent().unwrap_or(Path::new("."));
        let default_base = config_dir.parent().unwrap_or(config_dir).to_path_buf();

        let base_dir = match raw.base_dir {
            Some(dir) if dir.is_absolute() => dir,
            Some(dir) => config_dir.join(dir),
            None => default_base,
        };

        let under_base = |value: Option<PathBuf>, default: &str| match value {
            Some(path) if path.is_absolute() => path,
            Some(path) => base_dir.join(path),
            None => base_dir.join(default),
        };

        let log_dir = under_base(raw.log_dir, "log");
        let var_dir = under_base(raw.var_dir, "var");
        let data_dir = under_base(raw.data_dir, "data");
        let sqlldr_bin = under_base(raw.sqlldr_bin, "venv/orahome/sqlldr");
        let sqlldr_log_dir = under_base(raw.sqlldr_log_dir, "log");
        let sqlldr_ctl_dir = under_base(raw.sqlldr_ctl_dir, "var");
        let sqlldr_backup_dir = under_base(raw.sqlldr_backup_dir, "sqlldr");
        let pid_file = var_dir.join(PID_FILE_NAME);

        Self {
            base_dir,
            log_dir,
            var_dir,
            data_dir,
            sqlldr_bin,
            sqlldr_log_dir,
            sqlldr_ctl_dir,
            sqlldr_backup_dir,
            pid_file,
        }
    }

    /// Directories a run writes into
    pub fn work_dirs(&self) -> [&Path; 4] {
        [
            &self.var_dir,
            &self.sqlldr_log_dir,
            &self.sqlldr_ctl_dir,
            &self.sqlldr_backup_dir,
        ]
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub config_file: PathBuf,
    pub global: GlobalConfig,
    pub paths: PathsConfig,
    pub field_rules: FieldRules,
    pub databases: BTreeMap<String, Database>,
    /// Active flows in processing order
    pub flows: Vec<Flow>,
    /// Problems that did not stop loading (skipped flows); logged once
    /// logging is up
    pub warnings: Vec<String>,
}

impl Config {
    /// Read and validate a config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(CliError::FileNotFound(path.display().to_string()));
        }

        let content = std::fs::read_to_string(path)?;
        let path = std::path::absolute(path)?;
        Self::parse(&content, &path)
    }

    /// Validate `content` as if it were read from `config_file`
    pub fn parse(content: &str, config_file: &Path) -> Result<Self> {
        let raw: RawConfig = toml::from_str(content)?;
        let mut warnings = Vec::new();

        let global = validate_global(raw.global)?;
        let paths = PathsConfig::resolve(raw.paths, config_file);

        let mut databases = BTreeMap::new();
        for (name, db) in raw.databases {
            let database = Database::new(&name, db.user, db.pwd, db.sid)?;
            databases.insert(name, database);
        }

        let mut raw_flows = raw.flows;
        let mut flows = Vec::new();
        let mut seen = HashSet::new();

        for name in &global.active_flows {
            if !seen.insert(name.as_str()) {
                warnings.push(format!("flow '{}' listed twice in active_flows, loading it once", name));
                continue;
            }

            let Some(raw_flow) = raw_flows.remove(name) else {
                warnings.push(format!("flow '{}' has no [flows.{}] section, skipping", name, name));
                continue;
            };

            let Some(database) = databases.get(&raw_flow.database) else {
                warnings.push(format!(
                    "flow '{}' uses undefined database '{}', skipping",
                    name, raw_flow.database
                ));
                continue;
            };

            flows.push(build_flow(name, raw_flow, database.clone(), &paths)?);
        }

        if global.active_flows.is_empty() {
            warnings.push("no active flows configured, nothing to load".to_string());
        }

        Ok(Self {
            config_file: config_file.to_path_buf(),
            global,
            paths,
            field_rules: raw.fields,
            databases,
            flows,
            warnings,
        })
    }

    /// Fixed settings for the loader
    pub fn loader_config(&self) -> LoaderConfig {
        LoaderConfig::new(
            &self.paths.sqlldr_bin,
            &self.paths.sqlldr_log_dir,
            &self.paths.sqlldr_ctl_dir,
            &self.paths.sqlldr_backup_dir,
        )
        .with_max_error_count(self.global.sqlldr_max_error)
        .with_field_rules(self.field_rules.clone())
    }

    /// Logging setup for this run; `verbose` forces debug output on the console
    pub fn log_config(&self, verbose: bool) -> LogConfig {
        let output = if self.global.screenlog || verbose {
            LogOutput::Both
        } else {
            LogOutput::File
        };
        let level = if verbose {
            LogLevel::Debug
        } else {
            self.global.logging_lev
        };

        LogConfig::builder()
            .level(level)
            .output(output)
            .log_dir(&self.paths.log_dir)
            .build()
    }
}

fn validate_global(raw: RawGlobal) -> Result<GlobalConfig> {
    let logging_lev = match raw.logging_lev {
        Some(level) => level
            .parse()
            .map_err(|_| CliError::config(format!("[global] logging_lev: unknown level '{}'", level)))?,
        None => LogLevel::default(),
    };

    if raw.max_instances == 0 {
        return Err(CliError::config("[global] max_instances must be at least 1"));
    }

    Ok(GlobalConfig {
        devmode: raw.devmode,
        screenlog: raw.screenlog,
        logging_lev,
        active_flows: raw.active_flows.into_names(),
        sqlldr_max_error: raw.sqlldr_max_error,
        max_instances: raw.max_instances,
        stop_on_critical: raw.stop_on_critical,
    })
}

fn build_flow(name: &str, raw: RawFlow, database: Database, paths: &PathsConfig) -> Result<Flow> {
    let delimiter = match raw.delimiter {
        None => DEFAULT_DELIMITER,
        Some(text) => {
            let mut chars = text.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => c,
                _ => {
                    return Err(CliError::config(format!(
                        "flow '{}': delimiter must be a single character, got '{}'",
                        name, text
                    )))
                }
            }
        }
    };

    let input_folder = match raw.input_folder {
        Some(dir) if dir.is_absolute() => dir,
        Some(dir) => paths.base_dir.join(dir),
        None => paths.data_dir.clone(),
    };

    Flow::new(FlowDefinition {
        name: name.to_string(),
        delimiter,
        input_folder,
        file_pattern: raw.file_pattern,
        loadtable: raw.loadtable,
        database,
        field_names: raw.field_names.into_names(),
        sort: raw.sort,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    const FULL: &str = r#"
[global]
devmode = false
screenlog = true
logging_lev = "WARNING"
active_flows = ["xdr", "cdr"]
sqlldr_max_error = 10

[paths]
base_dir = "/srv/flowload"
data_dir = "/data/in"
sqlldr_bin = "/opt/oracle/bin/sqlldr"

[databases.vqsd]
user = "toto"
pwd = "poipoi"
sid = "VQSD"

[flows.xdr]
delimiter = "|"
file_pattern = '^xdr_\d+$'
loadtable = "VQS_LOADTABLE_TDM"
database = "vqsd"
field_names = "call_id, dt_start , report_date"

[flows.cdr]
file_pattern = "^cdr_"
loadtable = "CDR"
database = "vqsd"
field_names = ["id", "msisdn"]
input_folder = "incoming/cdr"
sort = "modified"
"#;

    fn parse(content: &str) -> Result<Config> {
        Config::parse(content, Path::new("/srv/flowload/etc/flowload.toml"))
    }

    #[test]
    fn test_full_config() {
        let config = parse(FULL).unwrap();

        assert!(config.global.screenlog);
        assert_eq!(config.global.logging_lev, LogLevel::Warn);
        assert_eq!(config.global.sqlldr_max_error, 10);
        assert_eq!(config.global.max_instances, 1);
        assert!(config.warnings.is_empty());

        let names: Vec<&str> = config.flows.iter().map(|f| f.name()).collect();
        assert_eq!(names, vec!["xdr", "cdr"]);

        let xdr = &config.flows[0];
        assert_eq!(xdr.field_names(), &["call_id", "dt_start", "report_date"]);
        assert_eq!(xdr.input_folder(), Path::new("/data/in"));

        let cdr = &config.flows[1];
        assert_eq!(cdr.input_folder(), Path::new("/srv/flowload/incoming/cdr"));
        assert_eq!(cdr.database().connect_string(), "toto/poipoi@VQSD");
    }

    #[test]
    fn test_path_defaults_follow_config_location() {
        let config = parse("[global]\nactive_flows = []\n").unwrap();
        let paths = &config.paths;

        assert_eq!(paths.base_dir, PathBuf::from("/srv/flowload"));
        assert_eq!(paths.log_dir, PathBuf::from("/srv/flowload/log"));
        assert_eq!(paths.sqlldr_bin, PathBuf::from("/srv/flowload/venv/orahome/sqlldr"));
        assert_eq!(paths.sqlldr_ctl_dir, PathBuf::from("/srv/flowload/var"));
        assert_eq!(paths.sqlldr_backup_dir, PathBuf::from("/srv/flowload/sqlldr"));
        assert_eq!(paths.pid_file, PathBuf::from("/srv/flowload/var/flowload.pid"));
        assert_eq!(config.warnings.len(), 1);
    }

    #[test]
    fn test_loader_and_log_config() {
        let config = parse(FULL).unwrap();

        let loader = config.loader_config();
        assert_eq!(loader.sqlldr_bin, PathBuf::from("/opt/oracle/bin/sqlldr"));
        assert_eq!(loader.max_error_count, 10);
        assert_eq!(loader.log_dir, PathBuf::from("/srv/flowload/log"));

        let log = config.log_config(false);
        assert_eq!(log.output, LogOutput::Both);
        assert_eq!(log.level, LogLevel::Warn);
        assert_eq!(config.log_config(true).level, LogLevel::Debug);
    }

    #[test]
    fn test_missing_flow_and_database_are_skipped() {
        let content = FULL
            .replace(r#"active_flows = ["xdr", "cdr"]"#, r#"active_flows = "xdr, ghost, cdr""#)
            .replace("database = \"vqsd\"\nfield_names = [", "database = \"nope\"\nfield_names = [");
        let config = parse(&content).unwrap();

        let names: Vec<&str> = config.flows.iter().map(|f| f.name()).collect();
        assert_eq!(names, vec!["xdr"]);
        assert_eq!(config.warnings.len(), 2);
        assert!(config.warnings[0].contains("ghost"));
        assert!(config.warnings[1].contains("'nope'"));
    }

    #[test]
    fn test_invalid_values_are_errors() {
        let bad_regex = FULL.replace(r#"'^xdr_\d+$'"#, "'xdr_('");
        assert!(matches!(parse(&bad_regex), Err(CliError::Config(_))));

        let bad_delimiter = FULL.replace(r#"delimiter = "|""#, r#"delimiter = "||""#);
        assert!(matches!(parse(&bad_delimiter), Err(CliError::Config(_))));

        let no_fields = FULL.replace(r#""call_id, dt_start , report_date""#, r#"" , ""#);
        assert!(matches!(parse(&no_fields), Err(CliError::Config(_))));

        let no_pwd = FULL.replace(r#"pwd = "poipoi""#, r#"pwd = """#);
        assert!(matches!(parse(&no_pwd), Err(CliError::Loader(_))));

        let bad_level = FULL.replace(r#""WARNING""#, r#""loud""#);
        assert!(matches!(parse(&bad_level), Err(CliError::Config(_))));
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let content = FULL.replace("sqlldr_max_error = 10", "sqlldr_max_error = 10\nnum_error = 3");
        assert!(matches!(parse(&content), Err(CliError::TomlParse(_))));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, CliError::FileNotFound(_)));
    }
}
