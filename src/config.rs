//! Configuration management and validation.
//!
//! Provides the user configuration (where data lives and which directory
//! layout each project uses), the developer configuration (per-project
//! path templates) and the combined [`Config`] value that is passed
//! explicitly into the locator and fix dispatcher.

use crate::constants::{DEFAULT_KEY, FX_ENSEMBLE, FX_FREQUENCY};
use crate::error::{DrsError, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// A path template: one string, or structure name to string
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathTemplate {
    Single(String),
    ByStructure(BTreeMap<String, String>),
}

impl From<&str> for PathTemplate {
    fn from(template: &str) -> Self {
        PathTemplate::Single(template.to_string())
    }
}

/// Which template of a project to select
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Dir,
    File,
}

impl InputKind {
    pub fn key(&self) -> &'static str {
        match self {
            InputKind::Dir => "input_dir",
            InputKind::File => "input_file",
        }
    }
}

/// Path templates and tables of one project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub input_dir: PathTemplate,
    pub input_file: PathTemplate,
    pub output_file: String,
    #[serde(default)]
    pub cmor_table: Option<String>,
}

impl ProjectConfig {
    pub fn template(&self, kind: InputKind) -> &PathTemplate {
        match kind {
            InputKind::Dir => &self.input_dir,
            InputKind::File => &self.input_file,
        }
    }
}

/// Project and frequency combination whose files carry a fixed ensemble
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeInvariantRule {
    pub project: String,
    pub frequency: String,
    pub ensemble: String,
}

fn default_time_invariant_rules() -> Vec<TimeInvariantRule> {
    vec![TimeInvariantRule {
        project: "CMIP5".to_string(),
        frequency: FX_FREQUENCY.to_string(),
        ensemble: FX_ENSEMBLE.to_string(),
    }]
}

/// Settings supplied by the user
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UserConfig {
    /// Project name (or `default`) to one or more base paths
    #[serde(deserialize_with = "deserialize_rootpath")]
    pub rootpath: BTreeMap<String, Vec<PathBuf>>,

    /// Project name to directory structure name
    pub drs: BTreeMap<String, String>,

    /// Directory for preprocessed output
    pub output_dir: PathBuf,

    /// Use NetCDF internal compression
    pub compress_netcdf: bool,

    /// Write NCL settings files next to metadata sidecars
    pub write_ncl_interface: bool,

    /// Merge new output into already existing files
    pub concatenate_output: bool,

    /// Directory holding `<tag>.bibtex` reference entries
    pub references_path: Option<PathBuf>,

    /// Skip network lookups when writing citations
    pub offline: bool,
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            rootpath: BTreeMap::new(),
            drs: BTreeMap::new(),
            output_dir: PathBuf::from("output"),
            compress_netcdf: false,
            write_ncl_interface: false,
            concatenate_output: false,
            references_path: None,
            offline: false,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawRootPath {
    One(String),
    Many(Vec<String>),
}

fn deserialize_rootpath<'de, D>(
    deserializer: D,
) -> std::result::Result<BTreeMap<String, Vec<PathBuf>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = BTreeMap::<String, RawRootPath>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .map(|(project, paths)| {
            let paths = match paths {
                RawRootPath::One(path) => vec![expand_home(&path)],
                RawRootPath::Many(paths) => paths.iter().map(|p| expand_home(p)).collect(),
            };
            (project, paths)
        })
        .collect())
}

/// Expand a leading `~` to the user's home directory
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    } else if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}

/// Global configuration for DRS processing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub user: UserConfig,

    /// Per-project templates
    pub projects: BTreeMap<String, ProjectConfig>,

    /// Time-invariant ensemble overrides
    #[serde(default = "default_time_invariant_rules")]
    pub time_invariant: Vec<TimeInvariantRule>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            user: UserConfig::default(),
            projects: default_projects(),
            time_invariant: default_time_invariant_rules(),
        }
    }
}

fn default_projects() -> BTreeMap<String, ProjectConfig> {
    let mut projects = BTreeMap::new();

    let mut cmip6_dirs = BTreeMap::new();
    cmip6_dirs.insert(DEFAULT_KEY.to_string(), "/".to_string());
    cmip6_dirs.insert(
        "BADC".to_string(),
        "{activity}/{institute}/{dataset}/{exp}/{ensemble}/{mip}/{short_name}/{grid}/{latestversion}"
            .to_string(),
    );
    cmip6_dirs.insert(
        "DKRZ".to_string(),
        "{activity}/{institute}/{dataset}/{exp}/{ensemble}/{mip}/{short_name}/{grid}/{latestversion}"
            .to_string(),
    );
    cmip6_dirs.insert(
        "ETHZ".to_string(),
        "{exp}/{mip}/{short_name}/{dataset}/{ensemble}/{grid}/".to_string(),
    );
    projects.insert(
        "CMIP6".to_string(),
        ProjectConfig {
            input_dir: PathTemplate::ByStructure(cmip6_dirs),
            input_file: "{short_name}_{mip}_{dataset}_{exp}_{ensemble}_{grid}*.nc".into(),
            output_file: "{project}_{dataset}_{mip}_{exp}_{ensemble}_{short_name}".to_string(),
            cmor_table: Some("CMIP6".to_string()),
        },
    );

    let mut cmip5_dirs = BTreeMap::new();
    cmip5_dirs.insert(DEFAULT_KEY.to_string(), "/".to_string());
    cmip5_dirs.insert(
        "BADC".to_string(),
        "{institute}/{dataset}/{exp}/{frequency}/{modeling_realm}/{mip}/{ensemble}/latest/{short_name}"
            .to_string(),
    );
    cmip5_dirs.insert(
        "DKRZ".to_string(),
        "{institute}/{dataset}/{exp}/{frequency}/{modeling_realm}/{mip}/{ensemble}/{latestversion}/{short_name}"
            .to_string(),
    );
    cmip5_dirs.insert(
        "ETHZ".to_string(),
        "{exp}/{mip}/{short_name}/{dataset}/{ensemble}/".to_string(),
    );
    projects.insert(
        "CMIP5".to_string(),
        ProjectConfig {
            input_dir: PathTemplate::ByStructure(cmip5_dirs),
            input_file: "{short_name}_{mip}_{dataset}_{exp}_{ensemble}*.nc".into(),
            output_file: "{project}_{dataset}_{mip}_{exp}_{ensemble}_{short_name}".to_string(),
            cmor_table: Some("CMIP5".to_string()),
        },
    );

    projects.insert(
        "OBS".to_string(),
        ProjectConfig {
            input_dir: "Tier{tier}/{dataset}".into(),
            input_file: "{project}_{dataset}_{type}_{version}_{mip}_{short_name}[_.]*nc".into(),
            output_file: "{project}_{dataset}_{type}_{version}_{mip}_{short_name}".to_string(),
            cmor_table: Some("CMIP5".to_string()),
        },
    );

    projects
}

impl Config {
    /// Load configuration from a user config file, falling back to defaults
    /// for anything the file does not set
    pub fn load(user_config: Option<&Path>) -> Result<Self> {
        let mut config = Config::default();

        let path = match user_config {
            Some(path) => Some(path.to_path_buf()),
            None => Self::default_config_path().filter(|p| p.exists()),
        };

        if let Some(path) = path {
            info!("Loading user configuration from {}", path.display());
            let text = std::fs::read_to_string(&path)?;
            config.user = serde_yaml::from_str(&text)?;
        } else {
            debug!("No user configuration file found, using defaults");
        }

        Ok(config)
    }

    /// Replace project templates with those from a developer config file
    pub fn with_developer_config(mut self, path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let projects: BTreeMap<String, ProjectConfig> = serde_yaml::from_str(&text)?;
        debug!(
            "Loaded {} project definitions from {}",
            projects.len(),
            path.display()
        );
        self.projects.extend(projects);
        Ok(self)
    }

    /// Default location of the user configuration file
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("drs-processor").join("config-user.yml"))
    }

    /// Set the base paths of a project
    pub fn with_rootpath(mut self, project: &str, paths: Vec<PathBuf>) -> Self {
        self.user.rootpath.insert(project.to_string(), paths);
        self
    }

    /// Select a directory structure for a project
    pub fn with_drs(mut self, project: &str, structure: &str) -> Self {
        self.user
            .drs
            .insert(project.to_string(), structure.to_string());
        self
    }

    /// Register or replace a project's templates
    pub fn with_project(mut self, project: &str, project_config: ProjectConfig) -> Self {
        self.projects.insert(project.to_string(), project_config);
        self
    }

    /// Enable concatenation of new output onto existing files
    pub fn with_concatenate_output(mut self) -> Self {
        self.user.concatenate_output = true;
        self
    }

    /// Directory of `<tag>.bibtex` reference files
    pub fn with_references_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.user.references_path = Some(path.into());
        self
    }

    /// Disable network citation lookups
    pub fn with_offline(mut self) -> Self {
        self.user.offline = true;
        self
    }

    /// Base paths for a project, else the `default` entry
    pub fn rootpath(&self, project: &str) -> Result<&[PathBuf]> {
        self.user
            .rootpath
            .get(project)
            .or_else(|| self.user.rootpath.get(DEFAULT_KEY))
            .map(Vec::as_slice)
            .ok_or_else(|| {
                DrsError::configuration(
                    project,
                    "default rootpath must be specified in the user configuration",
                )
            })
    }

    /// Templates of a project
    pub fn project(&self, project: &str) -> Result<&ProjectConfig> {
        self.projects.get(project).ok_or_else(|| {
            DrsError::configuration(project, "project is not defined in the developer configuration")
        })
    }

    /// Select the directory or filename template of a project
    ///
    /// A single template is used directly; a structured template requires
    /// the user's structure choice (or `default`) to be one of its keys.
    pub fn select_drs(&self, kind: InputKind, project: &str) -> Result<&str> {
        match self.project(project)?.template(kind) {
            PathTemplate::Single(template) => Ok(template),
            PathTemplate::ByStructure(templates) => {
                let structure = self
                    .user
                    .drs
                    .get(project)
                    .map(String::as_str)
                    .unwrap_or(DEFAULT_KEY);
                templates.get(structure).map(String::as_str).ok_or_else(|| {
                    DrsError::configuration(
                        project,
                        format!(
                            "drs {} for {} not specified in the developer configuration",
                            structure,
                            kind.key()
                        ),
                    )
                })
            }
        }
    }

    /// Fixed ensemble value for a time-invariant project/frequency pair
    pub fn time_invariant_ensemble(&self, project: &str, frequency: &str) -> Option<&str> {
        self.time_invariant
            .iter()
            .find(|rule| rule.project == project && rule.frequency == frequency)
            .map(|rule| rule.ensemble.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rootpath_falls_back_to_default() {
        let config = Config::default().with_rootpath("default", vec![PathBuf::from("/data")]);
        assert_eq!(config.rootpath("CMIP6").unwrap(), &[PathBuf::from("/data")]);
    }

    #[test]
    fn test_rootpath_missing_is_configuration_error() {
        let config = Config::default().with_rootpath("CMIP5", vec![PathBuf::from("/cmip5")]);
        match config.rootpath("CMIP6").unwrap_err() {
            DrsError::Configuration { project, .. } => assert_eq!(project, "CMIP6"),
            other => panic!("Expected Configuration error, got {:?}", other),
        }
    }

    #[test]
    fn test_select_drs_structured_and_single() {
        let config = Config::default().with_drs("CMIP5", "ETHZ");
        assert_eq!(
            config.select_drs(InputKind::Dir, "CMIP5").unwrap(),
            "{exp}/{mip}/{short_name}/{dataset}/{ensemble}/"
        );
        assert_eq!(
            config.select_drs(InputKind::File, "CMIP5").unwrap(),
            "{short_name}_{mip}_{dataset}_{exp}_{ensemble}*.nc"
        );
        // No drs entry selects the default structure
        assert_eq!(config.select_drs(InputKind::Dir, "CMIP6").unwrap(), "/");
    }

    #[test]
    fn test_select_drs_unknown_structure() {
        let config = Config::default().with_drs("CMIP6", "NOWHERE");
        let err = config.select_drs(InputKind::Dir, "CMIP6").unwrap_err();
        assert!(err.to_string().contains("NOWHERE"));
    }

    #[test]
    fn test_user_config_from_yaml() {
        let yaml = "rootpath:\n  CMIP5: [/a, /b]\n  default: /c\ndrs:\n  CMIP5: DKRZ\nconcatenate_output: true\n";
        let user: UserConfig = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(
            user.rootpath["CMIP5"],
            vec![PathBuf::from("/a"), PathBuf::from("/b")]
        );
        assert_eq!(user.rootpath["default"], vec![PathBuf::from("/c")]);
        assert_eq!(user.drs["CMIP5"], "DKRZ");
        assert!(user.concatenate_output);
        assert!(!user.offline);
    }

    #[test]
    fn test_time_invariant_ensemble() {
        let config = Config::default();
        assert_eq!(config.time_invariant_ensemble("CMIP5", "fx"), Some("r0i0p0"));
        assert_eq!(config.time_invariant_ensemble("CMIP6", "fx"), None);
        assert_eq!(config.time_invariant_ensemble("CMIP5", "mon"), None);
    }
}
