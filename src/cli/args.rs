//! Command-line argument definitions for the DRS processor
//!
//! This module defines the CLI interface using the clap derive API.

use crate::error::{DrsError, Result};
use crate::models::{DatasetDescriptor, TagValue};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::str::FromStr;

/// CLI arguments for the DRS processor
///
/// Locates CMOR-style climate model output laid out by a Data Reference
/// Syntax and merges new output into existing files.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "drs-processor",
    version,
    about = "Locate, date and concatenate DRS-organised climate model output",
    long_about = "Expands the directory and file templates of a project for a dataset \
                  description, resolves versioned directories, reads the years covered by \
                  each file from its name and merges new output into existing files \
                  without ever losing the existing data."
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Locate the input files of a dataset
    Find(FindArgs),
    /// Print the start and end year of files
    Years(YearsArgs),
    /// Merge files into a target file
    Concat(ConcatArgs),
}

/// Options shared by every command
#[derive(Debug, Clone, Parser)]
pub struct CommonArgs {
    /// User configuration file
    ///
    /// Defaults to `<config dir>/drs-processor/config-user.yml` when it exists.
    #[arg(
        short = 'c',
        long = "config",
        value_name = "FILE",
        help = "User configuration file"
    )]
    pub config: Option<PathBuf>,

    /// Developer configuration file with project templates
    #[arg(
        long = "developer-config",
        value_name = "FILE",
        help = "Developer configuration file with project path templates"
    )]
    pub developer_config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(
        short = 'v',
        long = "verbose",
        action = clap::ArgAction::Count,
        help = "Enable verbose logging (-v: info, -vv: debug, -vvv: trace)"
    )]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(
        short = 'q',
        long = "quiet",
        help = "Suppress output except errors",
        conflicts_with = "verbose"
    )]
    pub quiet: bool,
}

impl CommonArgs {
    /// Get the logging level based on verbosity settings
    pub fn get_log_level(&self) -> &'static str {
        if self.quiet {
            "error"
        } else {
            match self.verbose {
                0 => "warn",
                1 => "info",
                2 => "debug",
                _ => "trace",
            }
        }
    }

    /// Check if we should show progress bars (not in quiet mode)
    pub fn show_progress(&self) -> bool {
        !self.quiet
    }
}

/// One `key=value` pair given with `--tag`
#[derive(Debug, Clone, PartialEq)]
pub struct TagAssignment {
    pub key: String,
    pub value: String,
}

impl FromStr for TagAssignment {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (key, value) = s
            .split_once('=')
            .ok_or_else(|| format!("Expected key=value, got '{}'", s))?;
        let key = key.trim();
        if key.is_empty() {
            return Err(format!("Missing tag name in '{}'", s));
        }
        Ok(TagAssignment {
            key: key.to_string(),
            value: value.trim().to_string(),
        })
    }
}

/// Arguments for the find command
#[derive(Debug, Clone, Parser)]
pub struct FindArgs {
    /// Dataset tags
    ///
    /// Repeating a tag turns it into a list, which fans out into one path
    /// per value, e.g. `--tag exp=historical --tag exp=rcp85`.
    #[arg(
        short = 't',
        long = "tag",
        value_name = "KEY=VALUE",
        required = true,
        help = "Dataset tag such as project=CMIP6 (repeat a key for a list)"
    )]
    pub tags: Vec<TagAssignment>,

    /// First year of the requested window
    #[arg(long = "start-year", value_name = "YEAR", requires = "end_year")]
    pub start_year: Option<i32>,

    /// Last year of the requested window
    #[arg(long = "end-year", value_name = "YEAR", requires = "start_year")]
    pub end_year: Option<i32>,

    /// Base paths that replace the configured root paths of the project
    #[arg(
        short = 'r',
        long = "rootpath",
        value_name = "PATH",
        help = "Root path for the project (repeatable, overrides the configuration)"
    )]
    pub rootpath: Vec<PathBuf>,

    /// Directory structure name, e.g. BADC, DKRZ or ETHZ
    #[arg(long = "drs", value_name = "NAME", help = "Directory structure of the project")]
    pub drs: Option<String>,

    #[command(flatten)]
    pub common: CommonArgs,
}

impl FindArgs {
    /// Validate the tag set and the requested window
    pub fn validate(&self) -> Result<()> {
        if !self.tags.iter().any(|t| t.key == "project") {
            return Err(DrsError::MissingTag {
                tag: "project".to_string(),
                descriptor: "command line".to_string(),
            });
        }
        if let (Some(start), Some(end)) = (self.start_year, self.end_year) {
            if start > end {
                return Err(DrsError::configuration(
                    self.project().unwrap_or_default(),
                    format!("start year {} is after end year {}", start, end),
                ));
            }
        }
        Ok(())
    }

    /// Project named by the `project` tag
    pub fn project(&self) -> Option<&str> {
        self.tags
            .iter()
            .find(|t| t.key == "project")
            .map(|t| t.value.as_str())
    }

    /// Descriptor built from the tags and the requested window
    ///
    /// Values of a repeated key are kept in the order given.
    pub fn descriptor(&self) -> DatasetDescriptor {
        let mut grouped: Vec<(String, Vec<String>)> = Vec::new();
        for tag in &self.tags {
            match grouped.iter_mut().find(|(key, _)| *key == tag.key) {
                Some((_, values)) => values.push(tag.value.clone()),
                None => grouped.push((tag.key.clone(), vec![tag.value.clone()])),
            }
        }

        let mut descriptor = DatasetDescriptor::new();
        for (key, mut values) in grouped {
            let value = if values.len() == 1 {
                TagValue::Scalar(values.remove(0))
            } else {
                TagValue::List(values)
            };
            descriptor.set(key, value);
        }
        if let Some(start) = self.start_year {
            descriptor.set("start_year", start);
        }
        if let Some(end) = self.end_year {
            descriptor.set("end_year", end);
        }
        descriptor
    }
}

/// Arguments for the years command
#[derive(Debug, Clone, Parser)]
pub struct YearsArgs {
    /// Files to inspect
    #[arg(value_name = "FILE", required = true)]
    pub files: Vec<PathBuf>,

    #[command(flatten)]
    pub common: CommonArgs,
}

/// Arguments for the concat command
#[derive(Debug, Clone, Parser)]
pub struct ConcatArgs {
    /// Files whose cubes are merged into the target, in order
    #[arg(value_name = "INPUT", required = true)]
    pub inputs: Vec<PathBuf>,

    /// File the inputs are merged into; created when missing
    #[arg(short = 'o', long = "target", value_name = "FILE")]
    pub target: PathBuf,

    /// Use NetCDF internal compression
    #[arg(long = "compress", help = "Compress the written file")]
    pub compress: bool,

    /// Access pattern the file layout is optimised for
    ///
    /// `map`, `timeseries` or space-separated coordinate names.
    #[arg(long = "optimize-access", value_name = "PATTERN")]
    pub optimize_access: Option<String>,

    #[command(flatten)]
    pub common: CommonArgs,
}
