//! Directory and file location from project templates

use super::selection::select_files;
use super::tags::replace_tags;
use super::version::resolve_latest_version;
use crate::app::adapters::cube_store::CubeStore;
use crate::app::adapters::filesystem::FileSystem;
use crate::config::{Config, InputKind};
use crate::constants::FX_FREQUENCY;
use crate::error::{DrsError, Result};
use crate::models::{DatasetDescriptor, FileRecord, TagValue};
use glob::{MatchOptions, Pattern};
use std::path::{Path, PathBuf};
use tracing::debug;

const FNMATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

fn required_tag<'a>(descriptor: &'a DatasetDescriptor, tag: &str) -> Result<&'a str> {
    descriptor.get_str(tag).ok_or_else(|| DrsError::MissingTag {
        tag: tag.to_string(),
        descriptor: descriptor.to_string(),
    })
}

/// Files in `dirs` (searched recursively, through symbolic links) whose
/// names match any of the shell-style `patterns`
pub fn find_files(fs: &dyn FileSystem, dirs: &[PathBuf], patterns: &[String]) -> Result<Vec<PathBuf>> {
    debug!("Looking for files matching {:?} in {:?}", patterns, dirs);

    let compiled = patterns
        .iter()
        .map(|p| Pattern::new(p))
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut result = Vec::new();
    for dir in dirs {
        for entry in fs.walk(dir)? {
            for pattern in &compiled {
                result.extend(
                    entry
                        .files
                        .iter()
                        .filter(|name| pattern.matches_with(name, FNMATCH_OPTIONS))
                        .map(|name| entry.dir.join(name)),
                );
            }
        }
    }
    Ok(result)
}

/// Output path of a multi-model statistic
///
/// `<preproc_dir>/<diagnostic>/<variable_group>/<dataset>_<mip>_<short_name>_<start_year>-<end_year>.nc`
pub fn get_statistic_output_file(descriptor: &DatasetDescriptor, preproc_dir: &Path) -> Result<PathBuf> {
    let template =
        "{diagnostic}/{variable_group}/{dataset}_{mip}_{short_name}_{start_year}-{end_year}.nc";
    let name = replace_tags(template, descriptor)?
        .into_iter()
        .next()
        .unwrap_or_default();
    Ok(preproc_dir.join(name))
}

/// Locates input files of a dataset on a filesystem
///
/// Holds the configuration, the filesystem used for directory discovery
/// and the cube store used when file names carry no usable dates.
pub struct DataFinder<'a> {
    config: &'a Config,
    fs: &'a dyn FileSystem,
    store: &'a dyn CubeStore,
}

impl<'a> DataFinder<'a> {
    pub fn new(config: &'a Config, fs: &'a dyn FileSystem, store: &'a dyn CubeStore) -> Self {
        Self { config, fs, store }
    }

    /// Existing input directories of a dataset
    ///
    /// Every expansion of the project's directory template is tried under
    /// every root path of the project, with the version placeholder
    /// resolved, and the result is globbed keeping only directories.
    pub fn find_input_dirs(&self, descriptor: &DatasetDescriptor) -> Result<Vec<PathBuf>> {
        let project = required_tag(descriptor, "project")?;
        let roots = self.config.rootpath(project)?;
        let template = self.config.select_drs(InputKind::Dir, project)?;

        let mut dirnames = Vec::new();
        for dirname_template in replace_tags(template, descriptor)? {
            for base_path in roots {
                let dirname = base_path.join(&dirname_template);
                let dirname = resolve_latest_version(self.fs, &dirname.to_string_lossy())?;
                let matches: Vec<PathBuf> = self
                    .fs
                    .glob(&dirname)?
                    .into_iter()
                    .filter(|path| self.fs.is_dir(path))
                    .collect();
                if matches.is_empty() {
                    debug!("Skipping non-existent {}", dirname);
                }
                for found in matches {
                    debug!("Found {}", found.display());
                    dirnames.push(found);
                }
            }
        }
        Ok(dirnames)
    }

    /// File name patterns of a dataset
    pub fn filename_globs(&self, descriptor: &DatasetDescriptor) -> Result<Vec<String>> {
        let project = required_tag(descriptor, "project")?;
        let template = self.config.select_drs(InputKind::File, project)?;
        replace_tags(template, descriptor)
    }

    /// All input files of a dataset, without time gating
    pub fn find_input_files(&self, descriptor: &DatasetDescriptor) -> Result<Vec<PathBuf>> {
        let dirs = self.find_input_dirs(descriptor)?;
        let patterns = self.filename_globs(descriptor)?;
        find_files(self.fs, &dirs, &patterns)
    }

    /// Input files of a dataset, gated by its requested years
    ///
    /// Time-invariant project/frequency pairs first have their ensemble
    /// replaced by the fixed placeholder member. Files of `fx` variables
    /// are not gated.
    pub fn get_input_filelist(&self, descriptor: &DatasetDescriptor) -> Result<Vec<FileRecord>> {
        let project = required_tag(descriptor, "project")?;
        let frequency = required_tag(descriptor, "frequency")?;

        let mut descriptor = descriptor.clone();
        if let Some(ensemble) = self.config.time_invariant_ensemble(project, frequency) {
            descriptor.set("ensemble", ensemble);
        }

        let files: Vec<FileRecord> = self
            .find_input_files(&descriptor)?
            .into_iter()
            .map(FileRecord::new)
            .collect();

        if frequency == FX_FREQUENCY {
            return Ok(files);
        }
        let window = descriptor.year_range().ok_or_else(|| DrsError::MissingTag {
            tag: "start_year/end_year".to_string(),
            descriptor: descriptor.to_string(),
        })?;
        select_files(files, window, self.store)
    }

    /// Output path of a preprocessed dataset
    ///
    /// `<preproc_dir>/<diagnostic>/<variable_group>/<output template>.nc`;
    /// several experiments are joined with `-`.
    pub fn get_output_file(&self, descriptor: &DatasetDescriptor, preproc_dir: &Path) -> Result<PathBuf> {
        let project = required_tag(descriptor, "project")?;
        let template = &self.config.project(project)?.output_file;

        let mut descriptor = descriptor.clone();
        if let Some(TagValue::List(_)) = descriptor.get("exp") {
            let joined = descriptor.get("exp").map(TagValue::joined).unwrap_or_default();
            descriptor.set("exp", joined);
        }

        let name = replace_tags(template, &descriptor)?
            .into_iter()
            .next()
            .unwrap_or_default();
        Ok(preproc_dir
            .join(required_tag(&descriptor, "diagnostic")?)
            .join(required_tag(&descriptor, "variable_group")?)
            .join(format!("{}.nc", name)))
    }
}
