//! Applying fixes and compliance checks to a variable

use super::registry::FixRegistry;
use crate::app::cube::Cube;
use crate::constants::SOURCE_FILE_ATTRIBUTE;
use crate::error::{DrsError, Result};
use crate::models::DatasetDescriptor;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Checks a cube against its CMOR table
///
/// Implementations may repair what they can and return the corrected
/// cube; anything they cannot repair is a
/// [`DrsError::ComplianceCheck`].
pub trait ComplianceChecker {
    fn check_metadata(&self, cube: Cube, target: &FixTarget) -> Result<Cube>;

    fn check_data(&self, cube: Cube, target: &FixTarget) -> Result<Cube>;
}

/// The variable being fixed
#[derive(Debug, Clone, PartialEq)]
pub struct FixTarget {
    pub short_name: String,
    pub project: String,
    pub dataset: String,
    pub cmor_table: Option<String>,
    pub mip: Option<String>,
    pub frequency: Option<String>,
}

impl FixTarget {
    pub fn new(short_name: impl Into<String>, project: impl Into<String>, dataset: impl Into<String>) -> Self {
        Self {
            short_name: short_name.into(),
            project: project.into(),
            dataset: dataset.into(),
            cmor_table: None,
            mip: None,
            frequency: None,
        }
    }

    /// Target described by a dataset descriptor
    ///
    /// `short_name`, `project` and `dataset` are required; `mip` and
    /// `frequency` are taken when present.
    pub fn from_descriptor(descriptor: &DatasetDescriptor) -> Result<Self> {
        let required = |tag: &str| {
            descriptor
                .get_str(tag)
                .map(str::to_string)
                .ok_or_else(|| DrsError::MissingTag {
                    tag: tag.to_string(),
                    descriptor: descriptor.to_string(),
                })
        };
        let mut target = Self::new(required("short_name")?, required("project")?, required("dataset")?);
        target.mip = descriptor.get_str("mip").map(str::to_string);
        target.frequency = descriptor.frequency().map(str::to_string);
        Ok(target)
    }

    pub fn with_cmor_table(mut self, table: impl Into<String>, mip: impl Into<String>) -> Self {
        self.cmor_table = Some(table.into());
        self.mip = Some(mip.into());
        self
    }

    pub fn with_frequency(mut self, frequency: impl Into<String>) -> Self {
        self.frequency = Some(frequency.into());
        self
    }

    /// Whether a compliance check can run
    fn checkable(&self) -> bool {
        self.cmor_table.is_some() && self.mip.is_some()
    }
}

/// Apply the file-level fixes; returns the path to load from
pub fn fix_file(registry: &FixRegistry, path: &Path, target: &FixTarget, output_dir: &Path) -> Result<PathBuf> {
    let mut path = path.to_path_buf();
    for fix in registry.get_fixes(&target.project, &target.dataset, &target.short_name) {
        path = fix.fix_file(&path, output_dir)?;
    }
    Ok(path)
}

fn group_by_source_file(cubes: Vec<Cube>) -> Vec<Vec<Cube>> {
    let mut groups: Vec<(String, Vec<Cube>)> = Vec::new();
    for cube in cubes {
        let source = cube
            .attributes
            .get(SOURCE_FILE_ATTRIBUTE)
            .map(|v| v.to_string())
            .unwrap_or_default();
        match groups.iter_mut().find(|(s, _)| *s == source) {
            Some((_, group)) => group.push(cube),
            None => groups.push((source, vec![cube])),
        }
    }
    groups.into_iter().map(|(_, group)| group).collect()
}

/// Fix and check the metadata of freshly loaded cubes
///
/// Cubes are handled per source file. When the fixes leave more than one
/// cube for a file, the one whose var name is the target's short name is
/// kept and the others are dropped with a warning. Returns one cube per
/// source file, with the `source_file` attribute removed.
pub fn fix_metadata(
    registry: &FixRegistry,
    cubes: Vec<Cube>,
    target: &FixTarget,
    checker: Option<&dyn ComplianceChecker>,
) -> Result<Vec<Cube>> {
    let fixes = registry.get_fixes(&target.project, &target.dataset, &target.short_name);
    debug!(
        "Applying {} metadata fixes for {} of {}:{}",
        fixes.len(),
        target.short_name,
        target.project,
        target.dataset
    );

    let mut fixed = Vec::new();
    for mut group in group_by_source_file(cubes) {
        for fix in &fixes {
            group = fix.fix_metadata(group)?;
        }

        let mut cube = if group.len() == 1 {
            group.remove(0)
        } else {
            let candidates: Vec<String> = group.iter().map(Cube::summary).collect();
            let position = group
                .iter()
                .position(|c| c.var_name == target.short_name)
                .ok_or_else(|| DrsError::AmbiguousCube {
                    variable: target.short_name.clone(),
                    project: target.project.clone(),
                    dataset: target.dataset.clone(),
                    candidates: candidates.clone(),
                })?;
            warn!(
                "Found variable {} in {}:{}, but there were others present in the file. \
                 Those extra variables are usually metadata (cell area, latitude descriptions) \
                 that was not saved properly. It is possible that errors appear further on \
                 because of this. Full list of cubes encountered: {:?}",
                target.short_name,
                target.project,
                target.dataset,
                candidates
            );
            group.swap_remove(position)
        };

        if let (Some(checker), true) = (checker, target.checkable()) {
            cube = checker.check_metadata(cube, target)?;
        }
        cube.attributes.remove(SOURCE_FILE_ATTRIBUTE);
        fixed.push(cube);
    }
    Ok(fixed)
}

/// Fix and check the data of a cube whose metadata is already fixed
pub fn fix_data(
    registry: &FixRegistry,
    mut cube: Cube,
    target: &FixTarget,
    checker: Option<&dyn ComplianceChecker>,
) -> Result<Cube> {
    for fix in registry.get_fixes(&target.project, &target.dataset, &target.short_name) {
        cube = fix.fix_data(cube)?;
    }
    if let (Some(checker), true) = (checker, target.checkable()) {
        cube = checker.check_data(cube, target)?;
    }
    Ok(cube)
}
