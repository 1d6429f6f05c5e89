//! Fix lookup by project, dataset and variable

use super::{cmip5, cmip6};
use crate::app::cube::Cube;
use crate::error::Result;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Variable key of fixes that apply to every variable of a dataset
pub const ALL_VARIABLES: &str = "allvars";

/// A correction for one dataset quirk
///
/// Every stage defaults to passing its input through unchanged.
pub trait Fix {
    /// Correct a file that cannot be loaded as is
    ///
    /// Returns the path to load from. The original file is never
    /// overwritten; a corrected copy goes into `output_dir`.
    fn fix_file(&self, path: &Path, _output_dir: &Path) -> Result<PathBuf> {
        Ok(path.to_path_buf())
    }

    /// Correct the metadata of all cubes loaded from one file
    fn fix_metadata(&self, cubes: Vec<Cube>) -> Result<Vec<Cube>> {
        Ok(cubes)
    }

    /// Correct the data of the final cube
    fn fix_data(&self, cube: Cube) -> Result<Cube> {
        Ok(cube)
    }
}

type FixKey = (String, String, String);

fn key(project: &str, dataset: &str, variable: &str) -> FixKey {
    (
        project.to_lowercase(),
        dataset.to_lowercase(),
        variable.to_lowercase(),
    )
}

/// Registered fixes keyed by lower-cased (project, dataset, variable)
#[derive(Default)]
pub struct FixRegistry {
    fixes: BTreeMap<FixKey, Vec<Box<dyn Fix>>>,
}

impl FixRegistry {
    /// Registry without any fixes
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry with all fixes shipped with the crate
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        cmip5::ec_earth::register(&mut registry);
        cmip6::canesm5_canoe::register(&mut registry);
        cmip6::ipsl_cm6a_lr::register(&mut registry);
        registry
    }

    /// Add a fix; `variable` may be [`ALL_VARIABLES`]
    pub fn register(&mut self, project: &str, dataset: &str, variable: &str, fix: impl Fix + 'static) {
        self.fixes
            .entry(key(project, dataset, variable))
            .or_default()
            .push(Box::new(fix));
    }

    pub fn with_fix(mut self, project: &str, dataset: &str, variable: &str, fix: impl Fix + 'static) -> Self {
        self.register(project, dataset, variable, fix);
        self
    }

    /// Fixes for a variable in application order
    ///
    /// Dataset-wide fixes come first, then those for the variable itself.
    pub fn get_fixes(&self, project: &str, dataset: &str, variable: &str) -> Vec<&dyn Fix> {
        let mut keys = vec![key(project, dataset, ALL_VARIABLES)];
        if !variable.eq_ignore_ascii_case(ALL_VARIABLES) {
            keys.push(key(project, dataset, variable));
        }
        keys.iter()
            .filter_map(|k| self.fixes.get(k))
            .flat_map(|fixes| fixes.iter().map(|fix| fix.as_ref()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.fixes.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.fixes.is_empty()
    }
}
