//! Writing cubes to their output file

use super::engine::ConcatenationEngine;
use crate::app::adapters::cube_store::{CubeStore, SaveOptions};
use crate::app::cube::Cube;
use crate::error::Result;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::debug;

/// How [`save`] writes a file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SaveSettings {
    /// `map`, `timeseries` or space-separated coordinate names whose axes
    /// are stored contiguously
    pub optimize_access: Option<String>,
    pub compress: bool,
    /// Merge into an existing file instead of replacing it
    pub concatenate_output: bool,
    /// Write even when the cubes look unchanged
    pub force_saving: bool,
}

impl SaveSettings {
    pub fn with_optimize_access(mut self, access: impl Into<String>) -> Self {
        self.optimize_access = Some(access.into());
        self
    }

    pub fn with_compression(mut self) -> Self {
        self.compress = true;
        self
    }

    pub fn with_concatenate_output(mut self) -> Self {
        self.concatenate_output = true;
        self
    }

    pub fn with_force_saving(mut self) -> Self {
        self.force_saving = true;
        self
    }
}

/// Chunk length per axis for an access pattern
///
/// Axes named by the pattern keep their full length, all others get 1.
pub fn chunk_sizes(cube: &Cube, optimize_access: &str) -> Result<Vec<usize>> {
    let mut dims = BTreeSet::new();
    match optimize_access {
        "map" => {
            dims.extend(cube.coord_dims("latitude")?);
            dims.extend(cube.coord_dims("longitude")?);
        }
        "timeseries" => dims.extend(cube.coord_dims("time")?),
        names => {
            for name in names.split(' ').filter(|n| !n.is_empty()) {
                dims.extend(cube.coord_dims(name)?);
            }
        }
    }

    Ok(cube
        .shape()
        .iter()
        .enumerate()
        .map(|(axis, &len)| if dims.contains(&axis) { len } else { 1 })
        .collect())
}

/// Save cubes to `path`
///
/// With `concatenate_output` the cubes are merged into the existing file.
/// Otherwise, when the file exists, every cube still holds lazy data and
/// saving is not forced, the cubes are assumed unchanged and nothing is
/// written.
pub fn save(mut cubes: Vec<Cube>, path: &Path, settings: &SaveSettings, store: &dyn CubeStore) -> Result<PathBuf> {
    let mut options = SaveOptions::default().with_compression(settings.compress);
    if let (Some(access), Some(first)) = (settings.optimize_access.as_deref(), cubes.first()) {
        if !access.is_empty() {
            options = options.with_chunk_sizes(chunk_sizes(first, access)?);
        }
    }

    if settings.concatenate_output {
        ConcatenationEngine::new(store, options).concatenate_output(cubes, path)?;
        return Ok(path.to_path_buf());
    }

    if store.exists(path) && cubes.iter().all(Cube::has_lazy_data) && !settings.force_saving {
        debug!(
            "Not saving cubes to {} to avoid data loss. The cube is probably unchanged.",
            path.display()
        );
        return Ok(path.to_path_buf());
    }

    // Lazy data may be backed by the file about to be replaced
    for cube in &mut cubes {
        cube.realize()?;
    }
    debug!("Saving {} cubes to {}", cubes.len(), path.display());
    store.save(&cubes, path, &options)?;
    Ok(path.to_path_buf())
}
