//! Cube persistence seam
//!
//! The concatenation engine and the date parser only need to test for a
//! file, load the cubes it holds, save cubes and move a file aside. The
//! [`CubeStore`] trait captures that; [`MemoryCubeStore`] keeps everything
//! in memory and, with the `netcdf` feature, [`NetcdfStore`] reads and
//! writes NetCDF files.

pub mod memory;
#[cfg(feature = "netcdf")]
pub mod netcdf;

pub use memory::MemoryCubeStore;
#[cfg(feature = "netcdf")]
pub use self::netcdf::NetcdfStore;

use crate::app::cube::Cube;
use crate::constants::{GLOBAL_FILL_VALUE, SOURCE_FILE_ATTRIBUTE, VOLATILE_ATTRIBUTES};
use crate::error::{DrsError, Result};
use std::path::Path;
use tracing::debug;

/// Write hints passed through to the storage backend
#[derive(Debug, Clone, PartialEq)]
pub struct SaveOptions {
    /// Chunk length per axis of the first cube; `None` lets the backend decide
    pub chunk_sizes: Option<Vec<usize>>,
    /// Value written in place of masked points
    pub fill_value: f64,
    pub compress: bool,
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self {
            chunk_sizes: None,
            fill_value: GLOBAL_FILL_VALUE,
            compress: false,
        }
    }
}

impl SaveOptions {
    pub fn with_chunk_sizes(mut self, chunk_sizes: Vec<usize>) -> Self {
        self.chunk_sizes = Some(chunk_sizes);
        self
    }

    pub fn with_compression(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }
}

/// Storage backend for cubes
pub trait CubeStore {
    fn exists(&self, path: &Path) -> bool;

    /// Read every cube held in `path`
    fn load(&self, path: &Path) -> Result<Vec<Cube>>;

    /// Write `cubes` to `path`, replacing any existing file
    fn save(&self, cubes: &[Cube], path: &Path, options: &SaveOptions) -> Result<()>;

    fn rename(&self, from: &Path, to: &Path) -> Result<()>;
}

/// Load cubes tagged with the file they came from
///
/// Attributes that differ between otherwise identical files (creation date,
/// tracking id, history) are dropped so the cubes can be merged later. An
/// empty file is an error.
pub fn load_cubes(store: &dyn CubeStore, path: &Path) -> Result<Vec<Cube>> {
    debug!("Loading:\n{}", path.display());
    let mut cubes = store.load(path)?;
    if cubes.is_empty() {
        return Err(DrsError::unreadable(path, "can not load cubes from file"));
    }

    let source = path.display().to_string();
    for cube in &mut cubes {
        for attribute in VOLATILE_ATTRIBUTES {
            cube.attributes.remove(*attribute);
        }
        cube.attributes
            .insert(SOURCE_FILE_ATTRIBUTE.to_string(), source.clone().into());
    }
    Ok(cubes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::cube::tests::monthly_cube;
    use std::path::PathBuf;

    #[test]
    fn test_load_cubes_tags_source_and_strips_volatile_attributes() {
        let store = MemoryCubeStore::new();
        let path = PathBuf::from("/data/tas_2000.nc");
        let cube = monthly_cube("tas", 2000, 1, 0.0)
            .with_attribute("history", "created yesterday")
            .with_attribute("tracking_id", "abc")
            .with_attribute("institution", "somewhere");
        store.insert(&path, vec![cube]);

        let cubes = load_cubes(&store, &path).unwrap();
        let attributes = &cubes[0].attributes;
        assert!(!attributes.contains_key("history"));
        assert!(!attributes.contains_key("tracking_id"));
        assert_eq!(
            attributes[SOURCE_FILE_ATTRIBUTE].as_str(),
            Some("/data/tas_2000.nc")
        );
        assert!(attributes.contains_key("institution"));
    }

    #[test]
    fn test_load_cubes_rejects_empty_file() {
        let store = MemoryCubeStore::new();
        let path = PathBuf::from("/data/empty.nc");
        store.insert(&path, Vec::new());

        assert!(matches!(
            load_cubes(&store, &path),
            Err(DrsError::UnreadableFile { .. })
        ));
    }
}
