//! In-memory cube store

use super::{CubeStore, SaveOptions};
use crate::app::cube::Cube;
use crate::error::{DrsError, Result};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
enum Stored {
    Cubes(Vec<Cube>),
    /// A file that exists but cannot be read
    Corrupt(String),
}

/// Cube files held in memory, keyed by path
///
/// Saved cubes are realized so that later changes to lazy sources do not
/// leak into stored files.
#[derive(Debug, Default)]
pub struct MemoryCubeStore {
    files: RefCell<BTreeMap<PathBuf, Stored>>,
    options: RefCell<BTreeMap<PathBuf, SaveOptions>>,
}

impl MemoryCubeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Put a file in the store
    pub fn insert(&self, path: impl AsRef<Path>, cubes: Vec<Cube>) {
        self.files
            .borrow_mut()
            .insert(path.as_ref().to_path_buf(), Stored::Cubes(cubes));
    }

    /// Put an unreadable file in the store
    pub fn insert_corrupt(&self, path: impl AsRef<Path>, reason: impl Into<String>) {
        self.files
            .borrow_mut()
            .insert(path.as_ref().to_path_buf(), Stored::Corrupt(reason.into()));
    }

    /// Every stored path, sorted
    pub fn paths(&self) -> Vec<PathBuf> {
        self.files.borrow().keys().cloned().collect()
    }

    /// Cubes stored at `path`, if it holds a readable file
    pub fn get(&self, path: impl AsRef<Path>) -> Option<Vec<Cube>> {
        match self.files.borrow().get(path.as_ref()) {
            Some(Stored::Cubes(cubes)) => Some(cubes.clone()),
            _ => None,
        }
    }

    /// Options used by the most recent save to `path`
    pub fn save_options(&self, path: impl AsRef<Path>) -> Option<SaveOptions> {
        self.options.borrow().get(path.as_ref()).cloned()
    }
}

impl CubeStore for MemoryCubeStore {
    fn exists(&self, path: &Path) -> bool {
        self.files.borrow().contains_key(path)
    }

    fn load(&self, path: &Path) -> Result<Vec<Cube>> {
        match self.files.borrow().get(path) {
            Some(Stored::Cubes(cubes)) => Ok(cubes.clone()),
            Some(Stored::Corrupt(reason)) => Err(DrsError::unreadable(path, reason.clone())),
            None => Err(DrsError::unreadable(path, "no such file")),
        }
    }

    fn save(&self, cubes: &[Cube], path: &Path, options: &SaveOptions) -> Result<()> {
        let mut stored = cubes.to_vec();
        for cube in &mut stored {
            cube.realize()?;
        }
        self.files
            .borrow_mut()
            .insert(path.to_path_buf(), Stored::Cubes(stored));
        self.options
            .borrow_mut()
            .insert(path.to_path_buf(), options.clone());
        Ok(())
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        let mut files = self.files.borrow_mut();
        let entry = files.remove(from).ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("No such file: {}", from.display()),
            )
        })?;
        files.insert(to.to_path_buf(), entry);
        Ok(())
    }
}
