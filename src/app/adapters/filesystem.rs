//! Narrow filesystem seam for version resolution and file discovery
//!
//! The locator only needs to list directories, test paths, expand glob
//! patterns and walk directory trees. [`OsFileSystem`] does this against
//! the real disk; [`MemoryFileSystem`] holds a fixed tree in memory so the
//! template and parsing logic can be exercised without touching disk.

use crate::Result;
use glob::{MatchOptions, Pattern};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Files found in one directory during a tree walk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkEntry {
    pub dir: PathBuf,
    pub files: Vec<String>,
}

/// Filesystem operations used by the data finder
pub trait FileSystem {
    /// Whether anything exists at `path`
    fn exists(&self, path: &Path) -> bool;

    /// Whether `path` is an existing directory (following symlinks)
    fn is_dir(&self, path: &Path) -> bool;

    /// Names of the entries directly inside `path`
    fn list_dir(&self, path: &Path) -> Result<Vec<String>>;

    /// Paths matching a shell-style glob pattern
    fn glob(&self, pattern: &str) -> Result<Vec<PathBuf>>;

    /// Walk the tree below `root`, descending through symbolic links
    fn walk(&self, root: &Path) -> Result<Vec<WalkEntry>>;
}

/// The real filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFileSystem;

impl FileSystem for OsFileSystem {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn list_dir(&self, path: &Path) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(path)? {
            let entry = entry?;
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        Ok(names)
    }

    fn glob(&self, pattern: &str) -> Result<Vec<PathBuf>> {
        let matches = glob::glob(pattern)?
            .filter_map(|entry| match entry {
                Ok(path) => Some(path),
                Err(e) => {
                    debug!("Skipping unreadable glob match: {}", e);
                    None
                }
            })
            .collect();
        Ok(matches)
    }

    fn walk(&self, root: &Path) -> Result<Vec<WalkEntry>> {
        if !root.is_dir() {
            return Ok(Vec::new());
        }

        let mut by_dir: BTreeMap<PathBuf, Vec<String>> = BTreeMap::new();
        for entry in WalkDir::new(root).follow_links(true).into_iter() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    debug!("Skipping entry during walk of {}: {}", root.display(), e);
                    continue;
                }
            };

            if entry.file_type().is_dir() {
                by_dir.entry(entry.path().to_path_buf()).or_default();
            } else if let Some(parent) = entry.path().parent() {
                by_dir
                    .entry(parent.to_path_buf())
                    .or_default()
                    .push(entry.file_name().to_string_lossy().into_owned());
            }
        }

        Ok(by_dir
            .into_iter()
            .map(|(dir, files)| WalkEntry { dir, files })
            .collect())
    }
}

/// A fixed directory tree held in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryFileSystem {
    dirs: BTreeSet<PathBuf>,
    files: BTreeSet<PathBuf>,
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a directory and all of its ancestors
    pub fn add_dir(&mut self, path: impl AsRef<Path>) -> &mut Self {
        for ancestor in path.as_ref().ancestors() {
            if ancestor.as_os_str().is_empty() {
                continue;
            }
            self.dirs.insert(ancestor.to_path_buf());
        }
        self
    }

    /// Add a file, creating its parent directories
    pub fn add_file(&mut self, path: impl AsRef<Path>) -> &mut Self {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            self.add_dir(parent);
        }
        self.files.insert(path.to_path_buf());
        self
    }

    fn glob_options() -> MatchOptions {
        MatchOptions {
            case_sensitive: true,
            require_literal_separator: true,
            require_literal_leading_dot: false,
        }
    }
}

impl FileSystem for MemoryFileSystem {
    fn exists(&self, path: &Path) -> bool {
        self.dirs.contains(path) || self.files.contains(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.dirs.contains(path)
    }

    fn list_dir(&self, path: &Path) -> Result<Vec<String>> {
        if !self.dirs.contains(path) {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("No such directory: {}", path.display()),
            )
            .into());
        }

        Ok(self
            .dirs
            .iter()
            .chain(self.files.iter())
            .filter(|p| p.parent() == Some(path))
            .filter_map(|p| p.file_name())
            .map(|name| name.to_string_lossy().into_owned())
            .collect())
    }

    fn glob(&self, pattern: &str) -> Result<Vec<PathBuf>> {
        let compiled = Pattern::new(pattern)?;
        let options = Self::glob_options();
        Ok(self
            .dirs
            .iter()
            .chain(self.files.iter())
            .filter(|p| compiled.matches_path_with(p, options))
            .cloned()
            .collect())
    }

    fn walk(&self, root: &Path) -> Result<Vec<WalkEntry>> {
        Ok(self
            .dirs
            .iter()
            .filter(|dir| dir.starts_with(root))
            .map(|dir| WalkEntry {
                dir: dir.clone(),
                files: self
                    .files
                    .iter()
                    .filter(|f| f.parent() == Some(dir.as_path()))
                    .filter_map(|f| f.file_name())
                    .map(|name| name.to_string_lossy().into_owned())
                    .collect(),
            })
            .collect())
    }
}
