//! `{latestversion}` resolution

use crate::app::adapters::filesystem::FileSystem;
use crate::constants::{LATEST_VERSION_MARKER, LATEST_VERSION_PLACEHOLDER};
use crate::error::Result;
use std::path::Path;
use tracing::debug;

/// Replace the version placeholder with an existing version directory
///
/// The directory before the placeholder is listed; a `latest` entry is
/// tried first, then every entry in descending lexicographic order. The
/// first candidate for which `prefix/candidate/suffix` is a directory
/// wins. A template without the placeholder, a missing prefix or no
/// qualifying candidate returns the template unchanged, so the later glob
/// simply finds nothing.
pub fn resolve_latest_version(fs: &dyn FileSystem, template: &str) -> Result<String> {
    let Some((prefix, suffix)) = template.split_once(LATEST_VERSION_PLACEHOLDER) else {
        return Ok(template.to_string());
    };
    let suffix = suffix.trim_start_matches(std::path::MAIN_SEPARATOR);

    let prefix_path = Path::new(prefix);
    if !fs.exists(prefix_path) {
        debug!("Version directory {} does not exist", prefix);
        return Ok(template.to_string());
    }

    let mut versions = fs.list_dir(prefix_path)?;
    versions.sort_by(|a, b| b.cmp(a));

    let candidates = std::iter::once(LATEST_VERSION_MARKER.to_string()).chain(versions);
    for version in candidates {
        let mut dirname = prefix_path.join(&version);
        if !suffix.is_empty() {
            dirname.push(suffix);
        }
        if fs.is_dir(&dirname) {
            debug!("Resolved {} to version {}", template, version);
            return Ok(dirname.to_string_lossy().into_owned());
        }
    }

    Ok(template.to_string())
}
