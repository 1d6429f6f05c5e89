//! Time-window filtering of input files

use super::dates::get_start_end_year;
use crate::app::adapters::cube_store::CubeStore;
use crate::error::Result;
use crate::models::{FileRecord, YearRange};
use tracing::debug;

/// Keep the files whose years overlap `window`
///
/// A file is kept when `start <= window.end && end >= window.start`. Years
/// already cached on a record are reused; a file whose years cannot be
/// determined fails the whole selection.
pub fn select_files(
    files: Vec<FileRecord>,
    window: YearRange,
    store: &dyn CubeStore,
) -> Result<Vec<FileRecord>> {
    let mut selection = Vec::with_capacity(files.len());
    for mut file in files {
        let years = match file.years() {
            Some(years) => years,
            None => {
                let years = get_start_end_year(file.path(), store)?;
                file.set_years(years);
                years
            }
        };
        if years.overlaps(&window) {
            selection.push(file);
        } else {
            debug!("Skipping {} ({}) outside {}", file.path().display(), years, window);
        }
    }
    Ok(selection)
}
