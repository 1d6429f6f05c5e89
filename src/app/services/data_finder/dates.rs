//! Start and end years of input files
//!
//! Years are read from the file name when it follows one of the usual
//! conventions (`*_YYYY*-YYYY*.nc`, `*_YYYY*.nc`, `YYYY*_*.nc`, ...).
//! Only when the name is ambiguous is the file opened and its time
//! coordinate read.

use crate::app::adapters::cube_store::CubeStore;
use crate::error::{DrsError, Result};
use crate::models::YearRange;
use std::path::Path;
use tracing::debug;

fn is_date_token(token: &str) -> bool {
    token.len() >= 4 && token.chars().all(|c| c.is_ascii_digit())
}

/// Date-like tokens at either end of a file name
///
/// The stem is split on `_` and then `-`. A token is kept when it and all
/// tokens before it are date-like, or it and all tokens after it are.
pub fn date_tokens(path: &Path) -> Vec<String> {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tokens: Vec<&str> = stem.split('_').flat_map(|part| part.split('-')).collect();
    let is_date: Vec<bool> = tokens.iter().map(|t| is_date_token(t)).collect();

    let mut from_left = is_date.clone();
    for i in 1..from_left.len() {
        from_left[i] = from_left[i - 1] && from_left[i];
    }
    let mut from_right = is_date;
    for i in (0..from_right.len().saturating_sub(1)).rev() {
        from_right[i] = from_right[i + 1] && from_right[i];
    }

    tokens
        .iter()
        .enumerate()
        .filter(|(i, _)| from_left[*i] || from_right[*i])
        .map(|(_, token)| token.to_string())
        .collect()
}

fn leading_year(token: &str) -> Option<i32> {
    token.get(..4)?.parse().ok()
}

/// Read the years from the first cube of a file that has a time coordinate
fn years_from_content(path: &Path, store: &dyn CubeStore) -> Result<YearRange> {
    let cubes = store.load(path).map_err(|e| match e {
        DrsError::UnreadableFile { .. } => e,
        e => DrsError::unreadable(path, e.to_string()),
    })?;

    for cube in &cubes {
        debug!("{}", cube);
        let Ok(time) = cube.coord("time") else {
            continue;
        };
        let dates = match time.dates() {
            Ok(dates) => dates,
            Err(e) => {
                debug!("Time of {} can not be determined: {}", path.display(), e);
                continue;
            }
        };
        if let (Some(first), Some(last)) = (dates.first(), dates.last()) {
            return Ok(YearRange::new(first.year, last.year));
        }
    }
    Err(DrsError::DateNotFound {
        path: path.to_path_buf(),
    })
}

/// Start and end year of a file
///
/// One date token gives the same start and end year, two give start and
/// end in the order they appear. Any other count falls back to reading the
/// time coordinate from the file itself.
pub fn get_start_end_year(path: &Path, store: &dyn CubeStore) -> Result<YearRange> {
    let tokens = date_tokens(path);
    let years: Vec<i32> = tokens.iter().filter_map(|t| leading_year(t)).collect();

    match years.as_slice() {
        [year] => Ok(YearRange::new(*year, *year)),
        [start, end] => Ok(YearRange::new(*start, *end)),
        _ => {
            debug!(
                "{} has {} date tokens, reading time from file",
                path.display(),
                tokens.len()
            );
            years_from_content(path, store)
        }
    }
}
