//! Year-wise merging of a new cube into an existing file
//!
//! Per target path the engine ends in one of these states:
//!
//! - no file yet: the batch is written directly
//! - existing file that cannot be read: it is moved aside and the batch is
//!   written in its place
//! - existing single cube: merged with the new cube, new years overwriting
//!   old ones
//! - anything else (several cubes on either side, or a failed merge): every
//!   new cube is written to its own `.FAILED` file next to the target
//!
//! The existing file is never lost.

use crate::app::adapters::cube_store::{CubeStore, SaveOptions};
use crate::app::cube::{
    AttributeValue, Cube, check_frequency, concatenate, fix_cube_metadata, unify_attributes,
};
use crate::constants::{FAILED_SUFFIX, FALLBACK_TIMESTAMP_FORMAT, QUICKLOOK_TARGET};
use crate::error::{DrsError, Result};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// How the engine handled one batch
#[derive(Debug, Clone, PartialEq)]
pub enum ConcatenationOutcome {
    /// Nothing to save
    Empty,
    /// The target did not exist and was written directly
    DirectWrite,
    /// The new cube was merged into the existing file
    Merged { overwritten_years: Vec<i32> },
    /// The unreadable existing file was moved to `moved_to`
    ReplacedCorrupt { moved_to: PathBuf },
    /// Merging was not possible; new cubes went to separate files
    IndividualFallback { reason: String, written: Vec<PathBuf> },
}

/// Merges new output into existing files through a [`CubeStore`]
pub struct ConcatenationEngine<'a> {
    store: &'a dyn CubeStore,
    options: SaveOptions,
    clock: fn() -> DateTime<Utc>,
}

fn year_attribute(cube: &Cube, key: &str) -> Option<String> {
    cube.attributes.get(key).map(AttributeValue::to_string)
}

impl<'a> ConcatenationEngine<'a> {
    pub fn new(store: &'a dyn CubeStore, options: SaveOptions) -> Self {
        Self {
            store,
            options,
            clock: Utc::now,
        }
    }

    /// Use a fixed clock for fallback timestamps
    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    /// Name of a fallback file for `path`
    ///
    /// `<stem>[_<years>]_<UTC timestamp>.nc.FAILED`, where `years` are
    /// joined with `-`.
    pub fn fallback_filename(&self, path: &Path, years: &[String]) -> PathBuf {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let stem = name.strip_suffix(".nc").unwrap_or(&name);
        let years = if years.is_empty() {
            String::new()
        } else {
            format!("_{}", years.join("-"))
        };
        let now = (self.clock)().format(FALLBACK_TIMESTAMP_FORMAT);
        path.with_file_name(format!("{}{}_{}.nc{}", stem, years, now, FAILED_SUFFIX))
    }

    /// Write `cubes` to `path`, merging with what is already there
    ///
    /// Problems with the existing file or with merging never fail the call;
    /// they are reported and the new data is written elsewhere. Only errors
    /// from the final writes are returned.
    pub fn concatenate_output(&self, cubes: Vec<Cube>, path: &Path) -> Result<ConcatenationOutcome> {
        debug!("Saving cubes in concatenation mode");
        let Some(first) = cubes.first() else {
            warn!(target: QUICKLOOK_TARGET, "Cannot save {}, got empty cube list", path.display());
            return Ok(ConcatenationOutcome::Empty);
        };
        let years: Vec<String> = ["start_year", "end_year"]
            .iter()
            .filter_map(|key| year_attribute(first, key))
            .collect();

        if !self.store.exists(path) {
            debug!("File {} does not exist yet, saving {} cubes", path.display(), cubes.len());
            self.store.save(&cubes, path, &self.options)?;
            return Ok(ConcatenationOutcome::DirectWrite);
        }

        if cubes.len() > 1 {
            let reason = format!(
                "Saving cubes in concatenation mode is not possible for cube lists with more than one element, got {}",
                cubes.len()
            );
            return self.save_individually(&cubes, path, reason, &years);
        }

        let old_cubes = match self.store.load(path).and_then(|old| {
            if old.is_empty() {
                Err(DrsError::unreadable(path, "file holds no cubes"))
            } else {
                Ok(old)
            }
        }) {
            Ok(old) => old,
            Err(e) => {
                let moved_to = self.fallback_filename(path, &[]);
                self.store.rename(path, &moved_to)?;
                warn!(
                    target: QUICKLOOK_TARGET,
                    "Saving cubes in concatenation mode is not possible, existing file {} appears to be corrupt: {}",
                    path.display(),
                    e
                );
                warn!(
                    target: QUICKLOOK_TARGET,
                    "Moving existing file to {} and saving new cubes to {}",
                    moved_to.display(),
                    path.display()
                );
                self.store.save(&cubes, path, &self.options)?;
                return Ok(ConcatenationOutcome::ReplacedCorrupt { moved_to });
            }
        };

        if old_cubes.len() > 1 {
            let reason = format!(
                "Saving cubes in concatenation mode is not possible if old file at {} contains a cube list with more than one element, got {}",
                path.display(),
                old_cubes.len()
            );
            return self.save_individually(&cubes, path, reason, &years);
        }

        let mut old_cubes = old_cubes;
        let mut cubes = cubes;
        let (old_cube, new_cube) = match (old_cubes.pop(), cubes.pop()) {
            (Some(old), Some(new)) => (old, new),
            _ => return Ok(ConcatenationOutcome::Empty),
        };
        let fallback_copy = new_cube.clone();

        match concatenate_along_time(old_cube, new_cube, path) {
            Ok((merged, overwritten_years)) => {
                info!(
                    "Successfully concatenated cube {} to {}",
                    merged.summary(),
                    path.display()
                );
                self.store.save(std::slice::from_ref(&merged), path, &self.options)?;
                Ok(ConcatenationOutcome::Merged { overwritten_years })
            }
            Err(e) => {
                let reason = format!("Could not concatenate old and new cube along time: {}", e);
                self.save_individually(std::slice::from_ref(&fallback_copy), path, reason, &years)
            }
        }
    }

    fn save_individually(
        &self,
        cubes: &[Cube],
        path: &Path,
        reason: String,
        years: &[String],
    ) -> Result<ConcatenationOutcome> {
        warn!(target: QUICKLOOK_TARGET, "{}", reason);

        let base = self.fallback_filename(path, years);
        let mut written = Vec::with_capacity(cubes.len());
        for (index, cube) in cubes.iter().enumerate() {
            let target = if cubes.len() == 1 {
                base.clone()
            } else {
                let name = base
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let suffix = format!(".nc{}", FAILED_SUFFIX);
                let stem = name.strip_suffix(suffix.as_str()).unwrap_or(&name);
                base.with_file_name(format!("{}_{}{}", stem, index, suffix))
            };
            warn!(
                target: QUICKLOOK_TARGET,
                "Saving cube {} to {}",
                cube.summary(),
                target.display()
            );
            self.store.save(std::slice::from_ref(cube), &target, &self.options)?;
            written.push(target);
        }
        Ok(ConcatenationOutcome::IndividualFallback { reason, written })
    }
}

/// Merge two cubes year by year, preferring `new` where both have data
///
/// Returns the merged, realized cube and the years taken from `new` that
/// replaced years of `old`. The merged cube carries calendar auxiliary
/// coordinates and `start_year` / `end_year` attributes.
pub fn concatenate_along_time(old: Cube, new: Cube, target: &Path) -> Result<(Cube, Vec<i32>)> {
    let mut by_year = old.partition_by_year()?;
    let new_by_year = new.partition_by_year()?;

    let overwritten: Vec<i32> = new_by_year
        .keys()
        .filter(|year| by_year.contains_key(year))
        .copied()
        .collect();
    if !overwritten.is_empty() {
        info!(
            target: QUICKLOOK_TARGET,
            "File {}: Time ranges for old and new files overlap for the years {:?}, overwriting old data of those years",
            target.display(),
            overwritten
        );
    }
    by_year.extend(new_by_year);

    let mut cubes: Vec<Cube> = by_year.into_values().collect();
    unify_attributes(&mut cubes);
    fix_cube_metadata(&mut cubes);
    let mut merged = concatenate(cubes)?;
    merged.add_aux_time_coords()?;
    merged.realize()?;

    let frequency = merged
        .attributes
        .get("frequency")
        .map(AttributeValue::to_string);
    match frequency {
        Some(frequency) => {
            let gap = match check_frequency(merged.coord("time")?, &frequency) {
                Ok(gap) => gap,
                Err(e) => Some(e.to_string()),
            };
            if let Some(gap) = gap {
                warn!("{}: {}", merged.summary(), gap);
                warn!(
                    target: QUICKLOOK_TARGET,
                    "File {}: Frequency check of final cube was not successful, the cube might not be contiguous",
                    target.display()
                );
            }
        }
        None => warn!(
            target: QUICKLOOK_TARGET,
            "File {}: Could not check if final cube is contiguous, cube attributes do not contain 'frequency'",
            target.display()
        ),
    }

    let years = merged.coord("year")?.values();
    if let (Some(&start), Some(&end)) = (years.first(), years.last()) {
        merged
            .attributes
            .insert("start_year".to_string(), AttributeValue::Int(start as i64));
        merged
            .attributes
            .insert("end_year".to_string(), AttributeValue::Int(end as i64));
    }
    Ok((merged, overwritten))
}
