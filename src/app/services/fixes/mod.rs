//! Dataset-specific corrections
//!
//! Model output often deviates from its CMOR table in small, known ways.
//! A [`Fix`] corrects one such quirk at up to three stages: before the file
//! is loaded, on the loaded cubes' metadata and on the final cube's data.
//! Fixes are looked up in a [`FixRegistry`] by project, dataset and
//! variable; anything not registered passes through unchanged.

pub mod cmip5;
pub mod cmip6;
pub mod dispatch;
pub mod registry;
pub mod shared;

#[cfg(test)]
pub mod tests;

pub use dispatch::{ComplianceChecker, FixTarget, fix_data, fix_file, fix_metadata};
pub use registry::{ALL_VARIABLES, Fix, FixRegistry};
