//! Saving cubes and merging new output into existing files
//!
//! [`save`] writes cubes with the requested chunking. In concatenation mode
//! it hands over to the [`ConcatenationEngine`], which merges a new cube
//! into the file already at the target path year by year, and falls back
//! to separately named files whenever merging is not safe.

pub mod engine;
pub mod save;

#[cfg(test)]
pub mod tests;

pub use engine::{ConcatenationEngine, ConcatenationOutcome, concatenate_along_time};
pub use save::{SaveSettings, chunk_sizes, save};
