//! Input file discovery and time gating
//!
//! Path templates from the project configuration are expanded with the
//! values of a [`DatasetDescriptor`](crate::models::DatasetDescriptor),
//! version placeholders are resolved against the filesystem, and the
//! matching files are filtered by the years encoded in their names.

pub mod dates;
pub mod locator;
pub mod selection;
pub mod tags;
pub mod version;

#[cfg(test)]
pub mod tests;

// Re-export key types for convenience
pub use dates::{date_tokens, get_start_end_year};
pub use locator::{DataFinder, find_files, get_statistic_output_file};
pub use selection::select_files;
pub use tags::replace_tags;
pub use version::resolve_latest_version;
