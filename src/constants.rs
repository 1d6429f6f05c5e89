//! Application constants for the DRS processor
//!
//! This module contains reserved tag names, default values and fixed
//! strings used throughout the processor.

// =============================================================================
// Path Templates
// =============================================================================

/// Reserved tag resolved against the filesystem rather than the descriptor
pub const LATEST_VERSION_TAG: &str = "latestversion";

/// Placeholder form of the reserved version tag
pub const LATEST_VERSION_PLACEHOLDER: &str = "{latestversion}";

/// Directory name tried first when resolving the latest version
pub const LATEST_VERSION_MARKER: &str = "latest";

/// Rootpath / DRS key used when a project has no explicit entry
pub const DEFAULT_KEY: &str = "default";

/// Case-folding modifiers accepted after a tag name
pub const LOWER_SUFFIX: &str = ".lower";
pub const UPPER_SUFFIX: &str = ".upper";

/// Frequency of time-invariant (fixed field) variables
pub const FX_FREQUENCY: &str = "fx";

/// Ensemble member substituted for time-invariant CMIP5 variables
pub const FX_ENSEMBLE: &str = "r0i0p0";

// =============================================================================
// Saving
// =============================================================================

/// Fill value written for masked data
pub const GLOBAL_FILL_VALUE: f64 = 1e20;

/// Suffix appended to files written by the individual fallback
pub const FAILED_SUFFIX: &str = ".FAILED";

/// Timestamp layout used in fallback filenames (UTC)
pub const FALLBACK_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Attribute holding the file a cube was loaded from
pub const SOURCE_FILE_ATTRIBUTE: &str = "source_file";

/// Attributes dropped on load because they break merging
pub const VOLATILE_ATTRIBUTES: &[&str] = &["creation_date", "tracking_id", "history"];

/// Auxiliary calendar coordinates derived from the time coordinate
pub const AUX_TIME_COORDS: &[&str] = &["day_of_month", "day_of_year", "month_number", "year"];

/// Name of the metadata sidecar written per output directory
pub const METADATA_FILENAME: &str = "metadata.yml";

/// Sort index used for products without a recipe dataset index
pub const DEFAULT_RECIPE_DATASET_INDEX: f64 = 1e6;

// =============================================================================
// Citation
// =============================================================================

pub const CMIP6_URL_STEM: &str = "https://cera-www.dkrz.de/WDCC/ui/cerasearch";

/// Technical overview of the tool, always cited
pub const TOOL_CITATION: &str = "@article{righi19gmd,
\tdoi = {10.5194/gmd-2019-226},
\turl = {https://doi.org/10.5194%2Fgmd-2019-226},
\tyear = 2019,
\tmonth = {sep},
\tpublisher = {Copernicus {GmbH}},
\tauthor = {Mattia Righi and Bouwe Andela and Veronika Eyring and Axel Lauer and Valeriu Predoi and Manuel Schlund and Javier Vegas-Regidor and Lisa Bock and Björn Brötz and Lee de Mora and Faruk Diblen and Laura Dreyer and Niels Drost and Paul Earnshaw and Birgit Hassler and Nikolay Koldunov and Bill Little and Saskia Loosveldt Tomas and Klaus Zimmermann},
\ttitle = {{ESMValTool} v2.0 {\\&}amp$\\mathsemicolon${\\#}8211$\\mathsemicolon$ Technical overview}
}
";

/// Heading of the unresolved citation URL list
pub const CITATION_INFO_TITLE: &str =
    "Some citation information are found, which are not mentioned in the recipe or diagnostic.";

// =============================================================================
// Logging
// =============================================================================

/// Tracing target for user-facing notices emitted while concatenating
pub const QUICKLOOK_TARGET: &str = "drs_processor::quicklook";
