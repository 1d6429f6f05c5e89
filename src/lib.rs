//! DRS Processor Library
//!
//! A Rust library for post-processing CMOR-style climate model output laid
//! out according to a Data Reference Syntax (DRS).
//!
//! This library provides tools for:
//! - Expanding path templates from dataset descriptors and resolving
//!   `{latestversion}` directories
//! - Locating input files and gating them by the years in their names
//! - Applying dataset-specific metadata and data fixes
//! - Deriving variables from their inputs
//! - Merging new output into existing files without losing data
//! - Writing metadata sidecars and citation records

pub mod config;
pub mod constants;
pub mod error;
pub mod models;

// Core application modules
pub mod app {
    pub mod cube;
    pub mod services {
        pub mod citation;
        pub mod concatenation;
        pub mod data_finder;
        pub mod derive;
        pub mod fixes;
        pub mod metadata_writer;
    }
    pub mod adapters {
        pub mod cube_store;
        pub mod filesystem;
    }
}

// CLI modules
pub mod cli {
    pub mod args;
    pub mod commands;
}

// Re-export commonly used types
pub use app::cube::Cube;
pub use config::Config;
pub use error::{DrsError, Result};
pub use models::{DatasetDescriptor, FileRecord, TagValue, YearRange};
