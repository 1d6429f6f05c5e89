//! Tests for the data finder
//!
//! Template, version and date logic run against the in-memory filesystem
//! and cube store; a few tests use a temporary directory on disk.

pub mod dates_tests;
pub mod selection_tests;
pub mod tags_tests;
pub mod version_tests;

use crate::app::adapters::filesystem::MemoryFileSystem;
use crate::config::Config;
use crate::models::DatasetDescriptor;
use std::path::PathBuf;

/// Directory of the CMIP5 `tas` fixture below the version level
pub const CMIP5_VERSION_PARENT: &str = "/cmip5/ICHEC/EC-EARTH/historical/mon/atmos/Amon/r1i1p1";

/// A monthly CMIP5 request for 1990-1999
pub fn cmip5_descriptor() -> DatasetDescriptor {
    DatasetDescriptor::new()
        .with("project", "CMIP5")
        .with("dataset", "EC-EARTH")
        .with("institute", "ICHEC")
        .with("exp", "historical")
        .with("ensemble", "r1i1p1")
        .with("mip", "Amon")
        .with("frequency", "mon")
        .with("modeling_realm", "atmos")
        .with("short_name", "tas")
        .with("start_year", 1990)
        .with("end_year", 1999)
}

/// CMIP5 data under `/cmip5` in the DKRZ layout
pub fn dkrz_config() -> Config {
    Config::default()
        .with_rootpath("CMIP5", vec![PathBuf::from("/cmip5")])
        .with_drs("CMIP5", "DKRZ")
}

/// Two versions of decadal `tas` files in the DKRZ layout
pub fn dkrz_filesystem() -> MemoryFileSystem {
    let mut fs = MemoryFileSystem::new();
    for version in ["v20120101", "v20130101"] {
        for decade in ["198001-198912", "199001-199912", "200001-200512"] {
            fs.add_file(format!(
                "{}/{}/tas/tas_Amon_EC-EARTH_historical_r1i1p1_{}.nc",
                CMIP5_VERSION_PARENT, version, decade
            ));
        }
    }
    fs
}
