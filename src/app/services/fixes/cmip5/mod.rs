//! Fixes for CMIP5 models

pub mod ec_earth;
