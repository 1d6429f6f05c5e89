//! Fixes for CMIP6 models

pub mod canesm5_canoe;
pub mod ipsl_cm6a_lr;
