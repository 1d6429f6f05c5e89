//! Tests for saving and concatenation

pub mod engine_tests;

use chrono::{DateTime, TimeZone, Utc};

/// Clock fixed at 2024-03-01 12:30:45 UTC
pub fn fixed_clock() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 45).unwrap()
}

pub const FIXED_STAMP: &str = "20240301_123045";
