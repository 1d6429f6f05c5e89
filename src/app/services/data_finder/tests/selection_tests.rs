//! Tests for time-window selection

use crate::app::adapters::cube_store::MemoryCubeStore;
use crate::app::services::data_finder::select_files;
use crate::error::DrsError;
use crate::models::{FileRecord, YearRange};

fn decade_file() -> Vec<FileRecord> {
    vec![FileRecord::new("/data/tas_Amon_MODEL_1990-1999.nc")]
}

#[test]
fn test_overlapping_windows_keep_file() {
    let store = MemoryCubeStore::new();

    let kept = select_files(decade_file(), YearRange::new(1995, 2000), &store).unwrap();
    assert_eq!(kept.len(), 1);
    let kept = select_files(decade_file(), YearRange::new(1980, 1990), &store).unwrap();
    assert_eq!(kept.len(), 1);
}

#[test]
fn test_disjoint_window_excludes_file() {
    let store = MemoryCubeStore::new();

    let kept = select_files(decade_file(), YearRange::new(2000, 2010), &store).unwrap();
    assert!(kept.is_empty());
}

#[test]
fn test_cached_years_are_reused() {
    let store = MemoryCubeStore::new();
    let mut record = FileRecord::new("/data/no_dates_here.nc");
    record.set_years(YearRange::new(1850, 1900));

    let kept = select_files(vec![record], YearRange::new(1880, 1890), &store).unwrap();
    assert_eq!(kept.len(), 1);
}

#[test]
fn test_parse_failure_propagates() {
    let store = MemoryCubeStore::new();
    let files = vec![
        FileRecord::new("/data/tas_1990-1999.nc"),
        FileRecord::new("/data/tas_fixed.nc"),
    ];

    let err = select_files(files, YearRange::new(1990, 2000), &store).unwrap_err();
    assert!(matches!(err, DrsError::UnreadableFile { .. }));
}
