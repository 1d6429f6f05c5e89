//! Tests for the file name date parser

use crate::app::adapters::cube_store::MemoryCubeStore;
use crate::app::cube::tests::{monthly_cube, series_cube};
use crate::app::cube::{Coord, Cube};
use crate::app::services::data_finder::{date_tokens, get_start_end_year};
use crate::error::DrsError;
use crate::models::YearRange;
use ndarray::{ArrayD, IxDyn};
use std::path::Path;

fn years(name: &str) -> YearRange {
    get_start_end_year(Path::new(name), &MemoryCubeStore::new()).unwrap()
}

#[test]
fn test_start_and_end_year_from_range() {
    assert_eq!(years("tas_Amon_MODEL_1950-1999.nc"), YearRange::new(1950, 1999));
    assert_eq!(
        years("/data/tas_Amon_EC-EARTH_historical_r1i1p1_185001-200512.nc"),
        YearRange::new(1850, 2005)
    );
}

#[test]
fn test_single_year() {
    assert_eq!(years("tas_2001.nc"), YearRange::new(2001, 2001));
    assert_eq!(years("19900101_tas_MODEL.nc"), YearRange::new(1990, 1990));
}

#[test]
fn test_dates_at_both_ends() {
    assert_eq!(years("2000_tas_2010.nc"), YearRange::new(2000, 2010));
}

#[test]
fn test_order_is_kept_when_start_after_end() {
    assert_eq!(years("tas_2005-2001.nc"), YearRange::new(2005, 2001));
}

#[test]
fn test_date_tokens_ignore_interior_numbers() {
    assert_eq!(
        date_tokens(Path::new("OBS_ERA5_reanaly_1_Amon_tas_1990-2000.nc")),
        vec!["1990", "2000"]
    );
    assert!(date_tokens(Path::new("tas_1990_Amon.nc")).is_empty());
    assert_eq!(
        date_tokens(Path::new("tas_1990-1995-2000.nc")),
        vec!["1990", "1995", "2000"]
    );
}

#[test]
fn test_three_tokens_fall_back_to_file_content() {
    let store = MemoryCubeStore::new();
    let path = Path::new("/data/tas_1990-1995-2000.nc");
    store.insert(path, vec![monthly_cube("tas", 2000, 2, 0.0)]);

    assert_eq!(get_start_end_year(path, &store).unwrap(), YearRange::new(2000, 2001));
}

#[test]
fn test_fallback_skips_cubes_without_time() {
    let store = MemoryCubeStore::new();
    let path = Path::new("/data/areacella.nc");
    let lat = Coord::new("lat", "degrees_north", vec![0.0, 1.0]);
    let area = Cube::new("areacella", "m2", ArrayD::zeros(IxDyn(&[2])), vec![lat]).unwrap();
    let points = vec![30.0 * 360.0 + 15.0, 31.0 * 360.0 + 15.0];
    store.insert(path, vec![area, series_cube("tas", points, vec![1.0, 2.0])]);

    assert_eq!(get_start_end_year(path, &store).unwrap(), YearRange::new(1880, 1881));
}

#[test]
fn test_no_time_coordinate_is_date_not_found() {
    let store = MemoryCubeStore::new();
    let path = Path::new("/data/tas_1990-1995-2000.nc");
    let lat = Coord::new("lat", "degrees_north", vec![0.0]);
    let cube = Cube::new("tas", "K", ArrayD::zeros(IxDyn(&[1])), vec![lat]).unwrap();
    store.insert(path, vec![cube]);

    assert!(matches!(
        get_start_end_year(path, &store),
        Err(DrsError::DateNotFound { .. })
    ));
}

#[test]
fn test_time_without_time_units_is_date_not_found() {
    let store = MemoryCubeStore::new();
    let path = Path::new("/data/tas_1990-1995-2000.nc");
    let time = Coord::new("time", "1", vec![0.0, 1.0]);
    let cube = Cube::new("tas", "K", ArrayD::zeros(IxDyn(&[2])), vec![time]).unwrap();
    store.insert(path, vec![cube]);

    assert!(matches!(
        get_start_end_year(path, &store),
        Err(DrsError::DateNotFound { .. })
    ));
}

#[test]
fn test_out_of_range_time_value_is_date_not_found() {
    let store = MemoryCubeStore::new();
    let path = Path::new("/data/tas_1990-1995-2000.nc");
    store.insert(path, vec![series_cube("tas", vec![15.0, 1e20], vec![1.0, 2.0])]);

    assert!(matches!(
        get_start_end_year(path, &store),
        Err(DrsError::DateNotFound { .. })
    ));
}

#[test]
fn test_unreadable_file() {
    let store = MemoryCubeStore::new();
    store.insert_corrupt("/data/tas.nc", "truncated");

    let err = get_start_end_year(Path::new("/data/tas.nc"), &store).unwrap_err();
    assert!(matches!(err, DrsError::UnreadableFile { .. }));
    assert!(get_start_end_year(Path::new("/data/missing.nc"), &store).is_err());
}
