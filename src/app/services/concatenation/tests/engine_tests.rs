//! Tests for the concatenation engine

use super::*;
use crate::app::adapters::cube_store::{CubeStore, MemoryCubeStore, SaveOptions};
use crate::app::cube::{AttributeValue, check_frequency};
use crate::app::cube::tests::{first_values, monthly_cube};
use crate::app::services::concatenation::{ConcatenationEngine, ConcatenationOutcome};
use std::path::{Path, PathBuf};

const TARGET: &str = "/preproc/diag/tas/CMIP6_MODEL_Amon_historical_r1i1p1f1_tas.nc";

fn engine(store: &MemoryCubeStore) -> ConcatenationEngine<'_> {
    ConcatenationEngine::new(store, SaveOptions::default()).with_clock(fixed_clock)
}

#[test]
fn test_missing_target_is_written_directly() {
    let store = MemoryCubeStore::new();

    let outcome = engine(&store)
        .concatenate_output(vec![monthly_cube("tas", 2000, 1, 0.0)], Path::new(TARGET))
        .unwrap();

    assert_eq!(outcome, ConcatenationOutcome::DirectWrite);
    assert_eq!(store.paths(), vec![PathBuf::from(TARGET)]);
}

#[test]
fn test_overlapping_year_is_taken_from_new_cube() {
    let store = MemoryCubeStore::new();
    store.insert(TARGET, vec![monthly_cube("tas", 2000, 6, 0.0)]);
    let new_cube = monthly_cube("tas", 2005, 6, 1000.0);

    let outcome = engine(&store)
        .concatenate_output(vec![new_cube], Path::new(TARGET))
        .unwrap();

    assert_eq!(
        outcome,
        ConcatenationOutcome::Merged {
            overwritten_years: vec![2005]
        }
    );
    let merged = store.get(TARGET).unwrap();
    assert_eq!(merged.len(), 1);
    let merged = &merged[0];
    assert_eq!(merged.shape()[0], 11 * 12);
    let values = first_values(merged);
    // 2004 from the old file, 2005 onwards from the new cube
    assert_eq!(values[4 * 12], 48.0);
    assert_eq!(values[5 * 12], 1000.0);
    assert_eq!(values[10 * 12 + 11], 1071.0);
    assert_eq!(merged.attributes["start_year"], AttributeValue::Int(2000));
    assert_eq!(merged.attributes["end_year"], AttributeValue::Int(2010));
    assert!(merged.has_coord("day_of_year"));
    assert!(!merged.has_lazy_data());
}

#[test]
fn test_multi_cube_batch_is_saved_individually() {
    let store = MemoryCubeStore::new();
    store.insert(TARGET, vec![monthly_cube("tas", 2000, 1, 0.0)]);
    let batch = vec![
        monthly_cube("tas", 2001, 1, 0.0)
            .with_attribute("start_year", 2001)
            .with_attribute("end_year", 2001),
        monthly_cube("tas", 2002, 1, 0.0),
    ];

    let outcome = engine(&store).concatenate_output(batch, Path::new(TARGET)).unwrap();

    let written = match outcome {
        ConcatenationOutcome::IndividualFallback { written, reason } => {
            assert!(reason.contains("more than one element, got 2"));
            written
        }
        other => panic!("Expected individual fallback, got {:?}", other),
    };
    let stem = "/preproc/diag/tas/CMIP6_MODEL_Amon_historical_r1i1p1f1_tas_2001-2001";
    assert_eq!(
        written,
        vec![
            PathBuf::from(format!("{}_{}_0.nc.FAILED", stem, FIXED_STAMP)),
            PathBuf::from(format!("{}_{}_1.nc.FAILED", stem, FIXED_STAMP)),
        ]
    );
    // The existing file is untouched
    assert_eq!(store.get(TARGET).unwrap()[0].shape()[0], 12);
    assert_eq!(store.paths().len(), 3);
}

#[test]
fn test_corrupt_target_is_moved_aside() {
    let store = MemoryCubeStore::new();
    store.insert_corrupt(TARGET, "NetCDF: HDF error");

    let outcome = engine(&store)
        .concatenate_output(vec![monthly_cube("tas", 2000, 1, 0.0)], Path::new(TARGET))
        .unwrap();

    let moved_to = PathBuf::from(format!(
        "/preproc/diag/tas/CMIP6_MODEL_Amon_historical_r1i1p1f1_tas_{}.nc.FAILED",
        FIXED_STAMP
    ));
    assert_eq!(
        outcome,
        ConcatenationOutcome::ReplacedCorrupt {
            moved_to: moved_to.clone()
        }
    );
    assert!(store.exists(&moved_to));
    assert_eq!(store.get(TARGET).unwrap().len(), 1);
}

#[test]
fn test_inconsistent_cubes_fall_back() {
    let store = MemoryCubeStore::new();
    store.insert(TARGET, vec![monthly_cube("tas", 2000, 2, 0.0)]);
    let mut new_cube = monthly_cube("tas", 2002, 1, 0.0);
    new_cube.coord_mut("latitude").unwrap().points[[1]] = 45.0;

    let outcome = engine(&store)
        .concatenate_output(vec![new_cube], Path::new(TARGET))
        .unwrap();

    match outcome {
        ConcatenationOutcome::IndividualFallback { reason, written } => {
            assert!(reason.starts_with("Could not concatenate old and new cube along time"));
            assert_eq!(written.len(), 1);
            assert!(store.exists(&written[0]));
        }
        other => panic!("Expected individual fallback, got {:?}", other),
    }
    assert_eq!(store.get(TARGET).unwrap()[0].shape()[0], 24);
}

#[test]
fn test_old_file_with_several_cubes_falls_back() {
    let store = MemoryCubeStore::new();
    store.insert(
        TARGET,
        vec![monthly_cube("tas", 2000, 1, 0.0), monthly_cube("tas", 2001, 1, 0.0)],
    );

    let outcome = engine(&store)
        .concatenate_output(vec![monthly_cube("tas", 2002, 1, 0.0)], Path::new(TARGET))
        .unwrap();

    assert!(matches!(
        outcome,
        ConcatenationOutcome::IndividualFallback { .. }
    ));
}

#[test]
fn test_merge_without_frequency_attribute_still_succeeds() {
    let store = MemoryCubeStore::new();
    let mut old = monthly_cube("tas", 2000, 1, 0.0);
    old.attributes.remove("frequency");
    store.insert(TARGET, vec![old]);
    let mut new_cube = monthly_cube("tas", 2001, 1, 0.0);
    new_cube.attributes.remove("frequency");

    let outcome = engine(&store)
        .concatenate_output(vec![new_cube], Path::new(TARGET))
        .unwrap();

    assert_eq!(
        outcome,
        ConcatenationOutcome::Merged {
            overwritten_years: vec![]
        }
    );
}

#[test]
fn test_gap_in_merged_series_is_not_fatal() {
    let store = MemoryCubeStore::new();
    store.insert(TARGET, vec![monthly_cube("tas", 2000, 1, 0.0)]);
    let new_cube = monthly_cube("tas", 2002, 1, 100.0);

    let outcome = engine(&store)
        .concatenate_output(vec![new_cube], Path::new(TARGET))
        .unwrap();

    assert_eq!(
        outcome,
        ConcatenationOutcome::Merged {
            overwritten_years: vec![]
        }
    );
    let merged = &store.get(TARGET).unwrap()[0];
    assert_eq!(merged.shape(), &[24, 2, 2]);
    assert_eq!(merged.attributes["start_year"], AttributeValue::Int(2000));
    assert_eq!(merged.attributes["end_year"], AttributeValue::Int(2002));
    assert!(check_frequency(merged.coord("time").unwrap(), "mon").unwrap().is_some());
}

#[test]
fn test_empty_batch_writes_nothing() {
    let store = MemoryCubeStore::new();

    let outcome = engine(&store)
        .concatenate_output(Vec::new(), Path::new(TARGET))
        .unwrap();

    assert_eq!(outcome, ConcatenationOutcome::Empty);
    assert!(!store.exists(Path::new(TARGET)));
}
