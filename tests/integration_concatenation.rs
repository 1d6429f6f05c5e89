//! Integration tests for saving and concatenating cubes
//!
//! Output goes through the public save path into an in-memory cube store,
//! and is then read back the way the data finder reads input files.

use drs_processor::app::adapters::cube_store::{CubeStore, MemoryCubeStore};
use drs_processor::app::cube::{Coord, Cube};
use drs_processor::app::services::concatenation::{SaveSettings, save};
use drs_processor::app::services::data_finder::{get_start_end_year, select_files};
use drs_processor::{FileRecord, YearRange};
use ndarray::{ArrayD, IxDyn};
use std::path::{Path, PathBuf};

const TIME_UNITS: &str = "days since 1850-01-01";

/// Monthly 360-day cube on a single grid point, valued `base + month index`
fn monthly_cube(first_year: i32, n_years: usize, base: f64) -> Cube {
    let n_months = n_years * 12;
    let offset = (first_year - 1850) as f64 * 360.0;
    let points: Vec<f64> = (0..n_months).map(|m| offset + m as f64 * 30.0 + 15.0).collect();
    let time = Coord::time(TIME_UNITS, "360_day", points);
    let latitude = Coord::new("lat", "degrees_north", vec![45.0]).with_standard_name("latitude");
    let values: Vec<f64> = (0..n_months).map(|m| base + m as f64).collect();
    let data = ArrayD::from_shape_vec(IxDyn(&[n_months, 1]), values).unwrap();

    Cube::new("tas", "K", data, vec![time, latitude])
        .unwrap()
        .with_standard_name("air_temperature")
        .with_attribute("frequency", "mon")
}

fn years_in_file(store: &MemoryCubeStore, path: &Path) -> YearRange {
    let cubes = store.get(path).unwrap();
    let dates = cubes[0].coord("time").unwrap().dates().unwrap();
    YearRange::new(dates[0].year, dates[dates.len() - 1].year)
}

/// Successive batches merged into one file keep every year once, newer
/// data winning where batches overlap
#[test]
fn test_successive_batches_build_one_series() {
    let store = MemoryCubeStore::new();
    let target = Path::new("/preproc/diag/tas/CMIP6_MODEL_Amon_historical_r1_tas.nc");
    let settings = SaveSettings::default()
        .with_concatenate_output()
        .with_optimize_access("timeseries");

    save(vec![monthly_cube(2000, 3, 0.0)], target, &settings, &store).unwrap();
    save(vec![monthly_cube(2003, 2, 100.0)], target, &settings, &store).unwrap();
    save(vec![monthly_cube(2004, 2, 500.0)], target, &settings, &store).unwrap();

    assert_eq!(store.paths(), vec![target.to_path_buf()]);
    assert_eq!(years_in_file(&store, target), YearRange::new(2000, 2005));

    let cube = &store.get(target).unwrap()[0];
    assert_eq!(cube.shape(), &[72, 1]);
    let data = cube.array().unwrap();
    // January 2003 from the second batch, January 2004 from the third
    assert_eq!(data[[36, 0]], 100.0);
    assert_eq!(data[[48, 0]], 500.0);
    assert_eq!(data[[71, 0]], 523.0);
}

/// A second batch with two cubes is never merged and the existing file
/// is left as it was
#[test]
fn test_multi_cube_batch_leaves_existing_file_untouched() {
    let store = MemoryCubeStore::new();
    let target = Path::new("/preproc/tas.nc");
    let settings = SaveSettings::default().with_concatenate_output();

    save(vec![monthly_cube(2000, 1, 0.0)], target, &settings, &store).unwrap();
    save(
        vec![monthly_cube(2001, 1, 10.0), monthly_cube(2002, 1, 20.0)],
        target,
        &settings,
        &store,
    )
    .unwrap();

    assert_eq!(years_in_file(&store, target), YearRange::new(2000, 2000));
    let failed: Vec<PathBuf> = store
        .paths()
        .into_iter()
        .filter(|p| p.to_string_lossy().ends_with(".nc.FAILED"))
        .collect();
    assert_eq!(failed.len(), 2);
}

/// Files written and read back are selected for a time window exactly as
/// the cubes were before writing
#[test]
fn test_written_files_keep_window_membership() {
    let store = MemoryCubeStore::new();
    let window = YearRange::new(2004, 2010);
    let cubes = vec![
        ("/out/tas_early.nc", monthly_cube(2000, 2, 0.0)),
        ("/out/tas_late.nc", monthly_cube(2005, 2, 0.0)),
        ("/out/tas_2008-2012.nc", monthly_cube(2008, 5, 0.0)),
    ];

    let mut expected = Vec::new();
    for (path, cube) in &cubes {
        let dates = cube.coord("time").unwrap().dates().unwrap();
        let years = YearRange::new(dates[0].year, dates[dates.len() - 1].year);
        if years.overlaps(&window) {
            expected.push(PathBuf::from(path));
        }
    }

    let settings = SaveSettings::default().with_force_saving();
    for (path, cube) in cubes {
        save(vec![cube], Path::new(path), &settings, &store).unwrap();
    }

    let records: Vec<FileRecord> = store.paths().into_iter().map(FileRecord::new).collect();
    let selected: Vec<PathBuf> = select_files(records, window, &store)
        .unwrap()
        .into_iter()
        .map(FileRecord::into_path)
        .collect();

    let mut expected = expected;
    expected.sort();
    assert_eq!(selected, expected);
}

/// Years come from the file name when it has them and from the stored
/// time coordinate otherwise
#[test]
fn test_years_from_name_and_from_content_agree() {
    let store = MemoryCubeStore::new();
    let named = Path::new("/out/tas_Amon_MODEL_2003-2004.nc");
    let unnamed = Path::new("/out/tas_Amon_MODEL.nc");
    store
        .save(&[monthly_cube(2003, 2, 0.0)], unnamed, &Default::default())
        .unwrap();

    assert_eq!(
        get_start_end_year(named, &store).unwrap(),
        get_start_end_year(unnamed, &store).unwrap()
    );
}
