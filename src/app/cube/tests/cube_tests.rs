//! Tests for cube construction, coordinates and data access

use super::*;
use crate::app::cube::LazyData;
use crate::error::DrsError;
use std::cell::Cell;
use std::rc::Rc;

#[test]
fn test_new_rejects_coordinate_length_mismatch() {
    let time = Coord::time(TIME_UNITS, "standard", vec![0.0, 1.0]);
    let data = ArrayD::from_shape_vec(IxDyn(&[3]), vec![1.0, 2.0, 3.0]).unwrap();

    let result = Cube::new("tas", "K", data, vec![time]);
    assert!(matches!(result, Err(DrsError::CubeOperation { .. })));
}

#[test]
fn test_coordinate_lookup_by_any_name() {
    let cube = monthly_cube("tas", 2000, 1, 0.0);

    assert!(cube.has_coord("lat"));
    assert!(cube.has_coord("latitude"));
    assert_eq!(cube.coord_dims("longitude").unwrap(), vec![2]);
    assert_eq!(cube.time_dim().unwrap(), 0);
    assert!(cube.coord("height").is_err());
}

#[test]
fn test_add_aux_coord_checks_shape() {
    let mut cube = monthly_cube("tas", 2000, 1, 0.0);

    let wrong = Coord::new("area", "m2", vec![1.0, 2.0, 3.0]);
    assert!(cube.add_aux_coord(wrong, vec![1]).is_err());

    let right = Coord::new("area", "m2", vec![1.0, 2.0]);
    cube.add_aux_coord(right, vec![1]).unwrap();
    assert_eq!(cube.coord_dims("area").unwrap(), vec![1]);

    let scalar = Coord::scalar("height", "m", 2.0);
    cube.add_aux_coord(scalar, vec![]).unwrap();
    assert!(cube.coord_dims("height").unwrap().is_empty());
}

#[test]
fn test_lazy_data_is_loaded_once_realized() {
    let calls = Rc::new(Cell::new(0));
    let counter = Rc::clone(&calls);
    let lazy = LazyData::new(vec![2], move || {
        counter.set(counter.get() + 1);
        Ok(ArrayD::from_shape_vec(IxDyn(&[2]), vec![5.0, 6.0])?)
    });
    let time = Coord::time(TIME_UNITS, "standard", vec![0.0, 1.0]);
    let mut cube = Cube::lazy("pr", "kg m-2 s-1", lazy, vec![time]).unwrap();

    assert!(cube.has_lazy_data());
    assert_eq!(cube.array().unwrap()[[0]], 5.0);
    assert!(cube.has_lazy_data());

    cube.realize().unwrap();
    assert!(!cube.has_lazy_data());
    assert_eq!(cube.data().unwrap()[[1]], 6.0);
    assert_eq!(calls.get(), 2);
}

#[test]
fn test_lazy_data_with_wrong_shape_fails() {
    let lazy = LazyData::new(vec![3], || Ok(ArrayD::zeros(IxDyn(&[2]))));
    let time = Coord::time(TIME_UNITS, "standard", vec![0.0, 1.0, 2.0]);
    let mut cube = Cube::lazy("pr", "1", lazy, vec![time]).unwrap();

    assert!(cube.realize().is_err());
}

#[test]
fn test_guess_bounds_uses_midpoints() {
    let mut coord = Coord::new("lat", "degrees", vec![0.0, 10.0, 30.0]);
    coord.guess_bounds().unwrap();

    let bounds = coord.bounds.unwrap();
    assert_eq!(bounds.shape(), &[3, 2]);
    let flat: Vec<f64> = bounds.iter().copied().collect();
    assert_eq!(flat, vec![-5.0, 5.0, 5.0, 20.0, 20.0, 40.0]);
}

#[test]
fn test_mask_where_and_scale() {
    let mut cube = series_cube("tos", vec![15.0, 45.0, 75.0], vec![273.15, 280.0, 273.15]);

    assert_eq!(cube.mask_where(|v| v == 273.15).unwrap(), 2);
    cube.scale(2.0).unwrap();

    let data = cube.data().unwrap();
    assert!(data[[0]].is_nan());
    assert_eq!(data[[1]], 560.0);
}

#[test]
fn test_summary_lists_dimensions() {
    let cube = monthly_cube("tas", 2000, 1, 0.0);
    assert_eq!(
        cube.summary(),
        "air_temperature / (K) (time: 12; latitude: 2; longitude: 2)"
    );
}
