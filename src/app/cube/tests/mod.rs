//! Tests for the cube model and its operations
//!
//! The fixtures here are shared with the service tests that need cubes.

pub mod cube_tests;

use super::{Coord, Cube};
use ndarray::{ArrayD, IxDyn};

/// Time units used by all fixtures
pub const TIME_UNITS: &str = "days since 1850-01-01";

/// Monthly cube on a 360-day calendar with a 2x2 grid
///
/// Each value is `base + month index`, so the source of every slice can be
/// told apart after merging.
pub fn monthly_cube(var_name: &str, first_year: i32, n_years: usize, base: f64) -> Cube {
    let n_months = n_years * 12;
    let offset = (first_year - 1850) as f64 * 360.0;
    let points: Vec<f64> = (0..n_months).map(|m| offset + m as f64 * 30.0 + 15.0).collect();
    let time = Coord::time(TIME_UNITS, "360_day", points);
    let latitude = Coord::new("lat", "degrees_north", vec![-10.0, 10.0]).with_standard_name("latitude");
    let longitude = Coord::new("lon", "degrees_east", vec![0.0, 90.0]).with_standard_name("longitude");

    let values: Vec<f64> = (0..n_months)
        .flat_map(|m| std::iter::repeat(base + m as f64).take(4))
        .collect();
    let data = ArrayD::from_shape_vec(IxDyn(&[n_months, 2, 2]), values).unwrap();

    Cube::new(var_name, "K", data, vec![time, latitude, longitude])
        .unwrap()
        .with_standard_name("air_temperature")
        .with_attribute("frequency", "mon")
}

/// Cube with only a time axis, one value per point
pub fn series_cube(var_name: &str, points: Vec<f64>, values: Vec<f64>) -> Cube {
    let n = points.len();
    let time = Coord::time(TIME_UNITS, "360_day", points);
    let data = ArrayD::from_shape_vec(IxDyn(&[n]), values).unwrap();
    Cube::new(var_name, "1", data, vec![time]).unwrap()
}

/// First value of every time step of a monthly fixture
pub fn first_values(cube: &Cube) -> Vec<f64> {
    let data = cube.array().unwrap();
    data.outer_iter()
        .map(|slice| slice.iter().next().copied().unwrap())
        .collect()
}
