//! Tests for derived variables

pub mod derive_tests;

use crate::app::cube::tests::TIME_UNITS;
use crate::app::cube::{Coord, Cube};
use ndarray::{ArrayD, IxDyn};

/// `clisccp` with one time step and 3x3 optical thickness / pressure bins
///
/// The value of bin (tau index i, pressure index j) is `10^i * (j + 1)`.
pub fn clisccp_cube() -> Cube {
    let time = Coord::time(TIME_UNITS, "360_day", vec![15.0]);
    let tau = Coord::new("tau", "1", vec![10.0, 30.0, 60.0])
        .with_standard_name("atmosphere_optical_thickness_due_to_cloud");
    let plev = Coord::new("plev", "Pa", vec![90000.0, 50000.0, 30000.0]).with_standard_name("air_pressure");
    let values: Vec<f64> = (0..3)
        .flat_map(|i| (0..3).map(move |j| 10f64.powi(i) * (j + 1) as f64))
        .collect();
    let data = ArrayD::from_shape_vec(IxDyn(&[1, 3, 3]), values).unwrap();
    Cube::new("clisccp", "%", data, vec![time, tau, plev])
        .unwrap()
        .with_standard_name("isccp_cloud_area_fraction")
}

/// Overturning streamfunction over (time, region, depth, latitude)
///
/// Values encode their position so the selected cell can be recognised;
/// the shallowest level holds the largest values.
pub fn msftmyz_cube() -> Cube {
    let time = Coord::time(TIME_UNITS, "360_day", vec![15.0]);
    let mut region = Coord::new("region", "1", vec![0.0, 1.0]);
    region
        .attributes
        .insert("flag_meanings".to_string(), "global_ocean atlantic_arctic_ocean".into());
    let depth = Coord::new("lev", "m", vec![100.0, 1000.0, 2000.0]).with_standard_name("depth");
    let latitude = Coord::new("rlat", "degrees_north", vec![0.0, 26.0, 40.0]).with_standard_name("latitude");

    let mut values = Vec::new();
    for r in 0..2 {
        for d in 0..3 {
            for l in 0..3 {
                let depth_part = if d == 0 { 50 } else { d * 10 };
                values.push((r * 100 + depth_part + l) as f64);
            }
        }
    }
    let data = ArrayD::from_shape_vec(IxDyn(&[1, 2, 3, 3]), values).unwrap();
    Cube::new("msftmyz", "kg s-1", data, vec![time, region, depth, latitude])
        .unwrap()
        .with_standard_name("ocean_meridional_overturning_mass_streamfunction")
}
