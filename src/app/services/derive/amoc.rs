//! Atlantic meridional overturning circulation at 26.5N

use super::{DerivedVariable, RequiredVariable};
use crate::app::cube::{Aggregator, Cube, extract_strict};
use crate::error::{DrsError, Result};

const ATLANTIC_REGION: &str = "atlantic_arctic_ocean";
const RAPID_LATITUDE: f64 = 26.5;
/// Shallower levels are dominated by the wind-driven mixed layer
const MIN_DEPTH: f64 = 500.0;

/// Maximum overturning below 500 m in the Atlantic at the RAPID array latitude
///
/// The `region` coordinate holds indices into the space-separated names
/// of its `flag_meanings` attribute.
pub struct Amoc;

fn region_index(cube: &Cube, region: &str) -> Result<f64> {
    let coord = cube.coord("region")?;
    let meanings = coord
        .attributes
        .get("flag_meanings")
        .and_then(|v| v.as_str())
        .ok_or_else(|| DrsError::cube("Region coordinate has no flag_meanings"))?;
    meanings
        .split_whitespace()
        .position(|name| name == region)
        .map(|i| i as f64)
        .ok_or_else(|| DrsError::cube(format!("Region '{}' not found in '{}'", region, meanings)))
}

impl DerivedVariable for Amoc {
    fn required(&self, project: &str) -> Vec<RequiredVariable> {
        // msftmyz was superseded by msftyz in CMIP6
        let short_name = if project == "CMIP6" { "msftyz" } else { "msftmyz" };
        vec![RequiredVariable::derived(short_name)]
    }

    fn calculate(&self, cubes: &[Cube]) -> Result<Cube> {
        let index = extract_strict(cubes, "ocean_y_overturning_mass_streamfunction")
            .or_else(|_| extract_strict(cubes, "ocean_meridional_overturning_mass_streamfunction"))?;
        let cube = &cubes[index];
        let missing = |what: &str| DrsError::cube(format!("No {} points left for AMOC", what));

        let atlantic = region_index(cube, ATLANTIC_REGION)?;
        let cube = cube
            .extract_where("region", |r| r == atlantic)?
            .ok_or_else(|| missing("region"))?;
        let cube = cube
            .extract_where("depth", |d| d >= MIN_DEPTH)?
            .ok_or_else(|| missing("depth"))?;

        let latitudes = cube.coord("latitude")?.values();
        let rapid = latitudes
            .iter()
            .copied()
            .min_by(|a, b| {
                (a - RAPID_LATITUDE)
                    .abs()
                    .total_cmp(&(b - RAPID_LATITUDE).abs())
            })
            .ok_or_else(|| missing("latitude"))?;
        let cube = cube
            .extract_where("latitude", |l| l == rapid)?
            .ok_or_else(|| missing("latitude"))?;

        cube.collapsed(&["depth", "region", "latitude"], Aggregator::Max)
    }
}
