//! Fixes for IPSL-CM6A-LR

use crate::app::cube::{Cube, extract_strict};
use crate::app::services::fixes::registry::{ALL_VARIABLES, Fix, FixRegistry};
use crate::app::services::fixes::shared::cube_to_aux_coord;
use crate::error::Result;

pub fn register(registry: &mut FixRegistry) {
    registry.register("CMIP6", "IPSL-CM6A-LR", ALL_VARIABLES, AllVars);
}

/// Cell areas stored as a separate cube
///
/// The `cell_area` cube becomes an auxiliary coordinate on the latitude
/// axes of every other cube, whose latitude and longitude var names are
/// set to `lat` and `lon`.
pub struct AllVars;

impl Fix for AllVars {
    fn fix_metadata(&self, cubes: Vec<Cube>) -> Result<Vec<Cube>> {
        let Ok(index) = extract_strict(&cubes, "cell_area") else {
            return Ok(cubes);
        };
        let cell_area = cube_to_aux_coord(&cubes[index])?;

        let mut fixed = Vec::with_capacity(cubes.len() - 1);
        for (i, mut cube) in cubes.into_iter().enumerate() {
            if i == index {
                continue;
            }
            let dims = cube.coord_dims("latitude")?;
            cube.add_aux_coord(cell_area.clone(), dims)?;
            cube.coord_mut("latitude")?.var_name = "lat".to_string();
            cube.coord_mut("longitude")?.var_name = "lon".to_string();
            fixed.push(cube);
        }
        Ok(fixed)
    }
}
