//! Fixes for CanESM5-CanOE

use crate::app::cube::Cube;
use crate::app::services::fixes::registry::{Fix, FixRegistry};
use crate::app::services::fixes::shared::get_cube_from_list;
use crate::error::Result;

pub fn register(registry: &mut FixRegistry) {
    registry.register("CMIP6", "CanESM5-CanOE", "co2", Co2);
    registry.register("CMIP6", "CanESM5-CanOE", "gpp", Gpp);
}

/// Values in ppmv under units of mol mol-1
pub struct Co2;

impl Fix for Co2 {
    fn fix_metadata(&self, mut cubes: Vec<Cube>) -> Result<Vec<Cube>> {
        get_cube_from_list(&mut cubes, "co2")?.scale(1e-6)?;
        Ok(cubes)
    }
}

/// Ocean values set to 0 instead of masked
pub struct Gpp;

impl Fix for Gpp {
    fn fix_data(&self, mut cube: Cube) -> Result<Cube> {
        cube.mask_where(|v| v == 0.0)?;
        Ok(cube)
    }
}
