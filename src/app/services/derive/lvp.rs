//! Latent heat release from precipitation

use super::{DerivedVariable, RequiredVariable};
use crate::app::cube::{Cube, extract_strict};
use crate::error::Result;

/// `lvp = hfls * pr / evspsbl`
pub struct Lvp;

impl DerivedVariable for Lvp {
    fn required(&self, _project: &str) -> Vec<RequiredVariable> {
        ["hfls", "pr", "evspsbl"]
            .into_iter()
            .map(RequiredVariable::new)
            .collect()
    }

    fn calculate(&self, cubes: &[Cube]) -> Result<Cube> {
        let hfls = &cubes[extract_strict(cubes, "surface_upward_latent_heat_flux")?];
        let pr = &cubes[extract_strict(cubes, "precipitation_flux")?];
        let evspsbl = &cubes[extract_strict(cubes, "water_evaporation_flux")?];

        hfls.multiply(&pr.divide(evspsbl)?)
    }
}
