//! ISCCP cloud area fractions for optical thickness and pressure classes

use super::{DerivedVariable, RequiredVariable};
use crate::app::cube::{Aggregator, Cube, extract_strict};
use crate::error::{DrsError, Result};

const OPTICAL_THICKNESS: &str = "atmosphere_optical_thickness_due_to_cloud";
const AIR_PRESSURE: &str = "air_pressure";

/// Sum of `clisccp` over the selected optical thickness and pressure bins
pub fn cloud_area_fraction(
    cubes: &[Cube],
    tau: impl Fn(f64) -> bool,
    plev: impl Fn(f64) -> bool,
) -> Result<Cube> {
    let clisccp = &cubes[extract_strict(cubes, "isccp_cloud_area_fraction")?];
    let empty = || DrsError::cube("No ISCCP bins in the requested class");

    let selected = clisccp.extract_where(OPTICAL_THICKNESS, tau)?.ok_or_else(empty)?;
    let selected = selected.extract_where(AIR_PRESSURE, plev)?.ok_or_else(empty)?;
    selected.collapsed(&[OPTICAL_THICKNESS, AIR_PRESSURE], Aggregator::Sum)
}

fn clisccp() -> Vec<RequiredVariable> {
    vec![RequiredVariable::new("clisccp")]
}

/// Low level thick clouds: optical thickness above 23, pressure above 680 hPa
pub struct Clltkisccp;

impl DerivedVariable for Clltkisccp {
    fn required(&self, _project: &str) -> Vec<RequiredVariable> {
        clisccp()
    }

    fn calculate(&self, cubes: &[Cube]) -> Result<Cube> {
        cloud_area_fraction(cubes, |t| t > 23.0, |p| p > 68000.0)
    }
}

/// High level medium-thickness clouds: optical thickness in (3.6, 23],
/// pressure at most 440 hPa
pub struct Clhmtisccp;

impl DerivedVariable for Clhmtisccp {
    fn required(&self, _project: &str) -> Vec<RequiredVariable> {
        clisccp()
    }

    fn calculate(&self, cubes: &[Cube]) -> Result<Cube> {
        cloud_area_fraction(cubes, |t| 3.6 < t && t <= 23.0, |p| p <= 44000.0)
    }
}
