//! Fixes for EC-EARTH

use crate::app::cube::{CalendarDate, Cube, extract_strict};
use crate::app::services::fixes::registry::{ALL_VARIABLES, Fix, FixRegistry};
use crate::app::services::fixes::shared::{add_scalar_height_coord, cube_to_aux_coord};
use crate::error::Result;
use tracing::debug;

pub fn register(registry: &mut FixRegistry) {
    registry.register("CMIP5", "EC-EARTH", ALL_VARIABLES, AllVars);
    registry.register("CMIP5", "EC-EARTH", "sic", PercentFromFraction);
    registry.register("CMIP5", "EC-EARTH", "sftlf", PercentFromFraction);
    registry.register("CMIP5", "EC-EARTH", "tos", Tos);
    registry.register("CMIP5", "EC-EARTH", "tas", Tas);
    registry.register("CMIP5", "EC-EARTH", "areacello", Areacello);
}

fn next_month(date: CalendarDate) -> CalendarDate {
    if date.month == 12 {
        CalendarDate {
            year: date.year + 1,
            month: 1,
            ..date
        }
    } else {
        CalendarDate {
            month: date.month + 1,
            ..date
        }
    }
}

/// Time points that were written as trailing zeros
///
/// Each zero after the first point is replaced by the next step: one
/// calendar month when the first step looks monthly, else the first step.
/// Bounds are rebuilt afterwards.
pub struct AllVars;

impl AllVars {
    fn repair_time(cube: &mut Cube) -> Result<()> {
        if !cube.has_coord("time") {
            return Ok(());
        }
        let time = cube.coord("time")?;
        let mut points = time.values();
        if points.len() < 2 {
            return Ok(());
        }
        let unit = time.time_unit()?;
        let step = points[1] - points[0];
        let step_days = step * unit.days_per_step();

        let mut repaired = 0;
        for idx in 1..points.len() {
            if points[idx] != 0.0 {
                continue;
            }
            points[idx] = if (28.0..=31.0).contains(&step_days) {
                let previous = unit.num2date(points[idx - 1])?;
                unit.date2num(&next_month(previous))?
            } else {
                points[idx - 1] + step
            };
            repaired += 1;
        }
        if repaired > 0 {
            debug!("Repaired {} zero time points of {}", repaired, cube.name());
        }

        let time = cube.coord_mut("time")?;
        for (point, value) in time.points.iter_mut().zip(points) {
            *point = value;
        }
        time.bounds = None;
        time.guess_bounds()
    }
}

impl Fix for AllVars {
    fn fix_metadata(&self, mut cubes: Vec<Cube>) -> Result<Vec<Cube>> {
        for cube in &mut cubes {
            Self::repair_time(cube)?;
        }
        Ok(cubes)
    }
}

/// Fractions stored where percentages are declared
pub struct PercentFromFraction;

impl Fix for PercentFromFraction {
    fn fix_data(&self, mut cube: Cube) -> Result<Cube> {
        cube.scale(100.0)?;
        Ok(cube)
    }
}

/// Land points filled with the freezing point instead of masked
pub struct Tos;

impl Fix for Tos {
    fn fix_data(&self, mut cube: Cube) -> Result<Cube> {
        cube.mask_where(|v| v == 273.15)?;
        Ok(cube)
    }
}

/// Missing 2 m height coordinate and time long name
pub struct Tas;

impl Fix for Tas {
    fn fix_metadata(&self, mut cubes: Vec<Cube>) -> Result<Vec<Cube>> {
        for cube in &mut cubes {
            let has_height = cube.coords().iter().any(|(c, _)| c.var_name == "height");
            if !has_height {
                add_scalar_height_coord(cube, 2.0)?;
            }
            if cube.has_coord("time") {
                let time = cube.coord_mut("time")?;
                if time.long_name.is_none() {
                    time.long_name = Some("time".to_string());
                }
            }
        }
        Ok(cubes)
    }
}

/// Latitude and longitude stored as separate cubes next to the cell areas
pub struct Areacello;

impl Fix for Areacello {
    fn fix_metadata(&self, cubes: Vec<Cube>) -> Result<Vec<Cube>> {
        let mut areacello = cubes[extract_strict(&cubes, "Areas of grid cell")?].clone();
        let latitude = cube_to_aux_coord(&cubes[extract_strict(&cubes, "latitude")?])?;
        let longitude = cube_to_aux_coord(&cubes[extract_strict(&cubes, "longitude")?])?;

        areacello.add_aux_coord(latitude, vec![0, 1])?;
        areacello.add_aux_coord(longitude, vec![0, 1])?;
        Ok(vec![areacello])
    }
}
