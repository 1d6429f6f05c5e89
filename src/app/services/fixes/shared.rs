//! Helpers shared by several fixes

use crate::app::cube::{Coord, Cube};
use crate::error::{DrsError, Result};

/// Add a scalar `height` coordinate, e.g. 2 m for near-surface air temperature
pub fn add_scalar_height_coord(cube: &mut Cube, height: f64) -> Result<()> {
    let mut coord = Coord::scalar("height", "m", height)
        .with_standard_name("height")
        .with_long_name("height");
    coord.attributes.insert("positive".to_string(), "up".into());
    cube.add_aux_coord(coord, Vec::new())
}

/// Turn a cube into a coordinate holding its data
pub fn cube_to_aux_coord(cube: &Cube) -> Result<Coord> {
    let mut coord = Coord::with_points(cube.var_name.clone(), cube.units.clone(), cube.array()?.into_owned());
    coord.standard_name = cube.standard_name.clone();
    coord.long_name = cube.long_name.clone();
    Ok(coord)
}

/// The only cube of a list with the given var name
pub fn get_cube_from_list<'a>(cubes: &'a mut [Cube], short_name: &str) -> Result<&'a mut Cube> {
    cubes
        .iter_mut()
        .find(|cube| cube.var_name == short_name)
        .ok_or_else(|| DrsError::cube(format!("Cube for variable '{}' not found", short_name)))
}
