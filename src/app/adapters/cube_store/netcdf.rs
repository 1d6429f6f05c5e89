//! NetCDF cube store
//!
//! Every variable that is not a coordinate or a bounds variable becomes a
//! cube. Dimension variables become dimension coordinates and names listed
//! in a `coordinates` attribute become auxiliary coordinates. Cube data is
//! read lazily; coordinates are read eagerly.

use super::{CubeStore, SaveOptions};
use crate::app::cube::{AttributeValue, Attributes, Coord, Cube, LazyData};
use crate::error::{DrsError, Result};
use ndarray::{ArrayD, IxDyn};
use netcdf::{File, Variable};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

const BOUNDS_DIMENSION: &str = "bnds";

/// Attributes handled through dedicated cube or coordinate fields
const RESERVED_ATTRIBUTES: &[&str] = &[
    "units",
    "calendar",
    "standard_name",
    "long_name",
    "bounds",
    "coordinates",
    "_FillValue",
    "missing_value",
];

/// Reads and writes NetCDF files through libnetcdf
#[derive(Debug, Clone, Copy, Default)]
pub struct NetcdfStore;

fn to_attribute(value: netcdf::AttributeValue) -> Option<AttributeValue> {
    match value {
        netcdf::AttributeValue::Str(v) => Some(AttributeValue::Str(v)),
        netcdf::AttributeValue::Strs(v) => Some(AttributeValue::List(v)),
        netcdf::AttributeValue::Double(v) => Some(AttributeValue::Float(v)),
        netcdf::AttributeValue::Float(v) => Some(AttributeValue::Float(v as f64)),
        netcdf::AttributeValue::Int(v) => Some(AttributeValue::Int(v as i64)),
        netcdf::AttributeValue::Short(v) => Some(AttributeValue::Int(v as i64)),
        netcdf::AttributeValue::Longlong(v) => Some(AttributeValue::Int(v)),
        _ => None,
    }
}

fn from_attribute(value: &AttributeValue) -> netcdf::AttributeValue {
    match value {
        AttributeValue::Str(v) => netcdf::AttributeValue::Str(v.clone()),
        AttributeValue::List(v) => netcdf::AttributeValue::Strs(v.clone()),
        AttributeValue::Float(v) => netcdf::AttributeValue::Double(*v),
        AttributeValue::Int(v) => netcdf::AttributeValue::Longlong(*v),
    }
}

fn string_attribute(var: &Variable, name: &str) -> Option<String> {
    match var.attribute(name)?.value().ok()? {
        netcdf::AttributeValue::Str(value) => Some(value),
        _ => None,
    }
}

fn numeric_attribute(var: &Variable, name: &str) -> Option<f64> {
    to_attribute(var.attribute(name)?.value().ok()?)?.as_f64()
}

fn other_attributes(var: &Variable) -> Attributes {
    var.attributes()
        .filter(|attr| !RESERVED_ATTRIBUTES.contains(&attr.name()))
        .filter_map(|attr| {
            let value = to_attribute(attr.value().ok()?)?;
            Some((attr.name().to_string(), value))
        })
        .collect()
}

fn dimension_names(var: &Variable) -> Vec<String> {
    var.dimensions().iter().map(|d| d.name().to_string()).collect()
}

fn read_array(var: &Variable) -> Result<ArrayD<f64>> {
    let shape: Vec<usize> = var.dimensions().iter().map(netcdf::Dimension::len).collect();
    let values = var.get_values::<f64, _>(..)?;
    let mut data = ArrayD::from_shape_vec(IxDyn(&shape), values)?;

    let fill_values: Vec<f64> = ["_FillValue", "missing_value"]
        .iter()
        .filter_map(|name| numeric_attribute(var, name))
        .collect();
    if !fill_values.is_empty() {
        data.mapv_inplace(|v| if fill_values.contains(&v) { f64::NAN } else { v });
    }
    Ok(data)
}

fn read_coord(file: &File, name: &str) -> Result<Coord> {
    let var = file
        .variable(name)
        .ok_or_else(|| DrsError::cube(format!("Coordinate variable '{}' not found", name)))?;
    let units = string_attribute(&var, "units").unwrap_or_else(|| "1".to_string());
    let mut coord = Coord::with_points(name, units, read_array(&var)?);
    coord.standard_name = string_attribute(&var, "standard_name");
    coord.long_name = string_attribute(&var, "long_name");
    coord.calendar = string_attribute(&var, "calendar");
    coord.attributes = other_attributes(&var);
    if let Some(bounds_name) = string_attribute(&var, "bounds") {
        if let Some(bounds_var) = file.variable(&bounds_name) {
            coord.bounds = Some(read_array(&bounds_var)?);
        }
    }
    Ok(coord)
}

/// Names of all variables playing a coordinate role
fn coordinate_variables(file: &File) -> BTreeSet<String> {
    let dimensions: BTreeSet<String> = file.dimensions().map(|d| d.name().to_string()).collect();
    let mut names = BTreeSet::new();
    for var in file.variables() {
        let name = var.name().to_string();
        if dimensions.contains(&name) {
            names.insert(name);
        }
        if let Some(bounds) = string_attribute(&var, "bounds") {
            names.insert(bounds);
        }
        if let Some(coordinates) = string_attribute(&var, "coordinates") {
            names.extend(coordinates.split_whitespace().map(str::to_string));
        }
    }
    names
}

fn load_cube(path: &Path, file: &File, var: &Variable, globals: &Attributes) -> Result<Cube> {
    let var_name = var.name().to_string();
    let dims = dimension_names(var);
    let shape: Vec<usize> = var.dimensions().iter().map(netcdf::Dimension::len).collect();

    let mut dim_coords = Vec::with_capacity(dims.len());
    for (dim, &len) in dims.iter().zip(&shape) {
        let coord = match file.variable(dim) {
            Some(_) => read_coord(file, dim)?,
            None => Coord::new(dim.as_str(), "1", (0..len).map(|i| i as f64).collect()),
        };
        dim_coords.push(coord);
    }

    let source = path.to_path_buf();
    let name = var_name.clone();
    let loader = LazyData::new(shape, move || {
        let file = netcdf::open(&source)?;
        let var = file
            .variable(&name)
            .ok_or_else(|| DrsError::unreadable(&source, format!("variable {} vanished", name)))?;
        read_array(&var)
    });

    let units = string_attribute(var, "units").unwrap_or_else(|| "1".to_string());
    let mut cube = Cube::lazy(var_name.as_str(), units, loader, dim_coords)?;
    cube.standard_name = string_attribute(var, "standard_name");
    cube.long_name = string_attribute(var, "long_name");
    cube.attributes = globals.clone();
    cube.attributes.extend(other_attributes(var));

    if let Some(coordinates) = string_attribute(var, "coordinates") {
        for aux_name in coordinates.split_whitespace() {
            let Some(aux_var) = file.variable(aux_name) else {
                warn!("Auxiliary coordinate {} of {} not found", aux_name, var_name);
                continue;
            };
            let aux_dims: Option<Vec<usize>> = dimension_names(&aux_var)
                .iter()
                .map(|d| dims.iter().position(|own| own == d))
                .collect();
            match aux_dims {
                Some(aux_dims) => cube.add_aux_coord(read_coord(file, aux_name)?, aux_dims)?,
                None => debug!("Skipping auxiliary coordinate {} on foreign axes", aux_name),
            }
        }
    }
    Ok(cube)
}

fn put_attributes(var: &mut netcdf::VariableMut, attributes: &Attributes) -> Result<()> {
    for (key, value) in attributes {
        var.put_attribute(key, from_attribute(value))?;
    }
    Ok(())
}

fn filled(data: &ArrayD<f64>, fill_value: f64) -> ArrayD<f64> {
    data.mapv(|v| if v.is_nan() { fill_value } else { v })
}

fn write_coord(file: &mut netcdf::FileMut, coord: &Coord, dims: &[String]) -> Result<()> {
    if file.variable(&coord.var_name).is_some() {
        return Ok(());
    }
    let dim_refs: Vec<&str> = dims.iter().map(String::as_str).collect();
    let bounds_name = format!("{}_bnds", coord.var_name);

    {
        let mut var = file.add_variable::<f64>(&coord.var_name, &dim_refs)?;
        var.put(coord.points.view(), ..)?;
        var.put_attribute("units", coord.units.as_str())?;
        if let Some(name) = &coord.standard_name {
            var.put_attribute("standard_name", name.as_str())?;
        }
        if let Some(name) = &coord.long_name {
            var.put_attribute("long_name", name.as_str())?;
        }
        if let Some(calendar) = &coord.calendar {
            var.put_attribute("calendar", calendar.as_str())?;
        }
        if coord.bounds.is_some() {
            var.put_attribute("bounds", bounds_name.as_str())?;
        }
        put_attributes(&mut var, &coord.attributes)?;
    }

    if let Some(bounds) = &coord.bounds {
        if file.dimension(BOUNDS_DIMENSION).is_none() {
            file.add_dimension(BOUNDS_DIMENSION, 2)?;
        }
        let mut bounds_dims = dim_refs.clone();
        bounds_dims.push(BOUNDS_DIMENSION);
        let mut var = file.add_variable::<f64>(&bounds_name, &bounds_dims)?;
        var.put(bounds.view(), ..)?;
    }
    Ok(())
}

fn write_cube(file: &mut netcdf::FileMut, cube: &Cube, options: &SaveOptions, first: bool) -> Result<()> {
    let dims: Vec<String> = cube.dim_coords().iter().map(|c| c.var_name.clone()).collect();
    for (dim, &len) in dims.iter().zip(cube.shape()) {
        match file.dimension(dim) {
            Some(existing) if existing.len() != len => {
                return Err(DrsError::cube(format!(
                    "Dimension {} has length {} in file but {} in cube {}",
                    dim,
                    existing.len(),
                    len,
                    cube.var_name
                )));
            }
            Some(_) => {}
            None => {
                file.add_dimension(dim, len)?;
            }
        }
    }
    for (coord, dim) in cube.dim_coords().iter().zip(&dims) {
        write_coord(file, coord, std::slice::from_ref(dim))?;
    }

    let mut aux_names = Vec::new();
    for aux in cube.aux_coords() {
        let aux_dims: Vec<String> = aux.dims.iter().map(|&d| dims[d].clone()).collect();
        write_coord(file, &aux.coord, &aux_dims)?;
        aux_names.push(aux.coord.var_name.clone());
    }

    let dim_refs: Vec<&str> = dims.iter().map(String::as_str).collect();
    let data = filled(&cube.array()?, options.fill_value);
    let mut var = file.add_variable::<f64>(&cube.var_name, &dim_refs)?;
    if first {
        if let Some(chunks) = &options.chunk_sizes {
            if chunks.len() == dims.len() && !chunks.is_empty() {
                var.set_chunking(chunks)?;
            }
        }
    }
    if options.compress {
        var.set_compression(4, true)?;
    }
    var.set_fill_value(options.fill_value)?;
    var.put(data.view(), ..)?;
    var.put_attribute("units", cube.units.as_str())?;
    if let Some(name) = &cube.standard_name {
        var.put_attribute("standard_name", name.as_str())?;
    }
    if let Some(name) = &cube.long_name {
        var.put_attribute("long_name", name.as_str())?;
    }
    if !aux_names.is_empty() {
        var.put_attribute("coordinates", aux_names.join(" "))?;
    }
    Ok(())
}

impl CubeStore for NetcdfStore {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn load(&self, path: &Path) -> Result<Vec<Cube>> {
        let file = netcdf::open(path).map_err(|e| DrsError::unreadable(path, e.to_string()))?;
        let globals: Attributes = file
            .attributes()
            .filter_map(|attr| {
                let value = to_attribute(attr.value().ok()?)?;
                Some((attr.name().to_string(), value))
            })
            .collect();
        let coordinates = coordinate_variables(&file);

        let mut cubes = Vec::new();
        for var in file.variables() {
            if coordinates.contains(var.name().as_str()) {
                continue;
            }
            cubes.push(load_cube(path, &file, &var, &globals)?);
        }
        Ok(cubes)
    }

    fn save(&self, cubes: &[Cube], path: &Path, options: &SaveOptions) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        if path.exists() {
            fs::remove_file(path)?;
        }
        let mut file = netcdf::create(path)?;
        for (index, cube) in cubes.iter().enumerate() {
            write_cube(&mut file, cube, options, index == 0)?;
        }
        if let Some(first) = cubes.first() {
            for (key, value) in &first.attributes {
                file.add_attribute(key, from_attribute(value))?;
            }
        }
        Ok(())
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        fs::rename(from, to)?;
        Ok(())
    }
}
