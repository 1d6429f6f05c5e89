//! Cube operations: extraction, year partitioning, concatenation along
//! time, collapsing and element-wise arithmetic.

use super::{AttributeValue, Attributes, AuxCoord, Coord, Cube, CubeData};
use crate::constants::AUX_TIME_COORDS;
use crate::error::{DrsError, Result};
use ndarray::{ArrayD, Axis, IxDyn};
use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Tolerance for comparing coordinate points of different cubes
const POINT_TOLERANCE: f64 = 1e-6;

/// Statistic used when collapsing axes; NaN (masked) values are ignored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregator {
    Sum,
    Mean,
    Max,
}

impl Aggregator {
    fn apply(&self, values: &[f64]) -> f64 {
        let valid: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
        if valid.is_empty() {
            return f64::NAN;
        }
        match self {
            Aggregator::Sum => valid.iter().sum(),
            Aggregator::Mean => valid.iter().sum::<f64>() / valid.len() as f64,
            Aggregator::Max => valid.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        }
    }
}

fn subset_coord(coord: &Coord, local_axis: usize, indices: &[usize]) -> Coord {
    let mut subset = coord.clone();
    subset.points = coord.points.select(Axis(local_axis), indices);
    subset.bounds = coord
        .bounds
        .as_ref()
        .map(|b| b.select(Axis(local_axis), indices));
    subset
}

fn points_close(a: &Coord, b: &Coord) -> bool {
    a.points.shape() == b.points.shape()
        && a.points
            .iter()
            .zip(b.points.iter())
            .all(|(x, y)| (x - y).abs() <= POINT_TOLERANCE * x.abs().max(1.0))
}

impl Cube {
    fn with_payload(&self, data: ArrayD<f64>, dim_coords: Vec<Coord>, aux_coords: Vec<AuxCoord>) -> Cube {
        Cube {
            var_name: self.var_name.clone(),
            standard_name: self.standard_name.clone(),
            long_name: self.long_name.clone(),
            units: self.units.clone(),
            data: CubeData::Realized(data),
            dim_coords,
            aux_coords,
            attributes: self.attributes.clone(),
        }
    }

    fn take_from(&self, data: &ArrayD<f64>, axis: usize, indices: &[usize]) -> Cube {
        let new_data = data.select(Axis(axis), indices);
        let mut dim_coords = self.dim_coords.clone();
        dim_coords[axis] = subset_coord(&self.dim_coords[axis], 0, indices);
        let aux_coords = self
            .aux_coords
            .iter()
            .map(|aux| match aux.dims.iter().position(|&d| d == axis) {
                Some(local) => AuxCoord {
                    coord: subset_coord(&aux.coord, local, indices),
                    dims: aux.dims.clone(),
                },
                None => aux.clone(),
            })
            .collect();
        self.with_payload(new_data, dim_coords, aux_coords)
    }

    /// Subset of the cube at the given positions of one axis
    pub fn take_along(&self, axis: usize, indices: &[usize]) -> Result<Cube> {
        if axis >= self.ndim() || indices.iter().any(|&i| i >= self.shape()[axis]) {
            return Err(DrsError::cube(format!(
                "Indices out of range for axis {} of cube '{}'",
                axis,
                self.name()
            )));
        }
        let data = self.array()?;
        Ok(self.take_from(&data, axis, indices))
    }

    /// Keep the points of a coordinate for which `keep` is true
    ///
    /// Returns `None` when nothing matches. Scalar coordinates keep or drop
    /// the whole cube.
    pub fn extract_where(&self, coord_name: &str, keep: impl Fn(f64) -> bool) -> Result<Option<Cube>> {
        let coord = self.coord(coord_name)?;
        let dims = self.coord_dims(coord_name)?;
        match dims.as_slice() {
            [] => {
                let value = coord.points.iter().next().copied().unwrap_or(f64::NAN);
                Ok(keep(value).then(|| self.clone()))
            }
            [axis] => {
                let indices: Vec<usize> = coord
                    .points
                    .iter()
                    .enumerate()
                    .filter(|(_, v)| keep(**v))
                    .map(|(i, _)| i)
                    .collect();
                if indices.is_empty() {
                    return Ok(None);
                }
                self.take_along(*axis, &indices).map(Some)
            }
            _ => Err(DrsError::cube(format!(
                "Cannot extract on multi-dimensional coordinate '{}'",
                coord_name
            ))),
        }
    }

    /// Split the cube into one sub-cube per calendar year of its time axis
    pub fn partition_by_year(&self) -> Result<BTreeMap<i32, Cube>> {
        let axis = self.time_dim()?;
        let dates = self.dim_coords[axis].dates()?;

        let mut groups: BTreeMap<i32, Vec<usize>> = BTreeMap::new();
        for (index, date) in dates.iter().enumerate() {
            groups.entry(date.year).or_default().push(index);
        }

        let data = self.array()?;
        Ok(groups
            .into_iter()
            .map(|(year, indices)| (year, self.take_from(&data, axis, &indices)))
            .collect())
    }

    /// Add `day_of_month`, `day_of_year`, `month_number` and `year` along time
    pub fn add_aux_time_coords(&mut self) -> Result<()> {
        let axis = self.time_dim()?;
        let time = &self.dim_coords[axis];
        let unit = time.time_unit()?;
        let dates = time.dates()?;

        for name in AUX_TIME_COORDS {
            if self.aux_coords.iter().any(|aux| aux.coord.is_named(name)) {
                continue;
            }
            let points = dates
                .iter()
                .map(|date| {
                    Ok(match *name {
                        "day_of_month" => date.day as f64,
                        "day_of_year" => unit.day_of_year(date)? as f64,
                        "month_number" => date.month as f64,
                        _ => date.year as f64,
                    })
                })
                .collect::<Result<Vec<f64>>>()?;
            let coord = Coord::new(*name, "1", points).with_long_name(*name);
            self.add_aux_coord(coord, vec![axis])?;
        }
        Ok(())
    }

    /// Collapse the axes spanned by the named coordinates
    ///
    /// Collapsed dimension coordinates become scalar coordinates whose point
    /// is the middle of the collapsed range and whose bounds span it.
    pub fn collapsed(&self, coord_names: &[&str], aggregator: Aggregator) -> Result<Cube> {
        let mut axes = BTreeSet::new();
        for name in coord_names {
            axes.extend(self.coord_dims(name)?);
        }
        let shape = self.shape().to_vec();
        let keep: Vec<usize> = (0..shape.len()).filter(|a| !axes.contains(a)).collect();
        let order: Vec<usize> = keep.iter().chain(axes.iter()).copied().collect();

        let data = self.array()?;
        let permuted = data.view().permuted_axes(IxDyn(&order));
        let keep_shape: Vec<usize> = keep.iter().map(|&a| shape[a]).collect();
        let n_keep: usize = keep_shape.iter().product();
        let n_reduce: usize = axes.iter().map(|&a| shape[a]).product();

        let flat: Vec<f64> = permuted.iter().copied().collect();
        let reduced: Vec<f64> = if n_reduce == 0 {
            vec![f64::NAN; n_keep]
        } else {
            flat.chunks(n_reduce).map(|row| aggregator.apply(row)).collect()
        };
        let new_data = ArrayD::from_shape_vec(IxDyn(&keep_shape), reduced)?;

        let dim_coords: Vec<Coord> = keep.iter().map(|&a| self.dim_coords[a].clone()).collect();
        let mut aux_coords: Vec<AuxCoord> = Vec::new();
        for aux in &self.aux_coords {
            if aux.dims.iter().any(|d| axes.contains(d)) {
                continue;
            }
            let dims = aux
                .dims
                .iter()
                .filter_map(|d| keep.iter().position(|k| k == d))
                .collect();
            aux_coords.push(AuxCoord {
                coord: aux.coord.clone(),
                dims,
            });
        }
        for &axis in &axes {
            let coord = &self.dim_coords[axis];
            let values = coord.values();
            let (low, high) = values
                .iter()
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
            let mut scalar = coord.clone();
            scalar.points = ArrayD::from_elem(IxDyn(&[]), (low + high) / 2.0);
            scalar.bounds = Some(ArrayD::from_shape_vec(IxDyn(&[2]), vec![low, high])?);
            aux_coords.push(AuxCoord {
                coord: scalar,
                dims: Vec::new(),
            });
        }

        debug!(
            "Collapsed {:?} of {} with {:?}",
            coord_names,
            self.name(),
            aggregator
        );
        Ok(self.with_payload(new_data, dim_coords, aux_coords))
    }

    fn combine(&self, other: &Cube, op: impl Fn(f64, f64) -> f64, units: String) -> Result<Cube> {
        if self.shape() != other.shape() {
            return Err(DrsError::cube(format!(
                "Cannot combine cubes of shapes {:?} and {:?}",
                self.shape(),
                other.shape()
            )));
        }
        let left = self.array()?;
        let right = other.array()?;
        let mut result = left.into_owned();
        result.zip_mut_with(&*right, |a, &b| *a = op(*a, b));

        let mut cube = self.with_payload(result, self.dim_coords.clone(), self.aux_coords.clone());
        cube.units = units;
        Ok(cube)
    }

    /// Element-wise product keeping this cube's coordinates
    pub fn multiply(&self, other: &Cube) -> Result<Cube> {
        let units = match (self.units.as_str(), other.units.as_str()) {
            ("1", u) | (u, "1") => u.to_string(),
            (a, b) => format!("{} {}", a, b),
        };
        self.combine(other, |a, b| a * b, units)
    }

    /// Element-wise quotient keeping this cube's coordinates; division by
    /// zero is masked
    pub fn divide(&self, other: &Cube) -> Result<Cube> {
        let units = if self.units == other.units {
            "1".to_string()
        } else if other.units == "1" {
            self.units.clone()
        } else {
            format!("{} ({})-1", self.units, other.units)
        };
        self.combine(
            other,
            |a, b| if b == 0.0 { f64::NAN } else { a / b },
            units,
        )
    }
}

/// Position of the single cube known by `name`
pub fn extract_strict(cubes: &[Cube], name: &str) -> Result<usize> {
    let matches: Vec<usize> = cubes
        .iter()
        .enumerate()
        .filter(|(_, cube)| cube.is_named(name))
        .map(|(i, _)| i)
        .collect();
    match matches.as_slice() {
        [index] => Ok(*index),
        [] => Err(DrsError::cube(format!("No cube named '{}'", name))),
        _ => Err(DrsError::cube(format!(
            "Got {} cubes named '{}', expected one",
            matches.len(),
            name
        ))),
    }
}

/// Make the attributes of all cubes identical
///
/// Values that differ between cubes are joined with `|`.
pub fn unify_attributes(cubes: &mut [Cube]) -> Attributes {
    let mut attributes = Attributes::new();
    for cube in cubes.iter() {
        for (key, value) in &cube.attributes {
            match attributes.get(key) {
                None => {
                    attributes.insert(key.clone(), value.clone());
                }
                Some(existing) => {
                    let existing_text = existing.to_string();
                    let text = value.to_string();
                    if !existing_text.contains(&text) {
                        attributes.insert(
                            key.clone(),
                            AttributeValue::Str(format!("{}|{}", existing_text, text)),
                        );
                    }
                }
            }
        }
    }
    for cube in cubes.iter_mut() {
        cube.attributes = attributes.clone();
    }
    attributes
}

fn is_degrees(units: &str) -> bool {
    matches!(
        units,
        "degrees"
            | "degree"
            | "degrees_north"
            | "degree_north"
            | "degrees_N"
            | "degrees_east"
            | "degree_east"
            | "degrees_E"
    )
}

/// Prepare cubes for concatenation
///
/// Unifies attributes, drops auxiliary coordinates spanning the time axis
/// and normalises coordinate units.
pub fn fix_cube_metadata(cubes: &mut [Cube]) {
    unify_attributes(cubes);

    for cube in cubes.iter_mut() {
        if let Ok(time_axis) = cube.time_dim() {
            cube.retain_aux_coords(|aux| !aux.dims.contains(&time_axis));
        }

        let (dim_coords, aux_coords) = cube.parts_mut();
        let coords = dim_coords
            .iter_mut()
            .chain(aux_coords.iter_mut().map(|aux| &mut aux.coord));
        for coord in coords {
            if is_degrees(&coord.units) {
                coord.units = "degrees".to_string();
                if coord.is_named("longitude") {
                    coord.circular = true;
                }
            }
            if coord.attributes.contains_key("invalid_units") {
                coord.units = "unknown".to_string();
            }
        }
    }
}

/// Join cubes end to end along their time axis
///
/// Cubes are ordered by their first time point; every other axis, the
/// variable, the units and the time units must agree and time ranges must
/// not overlap.
pub fn concatenate(mut cubes: Vec<Cube>) -> Result<Cube> {
    if cubes.is_empty() {
        return Err(DrsError::inconsistent("no cubes to concatenate"));
    }
    if cubes.len() == 1 {
        return cubes.pop().ok_or_else(|| DrsError::inconsistent("no cubes to concatenate"));
    }

    let axis = cubes[0].time_dim()?;
    let first_point = |cube: &Cube| cube.dim_coords[axis].points.iter().next().copied();
    for cube in &cubes {
        if cube.time_dim()? != axis {
            return Err(DrsError::inconsistent(format!(
                "time axis differs between cubes ({} vs {})",
                cube.time_dim()?,
                axis
            )));
        }
        if first_point(cube).is_none() {
            return Err(DrsError::inconsistent("cube with empty time axis"));
        }
    }
    cubes.sort_by(|a, b| {
        first_point(a)
            .partial_cmp(&first_point(b))
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let reference = &cubes[0];
    let ref_time = &reference.dim_coords[axis];
    for cube in &cubes[1..] {
        if cube.var_name != reference.var_name || cube.units != reference.units {
            return Err(DrsError::inconsistent(format!(
                "cube {} does not match {}",
                cube.summary(),
                reference.summary()
            )));
        }
        if cube.ndim() != reference.ndim() {
            return Err(DrsError::inconsistent("cubes differ in number of axes"));
        }
        for (a, (coord, ref_coord)) in cube.dim_coords.iter().zip(&reference.dim_coords).enumerate() {
            if a == axis {
                continue;
            }
            if coord.name() != ref_coord.name() || !points_close(coord, ref_coord) {
                return Err(DrsError::inconsistent(format!(
                    "coordinate '{}' differs between cubes",
                    coord.name()
                )));
            }
        }
        let time = &cube.dim_coords[axis];
        if time.units != ref_time.units || time.calendar != ref_time.calendar {
            return Err(DrsError::inconsistent(format!(
                "time units differ: '{}' vs '{}'",
                time.units, ref_time.units
            )));
        }
    }

    let mut points = Vec::new();
    for cube in &cubes {
        let values = cube.dim_coords[axis].values();
        if let (Some(&last), Some(&next)) = (points.last(), values.first()) {
            if next <= last {
                return Err(DrsError::inconsistent(format!(
                    "time points overlap or are not increasing at {}",
                    next
                )));
            }
        }
        points.extend(values);
    }

    let arrays: Vec<Cow<'_, ArrayD<f64>>> = cubes.iter().map(Cube::array).collect::<Result<_>>()?;
    let views: Vec<_> = arrays.iter().map(|a| a.view()).collect();
    let data = ndarray::concatenate(Axis(axis), &views)
        .map_err(|e| DrsError::inconsistent(format!("data shapes differ: {}", e)))?;

    let mut time = ref_time.clone();
    time.points = ndarray::Array1::from(points).into_dyn();
    time.bounds = if cubes.iter().all(|c| c.dim_coords[axis].bounds.is_some()) {
        let bounds: Vec<_> = cubes
            .iter()
            .filter_map(|c| c.dim_coords[axis].bounds.as_ref().map(|b| b.view()))
            .collect();
        Some(ndarray::concatenate(Axis(0), &bounds)?)
    } else {
        None
    };

    let mut dim_coords = reference.dim_coords.clone();
    dim_coords[axis] = time;

    let mut aux_coords = Vec::new();
    for aux in &reference.aux_coords {
        match aux.dims.iter().position(|&d| d == axis) {
            None => aux_coords.push(aux.clone()),
            Some(local) => {
                let parts: Option<Vec<&Coord>> = cubes
                    .iter()
                    .map(|c| {
                        c.aux_coords
                            .iter()
                            .find(|other| other.coord.is_named(aux.coord.name()) && other.dims == aux.dims)
                            .map(|other| &other.coord)
                    })
                    .collect();
                let Some(parts) = parts else {
                    debug!("Dropping auxiliary coordinate {} during concatenation", aux.coord.name());
                    continue;
                };
                let views: Vec<_> = parts.iter().map(|c| c.points.view()).collect();
                let mut coord = aux.coord.clone();
                coord.points = ndarray::concatenate(Axis(local), &views)?;
                coord.bounds = None;
                aux_coords.push(AuxCoord {
                    coord,
                    dims: aux.dims.clone(),
                });
            }
        }
    }

    Ok(reference.with_payload(data, dim_coords, aux_coords))
}
