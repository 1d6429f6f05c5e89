//! In-memory array datasets ("cubes")
//!
//! A [`Cube`] is an n-dimensional array of `f64` values (NaN marks masked
//! points) with one dimension coordinate per axis, any number of auxiliary
//! coordinates spanning a subset of the axes, and an attribute dictionary.
//! Data may stay lazy until something needs it.

pub mod frequency;
pub mod ops;
pub mod time;

#[cfg(test)]
pub(crate) mod tests;

pub use frequency::check_frequency;
pub use ops::{Aggregator, concatenate, extract_strict, fix_cube_metadata, unify_attributes};
pub use time::{Calendar, CalendarDate, TimeUnit};

use crate::error::{DrsError, Result};
use ndarray::{Array1, ArrayD, IxDyn};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

/// A value in a cube or coordinate attribute dictionary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<String>),
}

impl AttributeValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::Str(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            AttributeValue::Int(value) => Some(*value),
            AttributeValue::Float(value) if value.fract() == 0.0 => Some(*value as i64),
            AttributeValue::Str(value) => value.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttributeValue::Int(value) => Some(*value as f64),
            AttributeValue::Float(value) => Some(*value),
            AttributeValue::Str(value) => value.trim().parse().ok(),
            AttributeValue::List(_) => None,
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Int(value) => write!(f, "{}", value),
            AttributeValue::Float(value) => write!(f, "{}", value),
            AttributeValue::Str(value) => write!(f, "{}", value),
            AttributeValue::List(values) => write!(f, "[{}]", values.join(", ")),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::Str(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::Str(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::Int(value)
    }
}

impl From<i32> for AttributeValue {
    fn from(value: i32) -> Self {
        AttributeValue::Int(value as i64)
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        AttributeValue::Float(value)
    }
}

pub type Attributes = BTreeMap<String, AttributeValue>;

/// A coordinate: named points (and optional cell bounds) with units
#[derive(Debug, Clone, PartialEq)]
pub struct Coord {
    pub var_name: String,
    pub standard_name: Option<String>,
    pub long_name: Option<String>,
    pub units: String,
    pub calendar: Option<String>,
    pub points: ArrayD<f64>,
    /// Bounds carry one extra trailing axis (usually of length 2)
    pub bounds: Option<ArrayD<f64>>,
    pub circular: bool,
    pub attributes: Attributes,
}

impl Coord {
    /// One-dimensional coordinate
    pub fn new(var_name: impl Into<String>, units: impl Into<String>, points: Vec<f64>) -> Self {
        Self::with_points(var_name, units, Array1::from(points).into_dyn())
    }

    /// Coordinate with arbitrarily shaped points
    pub fn with_points(var_name: impl Into<String>, units: impl Into<String>, points: ArrayD<f64>) -> Self {
        Self {
            var_name: var_name.into(),
            standard_name: None,
            long_name: None,
            units: units.into(),
            calendar: None,
            points,
            bounds: None,
            circular: false,
            attributes: Attributes::new(),
        }
    }

    /// Zero-dimensional coordinate holding a single value
    pub fn scalar(var_name: impl Into<String>, units: impl Into<String>, value: f64) -> Self {
        Self::with_points(var_name, units, ArrayD::from_elem(IxDyn(&[]), value))
    }

    /// Time coordinate with CF units and calendar
    pub fn time(units: &str, calendar: &str, points: Vec<f64>) -> Self {
        Coord::new("time", units, points)
            .with_standard_name("time")
            .with_calendar(calendar)
    }

    pub fn with_standard_name(mut self, name: impl Into<String>) -> Self {
        self.standard_name = Some(name.into());
        self
    }

    pub fn with_long_name(mut self, name: impl Into<String>) -> Self {
        self.long_name = Some(name.into());
        self
    }

    pub fn with_calendar(mut self, calendar: impl Into<String>) -> Self {
        self.calendar = Some(calendar.into());
        self
    }

    pub fn with_bounds(mut self, bounds: ArrayD<f64>) -> Self {
        self.bounds = Some(bounds);
        self
    }

    /// Preferred name: standard name, else long name, else var name
    pub fn name(&self) -> &str {
        self.standard_name
            .as_deref()
            .or(self.long_name.as_deref())
            .unwrap_or(&self.var_name)
    }

    /// Whether `name` refers to this coordinate
    pub fn is_named(&self, name: &str) -> bool {
        self.name() == name
            || self.var_name == name
            || self.standard_name.as_deref() == Some(name)
            || self.long_name.as_deref() == Some(name)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Points as a flat vector in logical order
    pub fn values(&self) -> Vec<f64> {
        self.points.iter().copied().collect()
    }

    /// Time unit of this coordinate
    pub fn time_unit(&self) -> Result<TimeUnit> {
        TimeUnit::parse(&self.units, self.calendar.as_deref())
    }

    /// Dates of all points of a time coordinate
    pub fn dates(&self) -> Result<Vec<CalendarDate>> {
        let unit = self.time_unit()?;
        self.points.iter().map(|&v| unit.num2date(v)).collect()
    }

    /// Contiguous bounds from midpoints between neighbouring points
    pub fn guess_bounds(&mut self) -> Result<()> {
        if self.points.ndim() != 1 {
            return Err(DrsError::cube(format!(
                "Can only guess bounds of one-dimensional coordinate '{}'",
                self.name()
            )));
        }
        let points = self.values();
        if points.len() < 2 {
            return Err(DrsError::cube(format!(
                "Cannot guess bounds for coordinate '{}' with fewer than two points",
                self.name()
            )));
        }

        let mut bounds = Vec::with_capacity(points.len() * 2);
        for (i, &point) in points.iter().enumerate() {
            let lower = if i == 0 {
                point - (points[1] - points[0]) / 2.0
            } else {
                (points[i - 1] + point) / 2.0
            };
            let upper = if i + 1 == points.len() {
                point + (point - points[i - 1]) / 2.0
            } else {
                (point + points[i + 1]) / 2.0
            };
            bounds.push(lower);
            bounds.push(upper);
        }
        self.bounds = Some(ArrayD::from_shape_vec(IxDyn(&[points.len(), 2]), bounds)?);
        Ok(())
    }
}

/// A coordinate attached to some of a cube's axes (none for scalars)
#[derive(Debug, Clone, PartialEq)]
pub struct AuxCoord {
    pub coord: Coord,
    pub dims: Vec<usize>,
}

/// Deferred array read
#[derive(Clone)]
pub struct LazyData {
    shape: Vec<usize>,
    loader: Rc<dyn Fn() -> Result<ArrayD<f64>>>,
}

impl LazyData {
    pub fn new(shape: Vec<usize>, loader: impl Fn() -> Result<ArrayD<f64>> + 'static) -> Self {
        Self {
            shape,
            loader: Rc::new(loader),
        }
    }

    fn load(&self) -> Result<ArrayD<f64>> {
        let data = (self.loader)()?;
        if data.shape() != self.shape.as_slice() {
            return Err(DrsError::cube(format!(
                "Lazy data has shape {:?}, expected {:?}",
                data.shape(),
                self.shape
            )));
        }
        Ok(data)
    }
}

impl fmt::Debug for LazyData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyData").field("shape", &self.shape).finish()
    }
}

/// Payload of a cube
#[derive(Debug, Clone)]
pub enum CubeData {
    Realized(ArrayD<f64>),
    Lazy(LazyData),
}

impl CubeData {
    pub fn shape(&self) -> &[usize] {
        match self {
            CubeData::Realized(data) => data.shape(),
            CubeData::Lazy(lazy) => &lazy.shape,
        }
    }
}

/// An array dataset with coordinates and attributes
#[derive(Debug, Clone)]
pub struct Cube {
    pub var_name: String,
    pub standard_name: Option<String>,
    pub long_name: Option<String>,
    pub units: String,
    data: CubeData,
    dim_coords: Vec<Coord>,
    aux_coords: Vec<AuxCoord>,
    pub attributes: Attributes,
}

impl Cube {
    /// Create a cube from realized data and one coordinate per axis
    pub fn new(
        var_name: impl Into<String>,
        units: impl Into<String>,
        data: ArrayD<f64>,
        dim_coords: Vec<Coord>,
    ) -> Result<Self> {
        Self::from_parts(var_name, units, CubeData::Realized(data), dim_coords)
    }

    /// Create a cube whose data is read on first use
    pub fn lazy(
        var_name: impl Into<String>,
        units: impl Into<String>,
        data: LazyData,
        dim_coords: Vec<Coord>,
    ) -> Result<Self> {
        Self::from_parts(var_name, units, CubeData::Lazy(data), dim_coords)
    }

    fn from_parts(
        var_name: impl Into<String>,
        units: impl Into<String>,
        data: CubeData,
        dim_coords: Vec<Coord>,
    ) -> Result<Self> {
        let var_name = var_name.into();
        let shape = data.shape().to_vec();
        if shape.len() != dim_coords.len() {
            return Err(DrsError::cube(format!(
                "Cube '{}' has {} axes but {} dimension coordinates",
                var_name,
                shape.len(),
                dim_coords.len()
            )));
        }
        for (axis, (coord, &len)) in dim_coords.iter().zip(shape.iter()).enumerate() {
            if coord.points.ndim() != 1 || coord.len() != len {
                return Err(DrsError::cube(format!(
                    "Dimension coordinate '{}' does not fit axis {} of length {} in cube '{}'",
                    coord.name(),
                    axis,
                    len,
                    var_name
                )));
            }
        }
        Ok(Self {
            var_name,
            standard_name: None,
            long_name: None,
            units: units.into(),
            data,
            dim_coords,
            aux_coords: Vec::new(),
            attributes: Attributes::new(),
        })
    }

    pub fn with_standard_name(mut self, name: impl Into<String>) -> Self {
        self.standard_name = Some(name.into());
        self
    }

    pub fn with_long_name(mut self, name: impl Into<String>) -> Self {
        self.long_name = Some(name.into());
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Preferred name: standard name, else long name, else var name
    pub fn name(&self) -> &str {
        self.standard_name
            .as_deref()
            .or(self.long_name.as_deref())
            .unwrap_or(&self.var_name)
    }

    pub fn is_named(&self, name: &str) -> bool {
        self.name() == name
            || self.var_name == name
            || self.standard_name.as_deref() == Some(name)
            || self.long_name.as_deref() == Some(name)
    }

    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    pub fn ndim(&self) -> usize {
        self.shape().len()
    }

    pub fn has_lazy_data(&self) -> bool {
        matches!(self.data, CubeData::Lazy(_))
    }

    /// Read lazy data into memory
    pub fn realize(&mut self) -> Result<()> {
        if let CubeData::Lazy(lazy) = &self.data {
            let data = lazy.load()?;
            self.data = CubeData::Realized(data);
        }
        Ok(())
    }

    /// Data, reading it without caching if it is still lazy
    pub fn array(&self) -> Result<Cow<'_, ArrayD<f64>>> {
        match &self.data {
            CubeData::Realized(data) => Ok(Cow::Borrowed(data)),
            CubeData::Lazy(lazy) => Ok(Cow::Owned(lazy.load()?)),
        }
    }

    /// Realized data
    pub fn data(&mut self) -> Result<&ArrayD<f64>> {
        self.realize()?;
        match &self.data {
            CubeData::Realized(data) => Ok(data),
            CubeData::Lazy(_) => Err(DrsError::cube("Data could not be realized")),
        }
    }

    /// Mutable realized data
    pub fn data_mut(&mut self) -> Result<&mut ArrayD<f64>> {
        self.realize()?;
        match &mut self.data {
            CubeData::Realized(data) => Ok(data),
            CubeData::Lazy(_) => Err(DrsError::cube("Data could not be realized")),
        }
    }

    /// Replace the data keeping the shape
    pub fn set_data(&mut self, data: ArrayD<f64>) -> Result<()> {
        if data.shape() != self.shape() {
            return Err(DrsError::cube(format!(
                "New data of shape {:?} does not match cube shape {:?}",
                data.shape(),
                self.shape()
            )));
        }
        self.data = CubeData::Realized(data);
        Ok(())
    }

    pub fn dim_coords(&self) -> &[Coord] {
        &self.dim_coords
    }

    pub fn aux_coords(&self) -> &[AuxCoord] {
        &self.aux_coords
    }

    /// All coordinates with the axes they span
    pub fn coords(&self) -> Vec<(&Coord, Vec<usize>)> {
        self.dim_coords
            .iter()
            .enumerate()
            .map(|(axis, coord)| (coord, vec![axis]))
            .chain(self.aux_coords.iter().map(|aux| (&aux.coord, aux.dims.clone())))
            .collect()
    }

    pub fn has_coord(&self, name: &str) -> bool {
        self.coords().iter().any(|(coord, _)| coord.is_named(name))
    }

    /// Look up a coordinate by any of its names
    pub fn coord(&self, name: &str) -> Result<&Coord> {
        self.dim_coords
            .iter()
            .find(|c| c.is_named(name))
            .or_else(|| {
                self.aux_coords
                    .iter()
                    .map(|aux| &aux.coord)
                    .find(|c| c.is_named(name))
            })
            .ok_or_else(|| {
                DrsError::cube(format!(
                    "Coordinate '{}' not found in cube '{}'",
                    name,
                    self.name()
                ))
            })
    }

    pub fn coord_mut(&mut self, name: &str) -> Result<&mut Coord> {
        let cube_name = self.name().to_string();
        if let Some(coord) = self.dim_coords.iter_mut().find(|c| c.is_named(name)) {
            return Ok(coord);
        }
        self.aux_coords
            .iter_mut()
            .map(|aux| &mut aux.coord)
            .find(|c| c.is_named(name))
            .ok_or_else(|| {
                DrsError::cube(format!(
                    "Coordinate '{}' not found in cube '{}'",
                    name, cube_name
                ))
            })
    }

    /// Axes spanned by a coordinate
    pub fn coord_dims(&self, name: &str) -> Result<Vec<usize>> {
        self.coords()
            .into_iter()
            .find(|(coord, _)| coord.is_named(name))
            .map(|(_, dims)| dims)
            .ok_or_else(|| {
                DrsError::cube(format!(
                    "Coordinate '{}' not found in cube '{}'",
                    name,
                    self.name()
                ))
            })
    }

    /// Axis of the time dimension coordinate
    pub fn time_dim(&self) -> Result<usize> {
        self.dim_coords
            .iter()
            .position(|c| c.is_named("time"))
            .ok_or_else(|| {
                DrsError::cube(format!(
                    "Cube '{}' has no time dimension coordinate",
                    self.name()
                ))
            })
    }

    /// Attach an auxiliary coordinate to the given axes
    pub fn add_aux_coord(&mut self, coord: Coord, dims: Vec<usize>) -> Result<()> {
        let expected: Vec<usize> = dims
            .iter()
            .map(|&d| self.shape().get(d).copied())
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| {
                DrsError::cube(format!(
                    "Axes {:?} out of range for cube '{}'",
                    dims,
                    self.name()
                ))
            })?;
        if coord.points.shape() != expected.as_slice() {
            return Err(DrsError::cube(format!(
                "Coordinate '{}' of shape {:?} does not fit axes {:?} of cube '{}'",
                coord.name(),
                coord.points.shape(),
                dims,
                self.name()
            )));
        }
        self.aux_coords.push(AuxCoord { coord, dims });
        Ok(())
    }

    /// Replace the dimension coordinate of an axis
    pub fn replace_dim_coord(&mut self, axis: usize, coord: Coord) -> Result<()> {
        let len = *self.shape().get(axis).ok_or_else(|| {
            DrsError::cube(format!("Axis {} out of range for cube '{}'", axis, self.name()))
        })?;
        if coord.points.ndim() != 1 || coord.len() != len {
            return Err(DrsError::cube(format!(
                "Coordinate '{}' does not fit axis {} of length {}",
                coord.name(),
                axis,
                len
            )));
        }
        self.dim_coords[axis] = coord;
        Ok(())
    }

    /// Remove an auxiliary coordinate; dimension coordinates cannot be removed
    pub fn remove_coord(&mut self, name: &str) -> Result<Coord> {
        match self.aux_coords.iter().position(|aux| aux.coord.is_named(name)) {
            Some(index) => Ok(self.aux_coords.remove(index).coord),
            None => Err(DrsError::cube(format!(
                "Auxiliary coordinate '{}' not found in cube '{}'",
                name,
                self.name()
            ))),
        }
    }

    /// Drop auxiliary coordinates matching a predicate
    pub fn retain_aux_coords(&mut self, keep: impl Fn(&AuxCoord) -> bool) {
        self.aux_coords.retain(|aux| keep(aux));
    }

    /// Multiply all values by a constant, keeping metadata
    pub fn scale(&mut self, factor: f64) -> Result<()> {
        self.data_mut()?.mapv_inplace(|v| v * factor);
        Ok(())
    }

    /// Mask (set to NaN) every value matching a predicate
    pub fn mask_where(&mut self, predicate: impl Fn(f64) -> bool) -> Result<usize> {
        let mut masked = 0;
        for value in self.data_mut()?.iter_mut() {
            if !value.is_nan() && predicate(*value) {
                *value = f64::NAN;
                masked += 1;
            }
        }
        Ok(masked)
    }

    /// One-line description, e.g. `air_temperature / (K) (time: 12; latitude: 2)`
    pub fn summary(&self) -> String {
        let dims: Vec<String> = self
            .dim_coords
            .iter()
            .map(|c| format!("{}: {}", c.name(), c.len()))
            .collect();
        format!("{} / ({}) ({})", self.name(), self.units, dims.join("; "))
    }

    pub(crate) fn parts_mut(&mut self) -> (&mut Vec<Coord>, &mut Vec<AuxCoord>) {
        (&mut self.dim_coords, &mut self.aux_coords)
    }
}

impl fmt::Display for Cube {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.summary())
    }
}
