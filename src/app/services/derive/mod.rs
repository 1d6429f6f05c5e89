//! Variables computed from other variables
//!
//! Each [`DerivedVariable`] declares the input variables it needs for a
//! project and combines their cubes into the derived cube. The
//! [`DerivedRegistry`] maps short names to their derivations.

pub mod amoc;
pub mod cloud;
pub mod lvp;

#[cfg(test)]
pub mod tests;

use crate::app::cube::Cube;
use crate::error::{DrsError, Result};
use std::collections::BTreeMap;
use tracing::debug;

/// An input variable of a derivation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequiredVariable {
    pub short_name: String,
    /// The input is itself derived
    pub derive: bool,
}

impl RequiredVariable {
    pub fn new(short_name: impl Into<String>) -> Self {
        Self {
            short_name: short_name.into(),
            derive: false,
        }
    }

    pub fn derived(short_name: impl Into<String>) -> Self {
        Self {
            short_name: short_name.into(),
            derive: true,
        }
    }
}

/// How to compute one variable
pub trait DerivedVariable {
    /// Variables needed for `project`
    fn required(&self, project: &str) -> Vec<RequiredVariable>;

    /// Combine the input cubes
    fn calculate(&self, cubes: &[Cube]) -> Result<Cube>;
}

/// Derivations keyed by short name
#[derive(Default)]
pub struct DerivedRegistry {
    variables: BTreeMap<String, Box<dyn DerivedVariable>>,
}

impl DerivedRegistry {
    /// Registry with all derivations shipped with the crate
    pub fn builtin() -> Self {
        let mut registry = Self::default();
        registry.register("amoc", amoc::Amoc);
        registry.register("clhmtisccp", cloud::Clhmtisccp);
        registry.register("clltkisccp", cloud::Clltkisccp);
        registry.register("lvp", lvp::Lvp);
        registry
    }

    pub fn register(&mut self, short_name: &str, variable: impl DerivedVariable + 'static) {
        self.variables.insert(short_name.to_string(), Box::new(variable));
    }

    pub fn get(&self, short_name: &str) -> Result<&dyn DerivedVariable> {
        self.variables
            .get(short_name)
            .map(|v| v.as_ref())
            .ok_or_else(|| DrsError::cube(format!("Cannot derive variable '{}'", short_name)))
    }

    pub fn short_names(&self) -> impl Iterator<Item = &str> {
        self.variables.keys().map(String::as_str)
    }

    /// Input variables of `short_name` for `project`
    pub fn required(&self, short_name: &str, project: &str) -> Result<Vec<RequiredVariable>> {
        Ok(self.get(short_name)?.required(project))
    }

    /// Compute `short_name` and name the result after it
    pub fn derive(&self, short_name: &str, cubes: &[Cube]) -> Result<Cube> {
        debug!("Deriving {} from {} cubes", short_name, cubes.len());
        let mut cube = self.get(short_name)?.calculate(cubes)?;
        cube.var_name = short_name.to_string();
        Ok(cube)
    }
}
