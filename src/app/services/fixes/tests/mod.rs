//! Tests for fix lookup, dispatch and the shipped fixes


use crate::app::cube::Cube;
use crate::app::services::fixes::{ComplianceChecker, Fix, FixTarget};
use crate::error::{DrsError, Result};

/// Appends its label to the `applied` attribute at every stage
pub struct LabelFix(pub &'static str);

fn append_label(cube: &mut Cube, label: &str) {
    let applied = match cube.attributes.get("applied") {
        Some(previous) => format!("{},{}", previous, label),
        None => label.to_string(),
    };
    cube.attributes.insert("applied".to_string(), applied.into());
}

impl Fix for LabelFix {
    fn fix_metadata(&self, mut cubes: Vec<Cube>) -> Result<Vec<Cube>> {
        for cube in &mut cubes {
            append_label(cube, self.0);
        }
        Ok(cubes)
    }

    fn fix_data(&self, mut cube: Cube) -> Result<Cube> {
        append_label(&mut cube, self.0);
        Ok(cube)
    }
}

/// Marks checked cubes, or rejects everything
pub struct MarkingChecker {
    pub reject: bool,
}

impl MarkingChecker {
    fn mark(&self, cube: Cube, stage: &str, target: &FixTarget) -> Result<Cube> {
        if self.reject {
            return Err(DrsError::ComplianceCheck {
                variable: target.short_name.clone(),
                message: format!("{} rejected", stage),
            });
        }
        Ok(cube.with_attribute("checked", stage))
    }
}

impl ComplianceChecker for MarkingChecker {
    fn check_metadata(&self, cube: Cube, target: &FixTarget) -> Result<Cube> {
        self.mark(cube, "metadata", target)
    }

    fn check_data(&self, cube: Cube, target: &FixTarget) -> Result<Cube> {
        self.mark(cube, "data", target)
    }
}

pub fn applied(cube: &Cube) -> Option<String> {
    cube.attributes.get("applied").map(|v| v.to_string())
}
