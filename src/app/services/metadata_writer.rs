//! Metadata sidecar files for diagnostic scripts
//!
//! Every output directory gets a `metadata.yml` mapping each output file
//! to its attributes. Legacy NCL diagnostics can additionally read a
//! `<short_name>_info.ncl` settings file.

use crate::constants::{DEFAULT_RECIPE_DATASET_INDEX, METADATA_FILENAME};
use crate::error::{DrsError, Result};
use serde_yaml::{Mapping, Value};
use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Keys always stored per dataset in NCL settings
const DATASET_KEYS: &[&str] = &["mip"];
/// Keys always stored once per variable in NCL settings
const VARIABLE_KEYS: &[&str] = &["reference_dataset", "alternative_dataset"];

/// An output file and its attributes, in insertion order
#[derive(Debug, Clone, PartialEq)]
pub struct ProductMetadata {
    pub filename: PathBuf,
    pub attributes: Mapping,
}

impl ProductMetadata {
    pub fn new(filename: impl Into<PathBuf>) -> Self {
        Self {
            filename: filename.into(),
            attributes: Mapping::new(),
        }
    }

    pub fn with_attribute(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.attributes.insert(Value::from(key), value.into());
        self
    }

    fn get(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    fn recipe_dataset_index(&self) -> f64 {
        self.get("recipe_dataset_index")
            .and_then(Value::as_f64)
            .unwrap_or(DEFAULT_RECIPE_DATASET_INDEX)
    }

    fn dataset(&self) -> &str {
        self.get("dataset").and_then(Value::as_str).unwrap_or_default()
    }

    fn output_dir(&self) -> PathBuf {
        self.filename.parent().map(Path::to_path_buf).unwrap_or_default()
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}

/// Attributes as written to the sidecar; a list of experiments is joined
/// with `-`
fn sidecar_attributes(product: &ProductMetadata) -> Mapping {
    let mut attributes = product.attributes.clone();
    if let Some(Value::Sequence(exps)) = attributes.get("exp") {
        let joined: Vec<String> = exps.iter().map(scalar_text).collect();
        attributes.insert(Value::from("exp"), Value::from(joined.join("-")));
    }
    attributes
}

/// Write `metadata.yml` (and optionally the NCL settings) per output directory
///
/// Products are ordered by `recipe_dataset_index`, then by `dataset`.
/// Returns the paths of all files written.
pub fn write_metadata(products: &[ProductMetadata], write_ncl: bool) -> Result<Vec<PathBuf>> {
    let mut groups: Vec<(PathBuf, Vec<&ProductMetadata>)> = Vec::new();
    for product in products {
        let dir = product.output_dir();
        match groups.iter_mut().find(|(d, _)| *d == dir) {
            Some((_, group)) => group.push(product),
            None => groups.push((dir, vec![product])),
        }
    }

    let mut output_files = Vec::new();
    for (output_dir, mut group) in groups {
        group.sort_by(|a, b| {
            a.recipe_dataset_index()
                .partial_cmp(&b.recipe_dataset_index())
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.dataset().cmp(b.dataset()))
        });

        let mut metadata = Mapping::new();
        for product in group {
            metadata.insert(
                Value::from(product.filename.display().to_string()),
                Value::Mapping(sidecar_attributes(product)),
            );
        }

        fs::create_dir_all(&output_dir)?;
        let output_filename = output_dir.join(METADATA_FILENAME);
        debug!("Writing metadata file {}", output_filename.display());
        fs::write(&output_filename, serde_yaml::to_string(&metadata)?)?;
        output_files.push(output_filename);

        if write_ncl {
            output_files.push(write_ncl_metadata(&output_dir, &metadata)?);
        }
    }
    Ok(output_files)
}

/// Flatten `fx_files` into the variable itself
fn flatten_fx_files(attributes: &Mapping) -> Mapping {
    let mut variable = Mapping::new();
    let mut fx_files = None;
    for (key, value) in attributes {
        match (key.as_str(), value) {
            (Some("fx_files"), Value::Mapping(files)) => fx_files = Some(files),
            _ => {
                variable.insert(key.clone(), value.clone());
            }
        }
    }
    for (fx_type, path) in fx_files.into_iter().flatten() {
        variable.insert(fx_type.clone(), path.clone());
    }
    variable
}

fn write_ncl_metadata(output_dir: &Path, metadata: &Mapping) -> Result<PathBuf> {
    let variables: Vec<Mapping> = metadata
        .values()
        .filter_map(Value::as_mapping)
        .map(flatten_fx_files)
        .collect();

    // Keys that differ between datasets go to dataset_info, the rest to variable_info
    let mut variable_info = Mapping::new();
    let mut dataset_info = Vec::with_capacity(variables.len());
    for variable in &variables {
        let mut info = Mapping::new();
        for (key, value) in variable {
            let name = key.as_str().unwrap_or_default();
            let dataset_specific = variables.iter().any(|other| other.get(key) != Some(value));
            if (dataset_specific || DATASET_KEYS.contains(&name)) && !VARIABLE_KEYS.contains(&name) {
                info.insert(key.clone(), value.clone());
            } else {
                variable_info.insert(key.clone(), value.clone());
            }
        }
        dataset_info.push(Value::Mapping(info));
    }

    let short_name = variable_info
        .get("short_name")
        .and_then(Value::as_str)
        .ok_or_else(|| DrsError::NclSettings {
            message: "short_name differs between datasets or is missing".to_string(),
        })?
        .to_string();

    let mut settings = Mapping::new();
    settings.insert(Value::from("dataset_info"), Value::Sequence(dataset_info));
    settings.insert(
        Value::from("input_file_info"),
        Value::Sequence(variables.into_iter().map(Value::Mapping).collect()),
    );
    settings.insert(Value::from("variable_info"), Value::Sequence(vec![Value::Mapping(variable_info)]));

    let filename = output_dir.join(format!("{}_info.ncl", short_name));
    write_ncl_settings(&settings, &filename)?;
    Ok(filename)
}

fn ncl_error(message: impl Into<String>) -> DrsError {
    DrsError::NclSettings {
        message: message.into(),
    }
}

fn ncl_type(value: &Value) -> Result<&'static str> {
    match value {
        Value::Bool(_) | Value::Mapping(_) => Ok("logical"),
        Value::String(_) => Ok("string"),
        Value::Number(n) if n.is_f64() => Ok("double"),
        Value::Number(_) => Ok("int64"),
        other => Err(ncl_error(format!("Unable to map {:?} to an NCL type", other))),
    }
}

/// Format a value as NCL, assigning it to `var_name` when given
fn py_to_ncl(value: &Value, var_name: &str) -> Result<String> {
    let mut txt = if var_name.is_empty() {
        String::new()
    } else {
        format!("{} = ", var_name)
    };
    match value {
        Value::Null => txt.push_str("_Missing"),
        Value::String(s) => txt.push_str(&format!("\"{}\"", s)),
        Value::Bool(true) => txt.push_str("True"),
        Value::Bool(false) => txt.push_str("False"),
        Value::Number(n) => txt.push_str(&n.to_string()),
        Value::Sequence(items) => {
            if items.is_empty() {
                return Err(ncl_error("NCL does not support empty arrays"));
            }
            let items = items
                .iter()
                .map(|item| py_to_ncl(item, ""))
                .collect::<Result<Vec<_>>>()?;
            txt.push_str(&format!("(/{}/)", items.join(", ")));
        }
        Value::Mapping(entries) => {
            if var_name.is_empty() {
                return Err(ncl_error("NCL does not support nested dicts"));
            }
            txt.push_str("True\n");
            for (key, item) in entries {
                txt.push_str(&format!(
                    "{}@{} = {}\n",
                    var_name,
                    scalar_text(key),
                    py_to_ncl(item, "")?
                ));
            }
        }
        Value::Tagged(tagged) => return py_to_ncl(&tagged.value, var_name),
    }
    Ok(txt)
}

/// Write top-level settings as NCL variables, lists as NCL lists
pub fn write_ncl_settings(settings: &Mapping, filename: &Path) -> Result<()> {
    debug!("Writing NCL configuration file {}", filename.display());
    let mut entries: Vec<(String, &Value)> = settings.iter().map(|(k, v)| (scalar_text(k), v)).collect();
    entries.sort_by(|a, b| a.0.cmp(&b.0));

    let mut lines = Vec::new();
    for (var_name, value) in entries {
        lines.push(format!(
            "if (isvar(\"{0}\")) then\n  delete({0})\nend if",
            var_name
        ));
        match value {
            Value::Sequence(items) => {
                lines.push(format!("{} = NewList(\"fifo\")", var_name));
                for item in items {
                    lines.push(format!(
                        "ListAppend({0}, new(1, {1}))\ni = ListCount({0}) - 1",
                        var_name,
                        ncl_type(item)?
                    ));
                    lines.push(py_to_ncl(item, &format!("{}[i]", var_name))?);
                }
            }
            other => lines.push(py_to_ncl(other, &var_name)?),
        }
    }

    let mut text = lines.join("\n");
    text.push('\n');
    fs::write(filename, text)?;
    Ok(())
}
