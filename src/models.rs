//! Core data structures for DRS processing.
//!
//! Defines the dataset descriptor that path templates are expanded from,
//! year ranges used for time gating, and resolved file records.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Value bound to a tag: a single scalar or a list that fans out
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum TagValue {
    Scalar(String),
    List(Vec<String>),
}

impl TagValue {
    /// Scalar value, if this is not a list
    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            TagValue::Scalar(value) => Some(value),
            TagValue::List(_) => None,
        }
    }

    /// All values in order; a scalar yields one element
    pub fn values(&self) -> Vec<&str> {
        match self {
            TagValue::Scalar(value) => vec![value.as_str()],
            TagValue::List(values) => values.iter().map(String::as_str).collect(),
        }
    }

    /// Values joined with `-`, used where a list must collapse to one name
    pub fn joined(&self) -> String {
        self.values().join("-")
    }
}

impl fmt::Display for TagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagValue::Scalar(value) => write!(f, "{}", value),
            TagValue::List(values) => write!(f, "[{}]", values.join(", ")),
        }
    }
}

impl From<&str> for TagValue {
    fn from(value: &str) -> Self {
        TagValue::Scalar(value.to_string())
    }
}

impl From<String> for TagValue {
    fn from(value: String) -> Self {
        TagValue::Scalar(value)
    }
}

impl From<i32> for TagValue {
    fn from(value: i32) -> Self {
        TagValue::Scalar(value.to_string())
    }
}

impl From<Vec<&str>> for TagValue {
    fn from(values: Vec<&str>) -> Self {
        TagValue::List(values.into_iter().map(str::to_string).collect())
    }
}

impl From<Vec<String>> for TagValue {
    fn from(values: Vec<String>) -> Self {
        TagValue::List(values)
    }
}

/// Scalars in recipe files may be numbers or booleans as well as strings
#[derive(Deserialize)]
#[serde(untagged)]
enum RawScalar {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
}

impl RawScalar {
    fn into_string(self) -> String {
        match self {
            RawScalar::Int(v) => v.to_string(),
            RawScalar::Float(v) => v.to_string(),
            RawScalar::Bool(v) => v.to_string(),
            RawScalar::Str(v) => v,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTagValue {
    List(Vec<RawScalar>),
    Scalar(RawScalar),
}

impl<'de> Deserialize<'de> for TagValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match RawTagValue::deserialize(deserializer)? {
            RawTagValue::List(items) => {
                TagValue::List(items.into_iter().map(RawScalar::into_string).collect())
            }
            RawTagValue::Scalar(item) => TagValue::Scalar(item.into_string()),
        })
    }
}

/// Key-value description of one variable request
///
/// Keys are tag names such as `project`, `dataset`, `exp`, `short_name`
/// or `frequency`. Constructed once per variable request by the caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DatasetDescriptor {
    tags: BTreeMap<String, TagValue>,
}

impl DatasetDescriptor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, tag: impl Into<String>, value: impl Into<TagValue>) -> Self {
        self.set(tag, value);
        self
    }

    pub fn set(&mut self, tag: impl Into<String>, value: impl Into<TagValue>) {
        self.tags.insert(tag.into(), value.into());
    }

    pub fn get(&self, tag: &str) -> Option<&TagValue> {
        self.tags.get(tag)
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.tags.contains_key(tag)
    }

    /// Scalar value of a tag; lists return `None`
    pub fn get_str(&self, tag: &str) -> Option<&str> {
        self.get(tag).and_then(TagValue::as_scalar)
    }

    /// Integer value of a scalar tag
    pub fn get_year(&self, tag: &str) -> Option<i32> {
        self.get_str(tag).and_then(|v| v.trim().parse().ok())
    }

    pub fn project(&self) -> Option<&str> {
        self.get_str("project")
    }

    pub fn frequency(&self) -> Option<&str> {
        self.get_str("frequency")
    }

    /// Requested time window, when both bounds are present
    pub fn year_range(&self) -> Option<YearRange> {
        Some(YearRange::new(
            self.get_year("start_year")?,
            self.get_year("end_year")?,
        ))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &TagValue)> {
        self.tags.iter()
    }
}

impl fmt::Display for DatasetDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .tags
            .iter()
            .map(|(k, v)| format!("{}: {}", k, v))
            .collect();
        write!(f, "{{{}}}", parts.join(", "))
    }
}

/// Inclusive range of calendar years
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct YearRange {
    pub start: i32,
    pub end: i32,
}

impl YearRange {
    pub fn new(start: i32, end: i32) -> Self {
        Self { start, end }
    }

    /// Overlap test used for time gating: `self.start <= other.end && self.end >= other.start`
    pub fn overlaps(&self, other: &YearRange) -> bool {
        self.start <= other.end && self.end >= other.start
    }
}

impl fmt::Display for YearRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// An existing input file; its year range is parsed only on demand
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    path: PathBuf,
    years: Option<YearRange>,
}

impl FileRecord {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            years: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Cached year range, if it has been resolved
    pub fn years(&self) -> Option<YearRange> {
        self.years
    }

    pub fn set_years(&mut self, years: YearRange) {
        self.years = Some(years);
    }

    pub fn into_path(self) -> PathBuf {
        self.path
    }
}
