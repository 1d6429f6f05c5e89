//! Error handling for DRS processing operations.
//!
//! Provides error types with context for configuration lookups, path
//! template expansion, filename date parsing, fix dispatch and cube I/O.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DrsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid glob pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("Directory traversal error: {0}")]
    Traversal(#[from] walkdir::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Array shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error for project {project}: {message}")]
    Configuration { project: String, message: String },

    #[error("Dataset key {tag} must be specified for {descriptor}, check your recipe entry")]
    MissingTag { tag: String, descriptor: String },

    #[error("File {path} can not be read: {reason}")]
    UnreadableFile { path: PathBuf, reason: String },

    #[error(
        "File {path} dates do not match a recognized pattern and time can not be read from the file"
    )]
    DateNotFound { path: PathBuf },

    #[error(
        "More than one cube found for variable {variable} in {project}:{dataset} but none of their var_names match the expected. Cubes encountered: {candidates:?}"
    )]
    AmbiguousCube {
        variable: String,
        project: String,
        dataset: String,
        candidates: Vec<String>,
    },

    #[error("Cubes can not be concatenated: {reason}")]
    ConcatenationInconsistency { reason: String },

    #[error("Compliance check failed for {variable}: {message}")]
    ComplianceCheck { variable: String, message: String },

    #[error("Cube operation failed: {message}")]
    CubeOperation { message: String },

    #[error("Cannot write NCL settings: {message}")]
    NclSettings { message: String },

    #[cfg(feature = "netcdf")]
    #[error("NetCDF error: {0}")]
    Netcdf(#[from] netcdf::Error),
}

impl DrsError {
    /// Create a configuration error for a project
    pub fn configuration(project: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Configuration {
            project: project.into(),
            message: message.into(),
        }
    }

    /// Create an unreadable file error
    pub fn unreadable(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::UnreadableFile {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a cube operation error
    pub fn cube(message: impl Into<String>) -> Self {
        Self::CubeOperation {
            message: message.into(),
        }
    }

    pub fn inconsistent(reason: impl Into<String>) -> Self {
        Self::ConcatenationInconsistency {
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, DrsError>;
