//! Tests for version resolution

use super::*;
use crate::app::adapters::filesystem::OsFileSystem;
use crate::app::services::data_finder::resolve_latest_version;
use std::fs;
use tempfile::TempDir;

fn template() -> String {
    format!("{}/{{latestversion}}/tas", CMIP5_VERSION_PARENT)
}

#[test]
fn test_picks_highest_version() {
    let fs = dkrz_filesystem();

    let resolved = resolve_latest_version(&fs, &template()).unwrap();
    assert_eq!(resolved, format!("{}/v20130101/tas", CMIP5_VERSION_PARENT));
}

#[test]
fn test_latest_marker_wins() {
    let mut fs = dkrz_filesystem();
    fs.add_dir(format!("{}/latest/tas", CMIP5_VERSION_PARENT));

    let resolved = resolve_latest_version(&fs, &template()).unwrap();
    assert_eq!(resolved, format!("{}/latest/tas", CMIP5_VERSION_PARENT));
}

#[test]
fn test_version_without_suffix_directory_is_skipped() {
    let mut fs = dkrz_filesystem();
    fs.add_dir(format!("{}/v20990101/pr", CMIP5_VERSION_PARENT));

    let resolved = resolve_latest_version(&fs, &template()).unwrap();
    assert_eq!(resolved, format!("{}/v20130101/tas", CMIP5_VERSION_PARENT));
}

#[test]
fn test_unresolvable_templates_are_returned_unchanged() {
    let fs = dkrz_filesystem();

    let missing_prefix = "/nowhere/{latestversion}/tas";
    assert_eq!(resolve_latest_version(&fs, missing_prefix).unwrap(), missing_prefix);

    let no_match = format!("{}/{{latestversion}}/pr", CMIP5_VERSION_PARENT);
    assert_eq!(resolve_latest_version(&fs, &no_match).unwrap(), no_match);
}

#[test]
fn test_resolution_is_idempotent() {
    let fs = dkrz_filesystem();

    let resolved = resolve_latest_version(&fs, &template()).unwrap();
    assert_eq!(resolve_latest_version(&fs, &resolved).unwrap(), resolved);
}

#[test]
fn test_placeholder_at_end_of_template() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    fs::create_dir_all(root.join("v1")).unwrap();
    fs::create_dir_all(root.join("v2")).unwrap();

    let template = format!("{}/{{latestversion}}", root.display());
    let resolved = resolve_latest_version(&OsFileSystem, &template).unwrap();
    assert_eq!(PathBuf::from(resolved), root.join("v2"));
}
