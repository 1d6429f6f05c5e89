//! Tests for tag substitution

use super::*;
use crate::app::services::data_finder::replace_tags;
use crate::error::DrsError;

#[test]
fn test_single_values_give_one_path() {
    let paths = replace_tags("{dataset}/{exp}/{short_name}", &cmip5_descriptor()).unwrap();
    assert_eq!(paths, vec!["EC-EARTH/historical/tas"]);
}

#[test]
fn test_list_value_fans_out_in_order() {
    let descriptor = cmip5_descriptor().with("exp", vec!["historical", "rcp85", "rcp45"]);

    let paths = replace_tags("{exp}/{short_name}", &descriptor).unwrap();
    assert_eq!(
        paths,
        vec!["historical/tas", "rcp85/tas", "rcp45/tas"]
    );
}

#[test]
fn test_two_list_values_compound() {
    let descriptor = cmip5_descriptor()
        .with("exp", vec!["a", "b"])
        .with("ensemble", vec!["r1", "r2"]);

    let paths = replace_tags("{exp}_{ensemble}", &descriptor).unwrap();
    assert_eq!(paths, vec!["a_r1", "b_r1", "a_r2", "b_r2"]);
}

#[test]
fn test_case_modifiers() {
    let paths = replace_tags("{short_name.upper}/{dataset.lower}/{dataset}", &cmip5_descriptor()).unwrap();
    assert_eq!(paths, vec!["TAS/ec-earth/EC-EARTH"]);
}

#[test]
fn test_repeated_tag_is_replaced_everywhere() {
    let descriptor = cmip5_descriptor().with("exp", vec!["a", "b"]);

    let paths = replace_tags("{exp}/{short_name}_{exp}", &descriptor).unwrap();
    assert_eq!(paths, vec!["a/tas_a", "b/tas_b"]);
}

#[test]
fn test_surrounding_separators_are_stripped() {
    let paths = replace_tags("/{exp}/", &cmip5_descriptor()).unwrap();
    assert_eq!(paths, vec!["historical"]);

    assert_eq!(replace_tags("/", &cmip5_descriptor()).unwrap(), vec![""]);
}

#[test]
fn test_latest_version_is_left_for_resolution() {
    let paths = replace_tags("{dataset}/{latestversion}/{short_name}", &cmip5_descriptor()).unwrap();
    assert_eq!(paths, vec!["EC-EARTH/{latestversion}/tas"]);
}

#[test]
fn test_missing_tag_names_tag_and_descriptor() {
    let err = replace_tags("{dataset}/{grid}", &cmip5_descriptor()).unwrap_err();
    match &err {
        DrsError::MissingTag { tag, descriptor } => {
            assert_eq!(tag, "grid");
            assert!(descriptor.contains("EC-EARTH"));
        }
        other => panic!("Expected MissingTag error, got {:?}", other),
    }
    assert!(err.to_string().starts_with("Dataset key grid must be specified for {"));
}
