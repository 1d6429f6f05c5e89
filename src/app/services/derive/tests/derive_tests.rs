//! Tests for the shipped derivations

use super::*;
use crate::app::cube::tests::series_cube;
use crate::app::services::derive::{DerivedRegistry, RequiredVariable};

#[test]
fn test_builtin_registry_lists_derivations() {
    let registry = DerivedRegistry::builtin();

    let names: Vec<&str> = registry.short_names().collect();
    assert_eq!(names, vec!["amoc", "clhmtisccp", "clltkisccp", "lvp"]);
    assert!(registry.get("unknown").is_err());
}

#[test]
fn test_required_variables() {
    let registry = DerivedRegistry::builtin();

    let lvp: Vec<String> = registry
        .required("lvp", "CMIP5")
        .unwrap()
        .into_iter()
        .map(|r| r.short_name)
        .collect();
    assert_eq!(lvp, vec!["hfls", "pr", "evspsbl"]);
    assert_eq!(
        registry.required("amoc", "CMIP6").unwrap(),
        vec![RequiredVariable::derived("msftyz")]
    );
    assert_eq!(
        registry.required("amoc", "CMIP5").unwrap(),
        vec![RequiredVariable::derived("msftmyz")]
    );
}

#[test]
fn test_lvp_scales_latent_heat_by_precipitation_ratio() {
    let registry = DerivedRegistry::builtin();
    let mut hfls = series_cube("hfls", vec![15.0, 45.0], vec![80.0, 100.0])
        .with_standard_name("surface_upward_latent_heat_flux");
    hfls.units = "W m-2".to_string();
    let mut pr = series_cube("pr", vec![15.0, 45.0], vec![3.0, 1.0]).with_standard_name("precipitation_flux");
    pr.units = "kg m-2 s-1".to_string();
    let mut evspsbl =
        series_cube("evspsbl", vec![15.0, 45.0], vec![2.0, 0.0]).with_standard_name("water_evaporation_flux");
    evspsbl.units = "kg m-2 s-1".to_string();

    let lvp = registry.derive("lvp", &[pr, evspsbl, hfls]).unwrap();
    assert_eq!(lvp.var_name, "lvp");
    assert_eq!(lvp.units, "W m-2");
    let data = lvp.array().unwrap();
    assert_eq!(data[[0]], 120.0);
    assert!(data[[1]].is_nan());
}

#[test]
fn test_lvp_needs_all_inputs() {
    let registry = DerivedRegistry::builtin();
    let hfls = series_cube("hfls", vec![15.0], vec![80.0]).with_standard_name("surface_upward_latent_heat_flux");

    assert!(registry.derive("lvp", &[hfls]).is_err());
}

#[test]
fn test_low_thick_cloud_fraction() {
    let registry = DerivedRegistry::builtin();

    let cube = registry.derive("clltkisccp", &[clisccp_cube()]).unwrap();
    assert_eq!(cube.shape(), &[1]);
    // tau 30 and 60 at 900 hPa
    assert_eq!(cube.array().unwrap()[[0]], 110.0);
    assert!(cube.coord("air_pressure").unwrap().points.ndim() == 0);
}

#[test]
fn test_high_medium_cloud_fraction() {
    let registry = DerivedRegistry::builtin();

    let cube = registry.derive("clhmtisccp", &[clisccp_cube()]).unwrap();
    // tau 10 at 300 hPa
    assert_eq!(cube.array().unwrap()[[0]], 3.0);
}

#[test]
fn test_amoc_takes_deep_atlantic_maximum_near_rapid_latitude() {
    let registry = DerivedRegistry::builtin();

    let cube = registry.derive("amoc", &[msftmyz_cube()]).unwrap();
    assert_eq!(cube.shape(), &[1]);
    assert_eq!(cube.array().unwrap()[[0]], 121.0);
    assert_eq!(cube.coord("latitude").unwrap().values(), vec![26.0]);
}

#[test]
fn test_amoc_without_region_names_fails() {
    let registry = DerivedRegistry::builtin();
    let mut cube = msftmyz_cube();
    cube.coord_mut("region").unwrap().attributes.clear();

    assert!(registry.derive("amoc", &[cube]).is_err());
}
