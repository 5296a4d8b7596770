//! Config loading, defaults and validation.

use h3492_core::{
    config::AnalysisConfig,
    dataset::{DatasetScope, DEFAULT_NATIONAL_URI},
    error::AnalysisError,
    metrics::ChangeFormula,
    reform::Reform,
};
use std::io::Write;

fn write_config(json: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(json.as_bytes()).unwrap();
    file
}

#[test]
fn empty_object_loads_defaults() {
    let file = write_config("{}");
    let config = AnalysisConfig::load(file.path()).unwrap();

    assert_eq!(config.year, 2026);
    assert_eq!(config.dataset.scope, DatasetScope::State { code: "SC".into() });
    assert_eq!(config.reform, Reform::sc_h3492_refundable());
    assert_eq!(config.sweep.count(), 2_001);
    assert_eq!(config.change_formula, ChangeFormula::CappedReform);
    assert_eq!(config.engine.command, vec!["policyengine-bridge".to_string()]);
    config.validate().unwrap();

    let dataset = config.dataset.resolve().unwrap();
    assert_eq!(dataset.uri, "hf://policyengine/policyengine-us-data/states/SC.h5");
    assert_eq!(dataset.state_fips, Some(45));
}

#[test]
fn partial_config_overrides_only_what_it_names() {
    let file = write_config(
        r#"{
            "year": 2027,
            "dataset": { "scope": { "scope": "national" } },
            "reform": { "kind": "builtin", "name": "my_reform" },
            "household": { "num_children": 3 },
            "sweep": { "max": 50000, "step": 5000 },
            "change_formula": "baseline_relative"
        }"#,
    );
    let config = AnalysisConfig::load(file.path()).unwrap();

    assert_eq!(config.year, 2027);
    assert_eq!(config.dataset.scope, DatasetScope::National);
    assert_eq!(config.reform.name(), "my_reform");
    assert_eq!(config.household.num_children, 3);
    assert_eq!(config.household.state, "SC");
    assert_eq!(config.sweep.min, 0);
    assert_eq!(config.sweep.count(), 11);
    assert_eq!(config.change_formula, ChangeFormula::BaselineRelative);

    let dataset = config.dataset.resolve().unwrap();
    assert_eq!(dataset.uri, DEFAULT_NATIONAL_URI);
    assert_eq!(dataset.state, None);
}

#[test]
fn unreadable_or_malformed_files_are_config_errors() {
    let missing = AnalysisConfig::load(std::path::Path::new("/nonexistent/h3492.json"));
    assert!(matches!(missing, Err(AnalysisError::Config(_))));

    let file = write_config("{ \"year\": ");
    assert!(matches!(AnalysisConfig::load(file.path()), Err(AnalysisError::Config(_))));
}

#[test]
fn reform_presets_resolve_by_name() {
    assert_eq!(
        Reform::preset("sc_h3492_eitc_refundable").unwrap(),
        Reform::sc_h3492_refundable()
    );
    assert_eq!(Reform::preset("sc_no_eitc").unwrap().name(), "sc_no_eitc");
    assert!(matches!(Reform::preset("flat_tax"), Err(AnalysisError::Config(_))));
}

#[test]
fn validation_rejects_bad_settings() {
    let mut config = AnalysisConfig::default_test();
    config.sweep.max = 0;
    config.sweep.min = 10;
    assert!(matches!(config.validate(), Err(AnalysisError::Config(_))));

    let mut config = AnalysisConfig::default_test();
    config.dataset.scope = DatasetScope::State { code: "ZZ".into() };
    assert!(matches!(config.validate(), Err(AnalysisError::UnknownDataset(_))));

    let mut config = AnalysisConfig::default_test();
    config.dataset.state_uri_template = "hf://fixed.h5".into();
    assert!(matches!(config.validate(), Err(AnalysisError::Config(_))));

    let mut config = AnalysisConfig::default_test();
    config.household.state = "ZZ".into();
    assert!(matches!(config.validate(), Err(AnalysisError::Config(_))));

    let mut config = AnalysisConfig::default_test();
    config.engine.command.clear();
    assert!(matches!(config.validate(), Err(AnalysisError::Config(_))));
    config.engine.replay = Some("recording.json".into());
    config.validate().unwrap();

    let mut config = AnalysisConfig::default_test();
    config.reform = Reform::Builtin { name: "  ".into() };
    assert!(matches!(config.validate(), Err(AnalysisError::Config(_))));
}
