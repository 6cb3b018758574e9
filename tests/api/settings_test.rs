//! Integration tests for running synthesis from TOML settings.

use std::fs;
use std::path::PathBuf;

use modlit::api::{register_types, synthesize_from_settings, SynthesisOptions};
use modlit::config::{Settings, SettingsError};
use modlit::errors::ModlitError;
use modlit::model::NamingStrategy;
use modlit::modules::Grouping;
use modlit::types::TypeRegistry;

const DUMP: &str = r#"{
    "dialect": "postgres",
    "schemas": [{
        "name": "gis",
        "tables": [
            {
                "name": "parcels",
                "columns": [
                    { "name": "parcel_id", "position": 1, "data_type": "integer" },
                    { "name": "footprint", "position": 2, "data_type": "modlit_settings_test_shape" }
                ],
                "primary_key": ["parcel_id"]
            },
            {
                "name": "survey_points",
                "columns": [
                    { "name": "id", "position": 1, "data_type": "integer" },
                    { "name": "parcel_id", "position": 2, "data_type": "integer" }
                ],
                "primary_key": ["id"],
                "foreign_keys": [
                    { "columns": ["parcel_id"], "referenced_table": "parcels" }
                ]
            }
        ]
    }]
}"#;

fn write_dump(name: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("modlit-{}-{}.json", name, std::process::id()));
    fs::write(&path, DUMP).unwrap();
    path
}

#[tokio::test]
async fn test_synthesize_from_settings() {
    let path = write_dump("settings");
    let settings = Settings::from_toml(&format!(
        r#"
        [connection]
        driver = "catalog_json"
        path = "{}"

        [naming]
        strategy = "pascal_singular"

        [meta]
        title = "Parcels"
        slug = "parcels"
        namespace = "county"
        version = "3"

        [[types]]
        native = "modlit_settings_test_shape"
        kind = "geometry"
        subtype = "polygon"
        "#,
        path.display()
    ))
    .unwrap();

    let report = synthesize_from_settings(&settings).await.unwrap();
    fs::remove_file(&path).unwrap();

    assert!(report.diagnostics.is_empty());
    assert_eq!(report.urn.as_deref(), Some("urn:county:parcels:3"));

    let bundle = report.bundle("gis").unwrap();
    assert_eq!(bundle.model_names(), vec!["Parcel", "SurveyPoint"]);

    let parcel = bundle.get("Parcel").unwrap();
    let footprint = parcel.attribute("footprint").unwrap();
    assert_eq!(footprint.resolved.to_string(), "geometry");
    assert_eq!(footprint.label, "Footprint");

    let point = bundle.get("SurveyPoint").unwrap();
    let reference = point.attribute("parcel_id").unwrap().reference.as_ref().unwrap();
    assert_eq!(reference.model(), Some("Parcel"));
}

#[test]
fn test_options_from_settings() {
    let settings = Settings::from_toml(
        r#"
        [filters]
        schema = "gis"
        table_pattern = "survey_*"

        [modules]
        group_by = "prefix"
        prefix_separator = "_"
        declared = ["survey"]
        allow_empty = false
        "#,
    )
    .unwrap();

    let options = SynthesisOptions::from_settings(&settings).unwrap();
    assert_eq!(options.naming, NamingStrategy::Pascal);
    assert_eq!(options.grouping, Grouping::TablePrefix("_".into()));
    assert_eq!(options.assemble.declared, vec!["survey".to_string()]);
    assert!(!options.assemble.allow_empty);
    assert!(options.filters.accepts("survey_points", modlit::db::TableKind::Table));
    assert!(!options.filters.accepts("parcels", modlit::db::TableKind::Table));
}

#[test]
fn test_invalid_pattern_is_reported() {
    let settings = Settings::from_toml(
        r#"
        [filters]
        table_pattern = "(unclosed"
        pattern_syntax = "regex"
        "#,
    )
    .unwrap();

    let err = SynthesisOptions::from_settings(&settings).unwrap_err();
    assert!(matches!(
        err,
        ModlitError::Settings(SettingsError::InvalidPattern { .. })
    ));
}

#[tokio::test]
async fn test_missing_dump_is_a_connection_error() {
    let settings = Settings::from_toml(
        r#"
        [connection]
        driver = "catalog_json"
        path = "/nonexistent/modlit/catalog.json"
        "#,
    )
    .unwrap();

    let err = synthesize_from_settings(&settings).await.unwrap_err();
    assert!(matches!(err, ModlitError::Connection { .. }));
}

#[test]
fn test_conflicting_types_leave_registry_unchanged() {
    let settings = Settings::from_toml(
        r#"
        [[types]]
        native = "hstore"
        kind = "json"

        [[types]]
        native = "integer"
        kind = "text"
        "#,
    )
    .unwrap();

    let registry = TypeRegistry::with_defaults();
    let err = register_types(&settings, &registry).unwrap_err();
    assert!(matches!(err, ModlitError::DuplicateTypeMapping { .. }));
    assert!(!registry.contains("hstore"));

    // Registering the same entries twice is accepted.
    let settings = Settings::from_toml(
        r#"
        [[types]]
        native = "hstore"
        kind = "json"
        "#,
    )
    .unwrap();
    register_types(&settings, &registry).unwrap();
    register_types(&settings, &registry).unwrap();
    assert!(registry.contains("hstore"));
}
