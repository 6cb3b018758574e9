//! Integration tests for end-to-end model synthesis from catalog dumps.

use modlit::api::{synthesize_models, synthesize_models_with, SynthesisOptions};
use modlit::db::{ReadFilters, StaticCatalog, TableNamePattern};
use modlit::errors::{DiagnosticKind, ModlitError, Severity};
use modlit::meta::ModelMeta;
use modlit::model::{NamingStrategy, ReferenceState};
use modlit::modules::{AssembleOptions, Grouping};
use modlit::types::{PrimitiveKind, TypeMapping, TypeRegistry};

const SHOP: &str = r#"{
    "dialect": "postgres",
    "schemas": [{
        "name": "public",
        "tables": [
            {
                "name": "users",
                "columns": [
                    { "name": "id", "position": 1, "data_type": "integer", "is_nullable": false },
                    { "name": "email", "position": 2, "data_type": "varchar(255)" }
                ],
                "primary_key": ["id"]
            },
            {
                "name": "orders",
                "columns": [
                    { "name": "id", "position": 1, "data_type": "integer", "is_nullable": false },
                    { "name": "user_id", "position": 2, "data_type": "integer" },
                    { "name": "total", "position": 3, "data_type": "numeric(10,2)" }
                ],
                "primary_key": ["id"],
                "foreign_keys": [
                    { "columns": ["user_id"], "referenced_table": "users", "referenced_columns": ["id"] }
                ]
            }
        ]
    }]
}"#;

const PARCELS: &str = r#"{
    "schemas": [{
        "name": "gis",
        "tables": [{
            "name": "parcels",
            "columns": [
                { "name": "id", "data_type": "integer" },
                { "name": "shape", "data_type": "geom_unknown_v2" },
                { "name": "owner", "data_type": "text" }
            ],
            "primary_key": ["id"]
        }]
    }]
}"#;

fn shop() -> StaticCatalog {
    StaticCatalog::from_json(SHOP).unwrap()
}

#[tokio::test]
async fn test_users_and_orders() {
    let registry = TypeRegistry::with_defaults();
    let report = synthesize_models_with(&shop(), &SynthesisOptions::default(), &registry)
        .await
        .unwrap();

    assert!(report.diagnostics.is_empty());
    assert_eq!(report.bundles.len(), 1);

    let bundle = report.bundle("public").unwrap();
    assert_eq!(bundle.model_names(), vec!["Users", "Orders"]);

    let users = bundle.get("Users").unwrap();
    let names: Vec<_> = users.attributes.iter().map(|a| a.name()).collect();
    assert_eq!(names, vec!["id", "email"]);
    assert_eq!(
        users.attributes[1].resolved.mapping().unwrap().primitive_kind(),
        Some(PrimitiveKind::Text)
    );
    assert_eq!(users.attributes[1].width, Some(255));

    let orders = bundle.get("Orders").unwrap();
    let reference = orders.attribute("user_id").unwrap().reference.as_ref().unwrap();
    assert_eq!(
        reference.state,
        ReferenceState::Resolved {
            model: "Users".into(),
            attribute: "id".into()
        }
    );

    insta::assert_snapshot!(report.summary(), @r"
    module public
      Users <- public.users
        id: integer [pk]
        email: text
      Orders <- public.orders
        id: integer [pk]
        user_id: integer -> Users.id
        total: decimal
    ");
}

#[tokio::test]
async fn test_forward_and_cyclic_references_resolve() {
    let source = StaticCatalog::from_json(
        r#"{ "schemas": [{ "name": "hr", "tables": [
            {
                "name": "employees",
                "columns": [
                    { "name": "id", "position": 1, "data_type": "integer" },
                    { "name": "dept_id", "position": 2, "data_type": "integer" },
                    { "name": "manager_id", "position": 3, "data_type": "integer" }
                ],
                "primary_key": ["id"],
                "foreign_keys": [
                    { "columns": ["dept_id"], "referenced_table": "departments", "referenced_columns": ["id"] },
                    { "columns": ["manager_id"], "referenced_table": "employees" }
                ]
            },
            {
                "name": "departments",
                "columns": [
                    { "name": "id", "position": 1, "data_type": "integer" },
                    { "name": "head_id", "position": 2, "data_type": "integer" }
                ],
                "primary_key": ["id"],
                "foreign_keys": [
                    { "columns": ["head_id"], "referenced_table": "employees", "referenced_columns": ["id"] }
                ]
            }
        ] }] }"#,
    )
    .unwrap();
    let registry = TypeRegistry::with_defaults();
    let report = synthesize_models_with(&source, &SynthesisOptions::default(), &registry)
        .await
        .unwrap();

    assert!(report.diagnostics.is_empty());
    insta::assert_snapshot!(report.summary(), @r"
    module hr
      Employees <- hr.employees
        id: integer [pk]
        dept_id: integer -> Departments.id
        manager_id: integer -> Employees.id
      Departments <- hr.departments
        id: integer [pk]
        head_id: integer -> Employees.id
    ");
}

#[tokio::test]
async fn test_filtered_out_target_dangles() {
    let registry = TypeRegistry::with_defaults();
    let options = SynthesisOptions {
        filters: ReadFilters::new().pattern(TableNamePattern::glob("orders").unwrap()),
        ..Default::default()
    };
    let report = synthesize_models_with(&shop(), &options, &registry)
        .await
        .unwrap();

    assert_eq!(report.model_count(), 1);
    assert_eq!(report.diagnostics.len(), 1);

    let diagnostic = &report.diagnostics[0];
    assert_eq!(diagnostic.severity, Severity::Warning);
    assert_eq!(
        diagnostic.kind,
        DiagnosticKind::DanglingReference {
            table: "orders".into(),
            column: "user_id".into(),
            target: "users.id".into(),
        }
    );

    let orders = report.bundle("public").unwrap().get("Orders").unwrap();
    assert!(orders.attribute("user_id").unwrap().reference.as_ref().unwrap().is_dangling());
}

#[tokio::test]
async fn test_unknown_type_becomes_opaque() {
    let registry = TypeRegistry::with_defaults();
    let source = StaticCatalog::from_json(PARCELS).unwrap();
    let report = synthesize_models_with(&source, &SynthesisOptions::default(), &registry)
        .await
        .unwrap();

    let parcels = report.bundle("gis").unwrap().get("Parcels").unwrap();
    assert_eq!(parcels.attributes.len(), 3);
    assert!(!parcels.attributes[0].is_opaque());
    assert!(parcels.attributes[1].is_opaque());
    assert!(!parcels.attributes[2].is_opaque());

    assert_eq!(report.diagnostics.len(), 1);
    assert!(report.has_warnings());
    assert_eq!(
        report.diagnostics[0].to_string(),
        "warning: 'parcels.shape' has unknown native type 'geom_unknown_v2', mapped as opaque"
    );
}

#[tokio::test]
async fn test_registered_extension_is_used() {
    let registry = TypeRegistry::with_defaults();
    registry
        .register("geom_unknown_v2", TypeMapping::geometry(None))
        .unwrap();
    let source = StaticCatalog::from_json(PARCELS).unwrap();
    let report = synthesize_models_with(&source, &SynthesisOptions::default(), &registry)
        .await
        .unwrap();

    assert!(report.diagnostics.is_empty());
    let parcels = report.bundle("gis").unwrap().get("Parcels").unwrap();
    assert!(parcels.attributes[1].resolved.mapping().unwrap().is_geometry());
}

#[tokio::test]
async fn test_name_collision_is_fatal() {
    let source = StaticCatalog::from_json(
        r#"{ "schemas": [{ "name": "main", "tables": [
            { "name": "order_items", "columns": [{ "name": "id", "data_type": "integer" }] },
            { "name": "OrderItems", "columns": [{ "name": "id", "data_type": "integer" }] }
        ] }] }"#,
    )
    .unwrap();

    let err = synthesize_models(&source, &SynthesisOptions::default())
        .await
        .unwrap_err();
    assert!(err.is_fatal());
    match err {
        ModlitError::NameCollision {
            model,
            first_table,
            second_table,
        } => {
            assert_eq!(model, "OrderItems");
            assert_eq!(first_table, "order_items");
            assert_eq!(second_table, "OrderItems");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_runs_are_deterministic() {
    let registry = TypeRegistry::with_defaults();
    let options = SynthesisOptions {
        naming: NamingStrategy::PascalSingular,
        ..Default::default()
    };

    let a = synthesize_models_with(&shop(), &options, &registry).await.unwrap();
    let b = synthesize_models_with(&shop(), &options, &registry).await.unwrap();

    assert_eq!(a.snapshot.fingerprint(), b.snapshot.fingerprint());
    assert_eq!(a.summary(), b.summary());
    assert_eq!(a.bundles[0].model_names(), vec!["User", "Order"]);
}

#[tokio::test]
async fn test_declared_empty_module() {
    let registry = TypeRegistry::with_defaults();
    let options = SynthesisOptions {
        assemble: AssembleOptions {
            declared: vec!["public".into(), "audit".into()],
            allow_empty: true,
        },
        ..Default::default()
    };
    let report = synthesize_models_with(&shop(), &options, &registry)
        .await
        .unwrap();

    assert_eq!(report.bundles.len(), 1);
    assert!(!report.has_warnings());
    assert_eq!(report.diagnostics[0].severity, Severity::Info);

    let strict = SynthesisOptions {
        assemble: AssembleOptions {
            declared: vec!["audit".into()],
            allow_empty: false,
        },
        ..Default::default()
    };
    let err = synthesize_models_with(&shop(), &strict, &registry)
        .await
        .unwrap_err();
    assert!(matches!(err, ModlitError::EmptyBundle { .. }));
}

#[tokio::test]
async fn test_prefix_grouping_and_meta() {
    let registry = TypeRegistry::with_defaults();
    let options = SynthesisOptions {
        grouping: Grouping::TablePrefix("_".into()),
        meta: Some(ModelMeta::new("Shop", "shop", "Acme Corp", "1.0")),
        ..Default::default()
    };
    let report = synthesize_models_with(&shop(), &options, &registry)
        .await
        .unwrap();

    assert_eq!(report.urn.as_deref(), Some("urn:acme_corp:shop:1.0"));
    // Neither table has a prefix, so both stay with their schema.
    assert_eq!(report.bundles.len(), 1);
    assert_eq!(report.bundles[0].name(), "public");
    assert!(report.summary().starts_with("Shop (urn:acme_corp:shop:1.0)\n"));
}

#[tokio::test]
async fn test_report_serializes() {
    let registry = TypeRegistry::with_defaults();
    let report = synthesize_models_with(&shop(), &SynthesisOptions::default(), &registry)
        .await
        .unwrap();

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["bundles"][0]["name"], "public");
    assert_eq!(json["bundles"][0]["models"][1]["name"], "Orders");
    assert_eq!(
        json["bundles"][0]["models"][1]["attributes"][1]["reference"]["state"]["state"],
        "resolved"
    );
}
