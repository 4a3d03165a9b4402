//! Declaration Document Tests
//!
//! Loads the fixture documents, declares them into a registry and builds
//! records from them.

use std::path::{Path, PathBuf};

use recordkit::{
    Document, ErrorKind, FieldType, MapOrder, Record, RecordkitConfig, SchemaError, TypeRegistry,
    Value,
};
use serde_json::json;

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name)
}

fn load(name: &str) -> TypeRegistry {
    let mut registry = TypeRegistry::new();
    Document::load(fixture(name))
        .unwrap()
        .declare_into(&mut registry)
        .unwrap();
    registry
}

fn output(record: &Record) -> serde_json::Value {
    Value::Map(record.to_output().unwrap()).to_json().unwrap()
}

#[test]
fn test_toml_document_declares_in_order() {
    let registry = load("process.toml");
    let names: Vec<_> = registry.names().collect();
    assert_eq!(names, vec!["ExampleEvent", "CustomExampleEvent", "ExampleProcess"]);

    let custom = registry.get("CustomExampleEvent").unwrap();
    assert!(custom.is_subtype_of(registry.get("ExampleEvent").unwrap()));
    let fields: Vec<_> = custom.field_names().collect();
    assert_eq!(fields, vec!["id", "type", "time", "comment"]);
    assert!(!custom.contains("PREFIX"));
    assert_eq!(custom.constant("PREFIX"), Some(&Value::text("CUSTOM")));

    let events = registry.get("ExampleProcess").unwrap().field("events").unwrap();
    assert_eq!(events.container_map_order(), MapOrder::Sorted);
    assert!(events.field_type().unwrap().is_record_container());
}

#[test]
fn test_records_from_toml_types() {
    let registry = load("process.toml");
    let process = registry.require("ExampleProcess").unwrap();

    let empty = Record::new(process, Value::Null).unwrap();
    assert_eq!(
        output(&empty),
        json!({"id": null, "status": null, "events": null, "tags": []})
    );

    let p = Record::new(
        process,
        Value::from(json!({
            "status": "running",
            "events": {
                "started": {"id": 1, "comment": "started at first"},
                "completed": {"id": 2}
            }
        })),
    )
    .unwrap();
    assert_eq!(p.set("status", "done").unwrap_err().kind(), ErrorKind::Mutation);

    let out = Value::Map(p.to_output().unwrap());
    let events = out.as_map().unwrap()["events"].as_map().unwrap();
    let keys: Vec<_> = events.keys().cloned().collect();
    assert_eq!(keys, vec!["completed", "started"]);
    assert_eq!(
        events["started"].to_json().unwrap(),
        json!({"id": "1", "type": "custom", "comment": "started at first"})
    );
}

#[test]
fn test_json_document_and_payload() {
    let registry = load("inventory.json");
    let item = registry.require("Item").unwrap();
    assert!(item.field("sku").unwrap().is_required());
    assert_eq!(item.field("note").unwrap().static_default(), Some(&Value::Null));
    assert!(item.field("payload").unwrap().field_type().is_none());
    assert_eq!(
        item.field("quantity").unwrap().field_type(),
        Some(&FieldType::Int)
    );

    let shelf = registry.require("Shelf").unwrap();
    let payload: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(fixture("shelf.json")).unwrap()).unwrap();
    let record = Record::new(shelf, Value::from(payload)).unwrap();
    assert_eq!(
        output(&record),
        json!({
            "items": [
                {"sku": "A-1", "quantity": 3, "note": null},
                {"sku": "B-2", "quantity": 0, "note": null}
            ],
            "location": "aisle 4"
        })
    );

    let err = Record::new(shelf, Value::from(json!({"owner": "me"}))).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Construction);
    let err = Record::new(item, Value::from(json!({"quantity": 1}))).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Construction);
}

#[test]
fn test_loading_twice_is_idempotent() {
    let mut registry = load("process.toml");
    let before = registry.get("ExampleEvent").unwrap().clone();
    Document::load(fixture("process.toml"))
        .unwrap()
        .declare_into(&mut registry)
        .unwrap();
    assert_eq!(registry.len(), 3);
    assert!(std::sync::Arc::ptr_eq(&before, registry.get("ExampleEvent").unwrap()));
}

#[test]
fn test_redefinition_through_document_fails() {
    let mut registry = load("inventory.json");
    let doc = Document::from_json_str(
        r#"{"types": [{"name": "Item", "fields": [{"name": "sku", "type": "int"}]}]}"#,
    )
    .unwrap();
    let err = doc.declare_into(&mut registry).unwrap_err();
    assert!(matches!(err, SchemaError::AlreadyDeclared { .. }));
}

#[test]
fn test_unknown_parent_and_extension() {
    let doc = Document::from_toml_str(
        r#"
[[types]]
name = "Orphan"
extends = "Missing"
"#,
    )
    .unwrap();
    let err = doc.declare_into(&mut TypeRegistry::new()).unwrap_err();
    assert!(matches!(err, SchemaError::UnknownType(_)));

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("types.yaml");
    std::fs::write(&path, "types: []").unwrap();
    assert!(matches!(
        Document::load(&path).unwrap_err(),
        SchemaError::InvalidDeclaration(_)
    ));
}

#[test]
fn test_registry_from_config_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("recordkit.toml");
    std::fs::write(
        &path,
        "[defaults]\nallow_open_attributes = true\nforbidden_open_attributes = [\"password\"]\n",
    )
    .unwrap();
    let config = RecordkitConfig::load_from(Some(&path)).unwrap();

    let mut registry = TypeRegistry::from_config(&config);
    Document::load(fixture("inventory.json"))
        .unwrap()
        .declare_into(&mut registry)
        .unwrap();
    let item = registry.require("Item").unwrap();
    assert!(item.allows_open_attributes());
    assert!(item.options().is_forbidden("password"));

    let shelf = registry.require("Shelf").unwrap();
    assert!(shelf.options().is_forbidden("owner"));
    assert!(!shelf.options().is_forbidden("password"));
}

#[test]
fn test_oversized_integer_default_is_rejected() {
    let doc = Document::from_json_str(
        r#"{"types": [{"name": "Counter", "fields": [{"name": "n", "type": "int", "default": 18446744073709551615}]}]}"#,
    )
    .unwrap();
    let err = doc.declare_into(&mut TypeRegistry::new()).unwrap_err();
    assert!(matches!(err, SchemaError::InvalidArgument(_)));
}
