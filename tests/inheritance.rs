//! Schema Resolution Tests
//!
//! How fields, defaults, properties and constants are inherited and overridden.

use std::sync::Arc;

use recordkit::{resolve, ErrorKind, FieldSpec, FieldType, Mixin, Record, Schema, TypeDecl, Value};
use serde_json::json;

fn output(record: &Record) -> serde_json::Value {
    Value::Map(record.to_output().unwrap()).to_json().unwrap()
}

fn new(schema: &Arc<Schema>) -> Record {
    Record::new(schema, Value::Null).unwrap()
}

#[test]
fn test_inherited_fields_are_distinct_copies() {
    let a = resolve(
        TypeDecl::new("A")
            .field("x", FieldType::Int, 1)
            .spec("y", FieldType::Text, FieldSpec::new().read_only().output(false)),
    )
    .unwrap();
    let b = resolve(TypeDecl::new("B").extends(&a)).unwrap();

    for name in ["x", "y"] {
        let parent = a.field(name).unwrap();
        let child = b.field(name).unwrap();
        assert!(!std::ptr::eq(parent, child));
        assert_eq!(parent, child);
    }
    assert!(b.is_subtype_of(&a));
    assert!(!a.is_subtype_of(&b));
}

#[test]
fn test_mixin_annotations_act_as_field_definitions() {
    let base = Mixin::new("Base")
        .annotate("x", FieldType::Int)
        .field("y", FieldType::Int, 5);
    let a = resolve(TypeDecl::new("A").mixin(base)).unwrap();
    assert!(a.contains("x"));
    assert_eq!(a.field("y").unwrap().static_default(), Some(&Value::Int(5)));
}

#[test]
fn test_default_value_override_in_subtype() {
    let a = resolve(TypeDecl::new("A").annotate("x", FieldType::Int)).unwrap();
    let b = resolve(TypeDecl::new("B").extends(&a).field("x", FieldType::Int, 0)).unwrap();
    let c = resolve(TypeDecl::new("C").extends(&b)).unwrap();
    let d = resolve(TypeDecl::new("D").extends(&c).field("x", FieldType::Int, 5)).unwrap();
    let e = resolve(TypeDecl::new("E").extends(&d)).unwrap();

    assert!(!a.field("x").unwrap().has_default());
    assert_eq!(b.field("x").unwrap().static_default(), Some(&Value::Int(0)));
    assert_eq!(c.field("x").unwrap().static_default(), Some(&Value::Int(0)));
    assert_eq!(d.field("x").unwrap().static_default(), Some(&Value::Int(5)));
    assert_eq!(e.field("x").unwrap().static_default(), Some(&Value::Int(5)));
}

#[test]
fn test_field_spec_override() {
    let a = resolve(TypeDecl::new("A").field("x", FieldType::Int, 0)).unwrap();
    let b = resolve(TypeDecl::new("B").extends(&a).spec(
        "x",
        FieldType::Int,
        FieldSpec::new()
            .default_value(55)
            .output(false)
            .read_only()
            .init(false),
    ))
    .unwrap();
    let c = resolve(TypeDecl::new("C").extends(&b)).unwrap();

    let ax = a.field("x").unwrap();
    assert!(ax.includes_in_output() && ax.is_init() && !ax.is_read_only());

    for schema in [&b, &c] {
        let x = schema.field("x").unwrap();
        assert_eq!(x.static_default(), Some(&Value::Int(55)));
        assert!(!x.includes_in_output());
        assert!(!x.is_init());
        assert!(x.is_read_only());
    }
}

#[test]
fn test_reannotation_without_value_keeps_inherited_field() {
    let a = resolve(TypeDecl::new("A").field("z", FieldType::Int, 3)).unwrap();
    let b = resolve(TypeDecl::new("B").extends(&a).annotate("z", FieldType::Text)).unwrap();
    let z = b.field("z").unwrap();
    assert_eq!(z, a.field("z").unwrap());
    assert_eq!(z.field_type(), Some(&FieldType::Int));
    assert_eq!(new(&b).get("z").unwrap(), Value::Int(3));
    assert_eq!(b.hints()["z"].field_type, Some(FieldType::Text));
}

#[test]
fn test_computed_field_is_inherited() {
    let a = resolve(TypeDecl::new("A").computed("x", |r| {
        Ok(Value::text(format!("{}/xxx", r.type_name())))
    }))
    .unwrap();
    let b = resolve(TypeDecl::new("B").extends(&a)).unwrap();
    let c = resolve(TypeDecl::new("C").extends(&b)).unwrap();

    assert_eq!(new(&b).get("x").unwrap(), Value::text("B/xxx"));
    assert_eq!(new(&c).get("x").unwrap(), Value::text("C/xxx"));
    for schema in [&b, &c] {
        let err = Record::new(schema, Value::from(json!({"x": 1}))).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Construction);
    }
}

#[test]
fn test_override_computed_field() {
    let a = resolve(TypeDecl::new("A").computed("x", |_| Ok(Value::text("aaa")))).unwrap();
    let b = resolve(TypeDecl::new("B").extends(&a)).unwrap();
    let c = resolve(TypeDecl::new("C").extends(&b).attach(
        "x",
        FieldSpec::computed("x", |_| Ok(Value::text("ccc"))).output(false),
    ))
    .unwrap();
    let d = resolve(TypeDecl::new("D").extends(&c)).unwrap();

    assert_eq!(new(&b).get("x").unwrap(), Value::text("aaa"));
    assert!(b.field("x").unwrap().includes_in_output());
    assert_eq!(new(&c).get("x").unwrap(), Value::text("ccc"));
    assert!(!c.field("x").unwrap().includes_in_output());
    assert_eq!(new(&d).get("x").unwrap(), Value::text("ccc"));
    assert!(!d.field("x").unwrap().includes_in_output());
}

#[test]
fn test_computed_field_in_derived_output() {
    let a = resolve(
        TypeDecl::new("A")
            .field("id", FieldType::Int, 0)
            .computed("path", |r| {
                Ok(Value::text(format!("/items/{}", r.get("id")?.as_i64().unwrap_or(0))))
            }),
    )
    .unwrap();
    let b = resolve(TypeDecl::new("B").extends(&a)).unwrap();
    assert_eq!(output(&new(&a)), json!({"id": 0, "path": "/items/0"}));
    assert_eq!(output(&new(&b)), json!({"id": 0, "path": "/items/0"}));
}

#[test]
fn test_property_is_not_a_field() {
    let a = resolve(
        TypeDecl::new("A")
            .property("x", |_| Ok(Value::text("xxx")))
            .annotate("y", FieldType::Text),
    )
    .unwrap();
    let b = resolve(TypeDecl::new("B").extends(&a)).unwrap();

    for schema in [&a, &b] {
        assert!(!schema.contains("x"));
        assert!(schema.contains("y"));
        assert_eq!(new(schema).get("x").unwrap(), Value::text("xxx"));
        assert_eq!(output(&new(schema)), json!({}));
        let r = Record::new(schema, Value::from(json!({"y": 555}))).unwrap();
        assert_eq!(output(&r), json!({"y": "555"}));
        let err = Record::new(schema, Value::from(json!({"x": false}))).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Construction);
    }
}

#[test]
fn test_property_overrides_field() {
    let a = resolve(TypeDecl::new("A").field("x", FieldType::Int, 5)).unwrap();
    let b = resolve(TypeDecl::new("B").extends(&a).property("x", |_| Ok(Value::Int(55)))).unwrap();

    assert_eq!(new(&a).get("x").unwrap(), Value::Int(5));
    assert!(!b.contains("x"));
    assert_eq!(new(&b).get("x").unwrap(), Value::Int(55));
    assert!(Record::new(&b, Value::from(json!({"x": 1}))).is_err());
    assert_eq!(new(&b).set("x", 1).unwrap_err().kind(), ErrorKind::Mutation);
}

#[test]
fn test_property_over_mixin_annotation_stays_property() {
    let base = Mixin::new("Base").annotate("x", FieldType::Int);
    let a = resolve(TypeDecl::new("A").mixin(base).property("x", |_| Ok(Value::Int(55)))).unwrap();
    let b = resolve(TypeDecl::new("B").extends(&a)).unwrap();
    let c = resolve(TypeDecl::new("C").extends(&b)).unwrap();
    for schema in [&a, &b, &c] {
        assert!(!schema.contains("x"));
        assert_eq!(new(schema).get("x").unwrap(), Value::Int(55));
    }
}

#[test]
fn test_class_var_hides_field_but_plain_value_is_ambiguous() {
    let a = resolve(TypeDecl::new("A").field("x", FieldType::Int, 5)).unwrap();

    let b = resolve(TypeDecl::new("B").extends(&a).class_var("x", 55)).unwrap();
    assert!(!b.contains("x"));
    assert_eq!(b.constant("x"), Some(&Value::Int(55)));
    assert_eq!(new(&b).get("x").unwrap(), Value::Int(55));

    let err = resolve(TypeDecl::new("C").extends(&a).value("x", 55)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);

    let d = resolve(TypeDecl::new("D").extends(&a).field("x", FieldType::Int, 55)).unwrap();
    assert_eq!(new(&d).get("x").unwrap(), Value::Int(55));
    let r = Record::new(&d, Value::from(json!({"x": 1}))).unwrap();
    assert_eq!(r.get("x").unwrap(), Value::Int(1));

    let e = resolve(TypeDecl::new("E").extends(&d).class_var("x", 33)).unwrap();
    assert!(!e.contains("x"));
    assert_eq!(new(&e).get("x").unwrap(), Value::Int(33));
}

#[test]
fn test_field_spec_under_class_var_is_rejected() {
    let err = resolve(
        TypeDecl::new("A")
            .class_var("x", 1)
            .attach("x", FieldSpec::new().default_value(2)),
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
}

#[test]
fn test_meta_is_inherited_and_can_be_switched_off() {
    let a = resolve(
        TypeDecl::new("A")
            .allow_open_attributes(true)
            .forbid_open_attributes(["y", "z"]),
    )
    .unwrap();
    let c = resolve(
        TypeDecl::new("C")
            .extends(&a)
            .allow_open_attributes(false)
            .annotate("w", FieldType::Int)
            .annotate("x", FieldType::Int)
            .annotate("y", FieldType::Int)
            .annotate("z", FieldType::Int),
    )
    .unwrap();
    assert!(!c.allows_open_attributes());
    assert_eq!(c.options().forbidden_open_attributes, vec!["y", "z"]);
    let r = Record::new(&c, Value::from(json!({"w": 11, "x": 22, "y": 33}))).unwrap();
    assert_eq!(output(&r), json!({"w": 11, "x": 22, "y": 33}));
}
