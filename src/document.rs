//! Declaration documents
//!
//! Types can be declared from JSON or TOML files instead of code:
//!
//! ```toml
//! [[types]]
//! name = "Point"
//!
//! [[types.fields]]
//! name = "x"
//! type = "int"
//! default = 0
//! ```
//!
//! Types are declared in file order, so `extends` and record-typed fields
//! may only name types declared earlier (in the document or the registry).

use std::path::Path;
use std::sync::{Arc, OnceLock};

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

use crate::error::{Result, SchemaError};
use crate::field::{FieldSpec, FieldType, MapOrder};
use crate::registry::TypeRegistry;
use crate::resolver::TypeDecl;
use crate::schema::Schema;
use crate::value::Value;

/// A declaration document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Document {
    #[serde(default)]
    pub types: Vec<TypeEntry>,
}

/// One declared type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TypeEntry {
    pub name: String,

    /// Name of an already declared parent type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extends: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_open_attributes: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forbidden_open_attributes: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initialize_all_fields: Option<bool>,

    #[serde(default)]
    pub fields: Vec<FieldEntry>,
}

/// One annotated name of a type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldEntry {
    pub name: String,

    /// Type expression; absent means untyped
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub field_type: Option<String>,

    /// `Some(Null)` is an explicit null default, `None` means no default
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub default: Option<serde_json::Value>,

    #[serde(default)]
    pub read_only: bool,

    #[serde(default)]
    pub required: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub init: Option<bool>,

    #[serde(default = "default_true")]
    pub output: bool,

    /// A type-level constant instead of a field
    #[serde(default)]
    pub class_var: bool,
}

fn default_true() -> bool {
    true
}

fn present<'de, D>(deserializer: D) -> std::result::Result<Option<serde_json::Value>, D::Error>
where
    D: Deserializer<'de>,
{
    serde_json::Value::deserialize(deserializer).map(Some)
}

fn identifier() -> &'static Regex {
    static IDENTIFIER: OnceLock<Regex> = OnceLock::new();
    IDENTIFIER.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid regex"))
}

fn container() -> &'static Regex {
    static CONTAINER: OnceLock<Regex> = OnceLock::new();
    CONTAINER.get_or_init(|| {
        Regex::new(r"^(list|map|map_sorted)\[\s*(.+?)\s*\]$").expect("valid regex")
    })
}

fn check_identifier(kind: &str, name: &str) -> Result<()> {
    if identifier().is_match(name) {
        Ok(())
    } else {
        Err(SchemaError::InvalidDeclaration(format!(
            "{} name {:?} is not an identifier",
            kind, name
        )))
    }
}

/// Parse a type expression against the types declared in `registry`
pub fn parse_type(expr: &str, registry: &TypeRegistry) -> Result<(FieldType, MapOrder)> {
    let expr = expr.trim();
    let field_type = match expr {
        "any" => FieldType::Any,
        "bool" => FieldType::Bool,
        "int" => FieldType::Int,
        "float" => FieldType::Float,
        "text" | "str" => FieldType::Text,
        "list" => FieldType::List(None),
        "map" => FieldType::Map(None),
        _ => {
            if let Some(caps) = container().captures(expr) {
                let (item, _) = parse_type(&caps[2], registry)?;
                return Ok(match &caps[1] {
                    "list" => (FieldType::list_of(item), MapOrder::Insertion),
                    "map" => (FieldType::map_of(item), MapOrder::Insertion),
                    _ => (FieldType::map_of(item), MapOrder::Sorted),
                });
            }
            if !identifier().is_match(expr) {
                return Err(SchemaError::UnknownType(expr.to_string()));
            }
            FieldType::record(registry.require(expr)?)
        }
    };
    Ok((field_type, MapOrder::Insertion))
}

impl Document {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Load a document, choosing the format by file extension
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::from_toml_str(&content),
            Some("json") => Self::from_json_str(&content),
            _ => Err(SchemaError::InvalidDeclaration(format!(
                "{}: expected a .toml or .json file",
                path.display()
            ))),
        }
    }

    /// Declare every type into `registry`, in order
    pub fn declare_into(&self, registry: &mut TypeRegistry) -> Result<Vec<Arc<Schema>>> {
        let mut declared = Vec::with_capacity(self.types.len());
        for entry in &self.types {
            let decl = entry.to_decl(registry)?;
            declared.push(registry.declare(decl)?);
        }
        debug!(types = declared.len(), "declared document");
        Ok(declared)
    }
}

impl TypeEntry {
    /// Build the declaration, looking referenced types up in `registry`
    pub fn to_decl(&self, registry: &TypeRegistry) -> Result<TypeDecl> {
        check_identifier("type", &self.name)?;
        let mut decl = TypeDecl::new(&self.name);
        if let Some(parent) = &self.extends {
            decl = decl.extends(registry.require(parent)?);
        }
        if let Some(open) = self.allow_open_attributes {
            decl = decl.allow_open_attributes(open);
        }
        if let Some(forbidden) = &self.forbidden_open_attributes {
            decl = decl.forbid_open_attributes(forbidden.iter().cloned());
        }
        if let Some(init_all) = self.initialize_all_fields {
            decl = decl.initialize_all_fields(init_all);
        }

        for field in &self.fields {
            check_identifier("field", &field.name)?;
            if field.class_var {
                let value = match &field.default {
                    Some(default) => Value::from_json(default.clone())?,
                    None => Value::Null,
                };
                decl = decl.class_var(&field.name, value);
                continue;
            }
            let mut spec = FieldSpec::new();
            if let Some(default) = &field.default {
                spec = spec.default_value(Value::from_json(default.clone())?);
            }
            if field.read_only {
                spec = spec.read_only();
            }
            if field.required {
                spec = spec.required();
            }
            if let Some(init) = field.init {
                spec = spec.init(init);
            }
            spec = spec.output(field.output);

            decl = match &field.field_type {
                Some(expr) => {
                    let (field_type, order) = parse_type(expr, registry)?;
                    decl.spec(&field.name, field_type, spec.map_order(order))
                }
                None => decl.annotate_untyped(&field.name).attach(&field.name, spec),
            };
        }
        Ok(decl)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const POINTS: &str = r#"
[[types]]
name = "Point"

[[types.fields]]
name = "x"
type = "int"
default = 0

[[types.fields]]
name = "y"
type = "int"
default = 0

[[types]]
name = "Line"

[[types.fields]]
name = "points"
type = "list[Point]"
"#;

    #[test]
    fn test_toml_document() {
        let doc = Document::from_toml_str(POINTS).unwrap();
        let mut registry = TypeRegistry::new();
        let declared = doc.declare_into(&mut registry).unwrap();
        assert_eq!(declared.len(), 2);
        let line = registry.get("Line").unwrap();
        let points = line.field("points").unwrap().field_type().unwrap();
        assert!(points.is_record_container());
        assert_eq!(points.to_string(), "list[Point]");
    }

    #[test]
    fn test_null_default_is_not_absent() {
        let doc = Document::from_json_str(
            r#"{"types": [{"name": "E", "fields": [
                {"name": "id", "type": "text", "default": null},
                {"name": "tag", "type": "text"}
            ]}]}"#,
        )
        .unwrap();
        let fields = &doc.types[0].fields;
        assert_eq!(fields[0].default, Some(serde_json::Value::Null));
        assert_eq!(fields[1].default, None);
    }

    #[test]
    fn test_type_expressions() {
        let registry = TypeRegistry::new();
        let (t, order) = parse_type("map_sorted[int]", &registry).unwrap();
        assert_eq!(t, FieldType::map_of(FieldType::Int));
        assert_eq!(order, MapOrder::Sorted);
        let (t, _) = parse_type("list[list[str]]", &registry).unwrap();
        assert_eq!(t.to_string(), "list[list[text]]");
        assert!(matches!(
            parse_type("Nope", &registry).unwrap_err(),
            SchemaError::UnknownType(_)
        ));
        assert!(matches!(
            parse_type("list[", &registry).unwrap_err(),
            SchemaError::UnknownType(_)
        ));
    }

    #[test]
    fn test_bad_names_are_rejected() {
        let doc = Document::from_json_str(
            r#"{"types": [{"name": "A", "fields": [{"name": "not valid"}]}]}"#,
        )
        .unwrap();
        let err = doc.declare_into(&mut TypeRegistry::new()).unwrap_err();
        assert!(matches!(err, SchemaError::InvalidDeclaration(_)));
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let err = Document::from_json_str(r#"{"types": [{"name": "A", "bogus": 1}]}"#).unwrap_err();
        assert!(matches!(err, SchemaError::Json(_)));
    }
}
