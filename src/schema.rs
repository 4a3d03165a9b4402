//! Resolved schema of one aggregate type

use std::fmt;
use std::fmt::Write as _;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::checksum::Checksum;
use crate::field::{Accessor, FieldSpec, FieldType};
use crate::record::PostInit;
use crate::value::{Fields, Value};

/// Per-type configuration, merged over the parent's (local keys win)
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SchemaOptions {
    /// Unknown attributes are stored as open attributes instead of rejected
    pub allow_open_attributes: bool,
    /// Names refused as open attributes even when they are allowed
    pub forbidden_open_attributes: Vec<String>,
    /// Constructor-eligible fields without default are set to null
    pub initialize_all_fields: bool,
    /// Host-defined settings carried along with the schema
    pub custom: Fields,
}

impl SchemaOptions {
    pub fn is_forbidden(&self, name: &str) -> bool {
        self.forbidden_open_attributes.iter().any(|n| n == name)
    }
}

/// An annotation as seen by the resolver: the name's declared type and
/// whether it names a type-level constant rather than a field
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    pub field_type: Option<FieldType>,
    pub class_var: bool,
}

/// A type-level attribute that is not a field
#[derive(Clone)]
pub enum TypeAttribute {
    Constant(Value),
    Property(Accessor),
}

impl fmt::Debug for TypeAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeAttribute::Constant(v) => f.debug_tuple("Constant").field(v).finish(),
            TypeAttribute::Property(_) => write!(f, "Property"),
        }
    }
}

/// Result of looking a name up on a type
#[derive(Clone, Copy)]
pub enum Attribute<'a> {
    Field(&'a FieldSpec),
    Property(&'a Accessor),
    Constant(&'a Value),
}

impl fmt::Debug for Attribute<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Attribute::Field(spec) => f.debug_tuple("Field").field(spec).finish(),
            Attribute::Property(_) => write!(f, "Property"),
            Attribute::Constant(v) => f.debug_tuple("Constant").field(v).finish(),
        }
    }
}

/// The resolved, immutable schema of one aggregate type
pub struct Schema {
    pub(crate) name: String,
    pub(crate) parent: Option<Arc<Schema>>,
    pub(crate) fields: IndexMap<String, FieldSpec>,
    pub(crate) options: SchemaOptions,
    pub(crate) hints: IndexMap<String, Annotation>,
    pub(crate) attributes: IndexMap<String, TypeAttribute>,
    pub(crate) hooks: Vec<PostInit>,
    pub(crate) fingerprint: Checksum,
}

impl Schema {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Nearest aggregate ancestor
    pub fn parent(&self) -> Option<&Arc<Schema>> {
        self.parent.as_ref()
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Fields in resolution order
    pub fn fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.values()
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn options(&self) -> &SchemaOptions {
        &self.options
    }

    pub fn allows_open_attributes(&self) -> bool {
        self.options.allow_open_attributes
    }

    pub fn initializes_all_fields(&self) -> bool {
        self.options.initialize_all_fields
    }

    /// A host-defined configuration value
    pub fn meta(&self, key: &str) -> Option<&Value> {
        self.options.custom.get(key)
    }

    /// Merged annotations, in declaration order
    pub fn hints(&self) -> &IndexMap<String, Annotation> {
        &self.hints
    }

    /// Look a name up on the type itself. Fields shadow type-level attributes.
    pub fn attribute(&self, name: &str) -> Option<Attribute<'_>> {
        if let Some(field) = self.fields.get(name) {
            return Some(Attribute::Field(field));
        }
        match self.attributes.get(name)? {
            TypeAttribute::Constant(value) => Some(Attribute::Constant(value)),
            TypeAttribute::Property(accessor) => Some(Attribute::Property(accessor)),
        }
    }

    pub fn constant(&self, name: &str) -> Option<&Value> {
        match self.attribute(name)? {
            Attribute::Constant(value) => Some(value),
            _ => None,
        }
    }

    /// True if `self` is `other` or declares it as an ancestor
    pub fn is_subtype_of(&self, other: &Schema) -> bool {
        let mut current = Some(self);
        while let Some(schema) = current {
            if std::ptr::eq(schema, other) {
                return true;
            }
            current = schema.parent.as_deref();
        }
        false
    }

    pub(crate) fn hooks(&self) -> &[PostInit] {
        &self.hooks
    }

    /// Content fingerprint of the resolved shape
    pub fn fingerprint(&self) -> &Checksum {
        &self.fingerprint
    }

    /// True when `other` declares exactly this type. Callbacks (hooks,
    /// factories, accessors, properties) compare by identity.
    pub fn same_declaration(&self, other: &Schema) -> bool {
        self.fingerprint == other.fingerprint
            && self.fields == other.fields
            && self.hooks.len() == other.hooks.len()
            && self.hooks.iter().zip(&other.hooks).all(|(a, b)| Arc::ptr_eq(a, b))
            && self.attributes.len() == other.attributes.len()
            && self.attributes.iter().all(|(name, attribute)| {
                match (attribute, other.attributes.get(name)) {
                    (TypeAttribute::Constant(a), Some(TypeAttribute::Constant(b))) => a == b,
                    (TypeAttribute::Property(a), Some(TypeAttribute::Property(b))) => Arc::ptr_eq(a, b),
                    _ => false,
                }
            })
    }

    /// Text hashed into the fingerprint: the listing plus type-level
    /// attributes, host settings, hook count and the parent's fingerprint
    pub(crate) fn canonical(&self) -> String {
        let mut out = self.describe();
        for (name, attribute) in &self.attributes {
            match attribute {
                TypeAttribute::Constant(value) => {
                    let _ = writeln!(out, "  const {} = {}", name, render(value));
                }
                TypeAttribute::Property(_) => {
                    let _ = writeln!(out, "  property {}", name);
                }
            }
        }
        if !self.options.custom.is_empty() {
            let _ = writeln!(out, "  meta {}", render(&Value::Map(self.options.custom.clone())));
        }
        if !self.hooks.is_empty() {
            let _ = writeln!(out, "  hooks {}", self.hooks.len());
        }
        if let Some(parent) = &self.parent {
            let _ = writeln!(out, "  parent {}", parent.fingerprint);
        }
        out
    }

    /// Human-readable listing of the resolved schema
    pub fn describe(&self) -> String {
        let mut out = String::new();
        match &self.parent {
            Some(parent) => {
                let _ = writeln!(out, "{} extends {}", self.name, parent.name);
            }
            None => {
                let _ = writeln!(out, "{}", self.name);
            }
        }
        for field in self.fields.values() {
            let _ = write!(out, "  {}", field.name());
            if let Some(t) = field.field_type() {
                let _ = write!(out, ": {}", t);
            }
            if let Some(default) = field.static_default() {
                let _ = write!(out, " = {}", render(default));
            }
            let mut flags = Vec::new();
            if field.has_default_factory() {
                flags.push("factory");
            }
            if field.is_computed() {
                flags.push("computed");
            }
            if field.is_read_only() {
                flags.push("read_only");
            }
            if field.is_required() {
                flags.push("required");
            }
            if !field.is_init() && !field.is_computed() {
                flags.push("no_init");
            }
            if !field.includes_in_output() {
                flags.push("hidden");
            }
            if !flags.is_empty() {
                let _ = write!(out, " [{}]", flags.join(", "));
            }
            out.push('\n');
        }
        let opts = &self.options;
        if opts.allow_open_attributes {
            let _ = write!(out, "  (open attributes");
            if !opts.forbidden_open_attributes.is_empty() {
                let _ = write!(out, ", forbidden: {}", opts.forbidden_open_attributes.join(", "));
            }
            out.push_str(")\n");
        }
        if opts.initialize_all_fields {
            out.push_str("  (initialize all fields)\n");
        }
        out
    }
}

fn render(value: &Value) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| value.type_name().to_string())
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("name", &self.name)
            .field("parent", &self.parent.as_ref().map(|p| p.name.clone()))
            .field("fields", &self.fields.keys().collect::<Vec<_>>())
            .field("options", &self.options)
            .finish()
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}
