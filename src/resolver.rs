//! Schema resolution
//!
//! A [`TypeDecl`] describes one aggregate type the way a class body would: an
//! optional aggregate parent, non-aggregate mixins contributing annotations
//! and values, a configuration block, annotated names and the values bound in
//! the type's own namespace. [`resolve`] merges all of that with the parent's
//! already-resolved schema exactly once and yields an immutable [`Schema`].

use std::collections::HashSet;
use std::sync::Arc;

use indexmap::IndexMap;
use tracing::debug;

use crate::checksum::Checksum;
use crate::error::{Result, SchemaError};
use crate::field::{Accessor, FieldSpec, FieldType};
use crate::record::{PostInit, Record, Super};
use crate::schema::{Annotation, Schema, SchemaOptions, TypeAttribute};
use crate::value::{Fields, Value};

/// Something bound to a name in a type's own namespace
#[derive(Clone)]
pub enum Member {
    /// An explicit field specification
    Field(FieldSpec),
    /// A plain value: a default when the name is annotated, a constant otherwise
    Value(Value),
    /// A computed accessor that is not a field
    Property(Accessor),
}

/// The local configuration block of a declaration. Unset keys are inherited.
#[derive(Debug, Clone, Default)]
pub struct MetaBlock {
    pub allow_open_attributes: Option<bool>,
    pub forbidden_open_attributes: Option<Vec<String>>,
    pub initialize_all_fields: Option<bool>,
    pub custom: Fields,
}

impl MetaBlock {
    fn apply(&self, options: &mut SchemaOptions) {
        if let Some(open) = self.allow_open_attributes {
            options.allow_open_attributes = open;
        }
        if let Some(forbidden) = &self.forbidden_open_attributes {
            options.forbidden_open_attributes = forbidden.clone();
        }
        if let Some(init_all) = self.initialize_all_fields {
            options.initialize_all_fields = init_all;
        }
        for (k, v) in &self.custom {
            options.custom.insert(k.clone(), v.clone());
        }
    }
}

/// A non-aggregate ancestor: contributes annotations and type-level values
/// but has no schema of its own.
#[derive(Clone)]
pub struct Mixin {
    name: String,
    annotations: IndexMap<String, Annotation>,
    namespace: IndexMap<String, TypeAttribute>,
}

impl Mixin {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            annotations: IndexMap::new(),
            namespace: IndexMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn annotate(mut self, name: impl Into<String>, field_type: FieldType) -> Self {
        self.annotations.insert(
            name.into(),
            Annotation {
                field_type: Some(field_type),
                class_var: false,
            },
        );
        self
    }

    pub fn field(mut self, name: impl Into<String>, field_type: FieldType, value: impl Into<Value>) -> Self {
        let name = name.into();
        self.namespace
            .insert(name.clone(), TypeAttribute::Constant(value.into()));
        self.annotate(name, field_type)
    }

    pub fn property<F>(mut self, name: impl Into<String>, accessor: F) -> Self
    where
        F: Fn(&Record) -> Result<Value> + Send + Sync + 'static,
    {
        self.namespace
            .insert(name.into(), TypeAttribute::Property(Arc::new(accessor)));
        self
    }
}

/// Declaration of one aggregate type
pub struct TypeDecl {
    name: String,
    parent: Option<Arc<Schema>>,
    mixins: Vec<Mixin>,
    meta: MetaBlock,
    annotations: IndexMap<String, Annotation>,
    namespace: IndexMap<String, Member>,
    post_init: Option<PostInit>,
}

impl TypeDecl {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            mixins: Vec::new(),
            meta: MetaBlock::default(),
            annotations: IndexMap::new(),
            namespace: IndexMap::new(),
            post_init: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<&Arc<Schema>> {
        self.parent.as_ref()
    }

    pub fn extends(mut self, parent: &Arc<Schema>) -> Self {
        self.parent = Some(Arc::clone(parent));
        self
    }

    pub fn mixin(mut self, mixin: Mixin) -> Self {
        self.mixins.push(mixin);
        self
    }

    /// Annotate a name without binding a value
    pub fn annotate(mut self, name: impl Into<String>, field_type: FieldType) -> Self {
        self.annotations.insert(
            name.into(),
            Annotation {
                field_type: Some(field_type),
                class_var: false,
            },
        );
        self
    }

    /// Annotate a name with no declared type (no coercion)
    pub fn annotate_untyped(mut self, name: impl Into<String>) -> Self {
        self.annotations.insert(
            name.into(),
            Annotation {
                field_type: None,
                class_var: false,
            },
        );
        self
    }

    /// Annotated name with a plain default value
    pub fn field(self, name: impl Into<String>, field_type: FieldType, default: impl Into<Value>) -> Self {
        let name = name.into();
        self.annotate(name.clone(), field_type)
            .bind(name, Member::Value(default.into()))
    }

    /// Annotated name bound to an explicit field specification
    pub fn spec(self, name: impl Into<String>, field_type: FieldType, spec: FieldSpec) -> Self {
        let name = name.into();
        self.annotate(name.clone(), field_type)
            .bind(name, Member::Field(spec))
    }

    /// A type-level constant, never a field
    pub fn class_var(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        let name = name.into();
        self.annotations.insert(
            name.clone(),
            Annotation {
                field_type: None,
                class_var: true,
            },
        );
        self.bind(name, Member::Value(value.into()))
    }

    /// Attach a field specification without annotating the name
    pub fn attach(self, name: impl Into<String>, spec: FieldSpec) -> Self {
        self.bind(name, Member::Field(spec))
    }

    /// Attach a computed field
    pub fn computed<F>(self, name: impl Into<String>, accessor: F) -> Self
    where
        F: Fn(&Record) -> Result<Value> + Send + Sync + 'static,
    {
        let name = name.into();
        let spec = FieldSpec::computed(name.clone(), accessor);
        self.attach(name, spec)
    }

    /// A computed attribute that is not a field
    pub fn property<F>(self, name: impl Into<String>, accessor: F) -> Self
    where
        F: Fn(&Record) -> Result<Value> + Send + Sync + 'static,
    {
        self.bind(name, Member::Property(Arc::new(accessor)))
    }

    /// Bind a plain value without annotating the name
    pub fn value(self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.bind(name, Member::Value(value.into()))
    }

    pub fn bind(mut self, name: impl Into<String>, member: Member) -> Self {
        self.namespace.insert(name.into(), member);
        self
    }

    pub fn allow_open_attributes(mut self, allow: bool) -> Self {
        self.meta.allow_open_attributes = Some(allow);
        self
    }

    pub fn forbid_open_attributes<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.meta.forbidden_open_attributes = Some(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn initialize_all_fields(mut self, init_all: bool) -> Self {
        self.meta.initialize_all_fields = Some(init_all);
        self
    }

    pub fn meta(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.meta.custom.insert(key.into(), value.into());
        self
    }

    /// Post-construction hook. It runs before read-only fields are sealed and
    /// must call `parent.call()` exactly once.
    pub fn post_init<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Record, Super<'_>) -> Result<()> + Send + Sync + 'static,
    {
        self.post_init = Some(Arc::new(hook));
        self
    }
}

/// Resolve a declaration with default root options
pub fn resolve(decl: TypeDecl) -> Result<Arc<Schema>> {
    resolve_with_defaults(decl, &SchemaOptions::default())
}

/// Resolve a declaration. `root_options` seed the configuration of types
/// without an aggregate parent.
pub fn resolve_with_defaults(decl: TypeDecl, root_options: &SchemaOptions) -> Result<Arc<Schema>> {
    let TypeDecl {
        name: type_name,
        parent,
        mixins,
        meta,
        annotations: own_hints,
        mut namespace,
        post_init,
    } = decl;

    let empty_fields = IndexMap::new();
    let parent_fields = parent.as_ref().map(|p| &p.fields).unwrap_or(&empty_fields);

    let mut options = parent
        .as_ref()
        .map(|p| p.options.clone())
        .unwrap_or_else(|| root_options.clone());
    meta.apply(&mut options);

    let mut hints: IndexMap<String, Annotation> = parent
        .as_ref()
        .map(|p| p.hints.clone())
        .unwrap_or_default();
    let mut attributes: IndexMap<String, TypeAttribute> = parent
        .as_ref()
        .map(|p| p.attributes.clone())
        .unwrap_or_default();
    for mixin in &mixins {
        for (name, hint) in &mixin.annotations {
            hints.insert(name.clone(), hint.clone());
        }
        for (name, attr) in &mixin.namespace {
            attributes.insert(name.clone(), attr.clone());
        }
    }
    for (name, hint) in &own_hints {
        hints.insert(name.clone(), hint.clone());
    }

    let mut fields: IndexMap<String, FieldSpec> = IndexMap::new();
    let mut seen: HashSet<String> = HashSet::new();

    for (name, hint) in &hints {
        seen.insert(name.clone());

        if name.starts_with('_') || hint.class_var {
            continue;
        }

        let own_annotated = own_hints.contains_key(name);

        let spec = match namespace.shift_remove(name) {
            Some(Member::Field(spec)) => adopt(&type_name, name, spec, hint.field_type.clone())?,
            Some(Member::Property(accessor)) => {
                attributes.insert(name.clone(), TypeAttribute::Property(accessor));
                continue;
            }
            Some(Member::Value(value)) => {
                if parent_fields.contains_key(name) && !own_annotated {
                    return Err(ambiguous(&type_name, name, parent_fields.get(name), &value));
                }
                synthesize(name, hint.field_type.clone(), Some(value))
            }
            None => match parent_fields.get(name) {
                Some(inherited) => inherited.clone(),
                None => match attributes.get(name) {
                    Some(TypeAttribute::Property(_)) => continue,
                    Some(TypeAttribute::Constant(value)) => {
                        synthesize(name, hint.field_type.clone(), Some(value.clone()))
                    }
                    None => synthesize(name, hint.field_type.clone(), None),
                },
            },
        };
        fields.insert(name.clone(), spec);
    }

    // Whatever is left in the namespace was not annotated.
    for (name, member) in namespace {
        match member {
            Member::Field(spec) => {
                if seen.contains(&name) {
                    return Err(SchemaError::configuration(
                        &type_name,
                        &name,
                        "private and class-level names cannot hold a field",
                    ));
                }
                let spec = adopt(&type_name, &name, spec, None)?;
                seen.insert(name.clone());
                fields.insert(name, spec);
            }
            Member::Property(accessor) => {
                seen.insert(name.clone());
                attributes.insert(name, TypeAttribute::Property(accessor));
            }
            Member::Value(value) => {
                if parent_fields.contains_key(&name) && !seen.contains(&name) {
                    return Err(ambiguous(&type_name, &name, parent_fields.get(&name), &value));
                }
                attributes.insert(name, TypeAttribute::Constant(value));
            }
        }
    }

    for (name, inherited) in parent_fields {
        if !seen.contains(name) {
            fields.insert(name.clone(), inherited.clone());
        }
    }

    attributes.retain(|name, _| !fields.contains_key(name));

    let mut hooks: Vec<PostInit> = Vec::new();
    hooks.extend(post_init);
    if let Some(parent) = &parent {
        hooks.extend(parent.hooks.iter().cloned());
    }

    let mut schema = Schema {
        name: type_name,
        parent,
        fields,
        options,
        hints,
        attributes,
        hooks,
        fingerprint: Checksum::from_str(""),
    };
    schema.fingerprint = Checksum::from_str(&schema.canonical());

    debug!(
        type_name = %schema.name,
        fields = schema.fields.len(),
        open = schema.options.allow_open_attributes,
        "resolved schema"
    );

    Ok(Arc::new(schema))
}

fn adopt(
    type_name: &str,
    name: &str,
    mut spec: FieldSpec,
    annotated: Option<FieldType>,
) -> Result<FieldSpec> {
    if spec.has_name() {
        if spec.name() != name {
            return Err(SchemaError::configuration(
                type_name,
                name,
                format!("field is named {:?} but bound to {:?}", spec.name(), name),
            ));
        }
    } else {
        spec.bind_name(name);
    }
    if spec.field_type().is_none() {
        spec.bind_type(annotated);
    }
    spec.validate(type_name)?;
    Ok(spec)
}

fn synthesize(name: &str, field_type: Option<FieldType>, default: Option<Value>) -> FieldSpec {
    let mut spec = FieldSpec::new().named(name);
    spec.bind_type(field_type);
    match default {
        Some(value) => spec.default_value(value),
        None => spec,
    }
}

fn ambiguous(type_name: &str, name: &str, inherited: Option<&FieldSpec>, value: &Value) -> SchemaError {
    let inherited_type = inherited
        .and_then(FieldSpec::field_type)
        .map(|t| t.to_string())
        .unwrap_or_else(|| "any".to_string());
    SchemaError::configuration(
        type_name,
        name,
        format!(
            "ambiguous value {:?} for an inherited field: declare it as a class-level \
             constant to hide the field, or annotate it (as {}) to override the default",
            value, inherited_type
        ),
    )
}
