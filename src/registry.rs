//! Type Registry
//!
//! Owns declared schemas by name. Declarations are append-only: a name can be
//! declared again only with an identical shape, in which case the schema
//! already registered is returned.

use std::sync::Arc;

use indexmap::IndexMap;
use tracing::{debug, info};

use crate::config::RecordkitConfig;
use crate::error::{Result, SchemaError};
use crate::resolver::{resolve_with_defaults, TypeDecl};
use crate::schema::{Schema, SchemaOptions};

/// The declared types of one application
#[derive(Debug, Default)]
pub struct TypeRegistry {
    /// Options seeding every root type
    defaults: SchemaOptions,
    /// Schemas in declaration order
    schemas: IndexMap<String, Arc<Schema>>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry whose root types start from `defaults`
    pub fn with_defaults(defaults: SchemaOptions) -> Self {
        Self {
            defaults,
            schemas: IndexMap::new(),
        }
    }

    /// A registry configured from the `[defaults]` section
    pub fn from_config(config: &RecordkitConfig) -> Self {
        Self::with_defaults(config.defaults.to_options())
    }

    pub fn defaults(&self) -> &SchemaOptions {
        &self.defaults
    }

    /// Resolve and register a declaration
    pub fn declare(&mut self, decl: TypeDecl) -> Result<Arc<Schema>> {
        let schema = resolve_with_defaults(decl, &self.defaults)?;

        // IMMUTABILITY CHECK
        if let Some(existing) = self.schemas.get(schema.name()) {
            if existing.same_declaration(&schema) {
                debug!(type_name = schema.name(), "identical re-declaration");
                return Ok(Arc::clone(existing));
            }
            return Err(SchemaError::AlreadyDeclared {
                name: schema.name().to_string(),
            });
        }

        info!(
            type_name = schema.name(),
            fingerprint = schema.fingerprint().short(),
            "declared type"
        );
        self.schemas
            .insert(schema.name().to_string(), Arc::clone(&schema));
        Ok(schema)
    }

    pub fn get(&self, name: &str) -> Option<&Arc<Schema>> {
        self.schemas.get(name)
    }

    /// Like [`TypeRegistry::get`], failing with `UnknownType`
    pub fn require(&self, name: &str) -> Result<&Arc<Schema>> {
        self.get(name)
            .ok_or_else(|| SchemaError::UnknownType(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.schemas.contains_key(name)
    }

    /// Declared schemas, in declaration order
    pub fn schemas(&self) -> impl Iterator<Item = &Arc<Schema>> {
        self.schemas.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.schemas.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}
