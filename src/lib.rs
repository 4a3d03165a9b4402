//! recordkit
//!
//! Declarative, inheritance-aware schemas for typed nested records.
//!
//! ## Features
//!
//! - **Inheritance**: a type's schema is resolved once from its parent's schema,
//!   its mixins and its own annotations
//! - **Coercion**: raw values are converted on every write, including nested
//!   records and one level of containers
//! - **Sealing**: read-only fields are writable only until the post-construction
//!   hooks have run
//! - **Open attributes**: opt-in storage for names outside the schema
//! - **Extraction**: build one type from the serialized form of another
//!
//! ## Example
//!
//! ```
//! use recordkit::{resolve, FieldType, Record, TypeDecl, Value};
//! use serde_json::json;
//!
//! let point = resolve(
//!     TypeDecl::new("Point")
//!         .field("x", FieldType::Int, 0)
//!         .field("y", FieldType::Int, 0),
//! )?;
//! let p = Record::new(&point, Value::from(json!({"x": "3"})))?;
//! assert_eq!(p.get("x")?, Value::Int(3));
//! assert_eq!(Value::Map(p.to_output()?).to_json()?, json!({"x": 3, "y": 0}));
//! # Ok::<(), recordkit::SchemaError>(())
//! ```

pub mod checksum;
pub mod coerce;
pub mod config;
pub mod document;
pub mod error;
pub mod field;
pub mod output;
pub mod record;
pub mod registry;
pub mod resolver;
pub mod schema;
pub mod value;

pub use checksum::Checksum;
pub use coerce::coerce;
pub use config::{OutputFormat, RecordkitConfig};
pub use document::Document;
pub use error::{ErrorKind, Result, SchemaError};
pub use field::{Accessor, DefaultFactory, FieldSpec, FieldType, MapOrder};
pub use output::{create_from, extract, AttributeSource, Selection};
pub use record::{construct, is_aggregate, schema_of, Input, PostInit, Record, Super};
pub use registry::TypeRegistry;
pub use resolver::{resolve, resolve_with_defaults, Member, Mixin, TypeDecl};
pub use schema::{Annotation, Attribute, Schema, SchemaOptions, TypeAttribute};
pub use value::{fields_from_json, Fields, Value};
