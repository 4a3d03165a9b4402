//! Error types for schema declaration and record handling

use thiserror::Error;

/// Result type for schema operations
pub type Result<T> = std::result::Result<T, SchemaError>;

/// Schema and record errors
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Invalid declaration of {type_name}.{attribute}: {reason}")]
    Configuration {
        type_name: String,
        attribute: String,
        reason: String,
    },

    #[error("Cannot construct {type_name}: {reason}")]
    Construction { type_name: String, reason: String },

    #[error("Post-init hook of {type_name} did not reach the base hook (did you forget to call the parent hook?)")]
    HookContract { type_name: String },

    #[error("Cannot set attribute {type_name}.{attribute}: {reason}")]
    Mutation {
        type_name: String,
        attribute: String,
        reason: String,
    },

    #[error("Cannot coerce {attribute}: expected {expected}, got {found}")]
    Coercion {
        attribute: String,
        expected: String,
        found: String,
    },

    #[error("{type_name} does not have attribute {attribute}")]
    AttributeNotPresent { type_name: String, attribute: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Type already declared with a different shape: {name}")]
    AlreadyDeclared { name: String },

    #[error("Unknown type: {0}")]
    UnknownType(String),

    #[error("Invalid declaration document: {0}")]
    InvalidDeclaration(String),

    #[error("{0}")]
    Custom(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Coarse classification of a [`SchemaError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Construction,
    HookContract,
    Mutation,
    Coercion,
    AttributeNotPresent,
    Usage,
    Host,
}

impl SchemaError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SchemaError::Configuration { .. } => ErrorKind::Configuration,
            SchemaError::Construction { .. } => ErrorKind::Construction,
            SchemaError::HookContract { .. } => ErrorKind::HookContract,
            SchemaError::Mutation { .. } => ErrorKind::Mutation,
            SchemaError::Coercion { .. } => ErrorKind::Coercion,
            SchemaError::AttributeNotPresent { .. } => ErrorKind::AttributeNotPresent,
            SchemaError::InvalidArgument(_)
            | SchemaError::AlreadyDeclared { .. }
            | SchemaError::UnknownType(_)
            | SchemaError::InvalidDeclaration(_) => ErrorKind::Usage,
            SchemaError::Custom(_)
            | SchemaError::Io(_)
            | SchemaError::Json(_)
            | SchemaError::Toml(_) => ErrorKind::Host,
        }
    }

    pub(crate) fn configuration(
        type_name: &str,
        attribute: &str,
        reason: impl Into<String>,
    ) -> Self {
        SchemaError::Configuration {
            type_name: type_name.to_string(),
            attribute: attribute.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn construction(type_name: &str, reason: impl Into<String>) -> Self {
        SchemaError::Construction {
            type_name: type_name.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn mutation(type_name: &str, attribute: &str, reason: impl Into<String>) -> Self {
        SchemaError::Mutation {
            type_name: type_name.to_string(),
            attribute: attribute.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn not_present(type_name: &str, attribute: &str) -> Self {
        SchemaError::AttributeNotPresent {
            type_name: type_name.to_string(),
            attribute: attribute.to_string(),
        }
    }
}
