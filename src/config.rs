//! Configuration for recordkit tools and registries
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (recordkit.toml)
//! - Environment variables (RECORDKIT__*)
//!
//! ## Example config file (recordkit.toml):
//! ```toml
//! [defaults]
//! allow_open_attributes = false
//! initialize_all_fields = true
//! forbidden_open_attributes = ["password"]
//!
//! [output]
//! format = "compact"
//!
//! [logging]
//! filter = "recordkit=debug"
//! ```

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::schema::SchemaOptions;

/// Main configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordkitConfig {
    /// Baseline options for root types
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// JSON output settings
    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Options every root type declared through a registry starts from
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DefaultsConfig {
    #[serde(default)]
    pub allow_open_attributes: bool,

    #[serde(default)]
    pub initialize_all_fields: bool,

    #[serde(default)]
    pub forbidden_open_attributes: Vec<String>,
}

impl DefaultsConfig {
    pub fn to_options(&self) -> SchemaOptions {
        SchemaOptions {
            allow_open_attributes: self.allow_open_attributes,
            forbidden_open_attributes: self.forbidden_open_attributes.clone(),
            initialize_all_fields: self.initialize_all_fields,
            ..SchemaOptions::default()
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,
}

/// Output format for JSON
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Pretty,
    Compact,
}

impl OutputFormat {
    pub fn render(&self, value: &serde_json::Value) -> serde_json::Result<String> {
        match self {
            OutputFormat::Pretty => serde_json::to_string_pretty(value),
            OutputFormat::Compact => serde_json::to_string(value),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive used when RUST_LOG is not set
    #[serde(default = "default_filter")]
    pub filter: String,
}

fn default_filter() -> String {
    "recordkit=info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
        }
    }
}

impl RecordkitConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration, adding a specific (required) file
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        let config_locations = ["recordkit.toml", ".recordkit.toml", "config/recordkit.toml"];
        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        // XDG config directory
        if let Some(dirs) = directories::ProjectDirs::from("dev", "familiar", "recordkit") {
            let xdg_config = dirs.config_dir().join("recordkit.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::from(path).required(true));
        }

        // RECORDKIT__OUTPUT__FORMAT=compact
        builder = builder.add_source(
            Environment::with_prefix("RECORDKIT")
                .prefix_separator("__")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("defaults.forbidden_open_attributes")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }

    /// Save configuration to a file
    pub fn save(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        std::fs::write(path, self.to_toml()?)
    }

    pub fn to_toml(&self) -> std::io::Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}
