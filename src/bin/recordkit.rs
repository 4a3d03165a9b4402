//! recordkit CLI
//!
//! Describes declared types and validates JSON payloads against them.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use recordkit::{Document, Record, RecordkitConfig, TypeRegistry, Value};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "recordkit")]
#[command(about = "Describe declared record types and validate payloads")]
struct Cli {
    /// Additional configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the resolved schema of every declared type
    Describe {
        /// Declaration document (.toml or .json)
        types: PathBuf,
    },

    /// Construct a record from a JSON payload and print its output mapping
    Validate {
        /// Declaration document (.toml or .json)
        types: PathBuf,
        /// Type to construct
        #[arg(short = 't', long = "type")]
        type_name: String,
        /// JSON payload
        payload: PathBuf,
    },

    /// Print the effective configuration
    Config,
}

fn main() {
    let cli = Cli::parse();

    let config = match RecordkitConfig::load_from(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli.command, &config) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn load_registry(types: &Path, config: &RecordkitConfig) -> Result<TypeRegistry> {
    let document = Document::load(types)
        .with_context(|| format!("failed to load {}", types.display()))?;
    let mut registry = TypeRegistry::from_config(config);
    document.declare_into(&mut registry)?;
    info!(types = registry.len(), "loaded declarations");
    Ok(registry)
}

fn run(command: Commands, config: &RecordkitConfig) -> Result<()> {
    match command {
        Commands::Describe { types } => {
            let registry = load_registry(&types, config)?;
            for schema in registry.schemas() {
                print!("{}", schema.describe());
                println!("  # {}", schema.fingerprint().short());
                println!();
            }
        }

        Commands::Validate {
            types,
            type_name,
            payload,
        } => {
            let registry = load_registry(&types, config)?;
            let schema = registry.require(&type_name)?;
            let content = std::fs::read_to_string(&payload)
                .with_context(|| format!("failed to read {}", payload.display()))?;
            let input: serde_json::Value = serde_json::from_str(&content)?;
            let record = Record::new(schema, Value::from_json(input)?)?;
            let output = Value::Map(record.to_output()?).to_json()?;
            println!("{}", config.output.format.render(&output)?);
        }

        Commands::Config => {
            print!("{}", config.to_toml()?);
        }
    }
    Ok(())
}
