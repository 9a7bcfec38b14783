//! CLI argument definitions using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// erdsmith: compile entity-relationship diagrams into validated schemas
#[derive(Parser)]
#[command(name = "erdsmith")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Compiler configuration (TOML)
    #[arg(short, long, global = true, value_name = "TOML")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Parse and validate a diagram without changing it
    Check {
        /// Path to the diagram file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,

        /// Extra reserved entity names, one per line
        #[arg(long, value_name = "NAMES_FILE")]
        reserved: Option<PathBuf>,
    },

    /// Apply automatic fixes and write the fixed model
    Fix {
        /// Path to the diagram file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Output path for the fixed model (default: <file>.fixed.json)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Extra reserved entity names, one per line
        #[arg(long, value_name = "NAMES_FILE")]
        reserved: Option<PathBuf>,
    },

    /// Suggest standard entities for each entity of a diagram
    Match {
        /// Path to the diagram file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Catalog to match against instead of the built-in one (JSON)
        #[arg(long, value_name = "CATALOG")]
        catalog: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run the full pipeline and export the schema
    Export {
        /// Path to the diagram file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(short, long, default_value = "json")]
        format: OutputFormat,

        /// Option sets for choice attributes (JSON array)
        #[arg(long, value_name = "CHOICES")]
        choices: Option<PathBuf>,

        /// Extra reserved entity names, one per line
        #[arg(long, value_name = "NAMES_FILE")]
        reserved: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Json,
    Csv,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            _ => Err(format!("Unknown format: {}. Use json or csv.", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Csv => write!(f, "csv"),
        }
    }
}
