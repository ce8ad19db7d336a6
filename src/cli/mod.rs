//! CLI command implementations

use clap::{Parser, Subcommand};
use std::str::FromStr;

pub mod error;
pub mod generate;
pub mod load;
pub mod validate;

pub use error::CliError;
pub use generate::GenerateArgs;
pub use load::LoadArgs;
pub use validate::ValidateCommand;

/// Bulk CSV loader CLI
#[derive(Parser, Debug)]
#[command(name = "bulk-csv-loader")]
#[command(about = "Load CSV files into DynamoDB-compatible tables concurrently", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Output format (json or human)
    #[arg(long, global = true, default_value = "human")]
    pub output_format: OutputFormat,
}

/// CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Load a CSV file into a table
    Load(LoadArgs),

    /// Generate a synthetic CSV file with ascending timestamps
    Generate(GenerateArgs),

    /// Validate a loader config file or a CSV source
    Validate(ValidateCommand),
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// Human-readable output
    Human,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "human" => Ok(OutputFormat::Human),
            _ => Err(format!("Invalid output format: {s}")),
        }
    }
}
