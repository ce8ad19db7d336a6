//! Validation subcommand

use clap::Parser;
use std::path::{Path, PathBuf};

use super::{CliError, OutputFormat};
use crate::loader::LoaderConfig;
use crate::source::read_source;

/// Validate command for checking config files and CSV sources
#[derive(Parser, Debug)]
pub struct ValidateCommand {
    /// What to validate
    #[command(subcommand)]
    pub target: ValidateTarget,
}

/// Target type for validation
#[derive(clap::Subcommand, Debug)]
pub enum ValidateTarget {
    /// Validate a JSON loader config file
    Config {
        /// Config file to validate
        file: PathBuf,
    },
    /// Check that a CSV file can be loaded
    Source {
        /// CSV file to check
        csv: PathBuf,
    },
}

impl ValidateCommand {
    /// Execute the validation command
    pub fn execute(&self, output_format: OutputFormat) -> Result<(), CliError> {
        match &self.target {
            ValidateTarget::Config { file } => validate_config(file, output_format),
            ValidateTarget::Source { csv } => validate_source(csv, output_format),
        }
    }
}

fn validate_config(file: &Path, output_format: OutputFormat) -> Result<(), CliError> {
    let config = LoaderConfig::from_json_file(file)?;

    if let Err(e) = config.validate() {
        if output_format == OutputFormat::Human {
            eprintln!("Invalid config: {e}");
        }
        return Err(e.into());
    }

    match output_format {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "valid": true,
                "config": config,
                "effective_max_workers": config.effective_max_workers(),
            });
            println!("{output}");
        }
        OutputFormat::Human => {
            println!("Valid config: {}", file.display());
            println!("  Table: {}", config.table_name);
            println!("  Region: {}", config.region);
            println!("  Strategy: {}", config.strategy);
            println!("  Workers: {}", config.effective_max_workers());
            println!("  Batch size: {}", config.batch_size);
            println!(
                "  Retries: {} (delay {}s..{}s)",
                config.max_retries, config.base_delay, config.max_delay
            );
        }
    }
    Ok(())
}

fn validate_source(csv: &Path, output_format: OutputFormat) -> Result<(), CliError> {
    let records = read_source(csv)?;
    let fields: Vec<&str> = records
        .first()
        .map(|r| r.field_names().collect())
        .unwrap_or_default();

    match output_format {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "valid": true,
                "records": records.len(),
                "fields": fields,
            });
            println!("{output}");
        }
        OutputFormat::Human => {
            println!("Valid CSV source: {}", csv.display());
            println!("  Records: {}", records.len());
            if !fields.is_empty() {
                println!("  Fields: {}", fields.join(", "));
            }
        }
    }
    Ok(())
}
