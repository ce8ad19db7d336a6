//! Generate command implementation

use clap::Parser;
use std::path::PathBuf;

use super::{CliError, OutputFormat};
use crate::source::generate::{CsvGenerator, DEFAULT_RECORD_COUNT, DEFAULT_SEED};

/// Arguments for the generate command
#[derive(Parser, Debug)]
pub struct GenerateArgs {
    /// Output CSV file
    #[arg(long, short = 'o')]
    pub output: PathBuf,

    /// Number of records to generate
    #[arg(long, short = 'c', default_value_t = DEFAULT_RECORD_COUNT as u64, value_parser = clap::value_parser!(u64).range(1..))]
    pub count: u64,

    /// Random seed for reproducible data
    #[arg(long, default_value_t = DEFAULT_SEED)]
    pub seed: u64,
}

impl GenerateArgs {
    /// Execute the generate command
    pub fn execute(&self, output_format: OutputFormat) -> Result<usize, CliError> {
        let count = usize::try_from(self.count)
            .map_err(|e| CliError::InvalidArgument(format!("count too large: {e}")))?;

        let written = CsvGenerator::new(&self.output)
            .with_count(count)
            .with_seed(self.seed)
            .generate()?;

        match output_format {
            OutputFormat::Json => {
                let output = serde_json::json!({
                    "output": self.output.display().to_string(),
                    "records": written,
                    "seed": self.seed,
                });
                println!("{output}");
            }
            OutputFormat::Human => {
                println!("Generated {} records: {}", written, self.output.display());
            }
        }

        Ok(written)
    }
}
