//! Main entry point for the bulk-csv-loader CLI

use bulk_csv_loader::cli::{Cli, Commands};
use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

/// Exit code when the load finished but some records were not written
const EXIT_PARTIAL_FAILURE: i32 = 2;

/// Initialize tracing subscriber with optional JSON formatting
fn init_tracing() {
    // Check if JSON output is requested via environment variable
    let json_format = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("bulk_csv_loader=info"));

    // Logs go to stderr; stdout carries command output
    if json_format {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = Cli::parse();

    let result: anyhow::Result<i32> = match &cli.command {
        Commands::Load(args) => args
            .execute(cli.output_format)
            .await
            .map(|result| {
                if result.is_complete() {
                    0
                } else {
                    EXIT_PARTIAL_FAILURE
                }
            })
            .map_err(anyhow::Error::from),
        Commands::Generate(args) => args
            .execute(cli.output_format)
            .map(|_| 0)
            .map_err(anyhow::Error::from),
        Commands::Validate(cmd) => cmd
            .execute(cli.output_format)
            .map(|_| 0)
            .map_err(anyhow::Error::from),
    };

    match result {
        Ok(0) => {}
        Ok(code) => std::process::exit(code),
        Err(e) => {
            error!("Command failed: {}", e);
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}
