//! Load command implementation

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::info;

use super::{CliError, OutputFormat};
use crate::loader::{BulkLoader, LoadResult, LoaderConfig, Strategy};
use crate::metrics::init_metrics;
use crate::store::dynamodb_http::DEFAULT_ENDPOINT;
use crate::store::{create_store, StoreKind};

/// Default number of errors listed in human output
pub const DEFAULT_SHOW_ERRORS: usize = 10;

/// Arguments for the load command.
///
/// Values given on the command line override values from `--config`.
#[derive(Parser, Debug)]
pub struct LoadArgs {
    /// CSV file to load
    #[arg(long)]
    pub csv: PathBuf,

    /// Target table name
    #[arg(long, short = 't')]
    pub table: Option<String>,

    /// Region of the target table (default: us-east-1)
    #[arg(long, short = 'r')]
    pub region: Option<String>,

    /// Concurrent workers (default: CPU cores for threaded, 10 for async)
    #[arg(long, short = 'w', allow_negative_numbers = true)]
    pub workers: Option<i64>,

    /// Records per batch write (default: 25, max: 25)
    #[arg(long, short = 'b', allow_negative_numbers = true)]
    pub batch_size: Option<i64>,

    /// Retries after the first attempt (default: 3)
    #[arg(long, allow_negative_numbers = true)]
    pub max_retries: Option<i64>,

    /// Base backoff delay in seconds (default: 0.1)
    #[arg(long, allow_negative_numbers = true)]
    pub base_delay: Option<f64>,

    /// Cap on a single backoff delay in seconds (default: 10)
    #[arg(long, allow_negative_numbers = true)]
    pub max_delay: Option<f64>,

    /// Scheduling strategy: threaded or async
    #[arg(long)]
    pub strategy: Option<Strategy>,

    /// Store backend: dynamodb or memory
    #[arg(long, default_value = "dynamodb")]
    pub store: StoreKind,

    /// Store endpoint URL
    #[arg(long, default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,

    /// Seed for the record shuffle (random when omitted)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Retry every failure up to the limit, including permanent ones
    #[arg(long, default_value_t = false)]
    pub retry_all_errors: bool,

    /// JSON loader config file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Number of errors listed in human output
    #[arg(long, default_value_t = DEFAULT_SHOW_ERRORS)]
    pub show_errors: usize,

    /// Serve Prometheus metrics on this address (e.g. 127.0.0.1:9090)
    #[arg(long)]
    pub metrics_addr: Option<SocketAddr>,

    /// Disable the progress bar
    #[arg(long, default_value_t = false)]
    pub no_progress: bool,
}

impl LoadArgs {
    /// Merge the config file (if any) with command line overrides
    pub fn build_config(&self) -> Result<LoaderConfig, CliError> {
        let mut config = match &self.config {
            Some(path) => LoaderConfig::from_json_file(path)?,
            None => LoaderConfig::default(),
        };

        if let Some(table) = &self.table {
            config.table_name = table.clone();
        }
        if let Some(region) = &self.region {
            config.region = region.clone();
        }
        if let Some(workers) = self.workers {
            config.max_workers = Some(workers);
        }
        if let Some(batch_size) = self.batch_size {
            config.batch_size = batch_size;
        }
        if let Some(max_retries) = self.max_retries {
            config.max_retries = max_retries;
        }
        if let Some(base_delay) = self.base_delay {
            config.base_delay = base_delay;
        }
        if let Some(max_delay) = self.max_delay {
            config.max_delay = max_delay;
        }
        if let Some(strategy) = self.strategy {
            config.strategy = strategy;
        }
        if let Some(seed) = self.seed {
            config.shuffle_seed = Some(seed);
        }
        if self.retry_all_errors {
            config.classify_errors = false;
        }

        Ok(config)
    }

    /// Execute the load command
    pub async fn execute(&self, output_format: OutputFormat) -> Result<LoadResult, CliError> {
        let config = self.build_config()?;
        config.validate()?;

        if let Some(addr) = self.metrics_addr {
            init_metrics(addr).await?;
        }

        let workers = usize::try_from(config.effective_max_workers())
            .map_err(|e| CliError::InvalidArgument(format!("invalid worker count: {e}")))?;
        let store = create_store(self.store, &self.endpoint, &config.region, workers)?;
        let table = config.table_name.clone();

        let mut loader = BulkLoader::new(config, store)?;
        if output_format == OutputFormat::Human && !self.no_progress {
            loader = loader.with_progress_bar(create_progress_bar(&table));
        }

        info!(
            "Starting load: {} -> {} ({})",
            self.csv.display(),
            table,
            self.store
        );
        let result = loader.load(&self.csv).await?;

        match output_format {
            OutputFormat::Json => output_json(&table, &result)?,
            OutputFormat::Human => output_human(&table, &result, self.show_errors),
        }

        Ok(result)
    }
}

/// Render a load result as one JSON object
pub fn result_json(table: &str, result: &LoadResult) -> serde_json::Value {
    serde_json::json!({
        "table": table,
        "strategy": result.strategy,
        "total_records": result.total_records,
        "successful_writes": result.successful_writes,
        "failed_writes": result.failed_writes,
        "success_rate": result.success_rate(),
        "duration_seconds": result.duration_seconds,
        "throughput": result.throughput(),
        "batches": result.batches,
        "retries": result.retries,
        "errors": result.errors,
    })
}

fn output_json(table: &str, result: &LoadResult) -> Result<(), CliError> {
    let output = serde_json::to_string(&result_json(table, result))
        .map_err(|e| CliError::InvalidArgument(format!("failed to render JSON: {e}")))?;
    println!("{output}");
    Ok(())
}

fn output_human(table: &str, result: &LoadResult, show_errors: usize) {
    println!("\nLoad Results");
    println!("============");
    println!("Table:            {table}");
    println!("Strategy:         {}", result.strategy);
    println!("Total records:    {}", result.total_records);
    println!("Successful:       {}", result.successful_writes);
    println!("Failed:           {}", result.failed_writes);
    println!("Success rate:     {:.2}%", result.success_rate());
    println!("Duration:         {:.2}s", result.duration_seconds);
    println!("Throughput:       {:.2} records/s", result.throughput());
    println!("Batches:          {}", result.batches);
    println!("Retries:          {}", result.retries);

    if !result.errors.is_empty() && show_errors > 0 {
        let shown = show_errors.min(result.errors.len());
        println!("\nErrors (showing {} of {}):", shown, result.errors.len());
        for error in result.errors.iter().take(shown) {
            println!("  - {error}");
        }
    }
}

/// Create progress bar with style
fn create_progress_bar(table: &str) -> ProgressBar {
    let pb = ProgressBar::new(0);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
    {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb.set_message(format!("Loading {table}"));
    pb
}
