//! Synthetic order data generator
//!
//! Produces CSV files whose timestamps ascend one second per row from
//! 2024-01-01T00:00:00. Written in file order, such data would concentrate
//! writes on one key range, which makes it a good workload for the shuffle.

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use csv::Writer;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::info;

use super::{SourceError, SourceResult};

/// Default number of generated rows
pub const DEFAULT_RECORD_COUNT: usize = 10_000;

/// Default generator seed
pub const DEFAULT_SEED: u64 = 42;

/// Column order of generated files
pub const FIELD_NAMES: [&str; 8] = [
    "id",
    "timestamp",
    "category",
    "user_name",
    "email",
    "amount",
    "status",
    "description",
];

const CATEGORIES: &[&str] = &["Electronics", "Books", "Clothing", "Home", "Sports", "Toys", "Food"];
const STATUSES: &[&str] = &["pending", "processing", "completed", "cancelled", "refunded"];

const FIRST_NAMES: &[&str] = &[
    "Alice", "Bruno", "Chen", "Dana", "Elif", "Farah", "Goran", "Hana", "Ivan", "Jules", "Kenji",
    "Lena", "Marco", "Nadia", "Omar", "Priya", "Quinn", "Rosa", "Sven", "Tariq",
];
const LAST_NAMES: &[&str] = &[
    "Anders", "Baker", "Costa", "Dubois", "Evans", "Fischer", "Garcia", "Haddad", "Ito", "Jensen",
    "Kowalski", "Lopez", "Moreau", "Novak", "Okafor", "Patel", "Rossi", "Schmidt", "Tanaka", "Weber",
];
const EMAIL_DOMAINS: &[&str] = &["example.com", "example.org", "example.net"];
const WORDS: &[&str] = &[
    "order", "shipped", "customer", "requested", "gift", "wrapping", "express", "delivery",
    "warehouse", "package", "returned", "item", "quality", "review", "discount", "applied",
    "seasonal", "bundle", "priority", "support", "tracking", "updated", "payment", "received",
];
const MAX_DESCRIPTION_CHARS: usize = 100;

/// One generated CSV row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneratedRow {
    /// Random UUID v4
    pub id: String,
    /// ISO-8601 timestamp without offset
    pub timestamp: String,
    /// Product category
    pub category: String,
    /// Customer name
    pub user_name: String,
    /// Customer email
    pub email: String,
    /// Amount between 1.00 and 1000.00 with two decimals
    pub amount: Decimal,
    /// Order status
    pub status: String,
    /// Free text of at most 100 characters
    pub description: String,
}

fn base_time() -> SourceResult<NaiveDateTime> {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .ok_or_else(|| SourceError::GenerateError("invalid base timestamp".to_string()))
}

fn pick<'a>(rng: &mut StdRng, items: &[&'a str]) -> &'a str {
    items.choose(rng).copied().unwrap_or_default()
}

fn description(rng: &mut StdRng) -> String {
    let mut text = String::new();
    let target = rng.random_range(20..=MAX_DESCRIPTION_CHARS);
    loop {
        let word = pick(rng, WORDS);
        let needed = if text.is_empty() { word.len() } else { word.len() + 1 };
        if text.len() + needed + 1 > target {
            break;
        }
        if !text.is_empty() {
            text.push(' ');
        }
        text.push_str(word);
    }
    if let Some(first) = text.get(..1) {
        text = first.to_uppercase() + &text[1..];
    }
    text.push('.');
    text
}

/// Generate `count` rows from `seed`. The same seed always yields the same rows.
pub fn generate_rows(count: usize, seed: u64) -> SourceResult<Vec<GeneratedRow>> {
    let mut rng = StdRng::seed_from_u64(seed);
    let base = base_time()?;

    let mut rows = Vec::with_capacity(count);
    for i in 0..count {
        let timestamp = i64::try_from(i)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .map(|offset| base + offset)
            .ok_or_else(|| SourceError::GenerateError(format!("row {i} is out of range")))?;

        let mut bytes = [0u8; 16];
        rng.fill(&mut bytes);
        let id = uuid::Builder::from_random_bytes(bytes).into_uuid();

        let first = pick(&mut rng, FIRST_NAMES);
        let last = pick(&mut rng, LAST_NAMES);
        let domain = pick(&mut rng, EMAIL_DOMAINS);
        let cents: i64 = rng.random_range(100..=100_000);

        rows.push(GeneratedRow {
            id: id.hyphenated().to_string(),
            timestamp: timestamp.format("%Y-%m-%dT%H:%M:%S").to_string(),
            category: pick(&mut rng, CATEGORIES).to_string(),
            user_name: format!("{first} {last}"),
            email: format!(
                "{}.{}{}@{}",
                first.to_lowercase(),
                last.to_lowercase(),
                i % 1000,
                domain
            ),
            amount: Decimal::new(cents, 2),
            status: pick(&mut rng, STATUSES).to_string(),
            description: description(&mut rng),
        });
    }

    Ok(rows)
}

/// Writes synthetic order data to a CSV file
#[derive(Debug, Clone)]
pub struct CsvGenerator {
    output: PathBuf,
    count: usize,
    seed: u64,
}

impl CsvGenerator {
    /// Create a generator writing [`DEFAULT_RECORD_COUNT`] rows to `output`
    pub fn new<P: Into<PathBuf>>(output: P) -> Self {
        Self {
            output: output.into(),
            count: DEFAULT_RECORD_COUNT,
            seed: DEFAULT_SEED,
        }
    }

    /// Set the number of rows
    pub fn with_count(mut self, count: usize) -> Self {
        self.count = count;
        self
    }

    /// Set the random seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Output path
    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Generate the file, creating parent directories as needed.
    /// Returns the number of data rows written.
    pub fn generate(&self) -> SourceResult<usize> {
        info!(
            "Generating {} records: path={}",
            self.count,
            self.output.display()
        );

        let rows = generate_rows(self.count, self.seed)?;

        if let Some(parent) = self.output.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    SourceError::IoError(format!("Failed to create directory: {e}"))
                })?;
            }
        }

        let file = File::create(&self.output)
            .map_err(|e| SourceError::IoError(format!("Failed to create file: {e}")))?;
        let mut writer = Writer::from_writer(BufWriter::new(file));

        if rows.is_empty() {
            writer
                .write_record(FIELD_NAMES)
                .map_err(|e| SourceError::CsvError(format!("Failed to write header: {e}")))?;
        }
        for row in &rows {
            writer
                .serialize(row)
                .map_err(|e| SourceError::CsvError(format!("Failed to write row: {e}")))?;
        }
        writer
            .flush()
            .map_err(|e| SourceError::IoError(format!("Failed to flush: {e}")))?;

        info!(records = rows.len(), "CSV generation complete");
        Ok(rows.len())
    }
}
