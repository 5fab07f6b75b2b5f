//! Bulk import of CSV files into a collection.
//!
//! The header row names the fields. Each cell is coerced to the type of its
//! field, vectors included, and rows are submitted in batches. A row that
//! fails to parse is counted and skipped.

use anyhow::{bail, Context};
use indicatif::{ProgressBar, ProgressStyle};
use milvus_client::{CollectionInfo, FieldSchema, Row};
use serde_json::Value;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::error::{CliError, Result};
use crate::validate::{parse_field_value, parse_scalar};

/// Import configuration
pub struct ImportConfig {
    pub batch_size: usize,
    pub show_progress: bool,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            show_progress: true,
        }
    }
}

/// Import statistics
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ImportStats {
    pub total: usize,
    pub imported: usize,
    pub errors: usize,
    pub duration_ms: u64,
}

impl ImportStats {
    /// Records per second
    #[must_use]
    pub fn records_per_sec(&self) -> f64 {
        if self.duration_ms == 0 {
            0.0
        } else {
            (self.imported as f64) / (self.duration_ms as f64 / 1000.0)
        }
    }
}

/// Where the cells of one CSV column go.
#[derive(Debug, Clone)]
enum Column {
    Field(FieldSchema),
    Dynamic(String),
    Skip,
}

fn plan_columns(headers: &csv::StringRecord, info: &CollectionInfo) -> anyhow::Result<Vec<Column>> {
    let mut columns = Vec::with_capacity(headers.len());
    for header in headers {
        let header = header.trim();
        let column = match info.fields.iter().find(|f| f.name == header) {
            Some(field) if field.is_primary && field.auto_id => Column::Skip,
            Some(field) => Column::Field(field.clone()),
            None if info.enable_dynamic_field => Column::Dynamic(header.to_string()),
            None => bail!(
                "column '{header}' is not a field of {} and the dynamic field is disabled",
                info.name
            ),
        };
        columns.push(column);
    }
    for field in &info.fields {
        let required = !(field.is_primary && field.auto_id)
            && !field.nullable
            && field.default_value.is_none();
        let present = columns
            .iter()
            .any(|c| matches!(c, Column::Field(f) if f.name == field.name));
        if required && !present {
            bail!("required field '{}' has no column", field.name);
        }
    }
    Ok(columns)
}

fn parse_record(record: &csv::StringRecord, columns: &[Column]) -> Result<Row> {
    let mut row = Row::new();
    for (cell, column) in record.iter().zip(columns) {
        match column {
            Column::Field(field) if cell.trim().is_empty() && field.nullable => {
                row.insert(field.name.clone(), Value::Null);
            }
            Column::Field(field) => {
                row.insert(field.name.clone(), parse_field_value(field, cell)?);
            }
            Column::Dynamic(name) => {
                row.insert(name.clone(), parse_scalar(cell));
            }
            Column::Skip => {}
        }
    }
    Ok(row)
}

fn open_reader(path: &Path) -> anyhow::Result<csv::Reader<BufReader<File>>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open CSV file {}", path.display()))?;
    Ok(csv::Reader::from_reader(BufReader::with_capacity(128 * 1024, file)))
}

fn run_import<F>(
    path: &Path,
    info: &CollectionInfo,
    config: &ImportConfig,
    mut submit: F,
) -> anyhow::Result<ImportStats>
where
    F: FnMut(&[Row]) -> Result<()>,
{
    let mut reader = open_reader(path)?;
    let headers = reader.headers().context("Failed to read CSV header")?.clone();
    let columns = plan_columns(&headers, info)?;

    // Streaming count for the progress bar
    let total = reader.records().count();
    if total == 0 {
        bail!("Empty file");
    }

    let mut reader = open_reader(path)?;
    let progress = create_progress_bar(total, config.show_progress);
    if config.show_progress {
        progress.set_message(format!("Importing {total} rows into {}", info.name));
    }

    let mut stats = ImportStats::default();
    let start = std::time::Instant::now();
    let batch_size = config.batch_size.max(1);
    let mut batch: Vec<Row> = Vec::with_capacity(batch_size);

    for result in reader.records() {
        let row = result
            .map_err(|e| CliError::parameter("file", e.to_string()))
            .and_then(|record| parse_record(&record, &columns));
        match row {
            Ok(row) => {
                batch.push(row);
                if batch.len() >= batch_size {
                    submit(&batch).map_err(|e| after_partial_import(e, stats.imported))?;
                    stats.imported += batch.len();
                    batch.clear();
                }
            }
            Err(e) => {
                tracing::debug!(error = %e, "skipping CSV row");
                stats.errors += 1;
            }
        }
        progress.inc(1);
    }

    if !batch.is_empty() {
        submit(&batch).map_err(|e| after_partial_import(e, stats.imported))?;
        stats.imported += batch.len();
    }

    progress.finish_with_message("Import complete");
    stats.duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
    stats.total = total;
    Ok(stats)
}

/// Batches submitted before a failure stay committed; say how many rows.
fn after_partial_import(err: CliError, imported: usize) -> CliError {
    if imported == 0 {
        return err;
    }
    match err {
        CliError::Remote { operation, message } => CliError::Remote {
            operation,
            message: format!("{message} ({imported} rows were imported before the failure)"),
        },
        other => CliError::parameter(
            "file",
            format!("{other} ({imported} rows were imported before the failure)"),
        ),
    }
}

/// Imports `path` into the collection described by `info`, handing each
/// batch to `submit`. A failed submission aborts the import.
///
/// # Errors
///
/// Unreadable files, unknown columns and missing required columns are
/// [`CliError::Parameter`] errors on `file`. Submission errors pass through,
/// with the count of rows already imported when earlier batches succeeded.
pub fn import_csv<F>(
    path: &Path,
    info: &CollectionInfo,
    config: &ImportConfig,
    submit: F,
) -> Result<ImportStats>
where
    F: FnMut(&[Row]) -> Result<()>,
{
    run_import(path, info, config, submit).map_err(|e| match e.downcast::<CliError>() {
        Ok(err) => err,
        Err(other) => CliError::parameter("file", format!("{other:#}")),
    })
}

/// Create progress bar
fn create_progress_bar(total: usize, show: bool) -> ProgressBar {
    if !show {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(total as u64);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
    {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb
}

#[cfg(test)]
#[path = "import_tests.rs"]
mod tests;
