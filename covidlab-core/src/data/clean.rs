//! Cleaning pass: raw OWID CSV → country-only, per-country forward-filled CSV.
//!
//! Steps, in order:
//! 1. read the raw file through the typed column projection
//! 2. keep rows whose filter key (continent) is non-null; aggregates such as
//!    "World" or income groups have no continent
//! 3. stable sort by (group key, order key)
//! 4. forward-fill each cumulative field within its group; leading nulls stay null
//! 5. write the frame with a header row, replacing the previous artifact atomically
//!
//! The sort is done here, not assumed from the caller: the fill is only
//! correct on date-ordered partitions.

use super::artifact::{write_atomic, ArtifactMeta};
use super::ingest::read_projected;
use super::schema::{OwidSchema, CONTINENT, DATE, LOCATION};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

/// Errors from reading, cleaning or writing the dataset.
///
/// Everything except `Write` means the raw input is malformed. In every case
/// the cleaned artifact is left as it was before the call.
#[derive(Debug, Error)]
pub enum CleanError {
    #[error("raw dataset not found at {}", path.display())]
    MissingInput { path: PathBuf },

    #[error("malformed input: missing required column '{column}'")]
    MissingColumn { column: String },

    #[error("malformed input: unparseable value {value:?} in column '{column}' at data row {row}")]
    UnparseableValue {
        column: String,
        row: usize,
        value: String,
    },

    #[error("malformed input: missing value in key column '{column}' at data row {row}")]
    MissingValue { column: String, row: usize },

    #[error("field '{field}' is not part of the column projection")]
    UnknownField { field: String },

    #[error("malformed input: {0}")]
    Read(String),

    #[error("failed to write {}: {reason}", path.display())]
    Write { path: PathBuf, reason: String },
}

/// Which columns drive the filter, the partition and the fill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanOptions {
    /// Partition key for the fill (the entity).
    pub group_key: String,
    /// Temporal order within a partition.
    pub order_key: String,
    /// Rows with a null in this column are dropped.
    pub require_non_null: String,
    /// Fields forward-filled within each partition.
    pub cumulative_fields: Vec<String>,
}

impl Default for CleanOptions {
    fn default() -> Self {
        Self {
            group_key: LOCATION.to_string(),
            order_key: DATE.to_string(),
            require_non_null: CONTINENT.to_string(),
            cumulative_fields: OwidSchema::CUMULATIVE_FIELDS
                .iter()
                .map(|f| f.to_string())
                .collect(),
        }
    }
}

/// Summary of one cleaning run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanReport {
    pub raw_rows: usize,
    pub kept_rows: usize,
    /// Rows removed by the non-null filter.
    pub dropped_rows: usize,
    /// Distinct group keys in the output.
    pub entities: usize,
    /// Nulls replaced by the forward-fill, per cumulative field.
    pub filled: BTreeMap<String, usize>,
    /// BLAKE3 of the written artifact bytes.
    pub data_hash: String,
}

/// The cleaning transform over a typed column projection.
pub struct Cleaner {
    projection: Schema,
    options: CleanOptions,
}

impl Cleaner {
    /// Build a cleaner; every key and cumulative field must be in `projection`.
    pub fn new(projection: Schema, options: CleanOptions) -> Result<Self, CleanError> {
        let referenced = [
            &options.group_key,
            &options.order_key,
            &options.require_non_null,
        ]
        .into_iter()
        .chain(options.cumulative_fields.iter());

        for field in referenced {
            if !projection.contains(field) {
                return Err(CleanError::UnknownField {
                    field: field.clone(),
                });
            }
        }

        Ok(Self {
            projection,
            options,
        })
    }

    /// Cleaner for the OWID column projection.
    pub fn owid() -> Self {
        Self {
            projection: OwidSchema::schema(),
            options: CleanOptions::default(),
        }
    }

    pub fn projection(&self) -> &Schema {
        &self.projection
    }

    pub fn options(&self) -> &CleanOptions {
        &self.options
    }

    /// Clean `raw_path` into `clean_path`, replacing any previous artifact.
    ///
    /// Also writes a `{clean_path}.meta.json` sidecar; a failure there is
    /// logged and does not fail the run.
    pub fn clean(&self, raw_path: &Path, clean_path: &Path) -> Result<CleanReport, CleanError> {
        info!(raw = %raw_path.display(), "cleaning dataset");

        let raw = read_projected(raw_path, &self.projection)?;
        let (mut cleaned, stats) = self.transform(raw)?;

        let mut buf = Vec::new();
        CsvWriter::new(&mut buf)
            .include_header(true)
            .finish(&mut cleaned)
            .map_err(|e| CleanError::Write {
                path: clean_path.to_path_buf(),
                reason: e.to_string(),
            })?;

        write_atomic(clean_path, &buf).map_err(|e| CleanError::Write {
            path: clean_path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let report = CleanReport {
            raw_rows: stats.raw_rows,
            kept_rows: stats.kept_rows,
            dropped_rows: stats.raw_rows - stats.kept_rows,
            entities: stats.entities,
            filled: stats.filled,
            data_hash: blake3::hash(&buf).to_hex().to_string(),
        };

        if let Err(e) = ArtifactMeta::new(raw_path, report.clone()).write(clean_path) {
            warn!(error = %e, "failed to write cleaned-artifact metadata");
        }

        info!(
            raw_rows = report.raw_rows,
            kept_rows = report.kept_rows,
            entities = report.entities,
            path = %clean_path.display(),
            "wrote cleaned dataset"
        );
        Ok(report)
    }

    /// Filter, sort and fill an already-typed frame.
    pub fn transform(&self, raw: DataFrame) -> Result<(DataFrame, TransformStats), CleanError> {
        let polars_err = |e: PolarsError| CleanError::Read(e.to_string());
        let opts = &self.options;
        let raw_rows = raw.height();

        // Keys must be present on every row that survives the filter.
        let keep = raw
            .column(&opts.require_non_null)
            .map_err(polars_err)?
            .as_materialized_series()
            .is_not_null();
        for key in [&opts.group_key, &opts.order_key] {
            let missing = raw
                .column(key)
                .map_err(polars_err)?
                .as_materialized_series()
                .is_null();
            let bad = &keep & &missing;
            let first_bad = bad.into_iter().position(|flag| flag == Some(true));
            if let Some(row) = first_bad {
                return Err(CleanError::MissingValue {
                    column: key.clone(),
                    row: row + 1,
                });
            }
        }

        let filtered = raw
            .lazy()
            .filter(col(opts.require_non_null.as_str()).is_not_null())
            .sort(
                [opts.group_key.as_str(), opts.order_key.as_str()],
                SortMultipleOptions::default().with_maintain_order(true),
            )
            .collect()
            .map_err(polars_err)?;

        let nulls_before = self.cumulative_nulls(&filtered)?;

        let fills: Vec<Expr> = opts
            .cumulative_fields
            .iter()
            .map(|field| {
                col(field.as_str())
                    .forward_fill(None)
                    .over([col(opts.group_key.as_str())])
            })
            .collect();

        let cleaned = filtered.lazy().with_columns(fills).collect().map_err(polars_err)?;

        let nulls_after = self.cumulative_nulls(&cleaned)?;
        let filled = nulls_before
            .into_iter()
            .map(|(field, before)| {
                let after = nulls_after.get(&field).copied().unwrap_or(0);
                (field, before - after)
            })
            .collect();

        let entities = cleaned
            .column(&opts.group_key)
            .map_err(polars_err)?
            .as_materialized_series()
            .n_unique()
            .map_err(polars_err)?;

        let stats = TransformStats {
            raw_rows,
            kept_rows: cleaned.height(),
            entities,
            filled,
        };
        Ok((cleaned, stats))
    }

    fn cumulative_nulls(&self, df: &DataFrame) -> Result<BTreeMap<String, usize>, CleanError> {
        self.options
            .cumulative_fields
            .iter()
            .map(|field| {
                df.column(field)
                    .map(|c| (field.clone(), c.null_count()))
                    .map_err(|e| CleanError::Read(e.to_string()))
            })
            .collect()
    }
}

/// Row accounting from [`Cleaner::transform`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformStats {
    pub raw_rows: usize,
    pub kept_rows: usize,
    pub entities: usize,
    pub filled: BTreeMap<String, usize>,
}
