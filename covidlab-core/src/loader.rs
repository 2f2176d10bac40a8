//! Dataset loading for the presentation layer.
//!
//! Resolution policy:
//! 1. Ensure the raw artifact exists (download once, presence-only cache)
//! 2. If the cleaned artifact exists and is preferred → read it
//! 3. Otherwise → read the raw artifact through the same column projection
//!
//! Either way the result holds country rows only, sorted by (location, date).

use crate::config::DashboardConfig;
use crate::data::schema::{CONTINENT, DATE, LOCATION};
use crate::data::{ensure_raw_dataset, read_projected, CleanError, FetchError, OwidSchema, RemoteSource};
use crate::Dataset;
use polars::prelude::*;
use std::fmt;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Malformed(#[from] CleanError),

    #[error("failed to prepare dataset: {0}")]
    Polars(#[from] PolarsError),
}

/// Which artifact a dataset was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetSource {
    Cleaned,
    Raw,
}

impl fmt::Display for DatasetSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatasetSource::Cleaned => f.write_str("cleaned"),
            DatasetSource::Raw => f.write_str("raw"),
        }
    }
}

#[derive(Debug)]
pub struct LoadedDataset {
    pub dataset: Dataset,
    pub source: DatasetSource,
}

/// Load the dashboard dataset, downloading the raw file first if needed.
pub fn load_dataset(
    config: &DashboardConfig,
    remote: &dyn RemoteSource,
    prefer_clean: bool,
) -> Result<LoadedDataset, LoadError> {
    let raw_path = config.raw_path();
    ensure_raw_dataset(remote, &raw_path, &config.source_url)?;

    let clean_path = config.clean_path();
    let (path, source) = if prefer_clean && clean_path.exists() {
        (clean_path, DatasetSource::Cleaned)
    } else {
        (raw_path, DatasetSource::Raw)
    };

    let df = read_projected(&path, &OwidSchema::schema())?;
    let df = df
        .lazy()
        .filter(col(CONTINENT).is_not_null())
        .sort(
            [LOCATION, DATE],
            SortMultipleOptions::default().with_maintain_order(true),
        )
        .collect()?;

    info!(rows = df.height(), %source, path = %path.display(), "loaded dataset");
    Ok(LoadedDataset {
        dataset: Dataset::from(df),
        source,
    })
}
