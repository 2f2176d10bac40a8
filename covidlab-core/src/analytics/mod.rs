//! Dashboard analytics over a loaded [`Dataset`](crate::Dataset).
//!
//! - `selection` — location set + date range filter (the sidebar)
//! - `kpi` — latest-snapshot totals for the selected locations (KPI cards)
//! - `ranking` — top-N locations by a metric (bar chart)
//! - `series` — per-location time series (line charts)

pub mod kpi;
pub mod ranking;
pub mod selection;
pub mod series;

pub use kpi::{format_count, kpi_snapshot, KpiSnapshot};
pub use ranking::{top_locations, Metric, TOP_N_DEFAULT, TOP_N_RANGE};
pub use selection::{Selection, DEFAULT_LOCATIONS};
pub use series::series;

use crate::data::schema::{DATE, LOCATION};
use polars::prelude::*;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("top-N must be between {min} and {max}, got {n}")]
    InvalidTopN { n: usize, min: usize, max: usize },

    #[error("unknown metric '{0}' (expected total_cases, total_deaths or people_fully_vaccinated)")]
    UnknownMetric(String),

    #[error("output is not valid UTF-8: {0}")]
    Encoding(String),

    #[error(transparent)]
    Polars(#[from] PolarsError),
}

/// Last row per location by date, keeping only `fields`.
///
/// The last row is taken as-is, nulls included.
pub(crate) fn latest_per_location(df: &DataFrame, fields: &[&str]) -> PolarsResult<DataFrame> {
    df.clone()
        .lazy()
        .sort(
            [LOCATION, DATE],
            SortMultipleOptions::default().with_maintain_order(true),
        )
        .group_by_stable([col(LOCATION)])
        .agg(fields.iter().map(|f| col(*f).last()).collect::<Vec<_>>())
        .collect()
}
