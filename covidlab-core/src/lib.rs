//! CovidLab Core — data pipeline and analytics over the OWID COVID-19 dataset.
//!
//! This crate contains everything behind the `covidlab` CLI:
//! - Explicit configuration (paths, source URL, timeout)
//! - Fetcher: presence-only cached download of the raw CSV
//! - Cleaner: projection, country filter, per-entity sort and forward-fill
//! - Loader: cleaned artifact preferred, raw fallback
//! - Analytics: selection filter, KPI snapshot, top-N ranking, chart series
//! - Read-only SQL over the raw dataset

pub mod analytics;
pub mod config;
pub mod data;
pub mod dataset;
pub mod loader;
pub mod query;

pub use config::{ConfigError, DashboardConfig};
pub use dataset::{frame_to_csv, Dataset};
pub use loader::{load_dataset, DatasetSource, LoadError, LoadedDataset};
pub use query::{example_sql, QueryEngine, QueryError};
