//! Data acquisition and cleaning

pub mod artifact;
pub mod clean;
pub mod fetch;
pub mod ingest;
pub mod provider;
pub mod schema;

pub use artifact::{write_atomic, ArtifactMeta};
pub use clean::{CleanError, CleanOptions, CleanReport, Cleaner};
pub use fetch::{ensure_raw_dataset, HttpSource};
pub use ingest::read_projected;
pub use provider::{FetchError, FetchOutcome, RemoteSource};
pub use schema::OwidSchema;
