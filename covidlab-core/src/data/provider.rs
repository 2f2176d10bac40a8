//! Remote source trait and fetch error types.
//!
//! The RemoteSource trait abstracts the single HTTP GET the fetcher performs,
//! so tests can count calls and simulate failures without the network.

use std::path::PathBuf;
use thiserror::Error;

/// Download failures. None of these are retried.
///
/// Displayable as-is in the CLI.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("network error fetching {url}: {reason}")]
    Network { url: String, reason: String },

    #[error("failed to build HTTP client: {0}")]
    Client(String),

    #[error("failed to write {}: {reason}", path.display())]
    Io { path: PathBuf, reason: String },
}

/// What `ensure_raw_dataset` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// A file was already at the destination; nothing was fetched.
    AlreadyPresent,
    /// The body was downloaded and written.
    Downloaded { bytes: usize },
}

/// A place the raw dataset can be fetched from.
pub trait RemoteSource: Send + Sync {
    /// Human-readable name of this source.
    fn name(&self) -> &str;

    /// Fetch the full body at `url`. Non-2xx responses are errors.
    fn get(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}
