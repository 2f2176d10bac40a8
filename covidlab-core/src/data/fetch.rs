//! Raw dataset fetcher.
//!
//! Presence-only cache: if a file exists at the destination it is used as-is,
//! with no freshness, checksum or size check. A truncated file is therefore
//! treated as valid until the operator deletes it. Otherwise one GET is made,
//! with the client's timeout and no retries.

use super::artifact::write_atomic;
use super::provider::{FetchError, FetchOutcome, RemoteSource};
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Blocking reqwest source with a bounded timeout.
pub struct HttpSource {
    client: reqwest::blocking::Client,
}

impl HttpSource {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("covidlab/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;

        Ok(Self { client })
    }
}

impl RemoteSource for HttpSource {
    fn name(&self) -> &str {
        "http"
    }

    fn get(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let network = |e: reqwest::Error| FetchError::Network {
            url: url.to_string(),
            reason: e.to_string(),
        };

        let resp = self.client.get(url).send().map_err(network)?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = resp.bytes().map_err(network)?;
        Ok(body.to_vec())
    }
}

/// Make sure the raw dataset exists at `destination`, downloading it from `url` if absent.
pub fn ensure_raw_dataset(
    source: &dyn RemoteSource,
    destination: &Path,
    url: &str,
) -> Result<FetchOutcome, FetchError> {
    if destination.exists() {
        return Ok(FetchOutcome::AlreadyPresent);
    }

    info!(url, source = source.name(), "downloading dataset");
    let body = source.get(url)?;

    write_atomic(destination, &body).map_err(|e| FetchError::Io {
        path: destination.to_path_buf(),
        reason: e.to_string(),
    })?;

    info!(bytes = body.len(), path = %destination.display(), "saved dataset");
    Ok(FetchOutcome::Downloaded { bytes: body.len() })
}
