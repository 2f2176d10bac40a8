//! Dashboard configuration.
//!
//! Every component takes its paths and source URL from a [`DashboardConfig`]
//! value handed in by the caller. Nothing reads a global data directory, so
//! tests can point the whole pipeline at a temporary directory.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Our World in Data full COVID-19 dataset.
pub const OWID_URL: &str = "https://covid.ourworldindata.org/data/owid-covid-data.csv";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config file {}: {reason}", path.display())]
    Read { path: PathBuf, reason: String },

    #[error("parse config TOML: {0}")]
    Parse(String),
}

/// Paths, source URL and limits for one dashboard instance.
///
/// All fields are optional in TOML; missing fields take the defaults below.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Directory holding both artifacts.
    pub data_dir: PathBuf,
    /// File name of the downloaded dataset inside `data_dir`.
    pub raw_file: String,
    /// File name of the cleaned dataset inside `data_dir`.
    pub clean_file: String,
    /// Remote CSV endpoint.
    pub source_url: String,
    /// HTTP timeout for the one-shot download.
    pub timeout_secs: u64,
    /// Table name the SQL engine exposes the raw dataset under.
    pub table_name: String,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            raw_file: "owid-covid-data.csv".to_string(),
            clean_file: "covid_cleaned.csv".to_string(),
            source_url: OWID_URL.to_string(),
            timeout_secs: 60,
            table_name: "owid".to_string(),
        }
    }
}

impl DashboardConfig {
    /// Load a configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::from_toml(&content)
    }

    /// Parse a configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Same configuration rooted at a different data directory.
    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = data_dir.into();
        self
    }

    pub fn raw_path(&self) -> PathBuf {
        self.data_dir.join(&self.raw_file)
    }

    pub fn clean_path(&self) -> PathBuf {
        self.data_dir.join(&self.clean_file)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_owid_layout() {
        let cfg = DashboardConfig::default();
        assert_eq!(cfg.raw_path(), PathBuf::from("data/owid-covid-data.csv"));
        assert_eq!(cfg.clean_path(), PathBuf::from("data/covid_cleaned.csv"));
        assert_eq!(cfg.source_url, OWID_URL);
        assert_eq!(cfg.timeout(), Duration::from_secs(60));
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let cfg = DashboardConfig::from_toml(
            r#"
data_dir = "/tmp/covid"
timeout_secs = 5
"#,
        )
        .unwrap();

        assert_eq!(cfg.data_dir, PathBuf::from("/tmp/covid"));
        assert_eq!(cfg.timeout_secs, 5);
        assert_eq!(cfg.clean_file, "covid_cleaned.csv");
        assert_eq!(cfg.table_name, "owid");
    }

    #[test]
    fn invalid_toml_is_a_parse_error() {
        let err = DashboardConfig::from_toml("timeout_secs = \"soon\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = DashboardConfig::from_file(Path::new("/nonexistent/covidlab.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn with_data_dir_moves_both_artifacts() {
        let cfg = DashboardConfig::default().with_data_dir("/srv/owid");
        assert_eq!(cfg.raw_path(), PathBuf::from("/srv/owid/owid-covid-data.csv"));
        assert_eq!(cfg.clean_path(), PathBuf::from("/srv/owid/covid_cleaned.csv"));
    }
}
