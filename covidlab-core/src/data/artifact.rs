//! On-disk artifacts: atomic writes and the cleaned-data metadata sidecar.
//!
//! Both the raw download and the cleaned CSV are written to a `.tmp` sibling
//! and renamed into place, so a failure never leaves a truncated file behind
//! and never clobbers the previous artifact.

use super::clean::CleanReport;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Metadata sidecar written next to the cleaned artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactMeta {
    pub raw_path: PathBuf,
    pub report: CleanReport,
    pub cleaned_at: NaiveDateTime,
}

impl ArtifactMeta {
    pub fn new(raw_path: &Path, report: CleanReport) -> Self {
        Self {
            raw_path: raw_path.to_path_buf(),
            report,
            cleaned_at: chrono::Local::now().naive_local(),
        }
    }

    /// Sidecar path for an artifact: `{file}.meta.json`
    pub fn path_for(artifact: &Path) -> PathBuf {
        sibling_with_suffix(artifact, ".meta.json")
    }

    pub fn write(&self, artifact: &Path) -> io::Result<()> {
        let json = serde_json::to_vec_pretty(self).map_err(io::Error::other)?;
        write_atomic(&Self::path_for(artifact), &json)
    }

    /// Read the sidecar for an artifact, if present and parseable.
    pub fn read(artifact: &Path) -> Option<Self> {
        let content = fs::read_to_string(Self::path_for(artifact)).ok()?;
        serde_json::from_str(&content).ok()
    }
}

/// Write `bytes` to `path` via a temporary sibling and rename.
///
/// Parent directories are created as needed.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let tmp_path = sibling_with_suffix(path, ".tmp");
    if let Err(e) = fs::write(&tmp_path, bytes) {
        let _ = fs::remove_file(&tmp_path);
        return Err(e);
    }

    fs::rename(&tmp_path, path).inspect_err(|_| {
        let _ = fs::remove_file(&tmp_path);
    })
}

fn sibling_with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| OsString::from("artifact"));
    name.push(suffix);
    path.with_file_name(name)
}
