//! I/O boundary traits for testability
//!
//! These traits abstract external I/O operations, allowing services
//! to be tested with mock implementations.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::domain::{PlotData, StandIdentity};

/// Filesystem abstraction for testability.
pub trait FileSystem: Send + Sync {
    /// Read file contents to string.
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Write string content to file.
    fn write(&self, path: &Path, content: &str) -> io::Result<()>;

    /// Check if path exists.
    fn exists(&self, path: &Path) -> bool;

    /// Create directory and all parent directories.
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    /// Create parent directories if needed.
    fn ensure_parent(&self, path: &Path) -> io::Result<()>;
}

/// Validation file locations for one stand, paired by index.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ValidationPaths {
    pub aoi: Vec<PathBuf>,
    pub points: Vec<PathBuf>,
}

/// Where the report text and the diagnostic chart are written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportPaths {
    pub tpa_report: PathBuf,
    pub tpa_rd_plot: PathBuf,
}

/// Stand metadata row. Only `ACRES` is interpreted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandInfo {
    #[serde(rename = "ACRES", deserialize_with = "number_or_string")]
    pub acres: f64,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

fn number_or_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) => s
            .trim()
            .parse()
            .map_err(|e| serde::de::Error::custom(format!("ACRES '{}': {}", s, e))),
    }
}

/// Failure reported by a remote collaborator.
#[derive(Error, Debug)]
pub enum UpstreamError {
    #[error("{endpoint} responded {status}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("{endpoint} unreachable: {message}")]
    Transport { endpoint: String, message: String },

    #[error("{endpoint} returned an unexpected payload: {message}")]
    Payload { endpoint: String, message: String },
}

/// Stand lookup and persistence service.
pub trait StandCatalog: Send + Sync {
    /// AOI and tree file paths for a stand.
    fn validation_paths(&self, stand: &StandIdentity) -> Result<ValidationPaths, UpstreamError>;

    /// Stand metadata row.
    fn stand_info(&self, stand: &StandIdentity) -> Result<StandInfo, UpstreamError>;

    /// Output locations for the report and chart.
    fn report_paths(&self, stand: &StandIdentity) -> Result<ReportPaths, UpstreamError>;

    /// Store the validated TPA value for a stand.
    fn set_validation_tpa(&self, stand: &StandIdentity, tpa: f64) -> Result<(), UpstreamError>;
}

/// Renders the acreage/tree diagnostic chart.
pub trait ChartRenderer: Send + Sync {
    fn render(&self, title: &str, data: &PlotData) -> String;
}

// ============================================================
// REAL IMPLEMENTATIONS
// ============================================================

/// Real filesystem implementation.
#[derive(Debug, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn write(&self, path: &Path, content: &str) -> io::Result<()> {
        std::fs::write(path, content)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        std::fs::create_dir_all(path)
    }

    fn ensure_parent(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                self.create_dir_all(parent)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_numeric_acres_when_deserializing_then_parses() {
        let info: StandInfo =
            serde_json::from_str(r#"{"ACRES": 42.5, "STAND_NAME": "North"}"#).unwrap();
        assert_eq!(info.acres, 42.5);
        assert_eq!(info.extra.get("STAND_NAME"), Some(&serde_json::json!("North")));
    }

    #[test]
    fn given_string_or_integer_acres_when_deserializing_then_parses() {
        let info: StandInfo = serde_json::from_str(r#"{"ACRES": " 12.25 "}"#).unwrap();
        assert_eq!(info.acres, 12.25);
        let info: StandInfo = serde_json::from_str(r#"{"ACRES": 7}"#).unwrap();
        assert_eq!(info.acres, 7.0);
    }

    #[test]
    fn given_missing_or_garbage_acres_when_deserializing_then_fails() {
        assert!(serde_json::from_str::<StandInfo>(r#"{"NAME": "x"}"#).is_err());
        assert!(serde_json::from_str::<StandInfo>(r#"{"ACRES": "lots"}"#).is_err());
    }
}
