//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/tpacalc/tpacalc.toml`
//! 3. Explicit config file (`--config`)
//! 4. Environment variables: `TPACALC_*` prefix, `__` between nested keys

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::application::ApplicationError;
use crate::domain::projection::{UTM_ZONE_10N, WGS84_LONLAT};
use crate::domain::{ConfidenceLevel, GeometryMeasurer, MultiFeaturePolicy, Projection};

/// Reprojection settings for area measurement.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ProjectionConfig {
    /// proj string of the input geometries
    pub source: String,
    /// proj string of the metric CRS areas are computed in
    pub target: String,
    /// Handling of AOI files with more than one feature
    pub multi_feature_policy: MultiFeaturePolicy,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            source: WGS84_LONLAT.to_string(),
            target: UTM_ZONE_10N.to_string(),
            multi_feature_policy: MultiFeaturePolicy::First,
        }
    }
}

/// Raw projection config for intermediate parsing (`None` = not specified).
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawProjectionConfig {
    pub source: Option<String>,
    pub target: Option<String>,
    pub multi_feature_policy: Option<MultiFeaturePolicy>,
}

/// Raw settings for intermediate parsing.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub storage_api_url: Option<String>,
    pub db_api_url: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub confidence_level: Option<f64>,
    pub projection: RawProjectionConfig,
}

impl ProjectionConfig {
    /// Overlay wins where specified.
    pub fn merge(&self, overlay: &RawProjectionConfig) -> Self {
        Self {
            source: overlay.source.clone().unwrap_or_else(|| self.source.clone()),
            target: overlay.target.clone().unwrap_or_else(|| self.target.clone()),
            multi_feature_policy: overlay
                .multi_feature_policy
                .unwrap_or(self.multi_feature_policy),
        }
    }
}

/// Unified configuration for tpacalc.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// File path service base URL
    pub storage_api_url: String,
    /// Stand metadata service base URL
    pub db_api_url: String,
    /// Per-request timeout for both services
    pub request_timeout_secs: u64,
    /// Default two-sided confidence level
    pub confidence_level: f64,
    /// Area measurement CRS
    pub projection: ProjectionConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            storage_api_url: "http://localhost:7111".into(),
            db_api_url: "http://localhost:5055".into(),
            request_timeout_secs: 30,
            confidence_level: ConfidenceLevel::DEFAULT,
            projection: ProjectionConfig::default(),
        }
    }
}

/// Get the XDG config directory for tpacalc.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "tpacalc").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("tpacalc.toml"))
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

impl Settings {
    /// Overlay wins for every field it specifies.
    fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            storage_api_url: overlay
                .storage_api_url
                .clone()
                .unwrap_or_else(|| self.storage_api_url.clone()),
            db_api_url: overlay
                .db_api_url
                .clone()
                .unwrap_or_else(|| self.db_api_url.clone()),
            request_timeout_secs: overlay
                .request_timeout_secs
                .unwrap_or(self.request_timeout_secs),
            confidence_level: overlay.confidence_level.unwrap_or(self.confidence_level),
            projection: self.projection.merge(&overlay.projection),
        }
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `config_file` - Optional explicit config file; it must exist if given
    pub fn load(config_file: Option<&Path>) -> Result<Self, ApplicationError> {
        // 1. Start with defaults
        let mut current = Self::default();

        // 2. Global config
        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                let raw = load_raw_settings(&global_path)?;
                current = current.merge_with(&raw);
            }
        }

        // 3. Explicit config file
        if let Some(path) = config_file {
            if !path.exists() {
                return Err(ApplicationError::Config {
                    message: format!("config file not found: {}", path.display()),
                });
            }
            let raw = load_raw_settings(path)?;
            current = current.merge_with(&raw);
        }

        // 4. Environment variables
        let settings = Self::apply_env_overrides(current)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Apply TPACALC_* environment variables as explicit overrides.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, ApplicationError> {
        let config = Config::builder()
            .add_source(
                Environment::with_prefix("TPACALC")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .map_err(config_err)?;

        if let Ok(val) = config.get_string("storage_api_url") {
            settings.storage_api_url = val;
        }
        if let Ok(val) = config.get_string("db_api_url") {
            settings.db_api_url = val;
        }
        if let Ok(val) = config.get_string("request_timeout_secs") {
            settings.request_timeout_secs = val.parse().map_err(|e| ApplicationError::Config {
                message: format!("TPACALC_REQUEST_TIMEOUT_SECS '{}': {}", val, e),
            })?;
        }
        if let Ok(val) = config.get_string("confidence_level") {
            settings.confidence_level = val.parse().map_err(|e| ApplicationError::Config {
                message: format!("TPACALC_CONFIDENCE_LEVEL '{}': {}", val, e),
            })?;
        }
        if let Ok(val) = config.get_string("projection.source") {
            settings.projection.source = val;
        }
        if let Ok(val) = config.get_string("projection.target") {
            settings.projection.target = val;
        }
        if let Ok(val) = config.get_string("projection.multi_feature_policy") {
            settings.projection.multi_feature_policy = match val.to_lowercase().as_str() {
                "first" => MultiFeaturePolicy::First,
                "reject" => MultiFeaturePolicy::Reject,
                other => {
                    return Err(ApplicationError::Config {
                        message: format!("unknown multi_feature_policy '{}'", other),
                    })
                }
            };
        }

        Ok(settings)
    }

    fn validate(&self) -> Result<(), ApplicationError> {
        self.confidence()?;
        for (name, url) in [
            ("storage_api_url", &self.storage_api_url),
            ("db_api_url", &self.db_api_url),
        ] {
            if url.trim().is_empty() {
                return Err(ApplicationError::Config {
                    message: format!("{} must not be empty", name),
                });
            }
        }
        Ok(())
    }

    /// Configured default confidence level.
    pub fn confidence(&self) -> Result<ConfidenceLevel, ApplicationError> {
        ConfidenceLevel::new(self.confidence_level).map_err(|e| ApplicationError::Config {
            message: e.to_string(),
        })
    }

    /// Build a geometry measurer for the configured CRS pair.
    pub fn measurer(&self) -> Result<GeometryMeasurer, ApplicationError> {
        let projection = Projection::new(&self.projection.source, &self.projection.target)
            .map_err(|e| ApplicationError::Config {
                message: e.to_string(),
            })?;
        Ok(GeometryMeasurer::new(
            projection,
            self.projection.multi_feature_policy,
        ))
    }

    /// Effective settings as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: e.to_string(),
        })
    }
}
