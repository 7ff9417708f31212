//! Service configuration
//!
//! Layered as: defaults, then an optional TOML file, then `CROPSIM_*`
//! environment variables, then CLI flags (applied by the binary).

use cropsim_core::{EconomicAnalyzer, UnknownCropPolicy, DEFAULT_CROP};
use cropsim_trainer::{DatasetConfig, ModelConfig};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::ConfigError;

pub const ENV_DATASET: &str = "CROPSIM_DATASET";
pub const ENV_MAX_RECORDS: &str = "CROPSIM_MAX_RECORDS";
pub const ENV_LOG_LEVEL: &str = "CROPSIM_LOG_LEVEL";

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub dataset: DatasetConfig,
    pub model: ModelConfig,
    pub economics: EconomicsConfig,
    pub logging: LoggingConfig,
}

/// Economic analyzer settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EconomicsConfig {
    pub unknown_crop: UnknownCropPolicy,
    /// Crop whose table prices unknown crops under `fallback`
    pub default_crop: String,
}

impl Default for EconomicsConfig {
    fn default() -> Self {
        Self {
            unknown_crop: UnknownCropPolicy::Reject,
            default_crop: DEFAULT_CROP.to_string(),
        }
    }
}

impl EconomicsConfig {
    pub fn analyzer(&self) -> EconomicAnalyzer {
        EconomicAnalyzer::new(self.unknown_crop).with_default_crop(self.default_crop.clone())
    }
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing` filter directive used when `RUST_LOG` is unset
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl ServiceConfig {
    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Apply `CROPSIM_*` overrides from the process environment
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|var| env::var(var).ok())
    }

    /// Apply overrides from any variable source
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup(ENV_DATASET) {
            self.dataset.path = PathBuf::from(path);
        }

        if let Some(value) = lookup(ENV_MAX_RECORDS) {
            self.dataset.max_records = match value.trim() {
                "" | "none" | "all" => None,
                n => Some(n.parse().map_err(|_| ConfigError::InvalidEnv {
                    var: ENV_MAX_RECORDS,
                    value: value.clone(),
                })?),
            };
        }

        if let Some(level) = lookup(ENV_LOG_LEVEL) {
            self.logging.level = level;
        }

        Ok(())
    }

    /// Check for settings that will fail or misbehave at fit time
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        let forest = &self.model.forest;

        if forest.n_estimators == 0 {
            warnings.push("n_estimators is 0, the model cannot be fit".to_string());
        }

        if forest.max_depth == 0 {
            warnings.push("max_depth is 0, every tree will be a single leaf".to_string());
        }

        if forest.min_samples_split < 2 {
            warnings.push("min_samples_split should be at least 2".to_string());
        }

        if forest.n_jobs == Some(0) {
            warnings.push("n_jobs is 0, use at least 1 or leave unset".to_string());
        }

        let fraction = self.model.test_fraction;
        if !(fraction > 0.0 && fraction < 1.0) {
            warnings.push(format!("test_fraction {fraction} should be between 0 and 1"));
        }

        if self.dataset.max_records == Some(0) {
            warnings.push("max_records is 0, no rows will be loaded".to_string());
        }

        if self.economics.unknown_crop == UnknownCropPolicy::Fallback
            && !self
                .economics
                .analyzer()
                .known_crops()
                .any(|crop| crop == self.economics.default_crop)
        {
            warnings.push(format!(
                "default_crop {:?} has no cost table, fallback will be rejected",
                self.economics.default_crop
            ));
        }

        warnings
    }
}
