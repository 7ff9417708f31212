//! Service error types

use cropsim_core::{Attribute, EconomicsError, EncodingError};
use cropsim_trainer::{DatasetError, TrainerError};
use thiserror::Error;

/// Recoverable per-request failures, returned as values
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InferenceError {
    #[error("model is not ready; fit must succeed before inference")]
    ModelNotReady,

    #[error("unknown {attribute} value {value:?}")]
    UnknownCategory { attribute: Attribute, value: String },

    #[error("{0}")]
    Generic(String),
}

impl From<EncodingError> for InferenceError {
    fn from(err: EncodingError) -> Self {
        match err {
            EncodingError::UnknownCategory { attribute, value } => {
                InferenceError::UnknownCategory { attribute, value }
            }
            other => InferenceError::Generic(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for InferenceError {
    fn from(err: serde_json::Error) -> Self {
        InferenceError::Generic(format!("malformed request: {err}"))
    }
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value for {var}: {value:?}")]
    InvalidEnv { var: &'static str, value: String },
}

/// Session-level failures
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Dataset(#[from] DatasetError),

    #[error(transparent)]
    Trainer(#[from] TrainerError),

    #[error(transparent)]
    Inference(#[from] InferenceError),

    #[error(transparent)]
    Economics(#[from] EconomicsError),
}
