use cropsim_core::{EncodingError, ForestError};
use thiserror::Error;

/// Errors returned while reading the historical dataset.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("failed to open dataset {path}: {source}")]
    Open {
        path: String,
        source: std::io::Error,
    },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("dataset is missing required column {0:?}")]
    MissingColumn(&'static str),

    #[error("line {line}: invalid {column} value {value:?}")]
    InvalidValue {
        line: u64,
        column: &'static str,
        value: String,
    },

    #[error("dataset has no complete records")]
    Empty,
}

/// Errors returned by the deterministic trainer.
#[derive(Debug, Error)]
pub enum TrainerError {
    #[error("dataset error: {0}")]
    Dataset(#[from] DatasetError),

    #[error("invalid training configuration: {0}")]
    InvalidConfig(String),

    #[error("insufficient data: {0}")]
    InsufficientData(String),

    #[error("training error: {0}")]
    Training(String),

    #[error("model has not been fit")]
    NotFitted,

    #[error(transparent)]
    Encoding(#[from] EncodingError),

    #[error(transparent)]
    Forest(#[from] ForestError),
}
