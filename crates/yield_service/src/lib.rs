//! Cropsim service layer
//!
//! Wraps a fitted yield model behind a fit-once/infer-many service, ranks
//! estimates against the historical population and builds the simulation
//! report shown by the `cropsim` CLI.

pub mod config;
pub mod errors;
pub mod report;
pub mod service;
pub mod session;

pub use config::{EconomicsConfig, LoggingConfig, ServiceConfig};
pub use errors::{ConfigError, InferenceError, ServiceError};
pub use report::{CropComparison, SimulationReport, StatusBand};
pub use service::{
    percentile_rank, FittedModel, InferenceResponse, InferenceService, PredictionResult,
};
pub use session::Session;

/// Service version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
