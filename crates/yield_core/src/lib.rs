//! Core types for crop yield simulation
//!
//! Provides the pieces shared by training and serving:
//!
//! Modules:
//! - `features`: Records, scenarios and the fixed feature-row layout
//! - `encoder`: Categorical encoding tables learned at fit time
//! - `forest`: Regression tree and random forest inference
//! - `economics`: Per-crop cost/price tables and the economic report
//! - `errors`: Error types for encoding and economics

pub mod economics;
pub mod encoder;
pub mod errors;
pub mod features;
pub mod forest;

pub use economics::{
    CropEconomics, EconomicAnalyzer, EconomicReport, MarginBand, RoiBand, UnknownCropPolicy,
    DEFAULT_CROP,
};
pub use encoder::{Attribute, EncodingTable, EncodingTables, FeatureEncoder};
pub use errors::{EconomicsError, EncodingError};
pub use features::{
    FeatureRow, Record, Scenario, FEATURE_COUNT, FEATURE_NAMES, TARGET_COLUMN,
};
pub use forest::{Forest, ForestError, Node, Tree};

/// Crate version string for reports
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
