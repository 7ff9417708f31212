//! Cropsim trainer - dataset loading and deterministic random forest fitting
//!
//! Loads the historical crop dataset, learns the categorical encoding
//! tables, and fits a bagged CART regressor with reproducible seeds.

pub mod cart;
pub mod dataset;
pub mod deterministic;
pub mod errors;
pub mod forest;
pub mod metrics;
pub mod model;

use cropsim_core::{EncodingTables, FeatureEncoder, FeatureRow};
use std::path::Path;

pub use cart::{CartBuilder, TreeConfig};
pub use dataset::{ColumnStats, Dataset, DatasetConfig, DatasetSummary, REQUIRED_COLUMNS};
pub use deterministic::{derive_seed, train_test_split, SplitTieBreaker, TrainTestSplit};
pub use errors::{DatasetError, TrainerError};
pub use forest::{ForestConfig, ForestTrainer};
pub use metrics::FitMetrics;
pub use model::{ModelConfig, YieldModel};

/// Everything produced by one fit over a dataset
#[derive(Debug, Clone)]
pub struct TrainingRun {
    pub tables: EncodingTables,
    /// Encoded rows of the full dataset, in dataset order
    pub features: Vec<FeatureRow>,
    pub targets: Vec<f64>,
    pub model: YieldModel,
    pub metrics: FitMetrics,
}

/// Encode the dataset and fit a yield model on it
pub fn train_from_dataset(dataset: &Dataset, config: &ModelConfig) -> Result<TrainingRun, TrainerError> {
    let tables = FeatureEncoder::fit(dataset.records());
    let features = tables.encode_records(dataset.records())?;
    let targets = dataset.targets();

    let mut model = YieldModel::new(config.clone());
    let metrics = model.fit(&features, &targets)?;

    Ok(TrainingRun {
        tables,
        features,
        targets,
        model,
        metrics,
    })
}

/// Load a CSV file and train on it with default sampling
pub fn train_from_csv(path: &Path, config: &ModelConfig) -> Result<TrainingRun, TrainerError> {
    let dataset = Dataset::from_csv(path, &DatasetConfig::default())?;
    train_from_dataset(&dataset, config)
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
