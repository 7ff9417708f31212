//! Yield model: seeded 80/20 partition, forest fit and held-out evaluation

use cropsim_core::Forest;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::deterministic::{train_test_split, TrainTestSplit};
use crate::errors::TrainerError;
use crate::forest::{ForestConfig, ForestTrainer};
use crate::metrics::FitMetrics;

/// Yield model configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Share of rows held out for evaluation
    pub test_fraction: f64,
    /// Seed for the train/test partition
    pub split_seed: u64,
    pub forest: ForestConfig,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            test_fraction: 0.2,
            split_seed: 42,
            forest: ForestConfig::default(),
        }
    }
}

/// Random forest regressor with fit/predict lifecycle
#[derive(Clone, Debug)]
pub struct YieldModel {
    config: ModelConfig,
    forest: Option<Forest>,
}

impl YieldModel {
    pub fn new(config: ModelConfig) -> Self {
        Self {
            config,
            forest: None,
        }
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn is_fitted(&self) -> bool {
        self.forest.is_some()
    }

    pub fn forest(&self) -> Option<&Forest> {
        self.forest.as_ref()
    }

    /// Partition used by `fit` for `n` rows
    pub fn split(&self, n: usize) -> Result<TrainTestSplit, TrainerError> {
        train_test_split(n, self.config.test_fraction, self.config.split_seed)
    }

    /// Fit on the training partition and score the held-out partition
    ///
    /// Metrics are informational; a poor fit is logged but still accepted.
    /// On error the model keeps its previous state.
    pub fn fit(&mut self, features: &[Vec<f64>], targets: &[f64]) -> Result<FitMetrics, TrainerError> {
        if features.len() != targets.len() {
            return Err(TrainerError::Training(format!(
                "{} feature rows but {} targets",
                features.len(),
                targets.len()
            )));
        }

        let split = self.split(features.len())?;
        let (train_x, train_y) = gather(features, targets, &split.train);
        let (test_x, test_y) = gather(features, targets, &split.test);

        let forest = ForestTrainer::new(self.config.forest.clone()).train(&train_x, &train_y)?;
        let predicted = forest.predict_batch(&test_x)?;
        let metrics = FitMetrics::evaluate(&test_y, &predicted, train_x.len());

        info!(
            "Model trained: {} trees, {} train / {} test rows, MAE={:.4}, R²={:.4}",
            forest.len(),
            metrics.train_samples,
            metrics.test_samples,
            metrics.mean_absolute_error,
            metrics.r_squared
        );
        if metrics.r_squared < 0.0 {
            warn!(
                "Held-out R² is negative ({:.4}); predictions are worse than the mean",
                metrics.r_squared
            );
        }

        self.forest = Some(forest);
        Ok(metrics)
    }

    pub fn predict(&self, row: &[f64]) -> Result<f64, TrainerError> {
        let forest = self.forest.as_ref().ok_or(TrainerError::NotFitted)?;
        Ok(forest.predict(row)?)
    }

    pub fn predict_batch(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>, TrainerError> {
        let forest = self.forest.as_ref().ok_or(TrainerError::NotFitted)?;
        Ok(forest.predict_batch(rows)?)
    }

    pub fn into_forest(self) -> Option<Forest> {
        self.forest
    }
}

fn gather(features: &[Vec<f64>], targets: &[f64], indices: &[usize]) -> (Vec<Vec<f64>>, Vec<f64>) {
    indices
        .iter()
        .map(|&i| (features[i].clone(), targets[i]))
        .unzip()
}
