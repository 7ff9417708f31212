//! Random forest trainer
//!
//! Bags CART regression trees over bootstrap samples. Trees are built in
//! parallel on the rayon pool; each tree draws its bootstrap sample from an
//! RNG seeded with `derive_seed(seed, tree_index)` and the results are
//! collected in tree order, so the forest does not depend on scheduling.

use cropsim_core::{Forest, Tree};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::cart::{CartBuilder, TreeConfig};
use crate::deterministic::{bootstrap_indices, derive_seed, seeded_rng};
use crate::errors::TrainerError;

/// Random forest training configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestConfig {
    pub n_estimators: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Sample rows with replacement for each tree
    pub bootstrap: bool,
    pub seed: u64,
    /// Worker threads for tree construction (None = rayon's global pool)
    pub n_jobs: Option<usize>,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_estimators: 30,
            max_depth: 8,
            min_samples_split: 2,
            min_samples_leaf: 1,
            bootstrap: true,
            seed: 42,
            n_jobs: None,
        }
    }
}

impl ForestConfig {
    pub fn validate(&self) -> Result<(), TrainerError> {
        if self.n_estimators == 0 {
            return Err(TrainerError::InvalidConfig(
                "n_estimators must be at least 1".to_string(),
            ));
        }
        if self.min_samples_split < 2 {
            return Err(TrainerError::InvalidConfig(
                "min_samples_split must be at least 2".to_string(),
            ));
        }
        if self.min_samples_leaf == 0 {
            return Err(TrainerError::InvalidConfig(
                "min_samples_leaf must be at least 1".to_string(),
            ));
        }
        if self.n_jobs == Some(0) {
            return Err(TrainerError::InvalidConfig(
                "n_jobs must be at least 1 when set".to_string(),
            ));
        }
        Ok(())
    }

    fn tree_config(&self) -> TreeConfig {
        TreeConfig {
            max_depth: self.max_depth,
            min_samples_split: self.min_samples_split,
            min_samples_leaf: self.min_samples_leaf,
        }
    }
}

/// Random forest trainer
pub struct ForestTrainer {
    config: ForestConfig,
}

impl ForestTrainer {
    pub fn new(config: ForestConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ForestConfig {
        &self.config
    }

    /// Train a forest on an encoded feature matrix
    pub fn train(&self, features: &[Vec<f64>], targets: &[f64]) -> Result<Forest, TrainerError> {
        self.config.validate()?;
        let feature_count = check_matrix(features, targets)?;

        tracing::debug!(
            "Training {} trees on {} samples x {} features",
            self.config.n_estimators,
            features.len(),
            feature_count
        );

        let build_all = || -> Vec<Tree> {
            (0..self.config.n_estimators)
                .into_par_iter()
                .map(|tree_idx| self.build_tree(tree_idx, features, targets))
                .collect()
        };

        let trees = match self.config.n_jobs {
            Some(threads) => rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build()
                .map_err(|e| TrainerError::Training(format!("thread pool: {e}")))?
                .install(build_all),
            None => build_all(),
        };

        let forest = Forest::new(trees, feature_count);
        forest.validate()?;
        Ok(forest)
    }

    fn build_tree(&self, tree_idx: usize, features: &[Vec<f64>], targets: &[f64]) -> Tree {
        let n = features.len();
        let indices = if self.config.bootstrap {
            let mut rng = seeded_rng(derive_seed(self.config.seed, tree_idx as u64));
            bootstrap_indices(n, &mut rng)
        } else {
            (0..n).collect()
        };

        let tree = CartBuilder::new(features, targets, self.config.tree_config()).build(&indices);
        tracing::trace!(
            "Tree {}: {} nodes, depth {}",
            tree_idx,
            tree.nodes.len(),
            tree.depth()
        );
        tree
    }
}

/// Check shape and finiteness, returning the feature count
fn check_matrix(features: &[Vec<f64>], targets: &[f64]) -> Result<usize, TrainerError> {
    if features.is_empty() {
        return Err(TrainerError::InsufficientData(
            "no training rows".to_string(),
        ));
    }
    if features.len() != targets.len() {
        return Err(TrainerError::Training(format!(
            "{} feature rows but {} targets",
            features.len(),
            targets.len()
        )));
    }

    let feature_count = features[0].len();
    for (i, row) in features.iter().enumerate() {
        if row.len() != feature_count {
            return Err(TrainerError::Training(format!(
                "row {} has {} features, expected {}",
                i,
                row.len(),
                feature_count
            )));
        }
        if row.iter().any(|v| !v.is_finite()) {
            return Err(TrainerError::Training(format!("row {i} has a non-finite feature")));
        }
    }
    if let Some(i) = targets.iter().position(|t| !t.is_finite()) {
        return Err(TrainerError::Training(format!("target {i} is not finite")));
    }

    Ok(feature_count)
}
