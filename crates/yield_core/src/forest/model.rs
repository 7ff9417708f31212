//! Random forest regressor (inference side)
//!
//! The forest's prediction is the plain mean of its trees' leaf values.
//! Models can be rendered to canonical JSON (sorted keys, no whitespace)
//! and fingerprinted with blake3, which is how repeated fits are checked
//! for bit-identical output.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::tree::Tree;

/// Forest errors
#[derive(Error, Debug)]
pub enum ForestError {
    #[error("Forest has no trees")]
    Empty,

    #[error("Expected {expected} features, got {actual}")]
    FeatureCount { expected: usize, actual: usize },

    #[error("Tree {0} could not evaluate the row")]
    BrokenTree(usize),

    #[error("Forest validation failed: {0}")]
    ValidationFailed(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Bagged ensemble of regression trees
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Forest {
    /// Model format version
    pub version: u32,

    /// Expected feature-row length
    pub feature_count: usize,

    /// Trees in the ensemble
    pub trees: Vec<Tree>,
}

impl Forest {
    pub fn new(trees: Vec<Tree>, feature_count: usize) -> Self {
        Self {
            version: 1,
            feature_count,
            trees,
        }
    }

    pub fn len(&self) -> usize {
        self.trees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }

    /// Validate forest structure
    pub fn validate(&self) -> Result<(), ForestError> {
        if self.trees.is_empty() {
            return Err(ForestError::Empty);
        }

        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate(self.feature_count).map_err(|e| {
                ForestError::ValidationFailed(format!("Tree {} validation failed: {}", i, e))
            })?;
        }

        Ok(())
    }

    /// Predict a single feature row
    pub fn predict(&self, features: &[f64]) -> Result<f64, ForestError> {
        if self.trees.is_empty() {
            return Err(ForestError::Empty);
        }
        if features.len() != self.feature_count {
            return Err(ForestError::FeatureCount {
                expected: self.feature_count,
                actual: features.len(),
            });
        }

        let mut sum = 0.0;
        for (i, tree) in self.trees.iter().enumerate() {
            sum += tree.evaluate(features).ok_or(ForestError::BrokenTree(i))?;
        }

        Ok(sum / self.trees.len() as f64)
    }

    /// Predict many rows, preserving order
    pub fn predict_batch(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>, ForestError> {
        rows.iter().map(|row| self.predict(row)).collect()
    }

    /// Serialize to canonical JSON (sorted keys, no whitespace)
    pub fn to_canonical_json(&self) -> Result<String, ForestError> {
        // serde_json::Value objects are BTreeMap-backed, so keys come out sorted
        let value = serde_json::to_value(self)?;
        Ok(serde_json::to_string(&value)?)
    }

    /// Blake3 hash of the canonical JSON, hex encoded
    pub fn hash_hex(&self) -> Result<String, ForestError> {
        let json = self.to_canonical_json()?;
        Ok(hex::encode(blake3::hash(json.as_bytes()).as_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forest::Node;

    fn two_tree_forest() -> Forest {
        let tree1 = Tree::new(vec![
            Node::internal(0, 0, 50.0, 1, 2),
            Node::leaf(1, 2.0),
            Node::leaf(2, 6.0),
        ]);
        let tree2 = Tree::new(vec![
            Node::internal(0, 1, 30.0, 1, 2),
            Node::leaf(1, 4.0),
            Node::leaf(2, 8.0),
        ]);
        Forest::new(vec![tree1, tree2], 2)
    }

    #[test]
    fn test_prediction_is_tree_mean() {
        let forest = two_tree_forest();

        // Tree1 left (2.0), tree2 left (4.0)
        assert_eq!(forest.predict(&[30.0, 20.0]).unwrap(), 3.0);
        // Tree1 right (6.0), tree2 right (8.0)
        assert_eq!(forest.predict(&[60.0, 40.0]).unwrap(), 7.0);
        // Mixed
        assert_eq!(forest.predict(&[60.0, 10.0]).unwrap(), 5.0);
    }

    #[test]
    fn test_feature_count_mismatch() {
        let forest = two_tree_forest();
        assert!(matches!(
            forest.predict(&[1.0]),
            Err(ForestError::FeatureCount { expected: 2, actual: 1 })
        ));
    }

    #[test]
    fn test_empty_forest() {
        let forest = Forest::new(Vec::new(), 2);
        assert!(matches!(forest.predict(&[1.0, 2.0]), Err(ForestError::Empty)));
        assert!(forest.validate().is_err());
    }

    #[test]
    fn test_batch_preserves_order() {
        let forest = two_tree_forest();
        let rows = vec![vec![60.0, 40.0], vec![30.0, 20.0]];
        assert_eq!(forest.predict_batch(&rows).unwrap(), vec![7.0, 3.0]);
    }

    #[test]
    fn test_hash_stability() {
        let a = two_tree_forest();
        let b = two_tree_forest();

        let hash = a.hash_hex().unwrap();
        assert_eq!(hash, b.hash_hex().unwrap());
        assert_eq!(hash, a.hash_hex().unwrap());
        assert_eq!(hash.len(), 64);

        let mut c = two_tree_forest();
        c.trees[0].nodes[1].leaf = Some(2.5);
        assert_ne!(hash, c.hash_hex().unwrap());
    }

    #[test]
    fn test_canonical_json_roundtrip() {
        let original = two_tree_forest();
        let json = original.to_canonical_json().unwrap();
        assert!(json.starts_with("{\"feature_count\""));

        let restored: Forest = serde_json::from_str(&json).unwrap();
        assert_eq!(original, restored);
    }
}
