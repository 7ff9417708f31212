//! CART (Classification and Regression Tree) builder
//!
//! Exact-greedy regression tree construction with the squared-error
//! criterion. Every feature is scanned at every node; candidate thresholds
//! are midpoints between consecutive distinct values.

use cropsim_core::{Node, Tree};

use crate::deterministic::SplitTieBreaker;

/// Growth limits for a single tree
#[derive(Clone, Debug)]
pub struct TreeConfig {
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            max_depth: 8,
            min_samples_split: 2,
            min_samples_leaf: 1,
        }
    }
}

/// Split candidate with gain and tie-breaker
#[derive(Debug, Clone)]
struct SplitCandidate {
    feature_idx: usize,
    threshold: f64,
    gain: f64,
    tie_breaker: SplitTieBreaker,
}

impl SplitCandidate {
    fn new(feature_idx: usize, threshold: f64, gain: f64) -> Self {
        Self {
            feature_idx,
            threshold,
            gain,
            tie_breaker: SplitTieBreaker::new(feature_idx, threshold),
        }
    }

    fn beats(&self, current: &SplitCandidate) -> bool {
        self.gain > current.gain
            || (self.gain == current.gain && self.tie_breaker.precedes(&current.tie_breaker))
    }
}

/// Builds regression trees over a borrowed feature matrix
///
/// Sample index lists may contain repeats (bootstrap draws); a repeated
/// index counts once per occurrence.
pub struct CartBuilder<'a> {
    config: TreeConfig,
    features: &'a [Vec<f64>],
    targets: &'a [f64],
    feature_count: usize,
}

impl<'a> CartBuilder<'a> {
    pub fn new(features: &'a [Vec<f64>], targets: &'a [f64], config: TreeConfig) -> Self {
        assert_eq!(features.len(), targets.len());

        let feature_count = features.first().map_or(0, Vec::len);

        Self {
            config,
            features,
            targets,
            feature_count,
        }
    }

    /// Build a tree over the given sample indices
    pub fn build(&self, sample_indices: &[usize]) -> Tree {
        let mut nodes = Vec::new();
        self.build_node(sample_indices.to_vec(), 0, &mut nodes);
        Tree::new(nodes)
    }

    /// Recursively build tree nodes, returning the index of the new node
    fn build_node(&self, indices: Vec<usize>, depth: usize, nodes: &mut Vec<Node>) -> i32 {
        let current_idx = nodes.len() as i32;
        let samples = indices.len() as u32;
        let leaf = Node::leaf(current_idx, self.mean_target(&indices)).with_samples(samples);

        // Check stopping conditions
        if depth >= self.config.max_depth
            || indices.len() < self.config.min_samples_split
            || indices.len() < 2 * self.config.min_samples_leaf
            || self.is_pure(&indices)
        {
            nodes.push(leaf);
            return current_idx;
        }

        let split = match self.find_best_split(&indices) {
            Some(s) => s,
            None => {
                nodes.push(leaf);
                return current_idx;
            }
        };

        let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .partition(|&&idx| self.features[idx][split.feature_idx] <= split.threshold);

        // Reserve space for current node
        nodes.push(
            Node::internal(current_idx, split.feature_idx as i32, split.threshold, -1, -1)
                .with_samples(samples),
        );

        let left_idx = self.build_node(left_indices, depth + 1, nodes);
        let right_idx = self.build_node(right_indices, depth + 1, nodes);

        let node = &mut nodes[current_idx as usize];
        node.left = left_idx;
        node.right = right_idx;

        current_idx
    }

    /// Find the split with the largest reduction in squared error
    ///
    /// Maximizes `S_l²/n_l + S_r²/n_r - S²/n`, which equals the drop in
    /// total squared error around the node means.
    fn find_best_split(&self, indices: &[usize]) -> Option<SplitCandidate> {
        let n = indices.len();
        let total_sum: f64 = indices.iter().map(|&i| self.targets[i]).sum();
        let parent_score = total_sum * total_sum / n as f64;
        let min_leaf = self.config.min_samples_leaf.max(1);

        let mut best_split: Option<SplitCandidate> = None;
        let mut column: Vec<(f64, f64)> = Vec::with_capacity(n);

        for feature_idx in 0..self.feature_count {
            column.clear();
            column.extend(
                indices
                    .iter()
                    .map(|&i| (self.features[i][feature_idx], self.targets[i])),
            );
            column.sort_by(|a, b| a.0.total_cmp(&b.0));

            let mut left_sum = 0.0;
            for i in 1..n {
                left_sum += column[i - 1].1;

                let (lo, hi) = (column[i - 1].0, column[i].0);
                if lo == hi || i < min_leaf || n - i < min_leaf {
                    continue;
                }

                let right_sum = total_sum - left_sum;
                let score = left_sum * left_sum / i as f64
                    + right_sum * right_sum / (n - i) as f64;
                let gain = score - parent_score;
                if gain <= 0.0 {
                    continue;
                }

                let candidate = SplitCandidate::new(feature_idx, midpoint(lo, hi), gain);
                best_split = match best_split {
                    Some(current) if !candidate.beats(&current) => Some(current),
                    _ => Some(candidate),
                };
            }
        }

        best_split
    }

    fn mean_target(&self, indices: &[usize]) -> f64 {
        if indices.is_empty() {
            return 0.0;
        }
        indices.iter().map(|&i| self.targets[i]).sum::<f64>() / indices.len() as f64
    }

    /// All targets identical, nothing left to explain
    fn is_pure(&self, indices: &[usize]) -> bool {
        let first = match indices.first() {
            Some(&i) => self.targets[i],
            None => return true,
        };
        indices.iter().all(|&i| self.targets[i] == first)
    }
}

/// Threshold between two consecutive distinct values
///
/// Falls back to the lower value when the midpoint rounds up to the upper
/// one, so the lower value always goes left.
fn midpoint(lo: f64, hi: f64) -> f64 {
    let mid = lo + (hi - lo) / 2.0;
    if mid >= hi {
        lo
    } else {
        mid
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step_data() -> (Vec<Vec<f64>>, Vec<f64>) {
        // Target depends only on feature 1
        let features = vec![
            vec![5.0, 1.0],
            vec![3.0, 2.0],
            vec![4.0, 3.0],
            vec![1.0, 10.0],
            vec![2.0, 11.0],
            vec![6.0, 12.0],
        ];
        let targets = vec![1.0, 1.0, 1.0, 5.0, 5.0, 5.0];
        (features, targets)
    }

    fn all(n: usize) -> Vec<usize> {
        (0..n).collect()
    }

    #[test]
    fn test_finds_informative_split() {
        let (features, targets) = step_data();
        let tree = CartBuilder::new(&features, &targets, TreeConfig::default()).build(&all(6));

        let root = &tree.nodes[0];
        assert_eq!(root.feature_idx, 1);
        assert_eq!(root.threshold, 6.5);
        assert_eq!(root.samples, 6);
        assert_eq!(tree.nodes.len(), 3);
        assert_eq!(tree.evaluate(&[0.0, 2.5]), Some(1.0));
        assert_eq!(tree.evaluate(&[0.0, 11.5]), Some(5.0));
        assert!(tree.validate(2).is_ok());
    }

    #[test]
    fn test_leaf_only_tree() {
        let features = vec![vec![100.0]];
        let targets = vec![3.5];
        let tree = CartBuilder::new(&features, &targets, TreeConfig::default()).build(&[0]);

        assert_eq!(tree.nodes.len(), 1);
        assert_eq!(tree.nodes[0].leaf, Some(3.5));
    }

    #[test]
    fn test_constant_feature_gives_leaf() {
        let features = vec![vec![1.0], vec![1.0], vec![1.0]];
        let targets = vec![1.0, 2.0, 3.0];
        let tree = CartBuilder::new(&features, &targets, TreeConfig::default()).build(&all(3));

        assert_eq!(tree.nodes.len(), 1);
        assert_eq!(tree.nodes[0].leaf, Some(2.0));
    }

    #[test]
    fn test_max_depth_is_respected() {
        let features: Vec<Vec<f64>> = (0..64).map(|i| vec![i as f64]).collect();
        let targets: Vec<f64> = (0..64).map(|i| i as f64).collect();
        let config = TreeConfig {
            max_depth: 3,
            ..TreeConfig::default()
        };
        let tree = CartBuilder::new(&features, &targets, config).build(&all(64));

        assert_eq!(tree.depth(), 3);
        assert_eq!(tree.leaf_count(), 8);
    }

    #[test]
    fn test_min_samples_leaf() {
        let (features, targets) = step_data();
        let config = TreeConfig {
            max_depth: 8,
            min_samples_split: 2,
            min_samples_leaf: 3,
        };
        let tree = CartBuilder::new(&features, &targets, config).build(&all(6));

        for node in tree.nodes.iter().filter(|n| n.is_leaf()) {
            assert!(node.samples >= 3);
        }
    }

    #[test]
    fn test_repeated_indices_weight_samples() {
        let features = vec![vec![0.0], vec![1.0]];
        let targets = vec![0.0, 4.0];
        let config = TreeConfig {
            max_depth: 0,
            ..TreeConfig::default()
        };
        let tree = CartBuilder::new(&features, &targets, config).build(&[0, 1, 1, 1]);

        assert_eq!(tree.nodes[0].leaf, Some(3.0));
        assert_eq!(tree.nodes[0].samples, 4);
    }

    #[test]
    fn test_equal_gain_prefers_lowest_feature() {
        // Both features separate the targets identically
        let features = vec![vec![0.0, 0.0], vec![1.0, 1.0]];
        let targets = vec![0.0, 1.0];
        let tree = CartBuilder::new(&features, &targets, TreeConfig::default()).build(&all(2));

        assert_eq!(tree.nodes[0].feature_idx, 0);
        assert_eq!(tree.nodes[0].threshold, 0.5);
    }

    #[test]
    fn test_midpoint_rounding() {
        assert_eq!(midpoint(1.0, 2.0), 1.5);
        let lo: f64 = 1.0;
        let hi = f64::from_bits(lo.to_bits() + 1);
        assert_eq!(midpoint(lo, hi), lo);
    }
}
