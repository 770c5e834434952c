//! Depth-capped binary classification tree.
//!
//! Nodes live in a flat array; internal nodes index their children. The split
//! search scans features in a fixed order and keeps the first strictly-best
//! Gini split, so fitting the same data always rebuilds the same tree.

use crate::error::CoreError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeConfig {
    /// Depth cap; keeps sparse label combinations from being memorized.
    pub max_depth: usize,
    pub min_samples_split: usize,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            max_depth: 4,
            min_samples_split: 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum TreeNode {
    Internal {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        on: bool,
        on_count: usize,
        total: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    nodes: Vec<TreeNode>,
    n_features: usize,
}

impl DecisionTree {
    pub fn fit(
        samples: &[Vec<f64>],
        labels: &[bool],
        config: &TreeConfig,
    ) -> Result<Self, CoreError> {
        if samples.is_empty() {
            return Err(CoreError::invalid_input(
                "training_set",
                "cannot fit tree on an empty set",
            ));
        }
        if samples.len() != labels.len() {
            return Err(CoreError::invalid_input(
                "training_set",
                format!("{} samples but {} labels", samples.len(), labels.len()),
            ));
        }
        let n_features = samples[0].len();
        if n_features == 0 || samples.iter().any(|s| s.len() != n_features) {
            return Err(CoreError::invalid_input(
                "training_set",
                "inconsistent or empty sample rows",
            ));
        }

        let mut tree = Self {
            nodes: Vec::new(),
            n_features,
        };
        let indices: Vec<usize> = (0..samples.len()).collect();
        tree.build(samples, labels, &indices, 0, config);
        Ok(tree)
    }

    /// Builds the subtree for `indices`, returning its node index.
    fn build(
        &mut self,
        samples: &[Vec<f64>],
        labels: &[bool],
        indices: &[usize],
        depth: usize,
        config: &TreeConfig,
    ) -> usize {
        let on_count = indices.iter().filter(|&&i| labels[i]).count();
        let total = indices.len();

        let is_pure = on_count == 0 || on_count == total;
        if depth >= config.max_depth || total < config.min_samples_split || is_pure {
            return self.push_leaf(on_count, total);
        }

        let Some((feature, threshold)) = best_split(samples, labels, indices, self.n_features)
        else {
            return self.push_leaf(on_count, total);
        };

        let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .copied()
            .partition(|&i| samples[i][feature] <= threshold);

        // Reserve this node's slot, then attach the children built after it.
        let node_index = self.nodes.len();
        self.nodes.push(TreeNode::Leaf {
            on: false,
            on_count,
            total,
        });
        let left = self.build(samples, labels, &left_idx, depth + 1, config);
        let right = self.build(samples, labels, &right_idx, depth + 1, config);
        self.nodes[node_index] = TreeNode::Internal {
            feature,
            threshold,
            left,
            right,
        };
        node_index
    }

    fn push_leaf(&mut self, on_count: usize, total: usize) -> usize {
        // Majority vote; ties predict OFF.
        self.nodes.push(TreeNode::Leaf {
            on: on_count * 2 > total,
            on_count,
            total,
        });
        self.nodes.len() - 1
    }

    pub fn predict(&self, x: &[f64]) -> Result<bool, CoreError> {
        if x.len() != self.n_features {
            return Err(CoreError::invalid_input(
                "features",
                format!("expected {} values, got {}", self.n_features, x.len()),
            ));
        }

        let mut index = 0usize;
        loop {
            match self.nodes[index] {
                TreeNode::Leaf { on, .. } => return Ok(on),
                TreeNode::Internal {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    index = if x[feature] <= threshold { left } else { right };
                }
            }
        }
    }

    pub fn depth(&self) -> usize {
        fn node_depth(nodes: &[TreeNode], index: usize) -> usize {
            match nodes[index] {
                TreeNode::Leaf { .. } => 0,
                TreeNode::Internal { left, right, .. } => {
                    1 + node_depth(nodes, left).max(node_depth(nodes, right))
                }
            }
        }
        node_depth(&self.nodes, 0)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

fn gini(on: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let p_on = on as f64 / total as f64;
    let p_off = 1.0 - p_on;
    1.0 - p_on * p_on - p_off * p_off
}

/// Finds the (feature, threshold) with the lowest weighted Gini impurity.
/// Features are scanned in order and candidate thresholds are midpoints of
/// consecutive distinct values; the first strictly-better split wins ties.
fn best_split(
    samples: &[Vec<f64>],
    labels: &[bool],
    indices: &[usize],
    n_features: usize,
) -> Option<(usize, f64)> {
    let total = indices.len();
    let parent_on = indices.iter().filter(|&&i| labels[i]).count();
    let parent_impurity = gini(parent_on, total);

    let mut best: Option<(usize, f64)> = None;
    let mut best_impurity = parent_impurity;

    for feature in 0..n_features {
        let mut ordered: Vec<(f64, bool)> = indices
            .iter()
            .map(|&i| (samples[i][feature], labels[i]))
            .collect();
        ordered.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

        let mut left_on = 0usize;
        let mut left_total = 0usize;
        for window in 0..total - 1 {
            let (value, label) = ordered[window];
            if label {
                left_on += 1;
            }
            left_total += 1;

            let next_value = ordered[window + 1].0;
            if next_value <= value {
                continue;
            }

            let right_total = total - left_total;
            let right_on = parent_on - left_on;
            let weighted = (left_total as f64 * gini(left_on, left_total)
                + right_total as f64 * gini(right_on, right_total))
                / total as f64;

            if weighted + 1e-12 < best_impurity {
                best_impurity = weighted;
                best = Some((feature, (value + next_value) / 2.0));
            }
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn threshold_data() -> (Vec<Vec<f64>>, Vec<bool>) {
        // Label is true iff feature 1 > 5.
        let samples: Vec<Vec<f64>> = (0..20)
            .map(|i| vec![f64::from(i % 3), f64::from(i % 10)])
            .collect();
        let labels = samples.iter().map(|s| s[1] > 5.0).collect();
        (samples, labels)
    }

    #[test]
    fn learns_a_simple_threshold() {
        let (samples, labels) = threshold_data();
        let tree = DecisionTree::fit(&samples, &labels, &TreeConfig::default()).expect("fit");

        assert!(!tree.predict(&[0.0, 2.0]).expect("predict"));
        assert!(tree.predict(&[0.0, 8.0]).expect("predict"));
    }

    #[test]
    fn respects_the_depth_cap() {
        let samples: Vec<Vec<f64>> = (0..64).map(|i| vec![f64::from(i)]).collect();
        // Alternating labels are unlearnable; the tree must still stop at the cap.
        let labels: Vec<bool> = (0..64).map(|i| i % 2 == 0).collect();
        let config = TreeConfig {
            max_depth: 4,
            min_samples_split: 2,
        };
        let tree = DecisionTree::fit(&samples, &labels, &config).expect("fit");
        assert!(tree.depth() <= 4);
    }

    #[test]
    fn pure_sets_become_single_leaves() {
        let samples = vec![vec![1.0], vec![2.0], vec![3.0]];
        let labels = vec![true, true, true];
        let tree = DecisionTree::fit(&samples, &labels, &TreeConfig::default()).expect("fit");
        assert_eq!(tree.node_count(), 1);
        assert!(tree.predict(&[9.0]).expect("predict"));
    }

    #[test]
    fn fitting_is_deterministic() {
        let (samples, labels) = threshold_data();
        let config = TreeConfig::default();
        let first = DecisionTree::fit(&samples, &labels, &config).expect("fit");
        let second = DecisionTree::fit(&samples, &labels, &config).expect("fit");
        assert_eq!(first, second);
    }

    #[test]
    fn identical_samples_with_mixed_labels_fall_back_to_majority() {
        let samples = vec![vec![1.0]; 5];
        let labels = vec![true, true, true, false, false];
        let tree = DecisionTree::fit(&samples, &labels, &TreeConfig::default()).expect("fit");
        assert_eq!(tree.node_count(), 1);
        assert!(tree.predict(&[1.0]).expect("predict"));
    }

    #[test]
    fn wrong_arity_is_rejected() {
        let (samples, labels) = threshold_data();
        let tree = DecisionTree::fit(&samples, &labels, &TreeConfig::default()).expect("fit");
        let err = tree.predict(&[1.0]).unwrap_err();
        assert!(matches!(err, CoreError::InvalidInput { .. }));
    }
}
