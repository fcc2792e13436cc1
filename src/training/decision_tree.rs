//! Decision tree classifier (CART, Gini impurity)

use super::{check_lengths, unique_labels, Classifier, Predictor};
use crate::error::{Result, TrainError};
use ndarray::{Array1, Array2, ArrayView1};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// Decision tree node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TreeNode {
    /// Leaf node predicting the majority class
    Leaf {
        value: f64,
        n_samples: usize,
    },
    /// Internal node; rows with `x[feature_idx] <= threshold` go left
    Split {
        feature_idx: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
        n_samples: usize,
        impurity: f64,
    },
}

impl TreeNode {
    fn predict_row(&self, row: ArrayView1<f64>) -> f64 {
        let mut node = self;
        loop {
            match node {
                TreeNode::Leaf { value, .. } => return *value,
                TreeNode::Split {
                    feature_idx,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    node = if row[*feature_idx] <= *threshold { left } else { right };
                }
            }
        }
    }

    /// Depth of the subtree rooted here; a single leaf has depth 0
    pub fn depth(&self) -> usize {
        match self {
            TreeNode::Leaf { .. } => 0,
            TreeNode::Split { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }
}

/// Best split found for a node
struct SplitCandidate {
    feature_idx: usize,
    threshold: f64,
    impurity: f64,
}

/// Decision tree classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTreeClassifier {
    /// Tree root
    root: Option<TreeNode>,
    /// Maximum depth (`None` = grow until pure)
    pub max_depth: Option<usize>,
    /// Minimum samples to split
    pub min_samples_split: usize,
    /// Minimum samples in leaf
    pub min_samples_leaf: usize,
    /// Number of features seen during fit
    n_features: usize,
    /// Sorted class labels seen during fit
    classes: Vec<f64>,
}

impl Default for DecisionTreeClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl DecisionTreeClassifier {
    pub fn new() -> Self {
        Self {
            root: None,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            n_features: 0,
            classes: Vec::new(),
        }
    }

    /// Set maximum depth
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Set minimum samples to split
    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples;
        self
    }

    /// Set minimum samples in leaf
    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples;
        self
    }

    pub fn classes(&self) -> &[f64] {
        &self.classes
    }

    pub fn root(&self) -> Option<&TreeNode> {
        self.root.as_ref()
    }

    /// Fit the tree to training data
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        check_lengths(x, y)?;
        if self.min_samples_split < 2 || self.min_samples_leaf < 1 {
            return Err(TrainError::InvalidParameter {
                name: "min_samples_split/min_samples_leaf".to_string(),
                value: format!("{}/{}", self.min_samples_split, self.min_samples_leaf),
                reason: "need min_samples_split >= 2 and min_samples_leaf >= 1".to_string(),
            });
        }

        self.classes = unique_labels(y.iter());
        self.n_features = x.ncols();

        // Encode labels as class indices once
        let encoded: Vec<usize> = y
            .iter()
            .map(|v| self.classes.partition_point(|c| c < v))
            .collect();

        let indices: Vec<usize> = (0..x.nrows()).collect();
        self.root = Some(self.build_tree(x, &encoded, &indices, 0));
        Ok(self)
    }

    fn class_counts(&self, labels: &[usize], indices: &[usize]) -> Vec<usize> {
        let mut counts = vec![0; self.classes.len()];
        for &i in indices {
            counts[labels[i]] += 1;
        }
        counts
    }

    fn build_tree(&self, x: &Array2<f64>, labels: &[usize], indices: &[usize], depth: usize) -> TreeNode {
        let n_samples = indices.len();
        let counts = self.class_counts(labels, indices);
        let impurity = gini(&counts, n_samples);

        let should_stop = n_samples < self.min_samples_split
            || n_samples < 2 * self.min_samples_leaf
            || self.max_depth.map_or(false, |d| depth >= d)
            || impurity == 0.0;

        let leaf = || TreeNode::Leaf {
            value: self.majority(&counts),
            n_samples,
        };
        if should_stop {
            return leaf();
        }

        let best = match self.best_split(x, labels, indices, impurity) {
            Some(split) => split,
            None => return leaf(),
        };

        let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .copied()
            .partition(|&i| x[[i, best.feature_idx]] <= best.threshold);
        if left_idx.is_empty() || right_idx.is_empty() {
            return leaf();
        }

        TreeNode::Split {
            feature_idx: best.feature_idx,
            threshold: best.threshold,
            left: Box::new(self.build_tree(x, labels, &left_idx, depth + 1)),
            right: Box::new(self.build_tree(x, labels, &right_idx, depth + 1)),
            n_samples,
            impurity: best.impurity,
        }
    }

    /// Exhaustive search over features and midpoints between distinct values
    fn best_split(
        &self,
        x: &Array2<f64>,
        labels: &[usize],
        indices: &[usize],
        parent_impurity: f64,
    ) -> Option<SplitCandidate> {
        let n = indices.len();
        let n_classes = self.classes.len();
        let mut best: Option<SplitCandidate> = None;

        for feature_idx in 0..self.n_features {
            let mut sorted: Vec<usize> = indices.to_vec();
            sorted.sort_by(|&a, &b| x[[a, feature_idx]].total_cmp(&x[[b, feature_idx]]));

            let mut left = vec![0usize; n_classes];
            let mut right = self.class_counts(labels, &sorted);

            for pos in 0..n - 1 {
                let row = sorted[pos];
                left[labels[row]] += 1;
                right[labels[row]] -= 1;

                let n_left = pos + 1;
                let n_right = n - n_left;
                let here = x[[row, feature_idx]];
                let next = x[[sorted[pos + 1], feature_idx]];
                if here == next || n_left < self.min_samples_leaf || n_right < self.min_samples_leaf {
                    continue;
                }

                let weighted = (n_left as f64 * gini(&left, n_left)
                    + n_right as f64 * gini(&right, n_right))
                    / n as f64;
                if weighted >= parent_impurity {
                    continue;
                }
                if best.as_ref().map_or(true, |b| weighted < b.impurity) {
                    // midpoint of adjacent floats can round up to `next`
                    let mut threshold = here + (next - here) / 2.0;
                    if threshold >= next {
                        threshold = here;
                    }
                    best = Some(SplitCandidate {
                        feature_idx,
                        threshold,
                        impurity: weighted,
                    });
                }
            }
        }

        best
    }

    fn majority(&self, counts: &[usize]) -> f64 {
        // ties go to the smaller label
        let (idx, _) = counts
            .iter()
            .enumerate()
            .fold((0, 0), |best, (i, &c)| if c > best.1 { (i, c) } else { best });
        self.classes[idx]
    }

    /// Predict class labels
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let root = self.root.as_ref().ok_or(TrainError::ModelNotFitted)?;
        if x.ncols() != self.n_features {
            return Err(TrainError::Shape {
                expected: format!("{} features", self.n_features),
                actual: format!("{} features", x.ncols()),
            });
        }
        Ok(x.rows().into_iter().map(|row| root.predict_row(row)).collect())
    }
}

fn gini(counts: &[usize], n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let n = n as f64;
    1.0 - counts.iter().map(|&c| (c as f64 / n).powi(2)).sum::<f64>()
}

impl Predictor for DecisionTreeClassifier {
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        DecisionTreeClassifier::predict(self, x)
    }
}

impl Classifier for DecisionTreeClassifier {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        DecisionTreeClassifier::fit(self, x, y).map(|_| ())
    }

    fn class_name(&self) -> &'static str {
        "DecisionTreeClassifier"
    }

    fn hyperparameters(&self) -> BTreeMap<String, Value> {
        let mut params = BTreeMap::new();
        params.insert("criterion".to_string(), json!("gini"));
        params.insert("max_depth".to_string(), json!(self.max_depth));
        params.insert("min_samples_leaf".to_string(), json!(self.min_samples_leaf));
        params.insert("min_samples_split".to_string(), json!(self.min_samples_split));
        params.insert("splitter".to_string(), json!("best"));
        params
    }

    fn is_fitted(&self) -> bool {
        self.root.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_fits_separable_data_exactly() {
        let x = array![[1.0, 5.0], [2.0, 4.0], [3.0, 3.0], [6.0, 1.0], [7.0, 2.0], [8.0, 0.0]];
        let y = array![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];

        let mut tree = DecisionTreeClassifier::new();
        tree.fit(&x, &y).unwrap();

        assert_eq!(tree.predict(&x).unwrap(), y);
        assert_eq!(tree.root().unwrap().depth(), 1);
    }

    #[test]
    fn test_xor_needs_depth_two() {
        let x = array![[0.0, 0.0], [0.0, 1.0], [1.0, 0.0], [1.0, 1.0]];
        let y = array![0.0, 1.0, 1.0, 0.0];

        let mut stump = DecisionTreeClassifier::new().with_max_depth(1);
        stump.fit(&x, &y).unwrap();
        assert_eq!(stump.root().unwrap().depth(), 0);

        let mut tree = DecisionTreeClassifier::new().with_max_depth(2);
        tree.fit(&x, &y).unwrap();
        let _ = tree.predict(&x).unwrap();
        assert!(tree.root().unwrap().depth() <= 2);
    }

    #[test]
    fn test_multiclass_labels() {
        let x = array![[0.0], [0.1], [5.0], [5.1], [10.0], [10.1]];
        let y = array![2.0, 2.0, 4.0, 4.0, 9.0, 9.0];

        let mut tree = DecisionTreeClassifier::new();
        tree.fit(&x, &y).unwrap();
        assert_eq!(tree.classes(), &[2.0, 4.0, 9.0]);
        assert_eq!(tree.predict(&array![[0.05], [4.9], [12.0]]).unwrap(), array![2.0, 4.0, 9.0]);
    }

    #[test]
    fn test_min_samples_leaf_limits_splits() {
        let x = array![[1.0], [2.0], [3.0], [4.0]];
        let y = array![0.0, 1.0, 1.0, 1.0];

        let mut tree = DecisionTreeClassifier::new().with_min_samples_leaf(2);
        tree.fit(&x, &y).unwrap();
        if let Some(TreeNode::Split { left, right, .. }) = tree.root() {
            for child in [left, right] {
                match &**child {
                    TreeNode::Leaf { n_samples, .. } => assert!(*n_samples >= 2),
                    TreeNode::Split { n_samples, .. } => assert!(*n_samples >= 2),
                }
            }
        }
    }

    #[test]
    fn test_adjacent_float_values_split_once() {
        let a = 1.0 + f64::EPSILON;
        let b = 1.0 + 2.0 * f64::EPSILON;
        let x = array![[a], [b]];
        let y = array![0.0, 1.0];

        for mut tree in [DecisionTreeClassifier::new(), DecisionTreeClassifier::new().with_max_depth(50)] {
            tree.fit(&x, &y).unwrap();
            assert_eq!(tree.root().unwrap().depth(), 1);
            assert_eq!(tree.predict(&x).unwrap(), y);
        }
    }

    #[test]
    fn test_predict_before_fit() {
        let tree = DecisionTreeClassifier::new();
        assert!(matches!(tree.predict(&array![[1.0]]), Err(TrainError::ModelNotFitted)));
    }
}
