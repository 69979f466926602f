use crate::domain::errors::ModelError;
use crate::domain::ml::classifier::{ProbabilisticClassifier, check_training_labels};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::tree::decision_tree_classifier::{
    DecisionTreeClassifier, DecisionTreeClassifierParameters,
};
use tracing::debug;

type Tree = DecisionTreeClassifier<f64, u32, DenseMatrix<f64>, Vec<u32>>;

/// Hyperparameters kept across refits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RandomForestParams {
    pub n_trees: usize,
    /// Minimum samples required to split an internal node
    pub min_samples_split: usize,
    pub max_depth: Option<u16>,
    /// Columns drawn for each tree; `None` = ceil(sqrt(n_features))
    pub max_features: Option<usize>,
    pub seed: u64,
}

impl Default for RandomForestParams {
    fn default() -> Self {
        Self {
            n_trees: 100,
            min_samples_split: 100,
            max_depth: None,
            max_features: None,
            seed: 1,
        }
    }
}

enum ForestMember {
    Tree { tree: LeafTree, columns: Vec<usize> },
    /// Bootstrap sample held a single class
    Constant(u32),
}

/// Split layout of a fitted smartcore tree, read back through its serde form.
#[derive(Debug, Deserialize)]
struct SplitNode {
    output: usize,
    split_feature: usize,
    split_value: Option<f64>,
    true_child: Option<usize>,
    false_child: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct TreeLayout {
    nodes: Vec<SplitNode>,
}

/// A fitted tree that answers the share of up days in the leaf a row lands in.
struct LeafTree {
    nodes: Vec<SplitNode>,
    /// Share of class 1 among the bootstrap rows routed to each node
    up_share: Vec<Option<f64>>,
}

impl LeafTree {
    fn from_fitted(tree: &Tree, x: &[Vec<f64>], y: &[u32]) -> Result<Self, ModelError> {
        let layout = serde_json::to_value(tree)
            .and_then(serde_json::from_value::<TreeLayout>)
            .map_err(|e| ModelError::Backend {
                reason: format!("Failed to read tree layout: {}", e),
            })?;
        if layout.nodes.is_empty() {
            return Err(ModelError::Backend {
                reason: "Fitted tree has no nodes".to_string(),
            });
        }

        let mut tree = LeafTree {
            up_share: vec![None; layout.nodes.len()],
            nodes: layout.nodes,
        };
        let mut counts = vec![(0usize, 0usize); tree.nodes.len()];
        for (row, &class) in x.iter().zip(y) {
            let (up, total) = &mut counts[tree.leaf(row)?];
            *up += usize::from(class == 1);
            *total += 1;
        }
        tree.up_share = counts
            .into_iter()
            .map(|(up, total)| (total > 0).then(|| up as f64 / total as f64))
            .collect();
        Ok(tree)
    }

    fn leaf(&self, row: &[f64]) -> Result<usize, ModelError> {
        let mut index = 0;
        // Depth is bounded by the node count
        for _ in 0..self.nodes.len() {
            let node = self.node(index)?;
            let next = match (node.true_child, node.false_child) {
                (None, None) => return Ok(index),
                (true_child, false_child) => {
                    let value = row.get(node.split_feature).copied().unwrap_or(f64::NAN);
                    if node.split_value.is_some_and(|split| value <= split) {
                        true_child
                    } else {
                        false_child
                    }
                }
            };
            index = next.ok_or_else(|| ModelError::Backend {
                reason: format!("Tree node {} has a single child", index),
            })?;
        }
        Err(ModelError::Backend {
            reason: "Tree layout contains a cycle".to_string(),
        })
    }

    fn node(&self, index: usize) -> Result<&SplitNode, ModelError> {
        self.nodes.get(index).ok_or_else(|| ModelError::Backend {
            reason: format!("Tree node {} out of range", index),
        })
    }

    /// Leaf class-1 share; a leaf no bootstrap row reached falls back to its majority class.
    fn up_probability(&self, row: &[f64]) -> Result<f64, ModelError> {
        let leaf = self.leaf(row)?;
        Ok(self.up_share[leaf].unwrap_or(if self.nodes[leaf].output == 1 { 1.0 } else { 0.0 }))
    }
}

/// Bagged decision-tree ensemble.
///
/// Each member is a smartcore CART tree fitted on a bootstrap sample of the
/// rows and a random subset of the columns. The column subset is drawn once
/// per tree (a random-subspace ensemble), not at every split, because
/// smartcore does not expose per-split feature sampling on a single tree.
///
/// P(up) is the mean over members of the class-1 share in the leaf each row
/// lands in (soft voting). A single-class member contributes 1.0 or 0.0.
/// Seeding is per tree, so refits on the same data are reproducible.
pub struct RandomForestClassifier {
    params: RandomForestParams,
    members: Vec<ForestMember>,
    n_features: Option<usize>,
}

impl RandomForestClassifier {
    pub fn new(params: RandomForestParams) -> Self {
        Self {
            params,
            members: Vec::new(),
            n_features: None,
        }
    }

    pub fn params(&self) -> &RandomForestParams {
        &self.params
    }

    fn tree_parameters(&self) -> DecisionTreeClassifierParameters {
        let params = DecisionTreeClassifierParameters::default()
            .with_min_samples_split(self.params.min_samples_split.max(2));
        match self.params.max_depth {
            Some(depth) => params.with_max_depth(depth),
            None => params,
        }
    }

    fn columns_per_tree(&self, n_features: usize) -> usize {
        let default = (n_features as f64).sqrt().ceil() as usize;
        self.params
            .max_features
            .unwrap_or(default)
            .clamp(1, n_features)
    }

    fn fit_member(
        &self,
        tree_index: usize,
        features: &[Vec<f64>],
        labels: &[u8],
        n_features: usize,
    ) -> Result<ForestMember, ModelError> {
        let mut rng = StdRng::seed_from_u64(self.params.seed.wrapping_add(tree_index as u64));
        let n = features.len();

        let mut columns =
            rand::seq::index::sample(&mut rng, n_features, self.columns_per_tree(n_features))
                .into_vec();
        columns.sort_unstable();

        let rows: Vec<usize> = (0..n).map(|_| rng.random_range(0..n)).collect();
        let y: Vec<u32> = rows.iter().map(|&r| u32::from(labels[r])).collect();

        let first = y[0];
        if y.iter().all(|&v| v == first) {
            return Ok(ForestMember::Constant(first));
        }

        let x: Vec<Vec<f64>> = rows
            .iter()
            .map(|&r| columns.iter().map(|&c| features[r][c]).collect())
            .collect();
        let matrix = to_matrix(&x)?;
        let tree = Tree::fit(&matrix, &y, self.tree_parameters()).map_err(|e| {
            ModelError::Backend {
                reason: format!("Tree {} training failed: {}", tree_index, e),
            }
        })?;

        Ok(ForestMember::Tree {
            tree: LeafTree::from_fitted(&tree, &x, &y)?,
            columns,
        })
    }
}

impl ProbabilisticClassifier for RandomForestClassifier {
    fn fit(&mut self, features: &[Vec<f64>], labels: &[u8]) -> Result<(), ModelError> {
        if features.len() != labels.len() {
            return Err(ModelError::LengthMismatch {
                features: features.len(),
                labels: labels.len(),
            });
        }
        check_training_labels(labels)?;

        let n_features = features[0].len();
        if n_features == 0 {
            return Err(ModelError::DimensionMismatch {
                expected: 1,
                actual: 0,
            });
        }
        if let Some(row) = features.iter().find(|r| r.len() != n_features) {
            return Err(ModelError::DimensionMismatch {
                expected: n_features,
                actual: row.len(),
            });
        }

        self.members.clear();
        self.n_features = None;

        let mut members = Vec::with_capacity(self.params.n_trees.max(1));
        for tree_index in 0..self.params.n_trees.max(1) {
            members.push(self.fit_member(tree_index, features, labels, n_features)?);
        }

        debug!(
            "Fitted {} trees on {} rows x {} features",
            members.len(),
            features.len(),
            n_features
        );

        self.members = members;
        self.n_features = Some(n_features);
        Ok(())
    }

    fn predict_probability(&self, features: &[Vec<f64>]) -> Result<Vec<f64>, ModelError> {
        let n_features = self.n_features.ok_or(ModelError::NotFitted)?;
        if features.is_empty() {
            return Ok(Vec::new());
        }
        if let Some(row) = features.iter().find(|r| r.len() != n_features) {
            return Err(ModelError::DimensionMismatch {
                expected: n_features,
                actual: row.len(),
            });
        }

        let mut up = vec![0.0; features.len()];
        for member in &self.members {
            match member {
                ForestMember::Constant(class) => {
                    if *class == 1 {
                        up.iter_mut().for_each(|p| *p += 1.0);
                    }
                }
                ForestMember::Tree { tree, columns } => {
                    for (p, row) in up.iter_mut().zip(features) {
                        let projected: Vec<f64> = columns.iter().map(|&c| row[c]).collect();
                        *p += tree.up_probability(&projected)?;
                    }
                }
            }
        }

        let total = self.members.len() as f64;
        Ok(up.into_iter().map(|p| p / total).collect())
    }

    fn fresh(&self) -> Box<dyn ProbabilisticClassifier> {
        Box::new(Self::new(self.params.clone()))
    }

    fn name(&self) -> &str {
        "SmartCore Random Forest"
    }
}

fn to_matrix(rows: &Vec<Vec<f64>>) -> Result<DenseMatrix<f64>, ModelError> {
    DenseMatrix::from_2d_vec(rows).map_err(|e| ModelError::Backend {
        reason: format!("Matrix creation failed: {}", e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn separable() -> (Vec<Vec<f64>>, Vec<u8>) {
        let mut x = Vec::new();
        let mut y = Vec::new();
        for i in 0..200 {
            let v = i as f64 / 200.0;
            x.push(vec![v, 1.0 - v]);
            y.push(u8::from(v > 0.5));
        }
        (x, y)
    }

    fn small_forest() -> RandomForestClassifier {
        RandomForestClassifier::new(RandomForestParams {
            n_trees: 15,
            min_samples_split: 4,
            ..RandomForestParams::default()
        })
    }

    #[test]
    fn test_learns_separable_data() {
        let (x, y) = separable();
        let mut model = small_forest();
        model.fit(&x, &y).unwrap();

        let probs = model
            .predict_probability(&[vec![0.05, 0.95], vec![0.95, 0.05]])
            .unwrap();
        assert!(probs[0] < 0.5);
        assert!(probs[1] > 0.5);
        assert!(probs.iter().all(|p| (0.0..=1.0).contains(p)));
    }

    #[test]
    fn test_impure_leaf_gives_its_class_share() {
        // 70 up days, 30 down days and too few rows to split: one impure leaf
        let x: Vec<Vec<f64>> = (0..100).map(|i| vec![i as f64]).collect();
        let y: Vec<u8> = (0..100).map(|i| u8::from(i % 10 < 7)).collect();
        let mut model = RandomForestClassifier::new(RandomForestParams {
            n_trees: 1,
            min_samples_split: 1_000,
            ..RandomForestParams::default()
        });
        model.fit(&x, &y).unwrap();

        let probs = model.predict_probability(&[vec![5.0], vec![95.0]]).unwrap();
        // A majority vote would answer exactly 1.0
        assert!(probs[0] > 0.4 && probs[0] < 0.95);
        assert_eq!(probs[0], probs[1]);
    }

    #[test]
    fn test_refit_is_reproducible() {
        let (x, y) = separable();
        let mut a = small_forest();
        let mut b = small_forest();
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();
        assert_eq!(
            a.predict_probability(&x).unwrap(),
            b.predict_probability(&x).unwrap()
        );
    }

    #[test]
    fn test_rejects_single_class() {
        let x = vec![vec![1.0], vec![2.0], vec![3.0]];
        let mut model = small_forest();
        assert!(matches!(
            model.fit(&x, &[1, 1, 1]),
            Err(ModelError::DegenerateLabels { .. })
        ));
    }

    #[test]
    fn test_predict_before_fit() {
        let model = small_forest();
        assert_eq!(
            model.predict_probability(&[vec![1.0]]),
            Err(ModelError::NotFitted)
        );
    }

    #[test]
    fn test_fresh_has_no_fitted_state() {
        let (x, y) = separable();
        let mut model = small_forest();
        model.fit(&x, &y).unwrap();
        let fresh = model.fresh();
        assert!(fresh.predict_probability(&x).is_err());
    }
}
