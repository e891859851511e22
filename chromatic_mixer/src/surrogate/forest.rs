//! Bagged regression trees.
//!
//! Each tree is a CART regressor grown on a bootstrap sample until its
//! leaves are pure or too small to split. Trees are fitted in parallel, but
//! every tree draws from its own seeded RNG so the ensemble is reproducible.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use crate::error::SurrogateError;

/// Label variance below which a node is treated as pure.
const PURITY_EPSILON: f64 = 1e-15;

/// Ensemble hyperparameters.
#[derive(Debug, Clone)]
pub struct ForestParams {
    pub n_trees: usize,
    /// `None` grows trees until leaves are pure.
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: None,
            min_samples_split: 2,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone)]
enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// A single CART regression tree stored as a flat node arena.
#[derive(Debug, Clone)]
pub struct RegressionTree {
    nodes: Vec<Node>,
}

struct SplitChoice {
    feature: usize,
    threshold: f64,
}

impl RegressionTree {
    fn fit(
        x: ArrayView2<'_, f64>,
        y: ArrayView1<'_, f64>,
        samples: Vec<usize>,
        params: &ForestParams,
    ) -> Self {
        let mut tree = Self { nodes: Vec::new() };
        tree.grow(x, y, samples, 0, params);
        tree
    }

    fn grow(
        &mut self,
        x: ArrayView2<'_, f64>,
        y: ArrayView1<'_, f64>,
        samples: Vec<usize>,
        depth: usize,
        params: &ForestParams,
    ) -> usize {
        let n = samples.len() as f64;
        let mean = samples.iter().map(|&i| y[i]).sum::<f64>() / n;
        let node_id = self.nodes.len();
        self.nodes.push(Node::Leaf { value: mean });

        let depth_reached = params.max_depth.map_or(false, |max| depth >= max);
        let pure = samples
            .iter()
            .all(|&i| (y[i] - mean).abs() <= PURITY_EPSILON);
        if depth_reached || pure || samples.len() < params.min_samples_split {
            return node_id;
        }

        let Some(split) = best_split(x, y, &samples) else {
            return node_id;
        };

        let (left_samples, right_samples): (Vec<usize>, Vec<usize>) = samples
            .iter()
            .copied()
            .partition(|&i| x[[i, split.feature]] <= split.threshold);

        let left = self.grow(x, y, left_samples, depth + 1, params);
        let right = self.grow(x, y, right_samples, depth + 1, params);
        self.nodes[node_id] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        node_id
    }

    pub fn predict_row(&self, row: ArrayView1<'_, f64>) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if row[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    pub fn predict(&self, x: ArrayView2<'_, f64>) -> Array1<f64> {
        x.rows().into_iter().map(|row| self.predict_row(row)).collect()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

/// Variance-reduction split over every feature, thresholds at midpoints
/// between consecutive distinct values. Ties keep the first split found.
fn best_split(
    x: ArrayView2<'_, f64>,
    y: ArrayView1<'_, f64>,
    samples: &[usize],
) -> Option<SplitChoice> {
    let n = samples.len();
    let total: f64 = samples.iter().map(|&i| y[i]).sum();
    // Maximising sum_l^2/n_l + sum_r^2/n_r minimises the children's squared error.
    let parent_score = total * total / n as f64;
    let mut best: Option<(f64, SplitChoice)> = None;

    let mut order = samples.to_vec();
    for feature in 0..x.ncols() {
        order.sort_by(|&a, &b| x[[a, feature]].total_cmp(&x[[b, feature]]));

        let mut left_sum = 0.0;
        for pos in 0..n - 1 {
            left_sum += y[order[pos]];
            let here = x[[order[pos], feature]];
            let next = x[[order[pos + 1], feature]];
            if next <= here {
                continue;
            }

            let left_n = (pos + 1) as f64;
            let right_n = (n - pos - 1) as f64;
            let right_sum = total - left_sum;
            let score = left_sum * left_sum / left_n + right_sum * right_sum / right_n;

            let improves = match &best {
                Some((best_score, _)) => score > *best_score + PURITY_EPSILON,
                None => score > parent_score + PURITY_EPSILON,
            };
            if improves {
                best = Some((
                    score,
                    SplitChoice {
                        feature,
                        threshold: (here + next) / 2.0,
                    },
                ));
            }
        }
    }

    best.map(|(_, split)| split)
}

/// Bootstrap-aggregated ensemble of [`RegressionTree`]s.
#[derive(Debug, Clone)]
pub struct RandomForest {
    trees: Vec<RegressionTree>,
    n_features: usize,
}

impl RandomForest {
    pub fn fit(
        x: ArrayView2<'_, f64>,
        y: ArrayView1<'_, f64>,
        params: &ForestParams,
    ) -> Result<Self, SurrogateError> {
        let n_samples = x.nrows();
        if n_samples == 0 {
            return Err(SurrogateError::EmptyTrainingSet);
        }
        if y.len() != n_samples {
            return Err(SurrogateError::DimensionMismatch {
                expected: n_samples,
                got: y.len(),
            });
        }
        if let Some(index) = y.iter().position(|v| !v.is_finite()) {
            return Err(SurrogateError::NonFiniteLabel { index });
        }
        if params.n_trees == 0 {
            return Err(SurrogateError::EmptyEnsemble);
        }

        let trees = (0..params.n_trees)
            .into_par_iter()
            .map(|tree_idx| {
                let mut rng = StdRng::seed_from_u64(tree_seed(params.seed, tree_idx));
                let bootstrap: Vec<usize> =
                    (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect();
                RegressionTree::fit(x, y, bootstrap, params)
            })
            .collect();

        Ok(Self {
            trees,
            n_features: x.ncols(),
        })
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn trees(&self) -> &[RegressionTree] {
        &self.trees
    }

    /// Predictions of every tree, shaped `(n_trees, n_samples)`.
    pub fn tree_predictions(&self, x: ArrayView2<'_, f64>) -> Result<Array2<f64>, SurrogateError> {
        if self.trees.is_empty() {
            return Err(SurrogateError::EmptyEnsemble);
        }
        if x.ncols() != self.n_features {
            return Err(SurrogateError::DimensionMismatch {
                expected: self.n_features,
                got: x.ncols(),
            });
        }

        let per_tree: Vec<Array1<f64>> =
            self.trees.par_iter().map(|tree| tree.predict(x)).collect();
        Ok(Array2::from_shape_fn((per_tree.len(), x.nrows()), |(t, s)| {
            per_tree[t][s]
        }))
    }

    /// Ensemble mean and across-tree variance for every row of `x`.
    pub fn predict_with_uncertainty(
        &self,
        x: ArrayView2<'_, f64>,
    ) -> Result<(Array1<f64>, Array1<f64>), SurrogateError> {
        let per_tree = self.tree_predictions(x)?;
        let n_trees = per_tree.nrows() as f64;

        let mean = per_tree.sum_axis(ndarray::Axis(0)) / n_trees;
        let variance = (&per_tree - &mean)
            .mapv(|d| d * d)
            .sum_axis(ndarray::Axis(0))
            / n_trees;

        if let Some(candidate) = mean.iter().position(|v| !v.is_finite()) {
            return Err(SurrogateError::NonFinitePrediction { candidate });
        }
        Ok((mean, variance))
    }

    pub fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Array1<f64>, SurrogateError> {
        self.predict_with_uncertainty(x).map(|(mean, _)| mean)
    }
}

fn tree_seed(seed: u64, tree_idx: usize) -> u64 {
    seed ^ (tree_idx as u64 + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}
