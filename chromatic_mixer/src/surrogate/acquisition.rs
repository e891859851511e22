//! Acquisition scoring: predicted fitness plus an exploration bonus that
//! shrinks as the iteration budget is spent, plus a proximity bonus toward
//! the best mixtures seen so far.

use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};

/// Tunable constants of the acquisition function and ensemble sizing.
///
/// Deserialises with per-field defaults, so a config table only needs the
/// constants it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcquisitionPolicy {
    /// Budget fraction below which exploration is weighted heavily.
    pub early_ratio: f64,
    /// Budget fraction below which exploration is weighted moderately.
    pub late_ratio: f64,
    pub early_weight: f64,
    pub mid_weight: f64,
    pub late_weight: f64,
    /// Scale of each `exp(-distance)` proximity term.
    pub proximity_weight: f64,
    /// How many top-scoring experiments attract candidates.
    pub proximity_neighbours: usize,
    /// History size from which the proximity bonus applies.
    pub proximity_min_history: usize,
    pub min_trees: usize,
    pub max_trees: usize,
    pub trees_per_experiment: usize,
    /// Seed for bootstrap sampling inside the ensemble.
    pub seed: u64,
}

impl Default for AcquisitionPolicy {
    fn default() -> Self {
        Self {
            early_ratio: 0.3,
            late_ratio: 0.7,
            early_weight: 2.0,
            mid_weight: 1.0,
            late_weight: 0.5,
            proximity_weight: 0.3,
            proximity_neighbours: 3,
            proximity_min_history: 3,
            min_trees: 10,
            max_trees: 100,
            trees_per_experiment: 5,
            seed: 42,
        }
    }
}

impl AcquisitionPolicy {
    /// Weight of the uncertainty term given how much of the budget is used.
    pub fn exploration_weight(&self, history_len: usize, max_iterations: usize) -> f64 {
        let ratio = history_len as f64 / max_iterations.max(1) as f64;
        if ratio < self.early_ratio {
            self.early_weight
        } else if ratio < self.late_ratio {
            self.mid_weight
        } else {
            self.late_weight
        }
    }

    /// Ensemble size: grows with the data, clamped to `[min_trees, max_trees]`.
    pub fn ensemble_size(&self, history_len: usize) -> usize {
        (self.trees_per_experiment * history_len)
            .max(self.min_trees)
            .min(self.max_trees)
    }

    pub fn base_score(&self, predicted: f64, uncertainty: f64, exploration_weight: f64) -> f64 {
        predicted + exploration_weight * uncertainty
    }

    /// Sum of `proximity_weight * exp(-d)` over the anchor points, where `d` is
    /// the Euclidean distance in scaled feature space.
    pub fn proximity_bonus<'a, I>(&self, candidate: ArrayView1<'_, f64>, anchors: I) -> f64
    where
        I: IntoIterator<Item = ArrayView1<'a, f64>>,
    {
        anchors
            .into_iter()
            .map(|anchor| {
                let d = candidate
                    .iter()
                    .zip(anchor.iter())
                    .map(|(a, b)| (a - b) * (a - b))
                    .sum::<f64>()
                    .sqrt();
                self.proximity_weight * (-d).exp()
            })
            .sum()
    }

    pub fn uses_proximity(&self, history_len: usize) -> bool {
        history_len >= self.proximity_min_history && self.proximity_neighbours > 0
    }
}
