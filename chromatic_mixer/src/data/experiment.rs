use serde::{Deserialize, Serialize};

use crate::color::{distance, Color};
use crate::data::Mixture;

/// A dispensed mixture paired with the color measured afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Experiment {
    pub mixture: Mixture,
    pub color: Color,
}

impl Experiment {
    pub fn new(mixture: Mixture, color: Color) -> Self {
        Self { mixture, color }
    }

    pub fn distance_to(&self, target: Color) -> f64 {
        distance(self.color, target)
    }
}
