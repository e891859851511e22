//! Dye-volume vectors.
//!
//! A [`Mixture`] holds one integer volume per dye. Equality and hashing are
//! positional, so `[40, 160, 0]` and `[160, 40, 0]` are different mixtures.

use std::fmt;
use std::ops::Index;

use serde::{Deserialize, Serialize};

use crate::error::{MixerError, MixerResult};

/// Ordered per-dye volumes for a single experiment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Mixture(Vec<u32>);

impl Mixture {
    pub fn new(volumes: Vec<u32>) -> Self {
        Self(volumes)
    }

    /// All-zero mixture for `dye_count` dyes.
    pub fn zeros(dye_count: usize) -> Self {
        Self(vec![0; dye_count])
    }

    /// Mixture with the whole budget on a single dye.
    pub fn single(dye_count: usize, dye: usize, volume: u32) -> Self {
        let mut volumes = vec![0; dye_count];
        volumes[dye] = volume;
        Self(volumes)
    }

    pub fn volumes(&self) -> &[u32] {
        &self.0
    }

    pub fn dye_count(&self) -> usize {
        self.0.len()
    }

    pub fn total(&self) -> u64 {
        self.0.iter().map(|&v| v as u64).sum()
    }

    /// Number of dyes with a non-zero volume.
    pub fn active_dyes(&self) -> usize {
        self.0.iter().filter(|&&v| v > 0).count()
    }

    /// Indices of dyes with a non-zero volume.
    pub fn active_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.0
            .iter()
            .enumerate()
            .filter(|(_, &v)| v > 0)
            .map(|(idx, _)| idx)
    }

    /// Volumes as floating-point features for the surrogate model.
    pub fn features(&self) -> Vec<f64> {
        self.0.iter().map(|&v| v as f64).collect()
    }

    /// Check the session invariants: length, step alignment and budget.
    pub fn validate(&self, dye_count: usize, step: u32, max_volume: u32) -> MixerResult<()> {
        if self.0.len() != dye_count {
            return Err(MixerError::dimension_mismatch(
                dye_count,
                self.0.len(),
                "mixture",
            ));
        }
        if step == 0 {
            return Err(MixerError::invalid_mixture("step size must be positive"));
        }
        if let Some((dye, volume)) = self.0.iter().enumerate().find(|(_, &v)| v % step != 0) {
            return Err(MixerError::invalid_mixture(format!(
                "dye {} volume {} is not a multiple of step {}",
                dye, volume, step
            )));
        }
        let total = self.total();
        if total > max_volume as u64 {
            return Err(MixerError::capacity_exceeded(
                total as f64,
                max_volume as f64,
                format!("mixture {}", self),
            ));
        }
        Ok(())
    }
}

impl From<Vec<u32>> for Mixture {
    fn from(volumes: Vec<u32>) -> Self {
        Self(volumes)
    }
}

impl Index<usize> for Mixture {
    type Output = u32;

    fn index(&self, index: usize) -> &u32 {
        &self.0[index]
    }
}

impl fmt::Display for Mixture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (idx, volume) in self.0.iter().enumerate() {
            if idx > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", volume)?;
        }
        write!(f, "]")
    }
}
