//! The physical mixing bench, seen from the optimizer.
//!
//! A bench dispenses mixtures into plate wells and reports the color it
//! measures there. Real implementations wrap liquid handlers and cameras;
//! [`SimulatedBench`] answers from a deterministic response function.

pub mod simulated;
pub mod well;

pub use simulated::{volumes_as_rgb, DyeBlend, SimulatedBench};
pub use well::{Plate, WellId};

use anyhow::Result;

use crate::color::Color;
use crate::data::Mixture;

/// Collaborator that carries out experiments.
///
/// Calls block until the bench is done. Timeouts and retries are the
/// implementation's business; any error it returns aborts the current
/// session tick without recording an experiment.
pub trait MixingBench {
    /// Dispense every dye volume of `mixture` into `well`.
    fn apply_mixture(&mut self, well: WellId, mixture: &Mixture) -> Result<()>;

    /// Measure the color currently in `well`.
    fn read_color(&mut self, well: WellId) -> Result<Color>;

    /// Bench name for logging
    fn name(&self) -> &str {
        "UnknownBench"
    }
}
