//! In-memory bench driven by a deterministic color response.

use std::collections::HashMap;

use anyhow::{bail, Context, Result};

use super::well::{Plate, WellId};
use super::MixingBench;
use crate::color::{Color, CHANNEL_MAX};
use crate::data::Mixture;

/// Reads the first three volumes directly as RGB, clamped to [0, 255].
pub fn volumes_as_rgb(mixture: &Mixture) -> Color {
    let channel = |i: usize| mixture.volumes().get(i).copied().unwrap_or(0) as f64;
    Color::clamped(channel(0), channel(1), channel(2))
}

/// Volume-weighted average of per-dye colors.
#[derive(Debug, Clone, PartialEq)]
pub struct DyeBlend {
    dyes: Vec<Color>,
    /// Color reported for a well that received no dye.
    pub background: Color,
}

impl DyeBlend {
    pub fn new(dyes: Vec<Color>) -> Self {
        Self {
            dyes,
            background: Color::new(CHANNEL_MAX, CHANNEL_MAX, CHANNEL_MAX),
        }
    }

    pub fn dye_count(&self) -> usize {
        self.dyes.len()
    }

    pub fn color_of(&self, mixture: &Mixture) -> Color {
        let total = mixture.total();
        if total == 0 {
            return self.background;
        }
        let mut rgb = [0.0; 3];
        for (volume, dye) in mixture.volumes().iter().zip(self.dyes.iter()) {
            let share = *volume as f64 / total as f64;
            for (acc, channel) in rgb.iter_mut().zip(dye.channels()) {
                *acc += share * channel;
            }
        }
        Color::from(rgb)
    }

    /// The blend as a response function for [`SimulatedBench`].
    pub fn into_response(self) -> impl Fn(&Mixture) -> Color {
        move |mixture: &Mixture| self.color_of(mixture)
    }
}

/// A plate whose wells take on `response(mixture)` once dispensed into.
///
/// Reference wells can be preset with a color before the session starts,
/// standing in for target samples placed on the plate by hand.
pub struct SimulatedBench<F>
where
    F: Fn(&Mixture) -> Color,
{
    name: String,
    plate: Plate,
    response: F,
    colors: HashMap<WellId, Color>,
    dispensed: usize,
    reads: usize,
}

impl<F> SimulatedBench<F>
where
    F: Fn(&Mixture) -> Color,
{
    pub fn new(plate: Plate, response: F) -> Self {
        Self {
            name: "SimulatedBench".to_string(),
            plate,
            response,
            colors: HashMap::new(),
            dispensed: 0,
            reads: 0,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Preset the color read back from `well`.
    pub fn with_reference(mut self, well: WellId, color: Color) -> Self {
        self.colors.insert(well, color);
        self
    }

    pub fn plate(&self) -> &Plate {
        &self.plate
    }

    /// Number of successful `apply_mixture` calls.
    pub fn dispensed(&self) -> usize {
        self.dispensed
    }

    /// Number of successful `read_color` calls.
    pub fn reads(&self) -> usize {
        self.reads
    }
}

impl<F> MixingBench for SimulatedBench<F>
where
    F: Fn(&Mixture) -> Color,
{
    fn apply_mixture(&mut self, well: WellId, mixture: &Mixture) -> Result<()> {
        self.plate
            .add(well, mixture.total() as f64)
            .with_context(|| format!("dispensing {} into {}", mixture, well))?;
        self.colors.insert(well, (self.response)(mixture));
        self.dispensed += 1;
        Ok(())
    }

    fn read_color(&mut self, well: WellId) -> Result<Color> {
        if !self.plate.contains(well) {
            bail!("well {} is not on the plate", well);
        }
        match self.colors.get(&well) {
            Some(color) => {
                self.reads += 1;
                Ok(*color)
            }
            None => bail!("well {} holds no sample", well),
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}
