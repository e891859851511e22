//! RGB color values and the scoring functions used to judge a measurement.
//!
//! Distances are plain Euclidean distances over channel intensities in
//! [0, 255]. The fitness score is the cubed normalized inverse distance, which
//! is what the surrogate model regresses on.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Upper end of the channel range.
pub const CHANNEL_MAX: f64 = 255.0;

/// Diagonal of the RGB cube, the largest possible distance between two colors.
pub const MAX_COLOR_DISTANCE: f64 = 441.672_955_930_063_7; // 255 * sqrt(3)

/// An immutable (r, g, b) triple of channel intensities.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color([f64; 3]);

impl Color {
    /// Build a color from raw channel values; no clamping is applied.
    pub const fn new(r: f64, g: f64, b: f64) -> Self {
        Self([r, g, b])
    }

    /// Build a color with every channel clamped into [0, 255].
    pub fn clamped(r: f64, g: f64, b: f64) -> Self {
        Self([
            r.clamp(0.0, CHANNEL_MAX),
            g.clamp(0.0, CHANNEL_MAX),
            b.clamp(0.0, CHANNEL_MAX),
        ])
    }

    /// Channels as `[r, g, b]`.
    pub fn channels(&self) -> [f64; 3] {
        self.0
    }

    /// Red channel.
    pub fn r(&self) -> f64 {
        self.0[0]
    }

    /// Green channel.
    pub fn g(&self) -> f64 {
        self.0[1]
    }

    /// Blue channel.
    pub fn b(&self) -> f64 {
        self.0[2]
    }

    /// True when every channel is finite and inside [0, 255].
    pub fn in_gamut(&self) -> bool {
        self.0
            .iter()
            .all(|c| c.is_finite() && (0.0..=CHANNEL_MAX).contains(c))
    }
}

impl From<[f64; 3]> for Color {
    fn from(channels: [f64; 3]) -> Self {
        Self(channels)
    }
}

impl From<[u8; 3]> for Color {
    fn from(rgb: [u8; 3]) -> Self {
        Self([rgb[0] as f64, rgb[1] as f64, rgb[2] as f64])
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.1}, {:.1}, {:.1})", self.0[0], self.0[1], self.0[2])
    }
}

/// Euclidean distance between two colors. Channels are not clamped.
pub fn distance(a: Color, b: Color) -> f64 {
    a.0.iter()
        .zip(b.0.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

/// Cubed normalized inverse distance to `target`.
///
/// Equals 1.0 for an exact match and falls toward 0.0 at `max_distance`.
/// Distances beyond `max_distance` yield negative scores; cubing keeps the
/// sign so such outliers still rank below every in-range measurement.
pub fn fitness(measured: Color, target: Color, max_distance: f64) -> f64 {
    let base = 1.0 - distance(measured, target) / max_distance;
    base.powi(3)
}

/// [`fitness`] with the RGB cube diagonal as the normalizer.
pub fn default_fitness(measured: Color, target: Color) -> f64 {
    fitness(measured, target, MAX_COLOR_DISTANCE)
}

/// True iff `distance(measured, target) <= tolerance`.
pub fn within_tolerance(measured: Color, target: Color, tolerance: f64) -> bool {
    distance(measured, target) <= tolerance
}
