//! Plate addressing and per-well volume bookkeeping.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{MixerError, MixerResult};

const ROW_LETTERS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Zero-based well coordinate. Displays as the plate label, e.g. `B7`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WellId {
    pub row: usize,
    pub column: usize,
}

impl WellId {
    pub const fn new(row: usize, column: usize) -> Self {
        Self { row, column }
    }
}

impl fmt::Display for WellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match ROW_LETTERS.get(self.row) {
            Some(&letter) => write!(f, "{}{}", letter as char, self.column + 1),
            None => write!(f, "R{}C{}", self.row + 1, self.column + 1),
        }
    }
}

impl FromStr for WellId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.trim().chars();
        let letter = chars
            .next()
            .ok_or_else(|| "empty well label".to_string())?
            .to_ascii_uppercase();
        let row = ROW_LETTERS
            .iter()
            .position(|&l| l as char == letter)
            .ok_or_else(|| format!("unsupported well row '{}'", letter))?;
        let column: usize = chars
            .as_str()
            .parse()
            .map_err(|_| format!("unsupported well label '{}'", s))?;
        if column == 0 {
            return Err(format!("well columns start at 1, got '{}'", s));
        }
        Ok(Self::new(row, column - 1))
    }
}

/// Grid of wells sharing one capacity, tracking how much each holds.
#[derive(Debug, Clone, PartialEq)]
pub struct Plate {
    rows: usize,
    columns: usize,
    well_capacity: f64,
    volumes: Vec<f64>,
}

impl Plate {
    pub fn new(rows: usize, columns: usize, well_capacity: f64) -> Self {
        Self {
            rows,
            columns,
            well_capacity,
            volumes: vec![0.0; rows * columns],
        }
    }

    /// Standard 96-well plate with 360 µL wells.
    pub fn standard_96() -> Self {
        Self::new(8, 12, 360.0)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn well_capacity(&self) -> f64 {
        self.well_capacity
    }

    pub fn contains(&self, well: WellId) -> bool {
        well.row < self.rows && well.column < self.columns
    }

    fn index(&self, well: WellId) -> MixerResult<usize> {
        if self.contains(well) {
            Ok(well.row * self.columns + well.column)
        } else {
            Err(MixerError::invalid_config(
                "well",
                well,
                format!("outside a {}x{} plate", self.rows, self.columns),
            ))
        }
    }

    pub fn volume(&self, well: WellId) -> MixerResult<f64> {
        Ok(self.volumes[self.index(well)?])
    }

    pub fn remaining(&self, well: WellId) -> MixerResult<f64> {
        Ok(self.well_capacity - self.volume(well)?)
    }

    /// Record `volume` added to `well`, rejecting the addition if it would
    /// overflow. A rejected addition leaves the well unchanged.
    pub fn add(&mut self, well: WellId, volume: f64) -> MixerResult<()> {
        let idx = self.index(well)?;
        let requested = self.volumes[idx] + volume;
        if requested > self.well_capacity {
            return Err(MixerError::capacity_exceeded(
                requested,
                self.well_capacity,
                format!("well {}", well),
            ));
        }
        self.volumes[idx] = requested;
        Ok(())
    }

    pub fn is_empty(&self, well: WellId) -> MixerResult<bool> {
        Ok(self.volume(well)? == 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_round_trip() {
        assert_eq!(WellId::new(0, 0).to_string(), "A1");
        assert_eq!(WellId::new(7, 11).to_string(), "H12");
        assert_eq!("c4".parse::<WellId>().unwrap(), WellId::new(2, 3));
        assert_eq!("A12".parse::<WellId>().unwrap(), WellId::new(0, 11));
    }

    #[test]
    fn rejects_malformed_labels() {
        assert!("".parse::<WellId>().is_err());
        assert!("A0".parse::<WellId>().is_err());
        assert!("1A".parse::<WellId>().is_err());
        assert!("Bx".parse::<WellId>().is_err());
    }

    #[test]
    fn plate_tracks_volume_until_full() {
        let mut plate = Plate::standard_96();
        let well = WellId::new(1, 2);
        plate.add(well, 200.0).unwrap();
        plate.add(well, 160.0).unwrap();
        assert_eq!(plate.remaining(well).unwrap(), 0.0);

        let err = plate.add(well, 1.0).unwrap_err();
        assert!(matches!(err, MixerError::CapacityExceeded { .. }));
        assert_eq!(plate.volume(well).unwrap(), 360.0);
        assert!(plate.is_empty(WellId::new(0, 0)).unwrap());
    }

    #[test]
    fn wells_outside_plate_are_rejected() {
        let mut plate = Plate::new(2, 2, 100.0);
        assert!(!plate.contains(WellId::new(2, 0)));
        assert!(plate.add(WellId::new(0, 5), 1.0).is_err());
    }
}
