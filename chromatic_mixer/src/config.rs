//! Session configuration via TOML files.
//!
//! Every table is optional; missing keys fall back to the defaults of a
//! three-dye, 200 µL, 96-well run. Parsed values are validated before a
//! [`SessionConfig`] is handed out, so a loaded config always builds a
//! session.

use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::bench::{Plate, WellId};
use crate::color::{Color, CHANNEL_MAX};
use crate::error::{MixerError, MixerResult};
use crate::surrogate::{AcquisitionPolicy, OptimizerSettings};

/// Where a target's true color comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TargetSource {
    /// Known up front.
    Fixed(Color),
    /// Measured from a sample well on the first visit to the target.
    ReferenceWell(WellId),
}

impl fmt::Display for TargetSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetSource::Fixed(color) => write!(f, "rgb {}", color),
            TargetSource::ReferenceWell(well) => write!(f, "reference well {}", well),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetSpec {
    pub name: String,
    pub source: TargetSource,
}

impl TargetSpec {
    pub fn fixed(name: impl Into<String>, color: Color) -> Self {
        Self {
            name: name.into(),
            source: TargetSource::Fixed(color),
        }
    }

    pub fn reference(name: impl Into<String>, well: WellId) -> Self {
        Self {
            name: name.into(),
            source: TargetSource::ReferenceWell(well),
        }
    }
}

/// Plate geometry. Target `i` uses row `i`; its `n`-th experiment goes in
/// column `n`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlateConfig {
    pub rows: usize,
    pub columns: usize,
    pub well_capacity: f64,
}

impl PlateConfig {
    pub fn build(&self) -> Plate {
        Plate::new(self.rows, self.columns, self.well_capacity)
    }

    pub fn well_for(&self, target: usize, iteration: usize) -> WellId {
        WellId::new(target, iteration)
    }
}

impl Default for PlateConfig {
    fn default() -> Self {
        Self {
            rows: default_rows(),
            columns: default_columns(),
            well_capacity: default_well_capacity(),
        }
    }
}

/// Everything a [`Session`](crate::controller::Session) needs.
///
/// # Examples
///
/// ```
/// use chromatic_mixer::SessionConfig;
///
/// let config = SessionConfig::load_from_file("config/session.toml")
///     .unwrap_or_else(|_| SessionConfig::default());
///
/// println!("{} dyes, {} targets", config.dye_count, config.targets.len());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub dye_count: usize,
    /// Total volume budget per mixture.
    pub max_volume: u32,
    /// Dispensing granularity; every volume is a multiple of it.
    pub step: u32,
    /// Largest color distance that counts as a match.
    pub tolerance: f64,
    /// Experiments allowed per target.
    pub max_iterations: usize,
    /// Multi-dye mixtures tried before the surrogate takes over.
    pub covering_count: usize,
    pub candidate_pool_size: usize,
    pub fallback_attempts: usize,
    pub seed: u64,
    pub plate: PlateConfig,
    pub acquisition: AcquisitionPolicy,
    pub targets: Vec<TargetSpec>,
}

impl SessionConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(&path)?;
        Self::from_str(&contents)
    }

    pub fn from_str(toml_str: &str) -> Result<Self, ConfigError> {
        let raw: RawSessionConfig =
            toml::from_str(toml_str).map_err(|err| ConfigError::Parse(err.to_string()))?;

        let targets = raw
            .targets
            .iter()
            .enumerate()
            .map(|(idx, target)| target.resolve(idx))
            .collect::<Result<Vec<_>, _>>()?;

        let config = Self {
            dye_count: raw.session.dye_count,
            max_volume: raw.session.max_volume,
            step: raw.session.step,
            tolerance: raw.session.tolerance,
            max_iterations: raw.session.max_iterations,
            covering_count: raw.session.covering_count,
            candidate_pool_size: raw.session.candidate_pool_size,
            fallback_attempts: raw.session.fallback_attempts,
            seed: raw.session.seed,
            plate: PlateConfig {
                rows: raw.plate.rows,
                columns: raw.plate.columns,
                well_capacity: raw.plate.well_capacity,
            },
            acquisition: raw.acquisition,
            targets,
        };
        config.validate().map_err(ConfigError::Invalid)?;
        Ok(config)
    }

    /// Default search parameters with the given targets.
    pub fn with_targets(targets: Vec<TargetSpec>) -> Self {
        Self {
            targets,
            ..Self::default()
        }
    }

    /// Reject configurations no session could run.
    pub fn validate(&self) -> MixerResult<()> {
        if self.dye_count == 0 {
            return Err(MixerError::invalid_config(
                "dye_count",
                self.dye_count,
                "at least one dye is required",
            ));
        }
        if self.step == 0 {
            return Err(MixerError::invalid_config("step", self.step, "must be > 0"));
        }
        if self.max_volume < self.step {
            return Err(MixerError::invalid_config(
                "max_volume",
                self.max_volume,
                format!("must be at least one step ({})", self.step),
            ));
        }
        if self.max_volume % self.step != 0 {
            return Err(MixerError::invalid_config(
                "max_volume",
                self.max_volume,
                format!("must be a multiple of step {}", self.step),
            ));
        }
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(MixerError::invalid_config(
                "tolerance",
                self.tolerance,
                "must be finite and >= 0",
            ));
        }
        if self.max_iterations == 0 {
            return Err(MixerError::invalid_config(
                "max_iterations",
                self.max_iterations,
                "must be > 0",
            ));
        }
        if self.candidate_pool_size == 0 {
            return Err(MixerError::invalid_config(
                "candidate_pool_size",
                self.candidate_pool_size,
                "must be > 0",
            ));
        }
        if self.fallback_attempts == 0 {
            return Err(MixerError::invalid_config(
                "fallback_attempts",
                self.fallback_attempts,
                "must be > 0",
            ));
        }

        self.validate_plate()?;
        self.validate_targets()?;
        self.validate_policy()
    }

    fn validate_plate(&self) -> MixerResult<()> {
        let plate = &self.plate;
        if plate.rows == 0 || plate.rows > 26 {
            return Err(MixerError::invalid_config(
                "plate.rows",
                plate.rows,
                "must be between 1 and 26",
            ));
        }
        if plate.columns == 0 {
            return Err(MixerError::invalid_config(
                "plate.columns",
                plate.columns,
                "must be > 0",
            ));
        }
        if !plate.well_capacity.is_finite() || plate.well_capacity <= 0.0 {
            return Err(MixerError::invalid_config(
                "plate.well_capacity",
                plate.well_capacity,
                "must be positive",
            ));
        }
        if self.max_volume as f64 > plate.well_capacity {
            return Err(MixerError::invalid_config(
                "max_volume",
                self.max_volume,
                format!("exceeds well capacity {}", plate.well_capacity),
            ));
        }
        if self.max_iterations > plate.columns {
            return Err(MixerError::invalid_config(
                "max_iterations",
                self.max_iterations,
                format!("each experiment needs a column; plate has {}", plate.columns),
            ));
        }
        Ok(())
    }

    fn validate_targets(&self) -> MixerResult<()> {
        if self.targets.is_empty() {
            return Err(MixerError::invalid_config(
                "targets",
                0,
                "at least one target is required",
            ));
        }
        if self.targets.len() > self.plate.rows {
            return Err(MixerError::invalid_config(
                "targets",
                self.targets.len(),
                format!("each target needs a row; plate has {}", self.plate.rows),
            ));
        }

        for (idx, target) in self.targets.iter().enumerate() {
            let parameter = format!("targets[{}]", idx);
            match &target.source {
                TargetSource::Fixed(color) => {
                    if !color.in_gamut() {
                        return Err(MixerError::invalid_config(
                            parameter,
                            color,
                            format!("channels must lie in [0, {}]", CHANNEL_MAX),
                        ));
                    }
                }
                TargetSource::ReferenceWell(well) => {
                    if !self.plate.build().contains(*well) {
                        return Err(MixerError::invalid_config(
                            parameter,
                            well,
                            "reference well is outside the plate",
                        ));
                    }
                    if well.row < self.targets.len() && well.column < self.max_iterations {
                        return Err(MixerError::invalid_config(
                            parameter,
                            well,
                            "reference well overlaps the experiment wells",
                        ));
                    }
                }
            }
        }
        Ok(())
    }

    fn validate_policy(&self) -> MixerResult<()> {
        let policy = &self.acquisition;
        if !(0.0..=1.0).contains(&policy.early_ratio)
            || !(policy.early_ratio..=1.0).contains(&policy.late_ratio)
        {
            return Err(MixerError::invalid_config(
                "acquisition.late_ratio",
                policy.late_ratio,
                "thresholds must satisfy 0 <= early_ratio <= late_ratio <= 1",
            ));
        }
        let weights = [
            policy.early_weight,
            policy.mid_weight,
            policy.late_weight,
            policy.proximity_weight,
        ];
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(MixerError::invalid_config(
                "acquisition",
                format!("{:?}", weights),
                "weights must be finite and >= 0",
            ));
        }
        if policy.min_trees == 0 || policy.max_trees < policy.min_trees {
            return Err(MixerError::invalid_config(
                "acquisition.max_trees",
                policy.max_trees,
                format!("must be >= min_trees ({}) and min_trees > 0", policy.min_trees),
            ));
        }
        Ok(())
    }

    pub fn optimizer_settings(&self) -> OptimizerSettings {
        OptimizerSettings {
            dye_count: self.dye_count,
            max_volume: self.max_volume,
            step: self.step,
            max_iterations: self.max_iterations,
            candidate_pool_size: self.candidate_pool_size,
            fallback_attempts: self.fallback_attempts,
            policy: self.acquisition.clone(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        let session = RawSession::default();
        Self {
            dye_count: session.dye_count,
            max_volume: session.max_volume,
            step: session.step,
            tolerance: session.tolerance,
            max_iterations: session.max_iterations,
            covering_count: session.covering_count,
            candidate_pool_size: session.candidate_pool_size,
            fallback_attempts: session.fallback_attempts,
            seed: session.seed,
            plate: PlateConfig::default(),
            acquisition: AcquisitionPolicy::default(),
            targets: vec![TargetSpec::fixed("target-1", Color::new(120.0, 80.0, 40.0))],
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawSessionConfig {
    #[serde(default)]
    session: RawSession,
    #[serde(default)]
    plate: RawPlate,
    #[serde(default)]
    acquisition: AcquisitionPolicy,
    #[serde(default)]
    targets: Vec<RawTarget>,
}

#[derive(Debug, Deserialize)]
struct RawSession {
    #[serde(default = "default_dye_count")]
    dye_count: usize,
    #[serde(default = "default_max_volume")]
    max_volume: u32,
    #[serde(default = "default_step")]
    step: u32,
    #[serde(default = "default_tolerance")]
    tolerance: f64,
    #[serde(default = "default_max_iterations")]
    max_iterations: usize,
    #[serde(default = "default_covering_count")]
    covering_count: usize,
    #[serde(default = "default_candidate_pool_size")]
    candidate_pool_size: usize,
    #[serde(default = "default_fallback_attempts")]
    fallback_attempts: usize,
    #[serde(default = "default_seed")]
    seed: u64,
}

impl Default for RawSession {
    fn default() -> Self {
        Self {
            dye_count: default_dye_count(),
            max_volume: default_max_volume(),
            step: default_step(),
            tolerance: default_tolerance(),
            max_iterations: default_max_iterations(),
            covering_count: default_covering_count(),
            candidate_pool_size: default_candidate_pool_size(),
            fallback_attempts: default_fallback_attempts(),
            seed: default_seed(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawPlate {
    #[serde(default = "default_rows")]
    rows: usize,
    #[serde(default = "default_columns")]
    columns: usize,
    #[serde(default = "default_well_capacity")]
    well_capacity: f64,
}

impl Default for RawPlate {
    fn default() -> Self {
        Self {
            rows: default_rows(),
            columns: default_columns(),
            well_capacity: default_well_capacity(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawTarget {
    name: Option<String>,
    rgb: Option<[f64; 3]>,
    reference_well: Option<String>,
}

impl RawTarget {
    fn resolve(&self, idx: usize) -> Result<TargetSpec, ConfigError> {
        let name = self
            .name
            .clone()
            .unwrap_or_else(|| format!("target-{}", idx + 1));
        let source = match (&self.rgb, &self.reference_well) {
            (Some(rgb), None) => TargetSource::Fixed(Color::from(*rgb)),
            (None, Some(label)) => {
                let well = label.parse::<WellId>().map_err(|reason| {
                    ConfigError::Invalid(MixerError::invalid_config(
                        format!("targets[{}].reference_well", idx),
                        label,
                        reason,
                    ))
                })?;
                TargetSource::ReferenceWell(well)
            }
            _ => {
                return Err(ConfigError::Parse(format!(
                    "target '{}' needs exactly one of `rgb` or `reference_well`",
                    name
                )))
            }
        };
        Ok(TargetSpec { name, source })
    }
}

fn default_dye_count() -> usize {
    3
}

fn default_max_volume() -> u32 {
    200
}

fn default_step() -> u32 {
    1
}

fn default_tolerance() -> f64 {
    30.0
}

fn default_max_iterations() -> usize {
    11
}

fn default_covering_count() -> usize {
    4
}

fn default_candidate_pool_size() -> usize {
    50
}

fn default_fallback_attempts() -> usize {
    10_000
}

fn default_seed() -> u64 {
    42
}

fn default_rows() -> usize {
    8
}

fn default_columns() -> usize {
    12
}

fn default_well_capacity() -> f64 {
    360.0
}

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(String),
    Invalid(MixerError),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(err) => write!(f, "IO error: {}", err),
            ConfigError::Parse(err) => write!(f, "Parse error: {}", err),
            ConfigError::Invalid(err) => write!(f, "Invalid config: {}", err),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(value: std::io::Error) -> Self {
        ConfigError::Io(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invalid_parameter(result: Result<SessionConfig, ConfigError>) -> String {
        match result {
            Err(ConfigError::Invalid(MixerError::InvalidConfiguration { parameter, .. })) => {
                parameter
            }
            other => panic!("expected invalid configuration, got {:?}", other),
        }
    }

    #[test]
    fn defaults_when_tables_missing() {
        let config = SessionConfig::from_str("[[targets]]\nrgb = [120, 80, 40]").unwrap();
        assert_eq!(config.dye_count, 3);
        assert_eq!(config.max_volume, 200);
        assert_eq!(config.step, 1);
        assert_eq!(config.tolerance, 30.0);
        assert_eq!(config.max_iterations, 11);
        assert_eq!(config.covering_count, 4);
        assert_eq!(config.plate, PlateConfig::default());
        assert_eq!(config.acquisition, AcquisitionPolicy::default());
        assert_eq!(config.targets[0].name, "target-1");
        assert_eq!(
            config.targets[0].source,
            TargetSource::Fixed(Color::new(120.0, 80.0, 40.0))
        );
    }

    #[test]
    fn parses_full_document() {
        let toml = r#"
            [session]
            dye_count = 4
            max_volume = 300
            step = 10
            tolerance = 12.5
            max_iterations = 10
            seed = 7

            [plate]
            rows = 4
            columns = 12
            well_capacity = 350.0

            [acquisition]
            proximity_weight = 0.1
            max_trees = 40

            [[targets]]
            name = "teal"
            rgb = [20.0, 160.0, 150.0]

            [[targets]]
            name = "sample"
            reference_well = "D12"
        "#;
        let config = SessionConfig::from_str(toml).unwrap();
        assert_eq!(config.dye_count, 4);
        assert_eq!(config.step, 10);
        assert_eq!(config.seed, 7);
        assert_eq!(config.plate.rows, 4);
        assert_eq!(config.acquisition.proximity_weight, 0.1);
        assert_eq!(config.acquisition.max_trees, 40);
        assert_eq!(config.acquisition.min_trees, 10);
        assert_eq!(
            config.targets[1],
            TargetSpec::reference("sample", WellId::new(3, 11))
        );

        let settings = config.optimizer_settings();
        assert_eq!(settings.dye_count, 4);
        assert_eq!(settings.max_volume, 300);
        assert_eq!(settings.policy.max_trees, 40);
    }

    #[test]
    fn rejects_structural_problems() {
        assert_eq!(
            invalid_parameter(SessionConfig::from_str(
                "[session]\ndye_count = 0\n[[targets]]\nrgb = [0, 0, 0]"
            )),
            "dye_count"
        );
        assert_eq!(
            invalid_parameter(SessionConfig::from_str(
                "[session]\nstep = 0\n[[targets]]\nrgb = [0, 0, 0]"
            )),
            "step"
        );
        assert_eq!(
            invalid_parameter(SessionConfig::from_str(
                "[session]\nstep = 3\n[[targets]]\nrgb = [0, 0, 0]"
            )),
            "max_volume"
        );
        assert_eq!(
            invalid_parameter(SessionConfig::from_str(
                "[session]\nmax_volume = 400\n[[targets]]\nrgb = [0, 0, 0]"
            )),
            "max_volume"
        );
        assert_eq!(
            invalid_parameter(SessionConfig::from_str(
                "[session]\nmax_iterations = 13\n[[targets]]\nrgb = [0, 0, 0]"
            )),
            "max_iterations"
        );
        assert_eq!(invalid_parameter(SessionConfig::from_str("")), "targets");
    }

    #[test]
    fn rejects_bad_targets() {
        assert_eq!(
            invalid_parameter(SessionConfig::from_str("[[targets]]\nrgb = [0, 300, 0]")),
            "targets[0]"
        );
        assert_eq!(
            invalid_parameter(SessionConfig::from_str("[[targets]]\nreference_well = \"K1\"")),
            "targets[0]"
        );
        assert_eq!(
            invalid_parameter(SessionConfig::from_str("[[targets]]\nreference_well = \"A3\"")),
            "targets[0]"
        );
        assert!(matches!(
            SessionConfig::from_str("[[targets]]\nname = \"x\""),
            Err(ConfigError::Parse(_))
        ));

        let too_many =
            "[plate]\nrows = 1\n[[targets]]\nrgb = [0, 0, 0]\n[[targets]]\nrgb = [1, 1, 1]";
        assert_eq!(invalid_parameter(SessionConfig::from_str(too_many)), "targets");
    }

    #[test]
    fn rejects_malformed_toml() {
        assert!(matches!(
            SessionConfig::from_str("[session\ndye_count = 3"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn default_config_is_valid() {
        assert!(SessionConfig::default().validate().is_ok());
        let config = SessionConfig::with_targets(vec![
            TargetSpec::fixed("a", Color::new(1.0, 2.0, 3.0)),
            TargetSpec::reference("b", WellId::new(7, 11)),
        ]);
        assert!(config.validate().is_ok());
    }
}
