//! # Chromatic Mixer
//!
//! Closed-loop, active-learning search for liquid-dye mixtures that reproduce
//! target RGB colors. A mixture is a vector of per-dye volumes; each
//! experiment dispenses one into a plate well and measures the resulting
//! color. Per target, a batch of multi-dye covering mixtures is tried first,
//! then a bagged regression-tree surrogate proposes each next mixture until
//! the color is within tolerance or the iteration budget is spent.
//!
//! ## Quick Start
//!
//! ```rust
//! use chromatic_mixer::{
//!     Color, DyeBlend, Plate, Session, SessionConfig, SimulatedBench, TargetSpec,
//! };
//!
//! let config = SessionConfig::with_targets(vec![TargetSpec::fixed(
//!     "ochre",
//!     Color::new(120.0, 80.0, 40.0),
//! )]);
//! let blend = DyeBlend::new(vec![
//!     Color::new(160.0, 90.0, 35.0),
//!     Color::new(100.0, 105.0, 45.0),
//!     Color::new(100.0, 45.0, 40.0),
//! ]);
//! let mut bench = SimulatedBench::new(Plate::standard_96(), blend.into_response());
//!
//! let mut session = Session::new(config).unwrap();
//! for summary in session.run(&mut bench).unwrap() {
//!     println!("{}", summary);
//! }
//! ```
//!
//! ## Core Modules
//!
//! - [`color`] - Color values, distance and fitness scoring
//! - [`candidates`] - Random, structured and covering mixture generation
//! - [`surrogate`] - Tree-ensemble surrogate and next-experiment selection
//! - [`controller`] - Target state machine and session stepping
//! - [`bench`] - Dispense/measure collaborator trait and simulated bench
//! - [`config`] - Session configuration via TOML
//! - [`journal`] - JSON line-delimited experiment journal

pub mod bench;
pub mod candidates;
pub mod checkpoint;
pub mod color;
pub mod config;
pub mod controller;
pub mod data;
pub mod error;
pub mod journal;
pub mod surrogate;

pub use bench::{volumes_as_rgb, DyeBlend, MixingBench, Plate, SimulatedBench, WellId};
pub use candidates::{
    generate_diverse_candidates, generate_diverse_covering_combinations, random_combination,
};
pub use checkpoint::{CheckpointError, Checkpointable};
pub use color::{default_fitness, distance, fitness, within_tolerance, Color, MAX_COLOR_DISTANCE};
pub use config::{ConfigError, PlateConfig, SessionConfig, TargetSource, TargetSpec};
pub use controller::{
    BestMatch, ExperimentReport, Session, StepOutcome, Target, TargetPhase, TargetSummary,
    Verdict,
};
pub use data::{Experiment, Mixture};
pub use error::{MixerError, MixerResult, SurrogateError};
pub use journal::{ExperimentJournal, JournalEntry, JournalEvent};
pub use surrogate::{
    optimize_next_experiment, AcquisitionPolicy, OptimizerSettings, Proposal, ProposalSource,
};
