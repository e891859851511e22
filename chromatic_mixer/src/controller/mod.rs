//! Per-target state machine and the session that sequences targets.

pub mod session;
pub mod target;

pub use session::{ExperimentReport, Session, StepOutcome};
pub use target::{BestMatch, Target, TargetPhase, TargetSummary, Verdict};
