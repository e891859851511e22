//! Per-target search state.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::color::Color;
use crate::config::{TargetSource, TargetSpec};
use crate::data::{Experiment, Mixture};

/// Where a target is in its search.
///
/// `Pending -> Covering -> Surrogate -> Matched | Exhausted`. A target whose
/// covering batch is empty goes straight from `Pending` to `Surrogate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetPhase {
    Pending,
    Covering,
    Surrogate,
    Matched,
    Exhausted,
}

impl TargetPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, TargetPhase::Matched | TargetPhase::Exhausted)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TargetPhase::Pending => "pending",
            TargetPhase::Covering => "covering",
            TargetPhase::Surrogate => "surrogate",
            TargetPhase::Matched => "matched",
            TargetPhase::Exhausted => "exhausted",
        }
    }
}

impl fmt::Display for TargetPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Final outcome of a completed target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    Matched,
    Exhausted,
}

impl Verdict {
    fn phase(self) -> TargetPhase {
        match self {
            Verdict::Matched => TargetPhase::Matched,
            Verdict::Exhausted => TargetPhase::Exhausted,
        }
    }
}

/// Closest experiment so far.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestMatch {
    pub mixture: Mixture,
    pub color: Color,
    pub distance: f64,
}

/// One independent color-matching problem and its search history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Target {
    index: usize,
    name: String,
    source: TargetSource,
    color: Option<Color>,
    phase: TargetPhase,
    iteration: usize,
    history: Vec<Experiment>,
    best: Option<BestMatch>,
    covering: Vec<Mixture>,
    /// Dispensed but not yet measured.
    pending: Option<Mixture>,
}

impl Target {
    /// Pending target at queue position `index`. Fixed colors are known
    /// immediately; reference wells are read on activation.
    pub fn new(index: usize, spec: &TargetSpec) -> Self {
        let color = match spec.source {
            TargetSource::Fixed(color) => Some(color),
            TargetSource::ReferenceWell(_) => None,
        };
        Self {
            index,
            name: spec.name.clone(),
            source: spec.source.clone(),
            color,
            phase: TargetPhase::Pending,
            iteration: 0,
            history: Vec::new(),
            best: None,
            covering: Vec::new(),
            pending: None,
        }
    }

    /// Position in the session queue, also the plate row of its experiments.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Human-readable label from the configuration.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Where the target color comes from.
    pub fn source(&self) -> &TargetSource {
        &self.source
    }

    /// The color being matched, once known.
    pub fn color(&self) -> Option<Color> {
        self.color
    }

    /// Current search phase.
    pub fn phase(&self) -> TargetPhase {
        self.phase
    }

    /// Experiments completed so far; the next experiment uses this column.
    pub fn iteration(&self) -> usize {
        self.iteration
    }

    /// Measured experiments in the order they were run.
    pub fn history(&self) -> &[Experiment] {
        &self.history
    }

    /// Closest experiment so far, if any.
    pub fn best(&self) -> Option<&BestMatch> {
        self.best.as_ref()
    }

    /// Distance of the best experiment, or infinity before the first one.
    pub fn best_distance(&self) -> f64 {
        self.best.as_ref().map_or(f64::INFINITY, |b| b.distance)
    }

    /// Covering mixtures planned on activation, tried before surrogate guidance.
    pub fn covering(&self) -> &[Mixture] {
        &self.covering
    }

    /// True once the target has matched or exhausted its budget.
    pub fn is_complete(&self) -> bool {
        self.phase.is_terminal()
    }

    /// Final outcome, or `None` while the search is still running.
    pub fn verdict(&self) -> Option<Verdict> {
        match self.phase {
            TargetPhase::Matched => Some(Verdict::Matched),
            TargetPhase::Exhausted => Some(Verdict::Exhausted),
            _ => None,
        }
    }

    pub(crate) fn pending(&self) -> Option<&Mixture> {
        self.pending.as_ref()
    }

    /// Leave `Pending` with a resolved color and covering batch.
    pub(crate) fn begin(&mut self, color: Color, covering: Vec<Mixture>) {
        self.color = Some(color);
        self.covering = covering;
        self.iteration = 0;
        self.phase = self.phase_for_iteration();
    }

    /// Phase that chooses the mixture for the current iteration.
    pub(crate) fn phase_for_iteration(&self) -> TargetPhase {
        if self.iteration < self.covering.len() {
            TargetPhase::Covering
        } else {
            TargetPhase::Surrogate
        }
    }

    pub(crate) fn set_pending(&mut self, mixture: Mixture) {
        self.pending = Some(mixture);
    }

    /// Append a measured experiment. Returns true if it is the new best.
    pub(crate) fn record(&mut self, experiment: Experiment, distance: f64) -> bool {
        self.pending = None;
        let improved = distance < self.best_distance();
        if improved {
            self.best = Some(BestMatch {
                mixture: experiment.mixture.clone(),
                color: experiment.color,
                distance,
            });
        }
        self.history.push(experiment);
        improved
    }

    /// Move on to the next iteration after an unmatched experiment.
    pub(crate) fn advance(&mut self) {
        self.iteration += 1;
        self.phase = self.phase_for_iteration();
    }

    pub(crate) fn finish(&mut self, verdict: Verdict) {
        if !self.is_complete() {
            self.phase = verdict.phase();
        }
    }

    /// Final report, available once the target is complete.
    pub fn summary(&self) -> Option<TargetSummary> {
        Some(TargetSummary {
            index: self.index,
            name: self.name.clone(),
            color: self.color?,
            verdict: self.verdict()?,
            best: self.best.clone(),
            experiments: self.history.len(),
        })
    }
}

/// Outcome of one target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetSummary {
    pub index: usize,
    pub name: String,
    pub color: Color,
    pub verdict: Verdict,
    pub best: Option<BestMatch>,
    pub experiments: usize,
}

impl TargetSummary {
    pub fn best_distance(&self) -> f64 {
        self.best.as_ref().map_or(f64::INFINITY, |b| b.distance)
    }
}

impl fmt::Display for TargetSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}): {:?} after {} experiments",
            self.name, self.color, self.verdict, self.experiments
        )?;
        if let Some(best) = &self.best {
            write!(
                f,
                ", best {} -> {} at distance {:.2}",
                best.mixture, best.color, best.distance
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bench::WellId;

    fn fixed_target() -> Target {
        Target::new(0, &TargetSpec::fixed("t", Color::new(10.0, 20.0, 30.0)))
    }

    fn experiment(volumes: Vec<u32>, color: Color) -> Experiment {
        Experiment::new(Mixture::new(volumes), color)
    }

    #[test]
    fn new_target_is_pending() {
        let target = fixed_target();
        assert_eq!(target.phase(), TargetPhase::Pending);
        assert_eq!(target.best_distance(), f64::INFINITY);
        assert!(target.summary().is_none());

        let reference = Target::new(1, &TargetSpec::reference("r", WellId::new(1, 11)));
        assert_eq!(reference.color(), None);
    }

    #[test]
    fn covering_then_surrogate() {
        let mut target = fixed_target();
        target.begin(
            Color::new(10.0, 20.0, 30.0),
            vec![Mixture::new(vec![1, 1]), Mixture::new(vec![2, 0])],
        );
        assert_eq!(target.phase(), TargetPhase::Covering);
        target.advance();
        assert_eq!(target.phase(), TargetPhase::Covering);
        target.advance();
        assert_eq!(target.phase(), TargetPhase::Surrogate);
        assert_eq!(target.iteration(), 2);
    }

    #[test]
    fn empty_covering_starts_in_surrogate() {
        let mut target = fixed_target();
        target.begin(Color::new(0.0, 0.0, 0.0), Vec::new());
        assert_eq!(target.phase(), TargetPhase::Surrogate);
    }

    #[test]
    fn best_only_improves() {
        let mut target = fixed_target();
        target.begin(Color::new(0.0, 0.0, 0.0), Vec::new());
        assert!(target.record(experiment(vec![1, 0], Color::new(5.0, 0.0, 0.0)), 5.0));
        assert!(!target.record(experiment(vec![0, 1], Color::new(9.0, 0.0, 0.0)), 9.0));
        assert!(!target.record(experiment(vec![2, 0], Color::new(5.0, 0.0, 0.0)), 5.0));
        assert!(target.record(experiment(vec![1, 1], Color::new(1.0, 0.0, 0.0)), 1.0));

        assert_eq!(target.history().len(), 4);
        let best = target.best().unwrap();
        assert_eq!(best.mixture, Mixture::new(vec![1, 1]));
        assert_eq!(best.distance, 1.0);
    }

    #[test]
    fn terminal_phase_is_never_reopened() {
        let mut target = fixed_target();
        target.begin(Color::new(0.0, 0.0, 0.0), Vec::new());
        target.finish(Verdict::Matched);
        target.finish(Verdict::Exhausted);
        assert_eq!(target.phase(), TargetPhase::Matched);
        assert_eq!(target.summary().unwrap().verdict, Verdict::Matched);
    }
}
