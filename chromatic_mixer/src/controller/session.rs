//! The search session: an ordered queue of targets driven one tick at a time.
//!
//! Each call to [`Session::step`] performs at most one experiment on the
//! active target, or closes it once its iteration budget is spent. The
//! caller owns the loop, so a session can be paused, checkpointed and
//! resumed between ticks.

use std::path::Path;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use super::target::{Target, TargetPhase, TargetSummary, Verdict};
use crate::bench::{MixingBench, WellId};
use crate::candidates::generate_diverse_covering_combinations;
use crate::checkpoint::{CheckpointError, Checkpointable};
use crate::color::{distance, within_tolerance, Color};
use crate::config::{SessionConfig, TargetSource};
use crate::data::{Experiment, Mixture};
use crate::error::{MixerError, MixerResult};
use crate::journal::{ExperimentJournal, JournalEntry, JournalEvent};
use crate::surrogate::{optimize_next_experiment, OptimizerSettings, ProposalSource};

/// One measured experiment, as reported by [`Session::step`].
#[derive(Debug, Clone, PartialEq)]
pub struct ExperimentReport {
    pub target: usize,
    pub target_name: String,
    pub well: WellId,
    pub iteration: usize,
    pub mixture: Mixture,
    pub color: Color,
    pub distance: f64,
    /// `Covering` or `Surrogate`.
    pub phase: TargetPhase,
    /// Set when the surrogate optimizer chose the mixture.
    pub source: Option<ProposalSource>,
    /// The experiment became the target's best match.
    pub improved: bool,
    pub matched: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    Experiment(ExperimentReport),
    /// The active target ran out of iterations or novel mixtures.
    TargetFinished(TargetSummary),
    /// Every target is complete.
    Complete,
}

pub struct Session {
    config: SessionConfig,
    settings: OptimizerSettings,
    targets: Vec<Target>,
    cursor: usize,
    tick: u64,
    journal: Option<ExperimentJournal>,
}

impl Session {
    /// Validate `config` and queue one pending target per entry.
    pub fn new(config: SessionConfig) -> MixerResult<Self> {
        config.validate()?;
        let targets = config
            .targets
            .iter()
            .enumerate()
            .map(|(idx, spec)| Target::new(idx, spec))
            .collect();
        Ok(Self {
            settings: config.optimizer_settings(),
            config,
            targets,
            cursor: 0,
            tick: 0,
            journal: None,
        })
    }

    pub fn with_journal(mut self, journal: ExperimentJournal) -> Self {
        self.journal = Some(journal);
        self
    }

    pub fn journal(&self) -> Option<&ExperimentJournal> {
        self.journal.as_ref()
    }

    pub fn take_journal(&mut self) -> Option<ExperimentJournal> {
        self.journal.take()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn targets(&self) -> &[Target] {
        &self.targets
    }

    /// Index of the target the next tick works on.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Ticks completed so far.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn active_target(&self) -> Option<&Target> {
        self.targets[self.cursor..].iter().find(|t| !t.is_complete())
    }

    pub fn is_complete(&self) -> bool {
        self.targets.iter().all(Target::is_complete)
    }

    /// Summaries of every completed target, in queue order.
    pub fn summaries(&self) -> Vec<TargetSummary> {
        self.targets.iter().filter_map(Target::summary).collect()
    }

    /// Advance the search by one tick.
    ///
    /// A bench failure is returned as [`MixerError::Bench`] and records no
    /// experiment. If dispensing succeeded but reading failed, the next call
    /// reads the same well again instead of dispensing a new mixture.
    pub fn step<B>(&mut self, bench: &mut B) -> MixerResult<StepOutcome>
    where
        B: MixingBench + ?Sized,
    {
        while self.cursor < self.targets.len() && self.targets[self.cursor].is_complete() {
            self.cursor += 1;
        }
        if self.cursor >= self.targets.len() {
            return Ok(StepOutcome::Complete);
        }

        let idx = self.cursor;
        let mut rng = StdRng::seed_from_u64(tick_seed(self.config.seed, self.tick));

        if self.targets[idx].phase() == TargetPhase::Pending {
            self.activate(idx, bench, &mut rng)?;
        }
        let Some(target_color) = self.targets[idx].color() else {
            return Err(MixerError::invalid_config(
                format!("targets[{}]", idx),
                self.targets[idx].source(),
                "target color was not resolved",
            ));
        };

        let iteration = self.targets[idx].iteration();
        if iteration >= self.config.max_iterations {
            return self.finish_active(Verdict::Exhausted, "iteration budget spent");
        }

        let well = self.config.plate.well_for(idx, iteration);
        let phase = self.targets[idx].phase_for_iteration();

        let (mixture, source) = match self.targets[idx].pending().cloned() {
            Some(mixture) => {
                tracing::debug!("re-reading {} for pending mixture {}", well, mixture);
                (mixture, None)
            }
            None => {
                let (mixture, source) = match self.choose(idx, phase, target_color, &mut rng) {
                    Ok(choice) => choice,
                    Err(MixerError::ExhaustedSearchSpace { context, attempts }) => {
                        tracing::warn!(
                            "No novel mixture for target {} after {} attempts in {}",
                            self.targets[idx].name(),
                            attempts,
                            context
                        );
                        return self.finish_active(Verdict::Exhausted, "search space exhausted");
                    }
                    Err(err) => return Err(err),
                };
                mixture.validate(self.config.dye_count, self.config.step, self.config.max_volume)?;
                bench
                    .apply_mixture(well, &mixture)
                    .map_err(|err| MixerError::bench("apply_mixture", &err))?;
                self.targets[idx].set_pending(mixture.clone());
                (mixture, source)
            }
        };

        let color = bench
            .read_color(well)
            .map_err(|err| MixerError::bench("read_color", &err))?;
        let dist = distance(color, target_color);
        let matched = within_tolerance(color, target_color, self.config.tolerance);

        let target = &mut self.targets[idx];
        let improved = target.record(Experiment::new(mixture.clone(), color), dist);
        if matched {
            target.finish(Verdict::Matched);
        } else {
            target.advance();
        }
        let target_name = target.name().to_string();

        tracing::debug!(
            "{} #{} in {}: {} -> {} (distance {:.2}, {})",
            target_name,
            iteration,
            well,
            mixture,
            color,
            dist,
            source.as_ref().map_or(phase.as_str(), ProposalSource::label)
        );

        let mut entry = JournalEntry::new(self.tick, idx, &target_name, JournalEvent::Experiment);
        entry.well = Some(well.to_string());
        entry.mixture = Some(mixture.volumes().to_vec());
        entry.color = Some(color.channels());
        entry.distance = Some(dist);
        entry.source = Some(
            source
                .as_ref()
                .map_or_else(|| phase.as_str().to_string(), |s| s.to_string()),
        );
        self.journal_record(entry);

        if matched {
            tracing::info!(
                "Target {} matched after {} experiments (distance {:.2})",
                target_name,
                iteration + 1,
                dist
            );
            let mut entry = JournalEntry::new(self.tick, idx, &target_name, JournalEvent::Matched);
            entry.distance = Some(dist);
            self.journal_record(entry);
            self.cursor += 1;
        }
        self.tick += 1;

        Ok(StepOutcome::Experiment(ExperimentReport {
            target: idx,
            target_name,
            well,
            iteration,
            mixture,
            color,
            distance: dist,
            phase,
            source,
            improved,
            matched,
        }))
    }

    /// Step until every target is complete and return their summaries.
    pub fn run<B>(&mut self, bench: &mut B) -> MixerResult<Vec<TargetSummary>>
    where
        B: MixingBench + ?Sized,
    {
        while self.step(bench)? != StepOutcome::Complete {}
        Ok(self.summaries())
    }

    fn activate<B>(&mut self, idx: usize, bench: &mut B, rng: &mut StdRng) -> MixerResult<()>
    where
        B: MixingBench + ?Sized,
    {
        let color = match self.targets[idx].source() {
            TargetSource::Fixed(color) => *color,
            TargetSource::ReferenceWell(well) => bench
                .read_color(*well)
                .map_err(|err| MixerError::bench("read_color", &err))?,
        };

        let covering = match generate_diverse_covering_combinations(
            rng,
            self.config.dye_count,
            self.config.covering_count,
            self.config.max_volume,
            self.config.step,
        ) {
            Ok(covering) => covering,
            Err(err) => {
                tracing::warn!(
                    "No covering batch for target {}; starting with surrogate guidance: {}",
                    self.targets[idx].name(),
                    err
                );
                Vec::new()
            }
        };

        let target = &mut self.targets[idx];
        target.begin(color, covering);
        tracing::info!(
            "Target {} ({}) active: matching {} via {} on {}",
            target.name(),
            idx,
            color,
            target.source(),
            bench.name()
        );

        let mut entry = JournalEntry::new(self.tick, idx, target.name(), JournalEvent::Activated);
        entry.color = Some(color.channels());
        entry.details = format!("{} covering mixtures", target.covering().len());
        self.journal_record(entry);
        Ok(())
    }

    fn choose(
        &self,
        idx: usize,
        phase: TargetPhase,
        target_color: Color,
        rng: &mut StdRng,
    ) -> MixerResult<(Mixture, Option<ProposalSource>)> {
        let target = &self.targets[idx];
        if phase == TargetPhase::Covering {
            if let Some(mixture) = target.covering().get(target.iteration()) {
                return Ok((mixture.clone(), None));
            }
        }
        let proposal =
            optimize_next_experiment(rng, target.history(), target_color, &self.settings)?;
        Ok((proposal.mixture, Some(proposal.source)))
    }

    fn finish_active(&mut self, verdict: Verdict, reason: &str) -> MixerResult<StepOutcome> {
        let idx = self.cursor;
        let target = &mut self.targets[idx];
        target.finish(verdict);
        let summary = target.summary().ok_or_else(|| {
            MixerError::invalid_config(
                format!("targets[{}]", idx),
                target.name(),
                "finished before its color was resolved",
            )
        })?;

        tracing::info!(
            "Target {} {}: {} (best distance {:.2})",
            summary.name,
            reason,
            summary.experiments,
            summary.best_distance()
        );

        let event = match verdict {
            Verdict::Matched => JournalEvent::Matched,
            Verdict::Exhausted => JournalEvent::Exhausted,
        };
        let mut entry = JournalEntry::new(self.tick, idx, &summary.name, event);
        entry.distance = summary.best.as_ref().map(|b| b.distance);
        entry.mixture = summary.best.as_ref().map(|b| b.mixture.volumes().to_vec());
        entry.details = reason.to_string();
        self.journal_record(entry);

        self.cursor += 1;
        self.tick += 1;
        Ok(StepOutcome::TargetFinished(summary))
    }

    fn journal_record(&mut self, entry: JournalEntry) {
        if let Some(journal) = self.journal.as_mut() {
            if let Err(err) = journal.record(entry) {
                tracing::warn!("Failed to append journal entry: {}", err);
            }
        }
    }
}

/// Per-tick RNG seed, so a resumed session draws the same numbers.
fn tick_seed(seed: u64, tick: u64) -> u64 {
    seed ^ (tick + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

#[derive(Serialize, Deserialize)]
struct SessionCheckpoint {
    config: SessionConfig,
    targets: Vec<Target>,
    cursor: usize,
    tick: u64,
}

impl Checkpointable for Session {
    const FORMAT_VERSION: u32 = 1;

    fn save_checkpoint<P: AsRef<Path>>(&self, path: P) -> Result<(), CheckpointError> {
        let snapshot = SessionCheckpoint {
            config: self.config.clone(),
            targets: self.targets.clone(),
            cursor: self.cursor,
            tick: self.tick,
        };
        Self::write_snapshot(&snapshot, path)
    }

    fn load_checkpoint<P: AsRef<Path>>(path: P) -> Result<Self, CheckpointError> {
        let snapshot: SessionCheckpoint = Self::read_snapshot(path)?;
        if snapshot.targets.len() != snapshot.config.targets.len() {
            return Err(CheckpointError::InvalidFormat(
                "target state count does not match configured targets".to_string(),
            ));
        }
        if snapshot.cursor > snapshot.targets.len() {
            return Err(CheckpointError::InvalidFormat(format!(
                "cursor {} beyond {} targets",
                snapshot.cursor,
                snapshot.targets.len()
            )));
        }

        let mut session = Session::new(snapshot.config)?;
        session.targets = snapshot.targets;
        session.cursor = snapshot.cursor;
        session.tick = snapshot.tick;
        Ok(session)
    }
}
