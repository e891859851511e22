//! Surrogate-guided selection of the next experiment.
//!
//! A bagged tree ensemble is refitted from scratch on every call, mapping
//! scaled dye volumes to fitness against the target. A fresh candidate pool
//! is then ranked by predicted fitness plus an uncertainty bonus plus a
//! proximity bonus toward the best experiments seen so far.
//!
//! Model failures never abort the search. They produce a random mixture
//! tagged with [`ProposalSource::Fallback`] so callers can tell a degraded
//! step from a guided one.

pub mod acquisition;
pub mod forest;
pub mod scaler;

pub use acquisition::AcquisitionPolicy;
pub use forest::{ForestParams, RandomForest, RegressionTree};
pub use scaler::MinMaxScaler;

use std::collections::HashSet;
use std::fmt;

use ndarray::{Array1, Array2};
use rand::Rng;

use crate::candidates::{generate_diverse_candidates, random_combination};
use crate::color::{default_fitness, Color};
use crate::data::{Experiment, Mixture};
use crate::error::{MixerError, MixerResult, SurrogateError};

/// Search-space and budget parameters for [`optimize_next_experiment`].
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizerSettings {
    pub dye_count: usize,
    pub max_volume: u32,
    pub step: u32,
    pub max_iterations: usize,
    /// Upper bound on the candidate pool scored per call.
    pub candidate_pool_size: usize,
    /// Random draws allowed when the pool is empty before giving up.
    pub fallback_attempts: usize,
    pub policy: AcquisitionPolicy,
}

impl OptimizerSettings {
    pub fn new(dye_count: usize, max_volume: u32, step: u32, max_iterations: usize) -> Self {
        Self {
            dye_count,
            max_volume,
            step,
            max_iterations,
            candidate_pool_size: 50,
            fallback_attempts: 10_000,
            policy: AcquisitionPolicy::default(),
        }
    }
}

/// How a proposed mixture was chosen.
#[derive(Debug, Clone, PartialEq)]
pub enum ProposalSource {
    /// No history yet; drawn at random.
    ColdStart,
    /// Ranked first by the acquisition function.
    Surrogate {
        predicted: f64,
        uncertainty: f64,
        acquisition: f64,
        pool_size: usize,
    },
    /// The model could not be fitted or queried; drawn at random.
    Fallback(SurrogateError),
    /// Every pooled candidate was already tried; a novel random draw.
    PoolExhausted,
}

impl ProposalSource {
    pub fn label(&self) -> &'static str {
        match self {
            ProposalSource::ColdStart => "cold_start",
            ProposalSource::Surrogate { .. } => "surrogate",
            ProposalSource::Fallback(_) => "fallback",
            ProposalSource::PoolExhausted => "pool_exhausted",
        }
    }

    pub fn is_guided(&self) -> bool {
        matches!(self, ProposalSource::Surrogate { .. })
    }
}

impl fmt::Display for ProposalSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProposalSource::Surrogate {
                predicted,
                uncertainty,
                acquisition,
                pool_size,
            } => write!(
                f,
                "surrogate (predicted {:.4}, variance {:.4}, score {:.4}, pool {})",
                predicted, uncertainty, acquisition, pool_size
            ),
            ProposalSource::Fallback(err) => write!(f, "fallback ({})", err),
            other => f.write_str(other.label()),
        }
    }
}

/// The next mixture to dispense and why it was chosen.
#[derive(Debug, Clone, PartialEq)]
pub struct Proposal {
    pub mixture: Mixture,
    pub source: ProposalSource,
}

impl Proposal {
    fn new(mixture: Mixture, source: ProposalSource) -> Self {
        Self { mixture, source }
    }
}

/// Choose the next mixture to try for `target` given the experiments so far.
///
/// Returns an error only when the history disagrees with `settings.dye_count`
/// or when every reachable mixture has already been tried.
pub fn optimize_next_experiment<R: Rng + ?Sized>(
    rng: &mut R,
    history: &[Experiment],
    target: Color,
    settings: &OptimizerSettings,
) -> MixerResult<Proposal> {
    if history.is_empty() {
        let mixture =
            random_combination(rng, settings.dye_count, settings.step, settings.max_volume);
        return Ok(Proposal::new(mixture, ProposalSource::ColdStart));
    }

    if let Some(bad) = history
        .iter()
        .find(|e| e.mixture.dye_count() != settings.dye_count)
    {
        return Err(MixerError::dimension_mismatch(
            settings.dye_count,
            bad.mixture.dye_count(),
            "experiment history",
        ));
    }

    let labels: Array1<f64> = history
        .iter()
        .map(|e| default_fitness(e.color, target))
        .collect();
    let features = feature_matrix(history.iter().map(|e| &e.mixture), settings.dye_count);

    let forest_params = ForestParams {
        n_trees: settings.policy.ensemble_size(history.len()),
        seed: settings.policy.seed,
        ..ForestParams::default()
    };
    let fitted = MinMaxScaler::fit(features.view()).and_then(|scaler| {
        let scaled = scaler.transform(features.view())?;
        let forest = RandomForest::fit(scaled.view(), labels.view(), &forest_params)?;
        Ok((scaler, scaled, forest))
    });
    let (scaler, scaled_history, forest) = match fitted {
        Ok(model) => model,
        Err(err) => return Ok(fallback(rng, settings, err)),
    };

    let tried: Vec<Mixture> = history.iter().map(|e| e.mixture.clone()).collect();
    let pool = generate_diverse_candidates(
        rng,
        settings.dye_count,
        settings.candidate_pool_size,
        &tried,
        settings.max_volume,
        settings.step,
    );
    if pool.is_empty() {
        return novel_random(rng, &tried, settings);
    }

    let candidates = feature_matrix(pool.iter(), settings.dye_count);
    let scored = scaler
        .transform(candidates.view())
        .and_then(|scaled| {
            let (mean, variance) = forest.predict_with_uncertainty(scaled.view())?;
            Ok((scaled, mean, variance))
        });
    let (scaled_pool, predicted, uncertainty) = match scored {
        Ok(scores) => scores,
        Err(err) => return Ok(fallback(rng, settings, err)),
    };

    let policy = &settings.policy;
    let weight = policy.exploration_weight(history.len(), settings.max_iterations);
    let anchors: Vec<usize> = if policy.uses_proximity(history.len()) {
        top_indices(&labels, policy.proximity_neighbours)
    } else {
        Vec::new()
    };

    let scores: Vec<f64> = (0..pool.len())
        .map(|i| {
            let base = policy.base_score(predicted[i], uncertainty[i], weight);
            let bonus = policy.proximity_bonus(
                scaled_pool.row(i),
                anchors.iter().map(|&a| scaled_history.row(a)),
            );
            base + bonus
        })
        .collect();

    let Some(best) = first_max(&scores) else {
        return Ok(fallback(
            rng,
            settings,
            SurrogateError::NonFinitePrediction { candidate: 0 },
        ));
    };

    tracing::debug!(
        pool = pool.len(),
        trees = forest.n_trees(),
        weight,
        acquisition = scores[best],
        "surrogate proposal {}",
        pool[best]
    );

    Ok(Proposal::new(
        pool[best].clone(),
        ProposalSource::Surrogate {
            predicted: predicted[best],
            uncertainty: uncertainty[best],
            acquisition: scores[best],
            pool_size: pool.len(),
        },
    ))
}

fn feature_matrix<'a, I>(mixtures: I, dye_count: usize) -> Array2<f64>
where
    I: IntoIterator<Item = &'a Mixture>,
{
    let flat: Vec<f64> = mixtures.into_iter().flat_map(|m| m.features()).collect();
    let rows = flat.len() / dye_count.max(1);
    Array2::from_shape_vec((rows, dye_count), flat)
        .unwrap_or_else(|_| Array2::zeros((0, dye_count)))
}

fn fallback<R: Rng + ?Sized>(
    rng: &mut R,
    settings: &OptimizerSettings,
    err: SurrogateError,
) -> Proposal {
    tracing::warn!("surrogate unavailable, proposing a random mixture: {}", err);
    let mixture = random_combination(rng, settings.dye_count, settings.step, settings.max_volume);
    Proposal::new(mixture, ProposalSource::Fallback(err))
}

fn novel_random<R: Rng + ?Sized>(
    rng: &mut R,
    tried: &[Mixture],
    settings: &OptimizerSettings,
) -> MixerResult<Proposal> {
    let seen: HashSet<&Mixture> = tried.iter().collect();
    for _ in 0..settings.fallback_attempts {
        let candidate =
            random_combination(rng, settings.dye_count, settings.step, settings.max_volume);
        if !seen.contains(&candidate) {
            tracing::warn!("candidate pool exhausted, proposing novel mixture {}", candidate);
            return Ok(Proposal::new(candidate, ProposalSource::PoolExhausted));
        }
    }
    Err(MixerError::exhausted(
        "novel mixture search",
        settings.fallback_attempts,
    ))
}

/// Indices of the `k` largest labels, best first. Equal labels keep
/// history order.
fn top_indices(labels: &Array1<f64>, k: usize) -> Vec<usize> {
    let mut order: Vec<usize> = (0..labels.len()).collect();
    order.sort_by(|&a, &b| labels[b].total_cmp(&labels[a]));
    order.truncate(k);
    order
}

/// Index of the first maximal finite score.
fn first_max(scores: &[f64]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (idx, &score) in scores.iter().enumerate() {
        if !score.is_finite() {
            continue;
        }
        match best {
            Some(b) if scores[b] >= score => {}
            _ => best = Some(idx),
        }
    }
    best
}
