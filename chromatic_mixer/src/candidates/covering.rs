use std::collections::BTreeSet;

use rand::Rng;

use super::random::random_combination;
use crate::data::Mixture;
use crate::error::{MixerError, MixerResult};

/// Draws spent preferring mixtures that introduce an uncovered dye.
pub const COVERAGE_PHASE_ATTEMPTS: usize = 1000;

/// Additional draws allowed to top the batch up with any multi-dye mixture.
pub const FILL_PHASE_ATTEMPTS: usize = 10_000;

/// Build `n_combinations` distinct mixtures that each use at least two dyes.
///
/// The first phase only accepts a mixture when it brings in a dye none of
/// the accepted mixtures use yet (the very first multi-dye draw is always
/// accepted), which spreads the batch across the palette. Once every dye is
/// covered, or after [`COVERAGE_PHASE_ATTEMPTS`] draws, the batch is topped up
/// with any distinct multi-dye mixture. A palette that cannot produce enough
/// of those within [`FILL_PHASE_ATTEMPTS`] draws (a single dye, or a budget of
/// one step) is reported as [`MixerError::ExhaustedSearchSpace`].
pub fn generate_diverse_covering_combinations<R: Rng + ?Sized>(
    rng: &mut R,
    dye_count: usize,
    n_combinations: usize,
    max_volume: u32,
    step: u32,
) -> MixerResult<Vec<Mixture>> {
    let mut combinations: Vec<Mixture> = Vec::with_capacity(n_combinations);
    let mut covered: BTreeSet<usize> = BTreeSet::new();

    let mut attempts = 0;
    while combinations.len() < n_combinations && attempts < COVERAGE_PHASE_ATTEMPTS {
        attempts += 1;
        let candidate = random_combination(rng, dye_count, step, max_volume);
        if candidate.active_dyes() < 2 {
            continue;
        }

        let brings_new_dye = candidate.active_indices().any(|dye| !covered.contains(&dye));
        if (brings_new_dye || combinations.is_empty()) && !combinations.contains(&candidate) {
            covered.extend(candidate.active_indices());
            combinations.push(candidate);
        }

        if covered.len() == dye_count {
            break;
        }
    }

    let mut fill_attempts = 0;
    while combinations.len() < n_combinations {
        if fill_attempts >= FILL_PHASE_ATTEMPTS {
            return Err(MixerError::exhausted(
                format!(
                    "covering combinations ({} of {} found)",
                    combinations.len(),
                    n_combinations
                ),
                attempts + fill_attempts,
            ));
        }
        fill_attempts += 1;

        let candidate = random_combination(rng, dye_count, step, max_volume);
        if candidate.active_dyes() >= 2 && !combinations.contains(&candidate) {
            combinations.push(candidate);
        }
    }

    Ok(combinations)
}
