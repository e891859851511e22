//! Structured candidate pools for the surrogate to score.
//!
//! Structural coverage comes first (single-dye extremes, pairwise ratios,
//! triple splits), then random fill. Everything is deduplicated against the
//! experiments already run and against the pool itself.

use std::collections::HashSet;

use rand::Rng;

use super::random::random_combination;
use crate::data::Mixture;

/// Split ratios tried for every unordered pair of dyes.
pub const PAIR_RATIOS: [f64; 3] = [0.2, 0.5, 0.8];

/// Random-fill attempts allowed per still-missing candidate.
pub const RANDOM_FILL_ATTEMPTS_PER_SLOT: usize = 5;

/// Pool builder that tracks what has been seen and stops once full.
struct Pool<'a> {
    seen: HashSet<&'a Mixture>,
    owned: HashSet<Mixture>,
    candidates: Vec<Mixture>,
    capacity: usize,
}

impl<'a> Pool<'a> {
    fn new(existing: &'a [Mixture], capacity: usize) -> Self {
        Self {
            seen: existing.iter().collect(),
            owned: HashSet::new(),
            candidates: Vec::with_capacity(capacity),
            capacity,
        }
    }

    fn is_full(&self) -> bool {
        self.candidates.len() >= self.capacity
    }

    fn remaining(&self) -> usize {
        self.capacity.saturating_sub(self.candidates.len())
    }

    /// Insert if novel. Returns true once the pool is full.
    fn offer(&mut self, candidate: Mixture) -> bool {
        if self.is_full() {
            return true;
        }
        if !self.seen.contains(&candidate) && self.owned.insert(candidate.clone()) {
            self.candidates.push(candidate);
        }
        self.is_full()
    }
}

/// Build up to `n_samples` unique mixtures absent from `existing`.
///
/// Never fails: when deduplication leaves fewer novel mixtures than
/// requested, the shorter pool is returned and the caller decides what to do.
pub fn generate_diverse_candidates<R: Rng + ?Sized>(
    rng: &mut R,
    dye_count: usize,
    n_samples: usize,
    existing: &[Mixture],
    max_volume: u32,
    step: u32,
) -> Vec<Mixture> {
    let mut pool = Pool::new(existing, n_samples);
    if pool.is_full() || dye_count == 0 || step == 0 {
        return pool.candidates;
    }

    for dye in 0..dye_count {
        if pool.offer(Mixture::single(dye_count, dye, max_volume)) {
            return pool.candidates;
        }
    }

    if dye_count >= 2 {
        for i in 0..dye_count {
            for j in (i + 1)..dye_count {
                for ratio in PAIR_RATIOS {
                    let first = ((max_volume as f64 * ratio / step as f64) as u32) * step;
                    let mut volumes = vec![0; dye_count];
                    volumes[i] = first;
                    volumes[j] = max_volume - first;
                    if pool.offer(Mixture::new(volumes)) {
                        return pool.candidates;
                    }
                }
            }
        }
    }

    if dye_count >= 3 {
        let third = (max_volume / 3 / step) * step;
        for i in 0..dye_count {
            for j in (i + 1)..dye_count {
                for k in (j + 1)..dye_count {
                    let mut volumes = vec![0; dye_count];
                    volumes[i] = third;
                    volumes[j] = third;
                    volumes[k] = max_volume - 2 * third;
                    if pool.offer(Mixture::new(volumes)) {
                        return pool.candidates;
                    }
                }
            }
        }
    }

    let mut attempts = 0;
    while !pool.is_full() && attempts < pool.remaining() * RANDOM_FILL_ATTEMPTS_PER_SLOT {
        attempts += 1;
        if pool.offer(random_combination(rng, dye_count, step, max_volume)) {
            break;
        }
    }

    pool.candidates
}
