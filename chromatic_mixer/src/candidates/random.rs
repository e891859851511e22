use rand::Rng;

use crate::data::Mixture;

/// Probability that a dye receives a random share of the remaining budget.
pub const DYE_INCLUSION_PROBABILITY: f64 = 0.7;

/// Draw a random step-aligned mixture that spends the whole budget.
///
/// One dye is picked as primary and seeded with a single step. Each dye, in
/// index order, then receives a random multiple of `step` from the remaining
/// budget with probability [`DYE_INCLUSION_PROBABILITY`]. Whatever is left is
/// added to one randomly chosen dye, so the volumes always sum to
/// `max_volume` when it is a multiple of `step` (and `max_volume >= step`).
pub fn random_combination<R: Rng + ?Sized>(
    rng: &mut R,
    dye_count: usize,
    step: u32,
    max_volume: u32,
) -> Mixture {
    let mut volumes = vec![0u32; dye_count];
    if dye_count == 0 || step == 0 {
        return Mixture::new(volumes);
    }

    let mut remaining = max_volume;
    if remaining >= step {
        let primary = rng.gen_range(0..dye_count);
        volumes[primary] = step;
        remaining -= step;
    }

    for volume in volumes.iter_mut() {
        if remaining == 0 {
            break;
        }
        if rng.gen::<f64>() < DYE_INCLUSION_PROBABILITY {
            let possible_steps = remaining / step;
            if possible_steps > 0 {
                let added = rng.gen_range(0..=possible_steps) * step;
                *volume += added;
                remaining -= added;
            }
        }
    }

    if remaining > 0 {
        let lucky = rng.gen_range(0..dye_count);
        volumes[lucky] += remaining;
    }

    Mixture::new(volumes)
}
