use std::collections::HashSet;

use chromatic_mixer::{
    default_fitness, distance, generate_diverse_candidates, generate_diverse_covering_combinations,
    optimize_next_experiment, random_combination, within_tolerance, Color, Experiment, Mixture,
    OptimizerSettings, ProposalSource,
};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn assert_valid(mixture: &Mixture, dye_count: usize, step: u32, max_volume: u32) {
    assert_eq!(mixture.dye_count(), dye_count, "{}", mixture);
    assert!(mixture.total() <= max_volume as u64, "{}", mixture);
    assert!(
        mixture.volumes().iter().all(|v| v % step == 0),
        "{} is not aligned to {}",
        mixture,
        step
    );
}

#[test]
fn random_mixtures_are_valid_across_shapes() {
    let shapes = [(1, 1, 200), (3, 1, 200), (3, 5, 200), (5, 10, 300), (8, 25, 100)];
    for (seed, &(dye_count, step, max_volume)) in shapes.iter().enumerate() {
        let mut rng = StdRng::seed_from_u64(seed as u64);
        for _ in 0..200 {
            let m = random_combination(&mut rng, dye_count, step, max_volume);
            assert_valid(&m, dye_count, step, max_volume);
            assert_eq!(m.total(), max_volume as u64);
        }
    }
}

#[test]
fn candidate_pools_are_valid_and_novel() {
    let mut rng = StdRng::seed_from_u64(17);
    let existing: Vec<Mixture> = (0..20)
        .map(|_| random_combination(&mut rng, 4, 10, 200))
        .collect();
    let pool = generate_diverse_candidates(&mut rng, 4, 60, &existing, 200, 10);

    assert!(!pool.is_empty() && pool.len() <= 60);
    let unique: HashSet<&Mixture> = pool.iter().collect();
    assert_eq!(unique.len(), pool.len());
    for m in &pool {
        assert_valid(m, 4, 10, 200);
        assert!(!existing.contains(m), "{} was already tried", m);
    }
}

#[test]
fn covering_batch_uses_multi_dye_mixtures() {
    for seed in 0..10 {
        let mut rng = StdRng::seed_from_u64(seed);
        let batch = generate_diverse_covering_combinations(&mut rng, 3, 4, 200, 1).unwrap();
        assert_eq!(batch.len(), 4);
        for m in &batch {
            assert!(m.active_dyes() >= 2, "{} uses one dye", m);
            assert_valid(m, 3, 1, 200);
        }
    }
}

#[test]
fn cold_start_proposal_has_session_shape() {
    let mut rng = StdRng::seed_from_u64(11);
    let settings = OptimizerSettings::new(3, 200, 1, 11);
    let proposal =
        optimize_next_experiment(&mut rng, &[], Color::new(120.0, 80.0, 40.0), &settings).unwrap();
    assert_eq!(proposal.source, ProposalSource::ColdStart);
    assert_valid(&proposal.mixture, 3, 1, 200);
}

#[test]
fn surrogate_steers_toward_the_better_region() {
    // Color is the share of dye 0 in red; the target is strongly red.
    let response = |m: &Mixture| Color::new(255.0 * m[0] as f64 / m.total() as f64, 0.0, 0.0);
    let target = Color::new(250.0, 0.0, 0.0);
    let history: Vec<Experiment> = [[20, 180], [60, 140], [100, 100], [140, 60], [160, 40]]
        .iter()
        .map(|v| {
            let m = Mixture::new(v.to_vec());
            let c = response(&m);
            Experiment::new(m, c)
        })
        .collect();

    let settings = OptimizerSettings::new(2, 200, 20, 11);
    let mut rng = StdRng::seed_from_u64(5);
    let proposal = optimize_next_experiment(&mut rng, &history, target, &settings).unwrap();

    assert!(proposal.source.is_guided(), "got {}", proposal.source);
    assert!(
        proposal.mixture[0] >= 100,
        "proposed {} away from the best experiments",
        proposal.mixture
    );
}

#[test]
fn fitness_orders_by_distance() {
    let target = Color::new(120.0, 80.0, 40.0);
    let colors = [
        target,
        Color::new(125.0, 80.0, 40.0),
        Color::new(150.0, 60.0, 40.0),
        Color::new(250.0, 10.0, 200.0),
        Color::new(0.0, 255.0, 255.0),
    ];
    assert_eq!(default_fitness(target, target), 1.0);
    for pair in colors.windows(2) {
        assert!(distance(pair[0], target) < distance(pair[1], target));
        assert!(default_fitness(pair[0], target) > default_fitness(pair[1], target));
    }
}

#[test]
fn tolerance_boundary_is_inclusive() {
    let target = Color::new(0.0, 0.0, 0.0);
    let edge = Color::new(30.0, 0.0, 0.0);
    assert!(within_tolerance(edge, target, 30.0));
    assert!(!within_tolerance(edge, target, 29.999));
}
