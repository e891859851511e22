use chromatic_mixer::{
    distance, volumes_as_rgb, within_tolerance, Color, DyeBlend, ExperimentJournal, JournalEvent,
    MixingBench, Mixture, Plate, Session, SessionConfig, SimulatedBench, StepOutcome, TargetPhase,
    TargetSpec, Verdict, WellId,
};

fn ochre() -> Color {
    Color::new(120.0, 80.0, 40.0)
}

fn earth_blend() -> DyeBlend {
    DyeBlend::new(vec![
        Color::new(160.0, 90.0, 35.0),
        Color::new(100.0, 105.0, 45.0),
        Color::new(100.0, 45.0, 40.0),
    ])
}

fn single_target(color: Color) -> SessionConfig {
    SessionConfig::with_targets(vec![TargetSpec::fixed("ochre", color)])
}

#[test]
fn blended_dyes_reach_the_target_within_budget() {
    let mut session = Session::new(single_target(ochre())).unwrap();
    let blend = earth_blend();
    let mut bench = SimulatedBench::new(Plate::standard_96(), blend.clone().into_response());

    let summaries = session.run(&mut bench).unwrap();
    assert_eq!(summaries.len(), 1);
    let summary = &summaries[0];
    assert_eq!(summary.verdict, Verdict::Matched);
    assert!(summary.experiments <= 11);

    let best = summary.best.as_ref().unwrap();
    assert!(within_tolerance(blend.color_of(&best.mixture), ochre(), 30.0));
    assert!(best.mixture.validate(3, 1, 200).is_ok());
}

#[test]
fn volumes_read_as_rgb_respect_every_invariant() {
    let mut session = Session::new(single_target(ochre())).unwrap();
    let mut bench = SimulatedBench::new(Plate::standard_96(), volumes_as_rgb);

    let mut reports = Vec::new();
    loop {
        match session.step(&mut bench).unwrap() {
            StepOutcome::Experiment(report) => reports.push(report),
            StepOutcome::TargetFinished(_) => {}
            StepOutcome::Complete => break,
        }
    }

    assert!(!reports.is_empty() && reports.len() <= 11);
    for report in &reports {
        assert!(report.mixture.validate(3, 1, 200).is_ok());
        assert_eq!(report.color, volumes_as_rgb(&report.mixture));
        assert_eq!(report.well, WellId::new(0, report.iteration));
    }

    let target = &session.targets()[0];
    assert!(target.is_complete());
    let closest = reports
        .iter()
        .map(|r| r.distance)
        .fold(f64::INFINITY, f64::min);
    assert_eq!(target.best_distance(), closest);

    match target.phase() {
        TargetPhase::Matched => {
            assert!(closest <= 30.0);
            assert!(reports.last().unwrap().matched);
        }
        TargetPhase::Exhausted => assert_eq!(reports.len(), 11),
        other => panic!("unexpected phase {}", other),
    }
}

#[test]
fn volumes_read_as_rgb_match_ochre_with_pinned_seed() {
    // Whether this response model matches within budget depends on the seed;
    // seed 0 reaches the target.
    let config = SessionConfig {
        seed: 0,
        ..single_target(ochre())
    };
    let mut session = Session::new(config).unwrap();
    let mut bench = SimulatedBench::new(Plate::standard_96(), volumes_as_rgb);

    let summaries = session.run(&mut bench).unwrap();
    let summary = &summaries[0];
    assert_eq!(summary.verdict, Verdict::Matched);
    assert!(summary.experiments <= 11);

    let best = summary.best.as_ref().unwrap();
    assert!(within_tolerance(volumes_as_rgb(&best.mixture), ochre(), 30.0));
    assert!(best.distance <= 30.0);
}

#[test]
fn tried_mixtures_are_never_repeated_by_the_surrogate() {
    let mut session = Session::new(single_target(Color::new(255.0, 255.0, 255.0))).unwrap();
    let mut bench = SimulatedBench::new(Plate::standard_96(), |_: &Mixture| {
        Color::new(10.0, 10.0, 10.0)
    });
    session.run(&mut bench).unwrap();

    let history = session.targets()[0].history();
    assert_eq!(history.len(), 11);
    for (i, a) in history.iter().enumerate() {
        for b in &history[i + 1..] {
            assert_ne!(a.mixture, b.mixture);
        }
    }
}

#[test]
fn cursor_moves_through_targets_in_order() {
    let config = SessionConfig {
        max_iterations: 4,
        ..SessionConfig::with_targets(vec![
            TargetSpec::fixed("unreachable", Color::new(255.0, 255.0, 255.0)),
            TargetSpec::fixed("anything", Color::new(0.0, 0.0, 0.0)),
            TargetSpec::reference("sample", WellId::new(3, 11)),
        ])
    };
    let mut session = Session::new(config)
        .unwrap()
        .with_journal(ExperimentJournal::in_memory());
    // Every mixture comes out near-black.
    let mut bench = SimulatedBench::new(Plate::standard_96(), |_: &Mixture| {
        Color::new(10.0, 10.0, 10.0)
    })
    .with_reference(WellId::new(3, 11), Color::new(20.0, 20.0, 20.0));

    let mut visited = Vec::new();
    loop {
        let cursor = session.cursor();
        match session.step(&mut bench).unwrap() {
            StepOutcome::Experiment(report) => {
                assert_eq!(report.target, cursor);
                assert_eq!(report.well.row, report.target);
                if visited.last() != Some(&report.target) {
                    visited.push(report.target);
                }
            }
            StepOutcome::TargetFinished(summary) => assert_eq!(summary.index, 0),
            StepOutcome::Complete => break,
        }
    }

    assert_eq!(visited, vec![0, 1, 2]);
    let summaries = session.summaries();
    assert_eq!(summaries[0].verdict, Verdict::Exhausted);
    assert_eq!(summaries[0].experiments, 4);
    assert_eq!(summaries[1].verdict, Verdict::Matched);
    assert_eq!(summaries[2].verdict, Verdict::Matched);
    assert_eq!(summaries[2].color, Color::new(20.0, 20.0, 20.0));
    assert!(session.is_complete());

    let journal = session.journal().unwrap();
    let activations = journal
        .entries()
        .iter()
        .filter(|e| e.event == JournalEvent::Activated)
        .map(|e| e.target)
        .collect::<Vec<_>>();
    assert_eq!(activations, vec![0, 1, 2]);
}

#[test]
fn sessions_with_the_same_seed_replay_identically() {
    let run = || {
        let mut session = Session::new(single_target(Color::new(30.0, 200.0, 90.0))).unwrap();
        let mut bench = SimulatedBench::new(Plate::standard_96(), volumes_as_rgb);
        session.run(&mut bench).unwrap();
        session.targets()[0].history().to_vec()
    };
    assert_eq!(run(), run());
}

#[test]
fn bench_failure_surfaces_without_recording() {
    struct BrokenDispenser;

    impl MixingBench for BrokenDispenser {
        fn apply_mixture(&mut self, well: WellId, _: &Mixture) -> anyhow::Result<()> {
            anyhow::bail!("pipette jammed at {}", well)
        }

        fn read_color(&mut self, _: WellId) -> anyhow::Result<Color> {
            Ok(Color::new(0.0, 0.0, 0.0))
        }
    }

    let mut session = Session::new(single_target(ochre())).unwrap();
    let err = session.step(&mut BrokenDispenser).unwrap_err();
    assert!(err.to_string().contains("pipette jammed at A1"));
    assert!(session.targets()[0].history().is_empty());
    assert!(!session.is_complete());
}

#[test]
fn best_match_tracks_minimum_distance() {
    let mut session = Session::new(single_target(Color::new(200.0, 30.0, 30.0))).unwrap();
    let blend = earth_blend();
    let mut bench = SimulatedBench::new(Plate::standard_96(), blend.into_response());
    session.run(&mut bench).unwrap();

    let target = &session.targets()[0];
    let expected = target
        .history()
        .iter()
        .map(|e| distance(e.color, Color::new(200.0, 30.0, 30.0)))
        .fold(f64::INFINITY, f64::min);
    assert_eq!(target.best_distance(), expected);
}
