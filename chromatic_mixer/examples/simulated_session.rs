//! Runs a full color-matching session against a simulated dye bench.
//!
//! Run with: RUST_LOG=chromatic_mixer=debug cargo run --example simulated_session

use std::path::PathBuf;

use chromatic_mixer::{
    Checkpointable, Color, ConfigError, DyeBlend, ExperimentJournal, Session, SessionConfig,
    SimulatedBench, StepOutcome, TargetSource,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chromatic_mixer=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = load_config()?;
    println!(
        "Loaded config: dyes={} max_volume={} step={} targets={} seed={}",
        config.dye_count,
        config.max_volume,
        config.step,
        config.targets.len(),
        config.seed
    );

    let blend = earth_pigments(config.dye_count);
    let mut bench = SimulatedBench::new(config.plate.build(), blend.into_response())
        .with_name("simulated-earth-pigments");
    for target in &config.targets {
        if let TargetSource::ReferenceWell(well) = target.source {
            bench = bench.with_reference(well, Color::new(140.0, 95.0, 50.0));
        }
    }

    let out = PathBuf::from("out");
    let journal = ExperimentJournal::with_file(out.join("session.jsonl"))?;
    let mut session = Session::new(config)?.with_journal(journal);

    loop {
        match session.step(&mut bench)? {
            StepOutcome::Experiment(report) => println!(
                "{} {:>2} {:<9} {} -> {} d={:.2}{}",
                report.well,
                report.iteration,
                report.phase.as_str(),
                report.mixture,
                report.color,
                report.distance,
                if report.improved { " *" } else { "" }
            ),
            StepOutcome::TargetFinished(summary) => println!("finished: {}", summary),
            StepOutcome::Complete => break,
        }
        session.save_checkpoint(out.join("session.ckpt"))?;
    }

    println!("\nSession complete after {} ticks", session.tick());
    for summary in session.summaries() {
        println!("  {}", summary);
    }
    Ok(())
}

/// Warm earth tones, cycled when the config asks for more dyes.
fn earth_pigments(dye_count: usize) -> DyeBlend {
    let palette = [
        Color::new(160.0, 90.0, 35.0),
        Color::new(100.0, 105.0, 45.0),
        Color::new(100.0, 45.0, 40.0),
        Color::new(210.0, 170.0, 90.0),
        Color::new(60.0, 40.0, 30.0),
    ];
    DyeBlend::new(palette.iter().copied().cycle().take(dye_count).collect())
}

fn load_config() -> Result<SessionConfig, ConfigError> {
    SessionConfig::load_from_file("config/session.toml").or_else(|err| {
        eprintln!("Falling back to default config: {err}");
        Ok(SessionConfig::default())
    })
}
