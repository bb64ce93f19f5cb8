use crate::core::models::ensemble::ConformationSet;
use crate::engine::config::{AlignmentConfig, AlignmentMode};
use crate::engine::context::AlignmentContext;
use crate::engine::error::EngineError;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::superposition::{KabschSuperposer, Superposer};
use crate::engine::tasks;
use crate::engine::tasks::iterate::IterationSummary;
use std::time::{Duration, Instant};
use tracing::{info, instrument};

#[derive(Debug, Clone, PartialEq)]
pub struct SuperpositionResult {
    /// Present when the ensemble was superimposed iteratively.
    pub iterations: Option<IterationSummary>,
    /// RMSD of every conformation from the final reference.
    pub rmsds: Vec<f64>,
    pub elapsed: Duration,
}

/// Superimposes an ensemble with the default weighted Kabsch fit.
pub fn run(
    ensemble: &mut ConformationSet,
    config: &AlignmentConfig,
    reporter: &ProgressReporter,
) -> Result<SuperpositionResult, EngineError> {
    run_with_superposer(ensemble, config, &KabschSuperposer, reporter)
}

#[instrument(skip_all, name = "superposition_workflow", fields(ensemble = ensemble.name()))]
pub fn run_with_superposer(
    ensemble: &mut ConformationSet,
    config: &AlignmentConfig,
    superposer: &dyn Superposer,
    reporter: &ProgressReporter,
) -> Result<SuperpositionResult, EngineError> {
    config.validate()?;
    let context = AlignmentContext::new(superposer, config, reporter);

    let start = Instant::now();
    info!(mode = ?config.mode, "Starting superposition of {}.", ensemble);

    let iterations = match config.mode {
        AlignmentMode::Single => {
            reporter.report(Progress::PhaseStart {
                name: "Superposition",
            });
            tasks::superimpose::run(ensemble, &context)?;
            reporter.report(Progress::PhaseFinish);
            None
        }
        AlignmentMode::Iterative => Some(tasks::iterate::run(ensemble, &context)?),
    };

    let elapsed = start.elapsed();
    info!(
        "Superposition of {} completed in {:.2}s.",
        ensemble,
        elapsed.as_secs_f64()
    );

    Ok(SuperpositionResult {
        iterations,
        rmsds: ensemble.rmsd_per_conformation().unwrap_or_default(),
        elapsed,
    })
}
