use super::superimpose;
use crate::core::models::ensemble::ConformationSet;
use crate::core::utils::geometry::calculate_rmsd;
use crate::engine::context::AlignmentContext;
use crate::engine::error::EngineError;
use crate::engine::progress::Progress;
use tracing::{info, instrument};

/// Outcome of a converged iterative superposition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IterationSummary {
    /// Number of superposition passes performed.
    pub iterations: usize,
    /// RMSD between the last two reference structures.
    pub final_rmsd: f64,
}

/// Superimposes the ensemble repeatedly, replacing the reference by the weighted mean
/// structure after every pass, until the reference moves by no more than the configured
/// convergence threshold.
///
/// Atoms that carry no weight in any conformation keep their previous reference position.
#[instrument(skip_all, name = "iterative_superposition_task", fields(ensemble = ensemble.name()))]
pub fn run(
    ensemble: &mut ConformationSet,
    context: &AlignmentContext,
) -> Result<IterationSummary, EngineError> {
    if ensemble.is_empty() {
        return Err(EngineError::Precondition(format!(
            "{ensemble} has no conformations to superimpose"
        )));
    }

    let threshold = context.config.convergence_threshold;
    let max_iterations = context.config.max_iterations;
    context.reporter.report(Progress::PhaseStart {
        name: "Iterative Superposition",
    });
    info!(threshold, max_iterations, "Starting iterative superposition.");

    let mut rmsd = f64::INFINITY;
    for step in 1..=max_iterations {
        superimpose::run(ensemble, context)?;

        let Some(old_reference) = ensemble.reference() else {
            return Err(EngineError::Precondition(format!(
                "{ensemble} has no reference coordinates"
            )));
        };
        let new_reference: Vec<_> = ensemble
            .weighted_mean_positions()
            .into_iter()
            .zip(&old_reference)
            .map(|(mean, old)| mean.unwrap_or(*old))
            .collect();

        rmsd = calculate_rmsd(&old_reference, &new_reference).unwrap_or(0.0);
        ensemble.replace_reference(new_reference);

        info!(step, rmsd, "Iteration finished.");
        context
            .reporter
            .report(Progress::IterationFinished { step, rmsd });

        if rmsd <= threshold {
            context.reporter.report(Progress::PhaseFinish);
            info!(iterations = step, rmsd, "Iterative superposition converged.");
            return Ok(IterationSummary {
                iterations: step,
                final_rmsd: rmsd,
            });
        }
    }

    context.reporter.report(Progress::PhaseFinish);
    Err(EngineError::Convergence {
        iterations: max_iterations,
        rmsd,
    })
}
