use crate::core::models::ensemble::ConformationSet;
use crate::engine::context::AlignmentContext;
use crate::engine::error::EngineError;
use crate::engine::progress::Progress;
use crate::engine::superposition::Superposition;
use nalgebra::Isometry3;
use tracing::{debug, info, instrument, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

type FitResult = Result<Superposition, EngineError>;

/// Fits every conformation onto the current reference.
///
/// Fitted coordinates and transformations are written back only when every fit succeeds;
/// on failure the ensemble is left untouched. A conformation whose weights sum to zero is
/// unconstrained: it keeps its coordinates and records the identity transformation.
#[instrument(skip_all, name = "superimpose_task", fields(ensemble = ensemble.name()))]
pub fn run(ensemble: &mut ConformationSet, context: &AlignmentContext) -> Result<(), EngineError> {
    if ensemble.is_empty() {
        return Err(EngineError::Precondition(format!(
            "{ensemble} has no conformations to superimpose"
        )));
    }
    let Some(reference) = ensemble.reference_points() else {
        return Err(EngineError::Precondition(format!(
            "{ensemble} has no reference coordinates"
        )));
    };

    let total = ensemble.len();
    info!(conformations = total, "Superimposing conformations onto the reference.");
    context.reporter.report(Progress::TaskStart {
        total_steps: total as u64,
    });

    let frames = ensemble.raw_frames();

    #[cfg(not(feature = "parallel"))]
    let iterator = frames.iter().enumerate();

    #[cfg(feature = "parallel")]
    let iterator = frames.par_iter().enumerate();

    let results: Vec<FitResult> = iterator
        .map(|(index, frame)| {
            let weights = ensemble.weight_column(index);
            if weights.is_some_and(|w| w.iter().sum::<f64>() <= 0.0) {
                warn!(
                    conformation = index,
                    "Conformation has zero total weight; leaving it in place."
                );
                context.reporter.report(Progress::TaskIncrement);
                return Ok(Superposition {
                    coordinates: frame.clone(),
                    transformation: Isometry3::identity(),
                });
            }
            let fit = context
                .superposer
                .superimpose(frame, reference, weights)
                .map_err(|source| EngineError::Fit { index, source })?;
            debug!(conformation = index, "Conformation fitted.");
            context.reporter.report(Progress::TaskIncrement);
            Ok(fit)
        })
        .collect();

    context.reporter.report(Progress::TaskFinish);

    let fits = results
        .into_iter()
        .map(|result| result.map(|fit| (fit.coordinates, fit.transformation)))
        .collect::<Result<Vec<_>, _>>()?;
    ensemble.store_fits(fits);

    info!("Superposition pass finished.");
    Ok(())
}
