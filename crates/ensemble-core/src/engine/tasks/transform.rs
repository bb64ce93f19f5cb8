use crate::core::models::ensemble::ConformationSet;
use crate::engine::error::EngineError;
use crate::engine::superposition::apply_transformation;
use tracing::{info, instrument};

/// Applies the stored transformation of every conformation to its coordinates.
///
/// Fails with [`EngineError::Precondition`] for an empty ensemble and with
/// [`EngineError::TransformationMissing`] for the first conformation without a
/// transformation, before any coordinates are touched.
#[instrument(skip_all, name = "transform_task", fields(ensemble = ensemble.name()))]
pub fn run(ensemble: &mut ConformationSet) -> Result<(), EngineError> {
    if ensemble.is_empty() {
        return Err(EngineError::Precondition(format!(
            "{ensemble} has no conformations to transform"
        )));
    }
    let transformations = ensemble
        .stored_transformations()
        .iter()
        .enumerate()
        .map(|(index, t)| t.ok_or(EngineError::TransformationMissing { index }))
        .collect::<Result<Vec<_>, _>>()?;

    for (frame, transformation) in ensemble.raw_frames_mut().iter_mut().zip(&transformations) {
        *frame = apply_transformation(transformation, frame);
    }

    info!(
        conformations = transformations.len(),
        "Applied stored transformations."
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::superposition::{KabschSuperposer, Superposer};
    use nalgebra::{Isometry3, Point3, Vector3};

    fn frame() -> Vec<Point3<f64>> {
        vec![Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 2.0, 3.0)]
    }

    fn ensemble(n: usize) -> ConformationSet {
        let mut ensemble = ConformationSet::new("transform");
        ensemble.add_conformations(vec![frame(); n], None).unwrap();
        ensemble
    }

    #[test]
    fn stored_transformations_are_applied_per_conformation() {
        let mut ensemble = ensemble(2);
        ensemble
            .set_transformation(0, Isometry3::translation(1.0, 0.0, 0.0))
            .unwrap();
        ensemble
            .set_transformation(
                1,
                Isometry3::new(Vector3::zeros(), Vector3::z() * std::f64::consts::FRAC_PI_2),
            )
            .unwrap();

        run(&mut ensemble).unwrap();

        let frames = ensemble.coordinate_sets().unwrap();
        assert!((frames[0][1] - Point3::new(2.0, 2.0, 3.0)).norm() < 1e-12);
        assert!((frames[1][1] - Point3::new(-2.0, 1.0, 3.0)).norm() < 1e-12);
    }

    #[test]
    fn a_missing_transformation_fails_without_mutation() {
        let mut ensemble = ensemble(3);
        ensemble
            .set_transformation(0, Isometry3::translation(1.0, 0.0, 0.0))
            .unwrap();

        let result = run(&mut ensemble);

        assert!(matches!(
            result,
            Err(EngineError::TransformationMissing { index: 1 })
        ));
        assert_eq!(ensemble.coordinate_sets().unwrap()[0], frame());
    }

    #[test]
    fn empty_ensemble_is_a_precondition_error() {
        let mut ensemble = ConformationSet::new("empty");
        assert!(matches!(
            run(&mut ensemble),
            Err(EngineError::Precondition(_))
        ));
    }

    #[test]
    fn transformations_from_a_core_fit_carry_over_to_the_full_set() {
        let core = vec![Point3::new(0.0, 0.0, 5.0), Point3::new(1.0, 0.0, 5.0)];
        let mut core_set = ConformationSet::new("core");
        core_set
            .set_reference(vec![Point3::origin(), Point3::new(1.0, 0.0, 0.0)])
            .unwrap();
        core_set.add_conformations(core, None).unwrap();
        let fitted = KabschSuperposer
            .superimpose(
                &core_set.coordinate_sets().unwrap()[0],
                &core_set.reference().unwrap(),
                None,
            )
            .unwrap();

        let mut full = ConformationSet::new("full");
        full.add_conformations(
            vec![
                Point3::new(0.0, 0.0, 5.0),
                Point3::new(1.0, 0.0, 5.0),
                Point3::new(3.0, 3.0, 5.0),
            ],
            None,
        )
        .unwrap();
        full.set_transformation(0, fitted.transformation).unwrap();
        run(&mut full).unwrap();

        let coords = &full.coordinate_sets().unwrap()[0];
        assert!((coords[2] - Point3::new(3.0, 3.0, 0.0)).norm() < 1e-9);
    }
}
