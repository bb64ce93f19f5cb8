use super::ensemble::ConformationSet;
use super::ids::ConformationId;
use crate::core::utils::geometry::{displacements, weighted_rmsd};
use nalgebra::{Isometry3, Point3, Vector3};
use std::fmt;
use tracing::warn;

/// A read-only view of one conformation in a [`ConformationSet`].
///
/// The view holds no coordinate data of its own; every accessor reads through the owning
/// ensemble at the view's current index.
#[derive(Clone, Copy)]
pub struct Conformation<'a> {
    ensemble: &'a ConformationSet,
    id: ConformationId,
    index: usize,
}

impl<'a> Conformation<'a> {
    pub(crate) fn new(ensemble: &'a ConformationSet, id: ConformationId, index: usize) -> Self {
        Self {
            ensemble,
            id,
            index,
        }
    }

    pub fn ensemble(&self) -> &'a ConformationSet {
        self.ensemble
    }

    pub fn id(&self) -> ConformationId {
        self.id
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn name(&self) -> &'a str {
        self.ensemble
            .label(self.id)
            .map_or("", |label| label.name.as_str())
    }

    /// Coordinates of this conformation; atoms with zero weight take the reference position.
    pub fn coordinates(&self) -> Vec<Point3<f64>> {
        self.ensemble.effective_frame(self.index)
    }

    /// Copy of this conformation's weight column, `None` for an unweighted ensemble.
    pub fn weights(&self) -> Option<Vec<f64>> {
        self.ensemble.weight_column(self.index).map(<[f64]>::to_vec)
    }

    /// Per-atom displacement from the ensemble reference.
    pub fn deviations(&self) -> Option<Vec<Vector3<f64>>> {
        let Some(reference) = self.ensemble.reference_points() else {
            warn!(conformation = self.index, "Reference coordinates are not set.");
            return None;
        };
        Some(displacements(&self.coordinates(), reference))
    }

    /// Weighted RMSD from the ensemble reference.
    pub fn rmsd(&self) -> Option<f64> {
        let Some(reference) = self.ensemble.reference_points() else {
            warn!(conformation = self.index, "Reference coordinates are not set.");
            return None;
        };
        weighted_rmsd(
            &self.coordinates(),
            reference,
            self.ensemble.weight_column(self.index),
        )
    }

    /// Transformation recorded for this conformation by the last superposition pass.
    pub fn transformation(&self) -> Option<Isometry3<f64>> {
        self.ensemble.stored_transformations()[self.index]
    }
}

impl fmt::Display for Conformation<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Conformation {} from {} (index {})",
            self.name(),
            self.ensemble.name(),
            self.index
        )
    }
}

impl fmt::Debug for Conformation<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Conformation")
            .field("id", &self.id)
            .field("index", &self.index)
            .field("name", &self.name())
            .field("ensemble", &self.ensemble.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::input::WeightInput;

    fn triangle(shift: Vector3<f64>) -> Vec<Point3<f64>> {
        [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]
            .into_iter()
            .map(|p| Point3::from(p) + shift)
            .collect()
    }

    fn weighted_ensemble() -> ConformationSet {
        let mut ensemble = ConformationSet::new("views");
        ensemble.set_reference(triangle(Vector3::zeros())).unwrap();
        ensemble
            .add_conformations(
                vec![
                    triangle(Vector3::new(0.0, 0.0, 2.0)),
                    triangle(Vector3::zeros()),
                ],
                Some(WeightInput::PerFrame(vec![
                    vec![1.0, 1.0, 0.0],
                    vec![1.0, 1.0, 1.0],
                ])),
            )
            .unwrap();
        ensemble
    }

    #[test]
    fn coordinates_substitute_reference_for_zero_weights() {
        let mut ensemble = weighted_ensemble();
        let view = ensemble.conformation(0).unwrap();
        let coords = view.coordinates();
        assert_eq!(coords[0], Point3::new(0.0, 0.0, 2.0));
        assert_eq!(coords[2], Point3::new(0.0, 1.0, 0.0));
        assert_eq!(view.weights(), Some(vec![1.0, 1.0, 0.0]));
    }

    #[test]
    fn deviations_and_rmsd_are_measured_against_the_reference() {
        let mut ensemble = weighted_ensemble();
        let view = ensemble.conformation(0).unwrap();

        let deviations = view.deviations().unwrap();
        assert_eq!(deviations[0], Vector3::new(0.0, 0.0, 2.0));
        assert_eq!(deviations[2], Vector3::zeros());
        assert!((view.rmsd().unwrap() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn identical_conformation_has_zero_rmsd() {
        let mut ensemble = weighted_ensemble();
        assert_eq!(ensemble.conformation(1).unwrap().rmsd(), Some(0.0));
    }

    #[test]
    fn missing_reference_yields_no_deviations() {
        let mut ensemble = ConformationSet::new("no reference");
        ensemble
            .add_conformations(triangle(Vector3::zeros()), None)
            .unwrap();
        let view = ensemble.conformation(0).unwrap();
        assert!(view.deviations().is_none());
        assert!(view.rmsd().is_none());
        assert!(view.weights().is_none());
    }

    #[test]
    fn transformation_is_absent_until_recorded() {
        let mut ensemble = weighted_ensemble();
        assert!(ensemble.conformation(0).unwrap().transformation().is_none());

        ensemble
            .set_transformation(0, Isometry3::translation(0.0, 0.0, -2.0))
            .unwrap();
        let transformation = ensemble.conformation(0).unwrap().transformation().unwrap();
        assert!((transformation.translation.vector.z + 2.0).abs() < 1e-12);
    }

    #[test]
    fn display_names_the_conformation_and_its_ensemble() {
        let mut ensemble = weighted_ensemble();
        let view = ensemble.conformation(1).unwrap();
        assert_eq!(view.to_string(), "Conformation 1 from views (index 1)");
    }
}
