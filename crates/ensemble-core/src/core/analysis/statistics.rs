use crate::core::models::ensemble::ConformationSet;
use crate::core::utils::geometry::{displacements, weighted_root_mean};
use nalgebra::{Point3, Vector3};
use tracing::warn;

impl ConformationSet {
    /// Per-conformation displacement from the reference, using the weight-substituted
    /// coordinates of [`coordinate_sets`](Self::coordinate_sets).
    ///
    /// Returns `None`, with a warning, if the reference or the conformations are not set.
    pub fn deviations(&self) -> Option<Vec<Vec<Vector3<f64>>>> {
        let (frames, reference) = self.frames_and_reference()?;
        Some(
            frames
                .iter()
                .map(|frame| displacements(frame, reference))
                .collect(),
        )
    }

    /// Weighted RMSD of every conformation from the reference.
    ///
    /// Squared deviations are weighted per atom and normalized by the conformation's total
    /// weight; without weights every atom counts once. A conformation whose weights sum to
    /// zero has an RMSD of `0.0`.
    pub fn rmsd_per_conformation(&self) -> Option<Vec<f64>> {
        let (frames, reference) = self.frames_and_reference()?;
        frames
            .iter()
            .enumerate()
            .map(|(i, frame)| {
                let squared: Vec<f64> = displacements(frame, reference)
                    .iter()
                    .map(|d| d.norm_squared())
                    .collect();
                weighted_root_mean(&squared, self.weight_column(i))
            })
            .collect()
    }

    /// Weighted mean-square fluctuation of every atom about its mean position.
    ///
    /// The mean position of an atom is the weighted average over conformations; an atom
    /// with zero total weight has a fluctuation of `0.0`. Returns `None` if there are no
    /// conformations.
    pub fn mean_square_fluctuation(&self) -> Option<Vec<f64>> {
        if self.is_empty() {
            return None;
        }
        let means = self.weighted_mean_positions();
        let frames = self.raw_frames();

        let msf = means
            .iter()
            .enumerate()
            .map(|(atom, mean)| {
                let Some(mean) = mean else {
                    return 0.0;
                };
                let (sum, total) = frames.iter().enumerate().fold(
                    (0.0, 0.0),
                    |(sum, total), (k, frame)| {
                        let w = self.weight_at(k, atom);
                        (sum + w * (frame[atom] - *mean).norm_squared(), total + w)
                    },
                );
                if total > 0.0 { sum / total } else { 0.0 }
            })
            .collect();
        Some(msf)
    }

    /// Weighted average position of every atom over all conformations.
    ///
    /// Atoms whose weights sum to zero across conformations have no mean and yield `None`.
    pub(crate) fn weighted_mean_positions(&self) -> Vec<Option<Point3<f64>>> {
        let frames = self.raw_frames();
        let n_atoms = frames.first().map_or(0, Vec::len);

        (0..n_atoms)
            .map(|atom| {
                let (sum, total) = frames.iter().enumerate().fold(
                    (Vector3::<f64>::zeros(), 0.0),
                    |(sum, total), (k, frame)| {
                        let w = self.weight_at(k, atom);
                        (sum + frame[atom].coords * w, total + w)
                    },
                );
                (total > 0.0).then(|| Point3::from(sum / total))
            })
            .collect()
    }

    fn weight_at(&self, conformation: usize, atom: usize) -> f64 {
        self.weight_column(conformation).map_or(1.0, |w| w[atom])
    }

    fn frames_and_reference(&self) -> Option<(Vec<Vec<Point3<f64>>>, &[Point3<f64>])> {
        let Some(frames) = self.coordinate_sets() else {
            warn!(ensemble = self.name(), "Conformations are not set.");
            return None;
        };
        let Some(reference) = self.reference_points() else {
            warn!(ensemble = self.name(), "Reference coordinates are not set.");
            return None;
        };
        Some((frames, reference))
    }
}

/// Sums the weights of every atom over all conformations of an ensemble.
///
/// For an ensemble of experimental structures with occupancy-derived weights this counts
/// how many structures resolve each atom. Returns `None` if the ensemble carries no weights.
pub fn sum_of_weights(ensemble: &ConformationSet) -> Option<Vec<f64>> {
    let columns = ensemble.weight_columns()?;
    let n_atoms = columns.first().map_or(0, Vec::len);
    Some(
        (0..n_atoms)
            .map(|atom| columns.iter().map(|column| column[atom]).sum())
            .collect(),
    )
}
