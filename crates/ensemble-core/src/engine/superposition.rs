use crate::core::utils::geometry::{rotation_to_align, weighted_centroid};
use nalgebra::{
    Isometry3, Matrix3, Point3, Rotation3, Translation3, Unit, UnitQuaternion, Vector3,
};
use std::f64::consts::PI;
use thiserror::Error;

/// Normalized singular value below which the cross-covariance is treated as rank deficient.
const RANK_TOLERANCE: f64 = 1e-10;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum FitError {
    #[error("Cannot fit {mobile} mobile atoms onto {reference} reference atoms")]
    LengthMismatch { mobile: usize, reference: usize },

    #[error("Expected {expected} weights, found {found}")]
    WeightLengthMismatch { expected: usize, found: usize },

    #[error("Cannot fit an empty coordinate set")]
    Empty,

    #[error("Total fit weight is zero")]
    ZeroWeight,

    #[error("Singular value decomposition failed")]
    Decomposition,
}

/// Mobile coordinates after fitting, with the rigid-body transformation that produced them.
#[derive(Debug, Clone, PartialEq)]
pub struct Superposition {
    pub coordinates: Vec<Point3<f64>>,
    pub transformation: Isometry3<f64>,
}

/// A weighted least-squares rigid-body fit of one coordinate set onto another.
///
/// Implementations must be deterministic: identical inputs give identical outputs. The
/// engine calls them from several threads when the `parallel` feature is enabled.
pub trait Superposer: Send + Sync {
    fn superimpose(
        &self,
        mobile: &[Point3<f64>],
        reference: &[Point3<f64>],
        weights: Option<&[f64]>,
    ) -> Result<Superposition, FitError>;
}

/// Weighted Kabsch superposition via the SVD of the cross-covariance matrix.
///
/// Reflections are excluded. For collinear data the minimal rotation aligning the two
/// principal directions is used, and coincident data is only translated, so degenerate
/// inputs still yield a unique transformation.
#[derive(Debug, Clone, Copy, Default)]
pub struct KabschSuperposer;

impl KabschSuperposer {
    pub fn new() -> Self {
        Self
    }
}

impl Superposer for KabschSuperposer {
    fn superimpose(
        &self,
        mobile: &[Point3<f64>],
        reference: &[Point3<f64>],
        weights: Option<&[f64]>,
    ) -> Result<Superposition, FitError> {
        let transformation = calculate_transformation(mobile, reference, weights)?;
        Ok(Superposition {
            coordinates: apply_transformation(&transformation, mobile),
            transformation,
        })
    }
}

pub fn apply_transformation(
    transformation: &Isometry3<f64>,
    coords: &[Point3<f64>],
) -> Vec<Point3<f64>> {
    coords.iter().map(|p| transformation * p).collect()
}

fn calculate_transformation(
    from_points: &[Point3<f64>],
    to_points: &[Point3<f64>],
    weights: Option<&[f64]>,
) -> Result<Isometry3<f64>, FitError> {
    if from_points.len() != to_points.len() {
        return Err(FitError::LengthMismatch {
            mobile: from_points.len(),
            reference: to_points.len(),
        });
    }
    if from_points.is_empty() {
        return Err(FitError::Empty);
    }
    if let Some(w) = weights {
        if w.len() != from_points.len() {
            return Err(FitError::WeightLengthMismatch {
                expected: from_points.len(),
                found: w.len(),
            });
        }
    }

    let from_centroid = weighted_centroid(from_points, weights).ok_or(FitError::ZeroWeight)?;
    let to_centroid = weighted_centroid(to_points, weights).ok_or(FitError::ZeroWeight)?;

    // `magnitude` bounds the singular values of `h`; dividing by it makes the rank
    // tests below independent of the coordinate and weight scale.
    let (h, magnitude) = from_points.iter().zip(to_points.iter()).enumerate().fold(
        (Matrix3::<f64>::zeros(), 0.0_f64),
        |(h, magnitude), (i, (f, t))| {
            let w = weights.map_or(1.0, |w| w[i]);
            let (f, t) = (f - from_centroid, t - to_centroid);
            (h + t * f.transpose() * w, magnitude + w * f.norm() * t.norm())
        },
    );

    let rotation = if magnitude > 0.0 {
        optimal_rotation(&(h / magnitude))?
    } else {
        Rotation3::identity()
    };
    let translation = to_centroid.coords - rotation * from_centroid.coords;

    Ok(Isometry3::from_parts(
        Translation3::from(translation),
        UnitQuaternion::from_rotation_matrix(&rotation),
    ))
}

/// Proper rotation `R` maximizing `trace(R^T H)` for a cross-covariance `H = sum(w t f^T)`
/// normalized so that its singular values lie in `[0, 1]`.
fn optimal_rotation(h: &Matrix3<f64>) -> Result<Rotation3<f64>, FitError> {
    let svd = h.svd(true, true);
    let (Some(u), Some(v_t)) = (svd.u, svd.v_t) else {
        return Err(FitError::Decomposition);
    };
    let s = svd.singular_values;

    let mut order = [0usize, 1, 2];
    order.sort_by(|&a, &b| s[b].total_cmp(&s[a]));
    let (largest, middle, smallest) = (order[0], order[1], order[2]);

    if s[largest] <= RANK_TOLERANCE {
        return Ok(Rotation3::identity());
    }

    if s[middle] <= RANK_TOLERANCE * s[largest] {
        let from_axis: Vector3<f64> = v_t.row(largest).transpose();
        let to_axis: Vector3<f64> = u.column(largest).into_owned();
        return Ok(rotation_to_align(&from_axis, &to_axis)
            .unwrap_or_else(|| half_turn_about_normal_of(&from_axis)));
    }

    let d = (u * v_t).determinant();
    let mut correction = Matrix3::identity();
    if d < 0.0 {
        correction[(smallest, smallest)] = -1.0;
    }

    let rotation_matrix = u * correction * v_t;
    Ok(Rotation3::from_matrix(&rotation_matrix))
}

fn half_turn_about_normal_of(axis: &Vector3<f64>) -> Rotation3<f64> {
    let helper = if axis.x.abs() < 0.9 {
        Vector3::x()
    } else {
        Vector3::y()
    };
    Rotation3::from_axis_angle(&Unit::new_normalize(axis.cross(&helper)), PI)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::utils::geometry::calculate_rmsd;

    const TOL: f64 = 1e-9;

    fn tetrahedron() -> Vec<Point3<f64>> {
        vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.5, 0.0, 0.0),
            Point3::new(0.0, 2.0, 0.0),
            Point3::new(0.3, 0.4, 1.1),
        ]
    }

    fn moved(points: &[Point3<f64>], iso: &Isometry3<f64>) -> Vec<Point3<f64>> {
        points.iter().map(|p| iso * p).collect()
    }

    #[test]
    fn pure_translation_is_recovered() {
        let reference = tetrahedron();
        let mobile = moved(&reference, &Isometry3::translation(10.0, 20.0, 30.0));

        let fit = KabschSuperposer.superimpose(&mobile, &reference, None).unwrap();

        assert!(fit.transformation.rotation.angle().abs() < TOL);
        let t = fit.transformation.translation.vector;
        assert!((t - Vector3::new(-10.0, -20.0, -30.0)).norm() < TOL);
        assert!(calculate_rmsd(&fit.coordinates, &reference).unwrap() < TOL);
    }

    #[test]
    fn rotation_and_translation_are_undone() {
        let reference = tetrahedron();
        let motion = Isometry3::new(Vector3::new(1.0, -2.0, 0.5), Vector3::new(0.3, -1.1, 0.7));
        let mobile = moved(&reference, &motion);

        let fit = KabschSuperposer.superimpose(&mobile, &reference, None).unwrap();

        assert!(calculate_rmsd(&fit.coordinates, &reference).unwrap() < TOL);
        let composed = fit.transformation * motion;
        assert!(composed.rotation.angle().abs() < 1e-7);
        assert!(composed.translation.vector.norm() < 1e-7);
    }

    #[test]
    fn mirror_images_are_not_reflected() {
        let reference = tetrahedron();
        let mirrored: Vec<_> = reference.iter().map(|p| Point3::new(p.x, p.y, -p.z)).collect();

        let fit = KabschSuperposer.superimpose(&mirrored, &reference, None).unwrap();

        let det = fit.transformation.rotation.to_rotation_matrix().matrix().determinant();
        assert!((det - 1.0).abs() < TOL);
    }

    #[test]
    fn zero_weighted_atoms_do_not_influence_the_fit() {
        let reference = tetrahedron();
        let mut mobile = moved(&reference, &Isometry3::translation(0.0, 0.0, 3.0));
        mobile[3] = Point3::new(50.0, -50.0, 50.0);
        let weights = [1.0, 1.0, 1.0, 0.0];

        let fit = KabschSuperposer
            .superimpose(&mobile, &reference, Some(&weights[..]))
            .unwrap();

        for i in 0..3 {
            assert!((fit.coordinates[i] - reference[i]).norm() < TOL);
        }
    }

    fn rotated_about_z(points: &[Point3<f64>]) -> Vec<Point3<f64>> {
        let motion = Isometry3::new(Vector3::new(0.5, -0.25, 2.0), Vector3::z() * 1.2);
        moved(points, &motion)
    }

    #[test]
    fn tiny_weights_fit_as_well_as_unit_weights() {
        let reference = tetrahedron();
        let mobile = rotated_about_z(&reference);

        let fit = KabschSuperposer
            .superimpose(&mobile, &reference, Some(&[1e-17; 4][..]))
            .unwrap();

        assert!(calculate_rmsd(&fit.coordinates, &reference).unwrap() < TOL);
        assert!((fit.transformation.rotation.angle() - 1.2).abs() < 1e-7);
    }

    #[test]
    fn nanometre_scale_coordinates_are_rotated_back() {
        let reference: Vec<_> = tetrahedron()
            .iter()
            .map(|p| Point3::from(p.coords * 1e-9))
            .collect();
        let motion = Isometry3::new(Vector3::new(1e-9, 0.0, -2e-9), Vector3::z() * 1.2);
        let mobile = moved(&reference, &motion);

        let fit = KabschSuperposer.superimpose(&mobile, &reference, None).unwrap();

        assert!(calculate_rmsd(&fit.coordinates, &reference).unwrap() < 1e-18);
        assert!((fit.transformation.rotation.angle() - 1.2).abs() < 1e-7);
    }

    #[test]
    fn collinear_pair_gets_the_minimal_rotation() {
        let reference = vec![Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0)];
        let mobile = vec![Point3::new(0.0, 0.0, 5.0), Point3::new(1.0, 0.0, 5.0)];

        let fit = KabschSuperposer.superimpose(&mobile, &reference, None).unwrap();

        assert!(fit.transformation.rotation.angle().abs() < TOL);
        let t = fit.transformation.translation.vector;
        assert!((t - Vector3::new(0.0, 0.0, -5.0)).norm() < TOL);
    }

    #[test]
    fn antiparallel_pair_is_turned_around() {
        let reference = vec![Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0)];
        let mobile = vec![Point3::new(1.0, 0.0, 0.0), Point3::new(0.0, 0.0, 0.0)];

        let fit = KabschSuperposer.superimpose(&mobile, &reference, None).unwrap();

        assert!(calculate_rmsd(&fit.coordinates, &reference).unwrap() < TOL);
    }

    #[test]
    fn single_atom_is_only_translated() {
        let fit = KabschSuperposer
            .superimpose(&[Point3::new(1.0, 1.0, 1.0)], &[Point3::origin()], None)
            .unwrap();
        assert!(fit.transformation.rotation.angle().abs() < TOL);
        assert!(fit.coordinates[0].coords.norm() < TOL);
    }

    #[test]
    fn invalid_inputs_are_reported() {
        let reference = tetrahedron();
        assert!(matches!(
            KabschSuperposer.superimpose(&reference[..2], &reference, None),
            Err(FitError::LengthMismatch { .. })
        ));
        assert_eq!(
            KabschSuperposer.superimpose(&[], &[], None).unwrap_err(),
            FitError::Empty
        );
        assert_eq!(
            KabschSuperposer
                .superimpose(&reference, &reference, Some(&[0.0; 4][..]))
                .unwrap_err(),
            FitError::ZeroWeight
        );
        assert!(matches!(
            KabschSuperposer.superimpose(&reference, &reference, Some(&[1.0; 2][..])),
            Err(FitError::WeightLengthMismatch { .. })
        ));
    }
}
