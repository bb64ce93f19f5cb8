use nalgebra::{Point3, Rotation3, Vector3};

pub fn rotation_to_align(from: &Vector3<f64>, to: &Vector3<f64>) -> Option<Rotation3<f64>> {
    Rotation3::rotation_between(from, to)
}

/// Unweighted RMSD between two equally sized coordinate sets.
pub fn calculate_rmsd(coords1: &[Point3<f64>], coords2: &[Point3<f64>]) -> Option<f64> {
    weighted_rmsd(coords1, coords2, None)
}

/// Weighted RMSD between two coordinate sets.
///
/// Returns `None` if the sets differ in length or are empty, or if `weights` does not hold
/// one value per atom. A zero total weight yields `0.0`: nothing constrains the fit, so no
/// deviation is measured.
pub fn weighted_rmsd(
    coords1: &[Point3<f64>],
    coords2: &[Point3<f64>],
    weights: Option<&[f64]>,
) -> Option<f64> {
    if coords1.len() != coords2.len() || coords1.is_empty() {
        return None;
    }
    let squared: Vec<f64> = coords1
        .iter()
        .zip(coords2.iter())
        .map(|(p1, p2)| (p1 - p2).norm_squared())
        .collect();
    weighted_root_mean(&squared, weights)
}

/// sqrt(sum(w_i * x_i) / sum(w_i)) over per-atom squared deviations.
pub(crate) fn weighted_root_mean(squared: &[f64], weights: Option<&[f64]>) -> Option<f64> {
    let (sum, total) = match weights {
        None => (squared.iter().sum::<f64>(), squared.len() as f64),
        Some(w) => {
            if w.len() != squared.len() {
                return None;
            }
            let sum = squared.iter().zip(w).map(|(d, w)| d * w).sum::<f64>();
            (sum, w.iter().sum::<f64>())
        }
    };
    if total <= 0.0 {
        return Some(0.0);
    }
    Some((sum / total).sqrt())
}

/// Weighted centroid of a point set, `None` when the total weight is zero or the set is empty.
pub fn weighted_centroid(points: &[Point3<f64>], weights: Option<&[f64]>) -> Option<Point3<f64>> {
    let (sum, total) = match weights {
        None => (
            points.iter().map(|p| p.coords).sum::<Vector3<f64>>(),
            points.len() as f64,
        ),
        Some(w) => (
            points
                .iter()
                .zip(w)
                .map(|(p, w)| p.coords * *w)
                .sum::<Vector3<f64>>(),
            w.iter().sum::<f64>(),
        ),
    };
    if total <= 0.0 {
        return None;
    }
    Some(Point3::from(sum / total))
}

/// Per-atom displacement vectors `coords - reference`.
pub fn displacements(coords: &[Point3<f64>], reference: &[Point3<f64>]) -> Vec<Vector3<f64>> {
    coords
        .iter()
        .zip(reference.iter())
        .map(|(p, r)| p - r)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOL: f64 = 1e-12;

    #[test]
    fn rmsd_of_identical_sets_is_zero() {
        let coords = vec![Point3::new(1.0, 2.0, 3.0), Point3::new(-1.0, 0.5, 2.0)];
        assert!(calculate_rmsd(&coords, &coords).unwrap().abs() < TOL);
    }

    #[test]
    fn rmsd_of_uniform_shift_equals_shift_length() {
        let a = vec![Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0)];
        let b: Vec<_> = a.iter().map(|p| p + Vector3::new(0.0, 3.0, 4.0)).collect();
        assert!((calculate_rmsd(&a, &b).unwrap() - 5.0).abs() < TOL);
    }

    #[test]
    fn rmsd_rejects_mismatched_or_empty_inputs() {
        let a = vec![Point3::origin()];
        assert_eq!(calculate_rmsd(&a, &[]), None);
        assert_eq!(calculate_rmsd(&[], &[]), None);
        assert_eq!(weighted_rmsd(&a, &a, Some(&[1.0, 1.0][..])), None);
    }

    #[test]
    fn weighted_rmsd_ignores_zero_weighted_atoms() {
        let a = vec![Point3::new(0.0, 0.0, 0.0), Point3::new(0.0, 0.0, 0.0)];
        let b = vec![Point3::new(2.0, 0.0, 0.0), Point3::new(100.0, 0.0, 0.0)];
        let rmsd = weighted_rmsd(&a, &b, Some(&[1.0, 0.0][..])).unwrap();
        assert!((rmsd - 2.0).abs() < TOL);
    }

    #[test]
    fn weighted_rmsd_with_all_zero_weights_is_zero_not_nan() {
        let a = vec![Point3::new(0.0, 0.0, 0.0)];
        let b = vec![Point3::new(1.0, 1.0, 1.0)];
        assert_eq!(weighted_rmsd(&a, &b, Some(&[0.0][..])), Some(0.0));
    }

    #[test]
    fn weighted_centroid_respects_weights() {
        let points = vec![Point3::new(0.0, 0.0, 0.0), Point3::new(4.0, 0.0, 0.0)];
        let c = weighted_centroid(&points, Some(&[3.0, 1.0][..])).unwrap();
        assert!((c - Point3::new(1.0, 0.0, 0.0)).norm() < TOL);
        assert_eq!(weighted_centroid(&points, Some(&[0.0, 0.0][..])), None);
        assert_eq!(weighted_centroid(&[], None), None);
    }

    #[test]
    fn rotation_to_align_parallel_vectors_is_identity() {
        let v = Vector3::new(1.0, 0.0, 0.0);
        let rot = rotation_to_align(&v, &v).unwrap();
        assert!(rot.angle().abs() < TOL);
    }
}
