//! Kernel extraction and small vector helpers shared by the tracks.

use nalgebra::linalg::SVD;
use nalgebra::{DMatrix, DVector};

use super::track::Point;
use crate::error::{ContinuationError, ContinuationResult};

/// Pivots below this fraction of the largest Jacobian entry count as zero.
const PIVOT_RTOL: f64 = 1e-12;
/// Singular values below this fraction of the largest one count as zero.
const RANK_RTOL: f64 = 1e-10;

/// Computes the unit vector spanning the kernel of an n×(n+1) Jacobian.
///
/// The matrix is reduced to upper-triangular form with partially pivoted LU.
/// The last kernel coordinate is pinned to 1 and the rest follow by back
/// substitution of U·v = 0, then v is normalized. The sign is arbitrary; tracks
/// orient it with [`orient_tangent`].
///
/// A (near-)zero pivot fails with `SingularJacobian`. This happens both when
/// rank(J) < n and when the true kernel vector has a zero last coordinate (the
/// curve turns back in λ); the error's `turning_point` flag tells them apart.
pub fn kernel_unit_basis(jacobian: &DMatrix<f64>) -> ContinuationResult<DVector<f64>> {
    let n = jacobian.nrows();
    if n == 0 {
        return Err(ContinuationError::DimensionMismatch {
            what: "Jacobian rows",
            expected: 1,
            actual: 0,
        });
    }
    if jacobian.ncols() != n + 1 {
        return Err(ContinuationError::DimensionMismatch {
            what: "Jacobian columns",
            expected: n + 1,
            actual: jacobian.ncols(),
        });
    }

    let tol = PIVOT_RTOL * jacobian.amax();
    let u = jacobian.clone().lu().u();

    let mut basis = DVector::zeros(n + 1);
    basis[n] = 1.0;
    for i in (0..n).rev() {
        let pivot = u[(i, i)];
        // Negated comparison so NaN pivots are rejected too.
        if !(pivot.abs() > tol) {
            return Err(ContinuationError::SingularJacobian {
                row: i,
                pivot,
                turning_point: has_full_row_rank(jacobian),
            });
        }
        let tail: f64 = (i + 1..=n).map(|k| u[(i, k)] * basis[k]).sum();
        basis[i] = -tail / pivot;
    }

    let norm = basis.norm();
    if !norm.is_finite() {
        return Err(ContinuationError::SingularJacobian {
            row: 0,
            pivot: u[(0, 0)],
            turning_point: false,
        });
    }
    Ok(basis / norm)
}

/// Flips `tangent` when it points against `previous`.
pub fn orient_tangent(tangent: DVector<f64>, previous: &DVector<f64>) -> DVector<f64> {
    if tangent.dot(previous) < 0.0 {
        -tangent
    } else {
        tangent
    }
}

/// The λ unit vector pointing from λ₀ towards λ₁, used before any tangent exists.
pub fn initial_orientation(dim: usize, param_range: (f64, f64)) -> DVector<f64> {
    let mut orientation = DVector::zeros(dim + 1);
    orientation[dim] = if param_range.1 < param_range.0 { -1.0 } else { 1.0 };
    orientation
}

/// Checks that a point has n + 1 components.
pub fn check_point_dimension(point: &Point, dim: usize) -> ContinuationResult<()> {
    if point.len() != dim + 1 {
        return Err(ContinuationError::DimensionMismatch {
            what: "point",
            expected: dim + 1,
            actual: point.len(),
        });
    }
    Ok(())
}

fn has_full_row_rank(jacobian: &DMatrix<f64>) -> bool {
    if jacobian.iter().any(|v| !v.is_finite()) {
        return false;
    }
    let svd = SVD::new(jacobian.clone(), false, false);
    let max = svd.singular_values.max();
    let min = svd.singular_values.min();
    max > 0.0 && min > RANK_RTOL * max
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_in_kernel(jacobian: &DMatrix<f64>, tangent: &DVector<f64>) {
        assert!((tangent.norm() - 1.0).abs() < 1e-12);
        let residual = jacobian * tangent;
        assert!(
            residual.norm() < 1e-10,
            "J·t = {residual} is not zero for t = {tangent}"
        );
    }

    #[test]
    fn kernel_of_row_vector() {
        let jacobian = DMatrix::from_row_slice(1, 2, &[1.0, 2.0]);
        let tangent = kernel_unit_basis(&jacobian).expect("kernel");
        assert_in_kernel(&jacobian, &tangent);
        assert!(tangent[1] > 0.0, "last coordinate keeps the pinned sign");
    }

    #[test]
    fn kernel_of_rank_two_needing_pivoting() {
        // Zero leading entry forces a row swap during elimination.
        let jacobian = DMatrix::from_row_slice(2, 3, &[0.0, 2.0, 1.0, 3.0, 1.0, -1.0]);
        let tangent = kernel_unit_basis(&jacobian).expect("kernel");
        assert_in_kernel(&jacobian, &tangent);
    }

    #[test]
    fn kernel_of_larger_system() {
        let jacobian = DMatrix::from_row_slice(
            3,
            4,
            &[4.0, -1.0, 0.5, 2.0, 1.0, 3.0, -2.0, 0.0, 0.0, 1.0, 5.0, -1.0],
        );
        let tangent = kernel_unit_basis(&jacobian).expect("kernel");
        assert_in_kernel(&jacobian, &tangent);
    }

    #[test]
    fn rank_deficient_jacobian_is_singular() {
        let jacobian = DMatrix::from_row_slice(2, 3, &[1.0, 2.0, 3.0, 2.0, 4.0, 6.0]);
        let err = kernel_unit_basis(&jacobian).expect_err("rank 1");
        match err {
            ContinuationError::SingularJacobian { turning_point, .. } => assert!(!turning_point),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn zero_jacobian_is_singular() {
        let jacobian = DMatrix::<f64>::zeros(1, 2);
        assert!(matches!(
            kernel_unit_basis(&jacobian),
            Err(ContinuationError::SingularJacobian { row: 0, .. })
        ));
    }

    #[test]
    fn vertical_tangent_is_reported_as_turning_point() {
        // Kernel is (1, 0): full rank, but the pinned coordinate vanishes.
        let jacobian = DMatrix::from_row_slice(1, 2, &[0.0, 1.0]);
        let err = kernel_unit_basis(&jacobian).expect_err("turning point");
        assert_eq!(
            err,
            ContinuationError::SingularJacobian {
                row: 0,
                pivot: 0.0,
                turning_point: true,
            }
        );
    }

    #[test]
    fn rejects_non_rectangular_shapes() {
        let square = DMatrix::<f64>::identity(2, 2);
        let err = kernel_unit_basis(&square).expect_err("shape");
        assert!(format!("{err}").contains("expected 3, got 2"));

        let empty = DMatrix::<f64>::zeros(0, 1);
        assert!(kernel_unit_basis(&empty).is_err());
    }

    #[test]
    fn orientation_follows_previous_tangent() {
        let previous = DVector::from_vec(vec![0.0, 1.0]);
        let flipped = orient_tangent(DVector::from_vec(vec![0.6, -0.8]), &previous);
        assert_eq!(flipped.as_slice(), &[-0.6, 0.8]);

        let kept = orient_tangent(DVector::from_vec(vec![1.0, 0.0]), &previous);
        assert_eq!(kept.as_slice(), &[1.0, 0.0]);
    }

    #[test]
    fn initial_orientation_points_towards_final_parameter() {
        assert_eq!(initial_orientation(2, (0.0, 1.0)).as_slice(), &[0.0, 0.0, 1.0]);
        assert_eq!(initial_orientation(1, (1.0, -1.0)).as_slice(), &[0.0, -1.0]);
    }

    #[test]
    fn point_dimension_check() {
        let point = DVector::from_vec(vec![1.0, 2.0]);
        assert!(check_point_dimension(&point, 1).is_ok());
        assert!(check_point_dimension(&point, 2).is_err());
    }
}
