//! Schmitt trigger transfer curve as a continuation problem.
//!
//! The trigger's output voltage vo satisfies tanh(k(vo/2 − vi)) = vo for input
//! voltage vi. For gains k > 2 the curve folds back on itself (hysteresis), so
//! it cannot be written as vo(vi) and has to be traced by arc length.

use nalgebra::{DMatrix, DVector};

use super::track::{HomotopyTrack, Point};
use super::util::{check_point_dimension, orient_tangent};
use crate::error::{ContinuationError, ContinuationResult};
use crate::traits::{Homotopy, Scalar};

/// Input voltage range swept by the trigger.
pub const SCHMITT_PARAM_RANGE: (f64, f64) = (-0.8, 0.8);

/// The trigger equation H(vo, vi) = tanh(k(vo/2 − vi)) − vo as a plain
/// homotopy function, for use with [`AutoHomotopyTrack`](super::AutoHomotopyTrack).
#[derive(Debug, Clone, Copy)]
pub struct SchmittTriggerHomotopy {
    pub k: f64,
}

impl<T: Scalar> Homotopy<T> for SchmittTriggerHomotopy {
    fn dimension(&self) -> usize {
        1
    }

    fn apply(&self, x: &[T], lambda: T, out: &mut [T]) {
        let k = T::from_f64(self.k).unwrap_or_else(T::nan);
        let half = T::from_f64(0.5).unwrap_or_else(T::nan);
        out[0] = (k * (x[0] * half - lambda)).tanh() - x[0];
    }
}

/// Closed-form track for the trigger.
///
/// With a single state variable the Jacobian is the 1×2 row ∇H, and its kernel
/// is spanned by the perpendicular (−∂H/∂vi, ∂H/∂vo). That shortcut only holds
/// for n = 1.
#[derive(Debug, Clone)]
pub struct SchmittTriggerTrack {
    k: f64,
    prev_tangent: DVector<f64>,
}

impl SchmittTriggerTrack {
    pub fn new(k: f64) -> Self {
        Self {
            k,
            prev_tangent: DVector::from_vec(vec![0.0, 1.0]),
        }
    }

    fn sech2(&self, vo: f64, vi: f64) -> f64 {
        let t = (self.k * (vo / 2.0 - vi)).tanh();
        1.0 - t * t
    }

    fn f(&self, vo: f64, vi: f64) -> f64 {
        (self.k * (vo / 2.0 - vi)).tanh() - vo
    }

    fn df_dvo(&self, vo: f64, vi: f64) -> f64 {
        self.k / 2.0 * self.sech2(vo, vi) - 1.0
    }

    fn df_dvi(&self, vo: f64, vi: f64) -> f64 {
        -self.k * self.sech2(vo, vi)
    }
}

impl Default for SchmittTriggerTrack {
    fn default() -> Self {
        Self::new(10.0)
    }
}

impl HomotopyTrack for SchmittTriggerTrack {
    fn dimension(&self) -> usize {
        1
    }

    fn initial_point(&self) -> ContinuationResult<Point> {
        Ok(DVector::from_vec(vec![1.0, SCHMITT_PARAM_RANGE.0]))
    }

    fn homotopy(&self, point: &Point) -> ContinuationResult<DVector<f64>> {
        check_point_dimension(point, 1)?;
        Ok(DVector::from_element(1, self.f(point[0], point[1])))
    }

    fn gradient(&self, point: &Point) -> ContinuationResult<DMatrix<f64>> {
        check_point_dimension(point, 1)?;
        let (vo, vi) = (point[0], point[1]);
        Ok(DMatrix::from_row_slice(
            1,
            2,
            &[self.df_dvo(vo, vi), self.df_dvi(vo, vi)],
        ))
    }

    fn tangent(&mut self, point: &Point) -> ContinuationResult<DVector<f64>> {
        let grad = self.gradient(point)?;
        let norm = grad.norm();
        if !(norm > 0.0) {
            return Err(ContinuationError::SingularJacobian {
                row: 0,
                pivot: norm,
                turning_point: false,
            });
        }
        let tangent = DVector::from_vec(vec![-grad[(0, 1)], grad[(0, 0)]]) / norm;
        let tangent = orient_tangent(tangent, &self.prev_tangent);
        self.prev_tangent = tangent.clone();
        Ok(tangent)
    }

    fn param_range(&self) -> (f64, f64) {
        SCHMITT_PARAM_RANGE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::autodiff::dual_jacobian;

    #[test]
    fn start_point_lies_on_curve() {
        let track = SchmittTriggerTrack::default();
        let start = track.initial_point().expect("start");
        assert!(track.homotopy(&start).expect("value").norm() < 1e-9);
    }

    #[test]
    fn closed_form_gradient_matches_dual_jacobian() {
        let track = SchmittTriggerTrack::new(7.5);
        let homotopy = SchmittTriggerHomotopy { k: 7.5 };
        for &(vo, vi) in &[(0.3, 0.1), (-0.9, 0.2), (0.0, 0.0)] {
            let point = DVector::from_vec(vec![vo, vi]);
            let closed = track.gradient(&point).expect("gradient");
            let auto = dual_jacobian(&homotopy, point.as_slice());
            assert!((closed - auto).norm() < 1e-12);
        }
    }

    #[test]
    fn first_tangent_heads_towards_increasing_input() {
        let mut track = SchmittTriggerTrack::default();
        let start = track.initial_point().expect("start");
        let tangent = track.tangent(&start).expect("tangent");
        assert!((tangent.norm() - 1.0).abs() < 1e-12);
        assert!(tangent[1] > 0.99);
    }

    #[test]
    fn tangent_is_in_kernel_and_keeps_orientation() {
        let mut track = SchmittTriggerTrack::default();
        // Points around the upper fold, where the tangent swings through vertical.
        let points = [(0.95, 0.2), (0.9, 0.3), (0.85, 0.29), (0.5, 0.1)];
        let mut previous: Option<DVector<f64>> = None;
        for &(vo, vi) in &points {
            let point = DVector::from_vec(vec![vo, vi]);
            let tangent = track.tangent(&point).expect("tangent");
            let jac = track.gradient(&point).expect("gradient");
            assert!((&jac * &tangent).norm() < 1e-12);
            if let Some(prev) = previous {
                assert!(prev.dot(&tangent) >= 0.0);
            }
            previous = Some(tangent);
        }
    }

    #[test]
    fn rejects_wrong_dimension() {
        let track = SchmittTriggerTrack::default();
        let point = DVector::from_vec(vec![0.0, 0.0, 0.0]);
        assert!(matches!(
            track.homotopy(&point),
            Err(ContinuationError::DimensionMismatch { .. })
        ));
    }
}
