use nalgebra::{DMatrix, DVector};

use crate::error::ContinuationResult;

/// A point on (or near) the curve: n state components followed by λ.
pub type Point = DVector<f64>;

/// Core interface implemented by any curve the predictor-corrector can follow.
///
/// The continuation parameter is never passed separately: the last component
/// of every point is λ, and the last column of the gradient holds ∂H/∂λ.
pub trait HomotopyTrack {
    /// Number of state variables n (points have n + 1 components).
    fn dimension(&self) -> usize;

    /// Start of the curve. Fails with `NotSupported` when the track was built
    /// without one and the caller is expected to supply it.
    fn initial_point(&self) -> ContinuationResult<Point>;

    /// H(point), a vector of length n.
    fn homotopy(&self, point: &Point) -> ContinuationResult<DVector<f64>>;

    /// The n×(n+1) Jacobian of H at `point`.
    fn gradient(&self, point: &Point) -> ContinuationResult<DMatrix<f64>>;

    /// Unit tangent at `point`, oriented along the previously returned tangent.
    ///
    /// Updates the track's orientation memory, so call it once per point that is
    /// advanced past, in arc order.
    fn tangent(&mut self, point: &Point) -> ContinuationResult<DVector<f64>>;

    /// The continuation interval (λ₀, λ₁).
    fn param_range(&self) -> (f64, f64);
}
