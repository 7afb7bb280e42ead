use num_traits::{Float, FromPrimitive};
use std::fmt::Debug;

/// A trait for types that can be used as scalars in homotopy functions.
/// Must support basic arithmetic, debug printing, and conversion from f64.
pub trait Scalar: Float + FromPrimitive + Debug + 'static {}

impl<T: Float + FromPrimitive + Debug + 'static> Scalar for T {}

/// A parametrized map H(x, λ) from ℝⁿ × ℝ to ℝⁿ.
///
/// Implementing it for both `f64` and `Dual` lets `AutoHomotopyTrack` build the
/// Jacobian by forward-mode differentiation.
pub trait Homotopy<T: Scalar> {
    /// Returns n, the number of equations (and of state variables).
    fn dimension(&self) -> usize;

    /// Evaluates H.
    /// x: state, length n
    /// lambda: continuation parameter
    /// out: buffer of length n receiving H(x, λ)
    fn apply(&self, x: &[T], lambda: T, out: &mut [T]);
}
