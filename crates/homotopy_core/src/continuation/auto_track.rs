use nalgebra::{DMatrix, DVector};

use super::track::{HomotopyTrack, Point};
use super::util::{check_point_dimension, initial_orientation, kernel_unit_basis, orient_tangent};
use crate::autodiff::{dual_jacobian, Dual};
use crate::error::{ContinuationError, ContinuationResult};
use crate::traits::Homotopy;

/// Generic track over any homotopy function that evaluates on `f64` and `Dual`.
///
/// The gradient is obtained by forward-mode differentiation and the tangent by
/// pinned-coordinate kernel extraction, so it works for any n.
pub struct AutoHomotopyTrack<H> {
    homotopy: H,
    init_root: Option<DVector<f64>>,
    param_range: (f64, f64),
    prev_tangent: DVector<f64>,
}

impl<H> AutoHomotopyTrack<H>
where
    H: Homotopy<f64> + Homotopy<Dual>,
{
    /// Creates a track over [λ₀, λ₁]. `init_root` solves H(x, λ₀) = 0; without it
    /// `initial_point` reports `NotSupported`.
    pub fn new(
        homotopy: H,
        init_root: Option<Vec<f64>>,
        param_range: (f64, f64),
    ) -> ContinuationResult<Self> {
        let dim = Homotopy::<f64>::dimension(&homotopy);
        if let Some(root) = &init_root {
            if root.len() != dim {
                return Err(ContinuationError::DimensionMismatch {
                    what: "initial root",
                    expected: dim,
                    actual: root.len(),
                });
            }
        }
        Ok(Self {
            homotopy,
            init_root: init_root.map(DVector::from_vec),
            param_range,
            prev_tangent: initial_orientation(dim, param_range),
        })
    }

    /// Forgets the orientation memory so the next tangent points towards λ₁ again.
    pub fn reset_orientation(&mut self) {
        self.prev_tangent = initial_orientation(self.dimension(), self.param_range);
    }
}

impl<H> HomotopyTrack for AutoHomotopyTrack<H>
where
    H: Homotopy<f64> + Homotopy<Dual>,
{
    fn dimension(&self) -> usize {
        Homotopy::<f64>::dimension(&self.homotopy)
    }

    fn initial_point(&self) -> ContinuationResult<Point> {
        let root = self
            .init_root
            .as_ref()
            .ok_or(ContinuationError::NotSupported("track has no initial root"))?;
        let mut point = DVector::zeros(root.len() + 1);
        point.rows_mut(0, root.len()).copy_from(root);
        point[root.len()] = self.param_range.0;
        Ok(point)
    }

    fn homotopy(&self, point: &Point) -> ContinuationResult<DVector<f64>> {
        let dim = self.dimension();
        check_point_dimension(point, dim)?;
        let mut out = DVector::zeros(dim);
        Homotopy::<f64>::apply(
            &self.homotopy,
            &point.as_slice()[..dim],
            point[dim],
            out.as_mut_slice(),
        );
        Ok(out)
    }

    fn gradient(&self, point: &Point) -> ContinuationResult<DMatrix<f64>> {
        check_point_dimension(point, self.dimension())?;
        Ok(dual_jacobian(&self.homotopy, point.as_slice()))
    }

    fn tangent(&mut self, point: &Point) -> ContinuationResult<DVector<f64>> {
        let jacobian = self.gradient(point)?;
        let tangent = orient_tangent(kernel_unit_basis(&jacobian)?, &self.prev_tangent);
        self.prev_tangent = tangent.clone();
        Ok(tangent)
    }

    fn param_range(&self) -> (f64, f64) {
        self.param_range
    }
}
