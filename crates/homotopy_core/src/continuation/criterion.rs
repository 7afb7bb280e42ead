//! Convergence criteria guarding the corrector and tracer loops.

use super::track::{HomotopyTrack, Point};
use super::types::ArcPoint;
use crate::error::{ContinuationResult, DivergenceKind};

/// Stateful predicate checked before every iteration of the loop it guards.
///
/// Criteria count iterations, so `reset` must be called before each fresh loop.
pub trait ConvergenceCriterion {
    /// Clears the iteration count (and any accumulated state).
    fn reset(&mut self);

    /// Returns whether `point` satisfies the criterion, or fails with
    /// `FailedToConverge` once the iteration budget is exhausted.
    fn converged<T: HomotopyTrack + ?Sized>(
        &mut self,
        point: &Point,
        track: &T,
    ) -> ContinuationResult<bool>;
}

/// Iteration budget shared by both reference criteria.
#[derive(Debug, Clone, Copy)]
struct IterationBudget {
    iterations: usize,
    max_iters: usize,
}

impl IterationBudget {
    fn new(max_iters: usize) -> Self {
        Self {
            iterations: 0,
            max_iters,
        }
    }

    /// Counts one call; false once more than `max_iters` calls were made.
    fn tick(&mut self) -> bool {
        self.iterations += 1;
        self.iterations <= self.max_iters
    }
}

/// Corrector criterion: ‖H(point)‖ below a tolerance.
#[derive(Debug, Clone)]
pub struct CorrectorCriterion {
    pub tolerance: f64,
    budget: IterationBudget,
}

impl CorrectorCriterion {
    pub fn new(tolerance: f64, max_iters: usize) -> Self {
        Self {
            tolerance,
            budget: IterationBudget::new(max_iters),
        }
    }

    /// Number of `converged` calls since the last reset.
    pub fn iterations(&self) -> usize {
        self.budget.iterations
    }

    pub fn max_iters(&self) -> usize {
        self.budget.max_iters
    }
}

impl ConvergenceCriterion for CorrectorCriterion {
    fn reset(&mut self) {
        self.budget.iterations = 0;
    }

    fn converged<T: HomotopyTrack + ?Sized>(
        &mut self,
        point: &Point,
        track: &T,
    ) -> ContinuationResult<bool> {
        if !self.budget.tick() {
            return Err(DivergenceKind::CorrectorDivergence {
                max_iters: self.budget.max_iters,
            }
            .into());
        }
        let residual = track.homotopy(point)?;
        Ok(residual.norm() < self.tolerance)
    }
}

/// The accepted points of a trace, in the order the tracer saw them.
#[derive(Debug, Clone, Default)]
pub struct SolutionArc {
    points: Vec<Point>,
}

impl SolutionArc {
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn last(&self) -> Option<&Point> {
        self.points.last()
    }

    /// λ-components along the arc.
    pub fn params(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().map(|p| p[p.len() - 1])
    }

    pub fn to_arc_points(&self) -> Vec<ArcPoint> {
        self.points.iter().map(ArcPoint::from_point).collect()
    }

    fn push(&mut self, point: Point) {
        self.points.push(point);
    }

    fn clear(&mut self) {
        self.points.clear();
    }
}

/// Tracer criterion: λ has moved past the end of the track's interval.
///
/// Every point it is asked about is recorded in its [`SolutionArc`]; the arc is
/// kept when the budget runs out so the partial curve stays inspectable.
#[derive(Debug, Clone)]
pub struct TracerCriterion {
    /// Overshoot past λ₁ that must be exceeded, measured in the direction of
    /// continuation.
    pub tolerance: f64,
    budget: IterationBudget,
    arc: SolutionArc,
}

impl TracerCriterion {
    pub fn new(tolerance: f64, max_iters: usize) -> Self {
        Self {
            tolerance,
            budget: IterationBudget::new(max_iters),
            arc: SolutionArc::default(),
        }
    }

    pub fn iterations(&self) -> usize {
        self.budget.iterations
    }

    pub fn max_iters(&self) -> usize {
        self.budget.max_iters
    }

    pub fn arc(&self) -> &SolutionArc {
        &self.arc
    }

    /// Moves the arc out, leaving an empty one behind.
    pub fn take_arc(&mut self) -> SolutionArc {
        std::mem::take(&mut self.arc)
    }
}

impl ConvergenceCriterion for TracerCriterion {
    fn reset(&mut self) {
        self.budget.iterations = 0;
        self.arc.clear();
    }

    fn converged<T: HomotopyTrack + ?Sized>(
        &mut self,
        point: &Point,
        track: &T,
    ) -> ContinuationResult<bool> {
        if !self.budget.tick() {
            return Err(DivergenceKind::TracerDivergence {
                max_iters: self.budget.max_iters,
            }
            .into());
        }
        self.arc.push(point.clone());

        let (start, end) = track.param_range();
        let direction = if end < start { -1.0 } else { 1.0 };
        let lambda = point[point.len() - 1];
        Ok(direction * (lambda - end) > self.tolerance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::continuation::schmitt_trigger::SchmittTriggerTrack;
    use crate::error::ContinuationError;
    use nalgebra::DVector;

    fn point(vo: f64, vi: f64) -> Point {
        DVector::from_vec(vec![vo, vi])
    }

    #[test]
    fn corrector_checks_residual() {
        let track = SchmittTriggerTrack::default();
        let mut criterion = CorrectorCriterion::new(1e-6, 10);
        assert!(criterion.converged(&point(0.0, 0.0), &track).expect("budget"));
        assert!(!criterion.converged(&point(0.5, 0.0), &track).expect("budget"));
        assert_eq!(criterion.iterations(), 2);
    }

    #[test]
    fn corrector_fails_after_budget() {
        let track = SchmittTriggerTrack::default();
        let mut criterion = CorrectorCriterion::new(1e-6, 2);
        let off_curve = point(0.5, 0.0);
        assert!(!criterion.converged(&off_curve, &track).expect("first"));
        assert!(!criterion.converged(&off_curve, &track).expect("second"));
        let err = criterion
            .converged(&off_curve, &track)
            .expect_err("budget exhausted");
        assert_eq!(
            err,
            ContinuationError::FailedToConverge(DivergenceKind::CorrectorDivergence {
                max_iters: 2
            })
        );
    }

    #[test]
    fn reset_clears_corrector_budget() {
        let track = SchmittTriggerTrack::default();
        let mut criterion = CorrectorCriterion::new(1e-6, 1);
        let off_curve = point(0.5, 0.0);
        criterion.converged(&off_curve, &track).expect("first");
        assert!(criterion.converged(&off_curve, &track).is_err());

        criterion.reset();
        assert_eq!(criterion.iterations(), 0);
        assert!(criterion.converged(&off_curve, &track).is_ok());
    }

    #[test]
    fn tracer_records_every_point_and_stops_past_final_param() {
        let track = SchmittTriggerTrack::default();
        let mut criterion = TracerCriterion::new(0.0, 10);
        assert!(!criterion.converged(&point(1.0, -0.8), &track).expect("start"));
        assert!(!criterion.converged(&point(-1.0, 0.5), &track).expect("middle"));
        assert!(criterion.converged(&point(-1.0, 0.81), &track).expect("end"));

        let params: Vec<f64> = criterion.arc().params().collect();
        assert_eq!(params, vec![-0.8, 0.5, 0.81]);
    }

    #[test]
    fn tracer_tolerance_requires_overshoot() {
        let track = SchmittTriggerTrack::default();
        let mut criterion = TracerCriterion::new(1e-3, 10);
        assert!(!criterion.converged(&point(-1.0, 0.8005), &track).expect("short"));
        assert!(criterion.converged(&point(-1.0, 0.802), &track).expect("past"));
    }

    #[test]
    fn tracer_requires_param_to_exceed_final_value() {
        let track = SchmittTriggerTrack::default();
        let mut criterion = TracerCriterion::new(0.0, 10);
        assert!(!criterion.converged(&point(-1.0, 0.8), &track).expect("at end"));
        assert!(criterion.converged(&point(-1.0, 0.8 + 1e-9), &track).expect("past end"));
    }

    #[test]
    fn tracer_keeps_arc_on_failure_and_clears_on_reset() {
        let track = SchmittTriggerTrack::default();
        let mut criterion = TracerCriterion::new(0.0, 2);
        criterion.converged(&point(1.0, -0.8), &track).expect("first");
        criterion.converged(&point(1.0, -0.7), &track).expect("second");
        let err = criterion
            .converged(&point(1.0, -0.6), &track)
            .expect_err("budget exhausted");
        assert!(matches!(
            err,
            ContinuationError::FailedToConverge(DivergenceKind::TracerDivergence { .. })
        ));
        assert_eq!(criterion.arc().len(), 2);

        criterion.reset();
        assert!(criterion.arc().is_empty());
        assert!(criterion.converged(&point(1.0, -0.6), &track).is_ok());
    }

    #[test]
    fn take_arc_leaves_empty_arc() {
        let track = SchmittTriggerTrack::default();
        let mut criterion = TracerCriterion::new(0.0, 5);
        criterion.converged(&point(1.0, -0.8), &track).expect("first");
        let arc = criterion.take_arc();
        assert_eq!(arc.len(), 1);
        assert!(criterion.arc().is_empty());
        assert_eq!(arc.to_arc_points()[0].param, -0.8);
    }
}
