//! Predictor-corrector curve tracing.
//!
//! The method alternates a predictor, which steps off the curve along its
//! tangent, with repeated corrector iterates that pull the estimate back onto
//! H = 0. Two convergence criteria decide when each loop ends: the corrector
//! criterion after every iterate, the tracer criterion after every accepted
//! point.

use nalgebra::DMatrix;
use tracing::{debug, warn};

use super::criterion::ConvergenceCriterion;
use super::step::StepAdjuster;
use super::track::{HomotopyTrack, Point};
use crate::error::{ContinuationError, ContinuationResult};

/// Singular values below this are dropped from the pseudo-inverse.
const PINV_EPS: f64 = 1e-12;

/// Produces the next estimate from the current accepted point.
pub trait Predictor {
    fn predict<T: HomotopyTrack + ?Sized>(
        &self,
        track: &mut T,
        point: &Point,
        step_size: f64,
    ) -> ContinuationResult<Point>;
}

/// Performs a single correction iterate; looping is up to the caller.
pub trait Corrector {
    fn correct<T: HomotopyTrack + ?Sized>(
        &self,
        estimate: Point,
        track: &T,
    ) -> ContinuationResult<Point>;
}

/// Forward-Euler predictor: point + h · tangent(point).
#[derive(Debug, Clone, Copy, Default)]
pub struct EulerPredictor;

impl Predictor for EulerPredictor {
    fn predict<T: HomotopyTrack + ?Sized>(
        &self,
        track: &mut T,
        point: &Point,
        step_size: f64,
    ) -> ContinuationResult<Point> {
        let tangent = track.tangent(point)?;
        Ok(point + tangent * step_size)
    }
}

/// Newton corrector using the Moore–Penrose pseudo-inverse of the n×(n+1)
/// Jacobian, i.e. the minimum-norm Newton step.
#[derive(Debug, Clone, Copy, Default)]
pub struct NewtonCorrector;

impl Corrector for NewtonCorrector {
    fn correct<T: HomotopyTrack + ?Sized>(
        &self,
        estimate: Point,
        track: &T,
    ) -> ContinuationResult<Point> {
        let jacobian = track.gradient(&estimate)?;
        let residual = track.homotopy(&estimate)?;
        if jacobian.ncols() != estimate.len() || jacobian.nrows() != residual.len() {
            return Err(ContinuationError::DimensionMismatch {
                what: "gradient",
                expected: residual.len() * estimate.len(),
                actual: jacobian.nrows() * jacobian.ncols(),
            });
        }
        let pinv: DMatrix<f64> = jacobian
            .pseudo_inverse(PINV_EPS)
            .map_err(ContinuationError::PseudoInverse)?;
        Ok(estimate - pinv * residual)
    }
}

/// A full tracing method: predictor, corrector, step control and the two
/// criteria guarding the outer and inner loops.
#[derive(Debug, Clone)]
pub struct PredictorCorrectorMethod<P, C, S, TC, CC> {
    pub predictor: P,
    pub corrector: C,
    pub step_adjuster: S,
    pub tracer_criterion: TC,
    pub corrector_criterion: CC,
}

/// The reference method: Euler predictor, Newton corrector.
pub type EulerNewton<S, TC, CC> = PredictorCorrectorMethod<EulerPredictor, NewtonCorrector, S, TC, CC>;

impl<S, TC, CC> EulerNewton<S, TC, CC>
where
    S: StepAdjuster,
    TC: ConvergenceCriterion,
    CC: ConvergenceCriterion,
{
    pub fn euler_newton(step_adjuster: S, tracer_criterion: TC, corrector_criterion: CC) -> Self {
        Self::new(
            EulerPredictor,
            NewtonCorrector,
            step_adjuster,
            tracer_criterion,
            corrector_criterion,
        )
    }
}

impl<P, C, S, TC, CC> PredictorCorrectorMethod<P, C, S, TC, CC>
where
    P: Predictor,
    C: Corrector,
    S: StepAdjuster,
    TC: ConvergenceCriterion,
    CC: ConvergenceCriterion,
{
    pub fn new(
        predictor: P,
        corrector: C,
        step_adjuster: S,
        tracer_criterion: TC,
        corrector_criterion: CC,
    ) -> Self {
        Self {
            predictor,
            corrector,
            step_adjuster,
            tracer_criterion,
            corrector_criterion,
        }
    }

    /// Predicts the next point; the step size is read fresh on every call.
    pub fn predict<T: HomotopyTrack + ?Sized>(
        &self,
        track: &mut T,
        point: &Point,
    ) -> ContinuationResult<Point> {
        let step_size = self.step_adjuster.cur_step_size();
        self.predictor.predict(track, point, step_size)
    }

    /// One corrector iterate.
    pub fn correct<T: HomotopyTrack + ?Sized>(
        &self,
        estimate: Point,
        track: &T,
    ) -> ContinuationResult<Point> {
        self.corrector.correct(estimate, track)
    }

    /// Runs one outer iteration from an accepted point: predict, correct until
    /// the corrector criterion holds, then let the step adjuster observe the
    /// new point. The tracer criterion is not consulted.
    pub fn advance<T: HomotopyTrack + ?Sized>(
        &mut self,
        track: &mut T,
        point: &Point,
    ) -> ContinuationResult<Point> {
        let mut estimate = self.predict(track, point)?;
        self.corrector_criterion.reset();
        let mut corrections = 0usize;
        while !self.corrector_criterion.converged(&estimate, &*track)? {
            estimate = self.correct(estimate, &*track)?;
            corrections += 1;
        }
        self.step_adjuster.adjust(&*track, &estimate);
        debug!(
            "Accepted point λ = {:.6} after {} corrections (h = {:.3e})",
            estimate[estimate.len() - 1],
            corrections,
            self.step_adjuster.cur_step_size()
        );
        Ok(estimate)
    }

    /// Traces `track` from its initial point until the tracer criterion holds
    /// and returns the final accepted point.
    ///
    /// Errors are terminal and propagate unchanged; a recording tracer
    /// criterion keeps the points accepted before the failure.
    pub fn trace<T: HomotopyTrack + ?Sized>(&mut self, track: &mut T) -> ContinuationResult<Point> {
        let mut point = track.initial_point()?;
        let (start, end) = track.param_range();
        debug!(
            "Tracing {}-dimensional track over [{}, {}]",
            track.dimension(),
            start,
            end
        );

        self.tracer_criterion.reset();
        let mut steps = 0usize;
        loop {
            match self.tracer_criterion.converged(&point, &*track) {
                Ok(true) => break,
                Ok(false) => {}
                Err(err) => {
                    warn!("Trace stopped after {} steps: {}", steps, err);
                    return Err(err);
                }
            }
            point = self.advance(track, &point).map_err(|err| {
                warn!("Trace stopped after {} steps: {}", steps, err);
                err
            })?;
            steps += 1;
        }

        debug!(
            "Trace converged after {} steps at λ = {:.6}",
            steps,
            point[point.len() - 1]
        );
        Ok(point)
    }
}
