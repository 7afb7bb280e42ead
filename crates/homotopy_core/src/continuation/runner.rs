//! Stepped tracing for callers that report progress between batches.

use tracing::{debug, warn};

use super::criterion::{ConvergenceCriterion, SolutionArc};
use super::track::{HomotopyTrack, Point};
use super::types::{ArcPoint, ReferenceMethod, TraceOutcome, TraceProgress, TraceSettings};
use crate::error::{ContinuationError, ContinuationResult};

/// Runs the reference method one outer iteration at a time.
///
/// Stepping the runner to completion visits exactly the points
/// [`PredictorCorrectorMethod::trace`](super::PredictorCorrectorMethod::trace)
/// would, and fails with the same error.
pub struct TraceRunner<T> {
    track: T,
    method: ReferenceMethod,
    point: Point,
    steps: usize,
    done: bool,
    failure: Option<ContinuationError>,
}

impl<T: HomotopyTrack> TraceRunner<T> {
    pub fn new(track: T, settings: &TraceSettings) -> ContinuationResult<Self> {
        let mut method = settings.build()?;
        let point = track.initial_point()?;
        method.tracer_criterion.reset();
        Ok(Self {
            track,
            method,
            point,
            steps: 0,
            done: false,
            failure: None,
        })
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Points accepted so far.
    pub fn arc(&self) -> &SolutionArc {
        self.method.tracer_criterion.arc()
    }

    /// The error that ended the trace, if any.
    pub fn failure(&self) -> Option<&ContinuationError> {
        self.failure.as_ref()
    }

    /// Checks the tracer criterion on the current point and, unless it holds,
    /// advances to the next one. Does nothing once the runner is done.
    pub fn step(&mut self) -> ContinuationResult<()> {
        if self.done {
            return Ok(());
        }
        match self.try_step() {
            Ok(()) => Ok(()),
            Err(err) => {
                warn!("Trace stopped after {} steps: {}", self.steps, err);
                self.done = true;
                self.failure = Some(err.clone());
                Err(err)
            }
        }
    }

    fn try_step(&mut self) -> ContinuationResult<()> {
        if self
            .method
            .tracer_criterion
            .converged(&self.point, &self.track)?
        {
            debug!(
                "Trace converged after {} steps at λ = {:.6}",
                self.steps,
                self.current_param()
            );
            self.done = true;
            return Ok(());
        }
        self.point = self.method.advance(&mut self.track, &self.point)?;
        self.steps += 1;
        Ok(())
    }

    /// Runs up to `batch_size` steps, stopping early when the trace ends.
    pub fn run_steps(&mut self, batch_size: usize) -> ContinuationResult<TraceProgress> {
        for _ in 0..batch_size {
            if self.done {
                break;
            }
            self.step()?;
        }
        Ok(self.progress())
    }

    pub fn progress(&self) -> TraceProgress {
        TraceProgress {
            done: self.done,
            current_step: self.steps,
            max_steps: self.method.tracer_criterion.max_iters(),
            points_computed: self.arc().len(),
            current_param: self.current_param(),
        }
    }

    fn current_param(&self) -> f64 {
        self.point[self.point.len() - 1]
    }

    /// Consumes the runner and returns the traced curve.
    ///
    /// Fails with the error that stopped the trace, or with `TraceUnfinished`
    /// if the trace has not finished yet.
    pub fn take_result(mut self) -> ContinuationResult<TraceOutcome> {
        if let Some(err) = self.failure.take() {
            return Err(err);
        }
        if !self.done {
            return Err(ContinuationError::TraceUnfinished);
        }
        let arc = self.method.tracer_criterion.take_arc();
        Ok(TraceOutcome {
            final_point: ArcPoint::from_point(&self.point),
            arc: arc.to_arc_points(),
        })
    }
}
